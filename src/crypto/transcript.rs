//! Fiat–Shamir transcripts.
//!
//! Every Σ-protocol and the Bulletproofs range proof derive their challenges
//! from a [`merlin::Transcript`] seeded with a protocol label. Group
//! elements and scalars enter the transcript in their wire encoding, so
//! prover and verifier stay byte-for-byte synchronized.

use merlin::Transcript;

use crate::crypto::bignum::BigNum;
use crate::crypto::params::IntegerGroupParams;
use crate::hash::Hash256;
use crate::ser::Encodable;

pub trait TranscriptProtocol {
    /// Appends a big integer with the given `label`.
    fn append_bignum(&mut self, label: &'static [u8], value: &BigNum);

    /// Appends a 256-bit hash with the given `label`.
    fn append_hash(&mut self, label: &'static [u8], value: &Hash256);

    /// Appends the identifying elements of an integer group.
    fn append_group(&mut self, label: &'static [u8], group: &IntegerGroupParams);

    /// Draws a non-zero challenge reduced modulo `modulus`.
    ///
    /// A draw that reduces to zero is discarded and redrawn; both sides of
    /// the protocol perform the identical loop, so no restart is needed.
    fn challenge_bignum(&mut self, label: &'static [u8], modulus: &BigNum) -> BigNum;
}

impl TranscriptProtocol for Transcript {
    fn append_bignum(&mut self, label: &'static [u8], value: &BigNum) {
        self.append_message(label, &value.to_bytes());
    }

    fn append_hash(&mut self, label: &'static [u8], value: &Hash256) {
        self.append_message(label, value.as_bytes());
    }

    fn append_group(&mut self, label: &'static [u8], group: &IntegerGroupParams) {
        self.append_bignum(label, &group.modulus);
        self.append_bignum(b"order", &group.group_order);
        self.append_bignum(b"g", &group.g);
        self.append_bignum(b"h", &group.h);
    }

    fn challenge_bignum(&mut self, label: &'static [u8], modulus: &BigNum) -> BigNum {
        loop {
            let mut buf = [0u8; 64];
            self.challenge_bytes(label, &mut buf);
            let challenge = BigNum::from_bytes_be(&buf).mod_floor(modulus);
            if !challenge.is_zero() {
                return challenge;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_transcripts_agree() {
        let q = BigNum::from_u64(0xffff_ffff_ffff_ffc5);
        let mut a = Transcript::new(b"test");
        let mut b = Transcript::new(b"test");
        a.append_bignum(b"x", &BigNum::from_u64(42));
        b.append_bignum(b"x", &BigNum::from_u64(42));
        assert_eq!(a.challenge_bignum(b"c", &q), b.challenge_bignum(b"c", &q));
    }

    #[test]
    fn diverging_transcripts_disagree() {
        let q = BigNum::from_u64(0xffff_ffff_ffff_ffc5);
        let mut a = Transcript::new(b"test");
        let mut b = Transcript::new(b"test");
        a.append_bignum(b"x", &BigNum::from_u64(42));
        b.append_bignum(b"x", &BigNum::from_u64(43));
        assert_ne!(a.challenge_bignum(b"c", &q), b.challenge_bignum(b"c", &q));
    }
}

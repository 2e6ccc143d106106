//! Pedersen commitments and the proof that two commitments in different
//! groups open to the same value.

use merlin::Transcript;

use crate::crypto::bignum::BigNum;
use crate::crypto::params::IntegerGroupParams;
use crate::crypto::transcript::TranscriptProtocol;
use crate::error::{Error, ProofKind, Result};
use crate::ser::{Decodable, Encodable, Reader};

/// Bit length of the equality-proof challenge space.
pub const COMMITMENT_EQUALITY_CHALLENGE_SIZE: u32 = 256;

/// Statistical hiding margin for the equality-proof blinders.
pub const COMMITMENT_EQUALITY_SECMARGIN: u32 = 512;

/// A Pedersen commitment `C = g^x · h^r mod p` together with its opening.
///
/// The opening stays with the committer; only `commitment_value` travels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    commitment_value: BigNum,
    randomness: BigNum,
    content: BigNum,
}

impl Commitment {
    /// Commits to `content` under fresh uniform randomness.
    pub fn new(group: &IntegerGroupParams, content: BigNum) -> Self {
        let randomness = group.random_exponent();
        Self::with_randomness(group, content, randomness)
    }

    /// Commits to `content` under caller-chosen randomness.
    pub fn with_randomness(
        group: &IntegerGroupParams,
        content: BigNum,
        randomness: BigNum,
    ) -> Self {
        let commitment_value = group
            .g
            .pow_mod(&content, &group.modulus)
            .mul_mod(&group.h.pow_mod(&randomness, &group.modulus), &group.modulus);
        Commitment {
            commitment_value,
            randomness,
            content,
        }
    }

    pub fn commitment_value(&self) -> &BigNum {
        &self.commitment_value
    }

    pub fn randomness(&self) -> &BigNum {
        &self.randomness
    }

    pub fn content(&self) -> &BigNum {
        &self.content
    }
}

/// Non-interactive proof that two commitments, under different groups,
/// open to the same integer.
///
/// Three blinders `r1, r2, r3` of `challenge + secmargin + max(|p|)` bits
/// commit to the shared content and both randomness values; responses are
/// computed over the integers so no modular wraparound leaks the witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentProofOfKnowledge {
    s1: BigNum,
    s2: BigNum,
    s3: BigNum,
    challenge: BigNum,
}

impl CommitmentProofOfKnowledge {
    /// Produces a proof for commitments `a` (under `a_group`) and `b`
    /// (under `b_group`) to the same content.
    pub fn new(
        a_group: &IntegerGroupParams,
        b_group: &IntegerGroupParams,
        a: &Commitment,
        b: &Commitment,
    ) -> Result<Self> {
        if a.content() != b.content() {
            return Err(Error::Param(
                "cannot prove equality of commitments with different contents".into(),
            ));
        }

        let blinder_bits = u64::from(
            COMMITMENT_EQUALITY_CHALLENGE_SIZE + COMMITMENT_EQUALITY_SECMARGIN,
        ) + a_group.modulus.bits().max(b_group.modulus.bits());

        let r1 = BigNum::random_bits(blinder_bits);
        let r2 = BigNum::random_bits(blinder_bits);
        let r3 = BigNum::random_bits(blinder_bits);

        let t1 = a_group
            .g
            .pow_mod(&r1, &a_group.modulus)
            .mul_mod(&a_group.h.pow_mod(&r2, &a_group.modulus), &a_group.modulus);
        let t2 = b_group
            .g
            .pow_mod(&r1, &b_group.modulus)
            .mul_mod(&b_group.h.pow_mod(&r3, &b_group.modulus), &b_group.modulus);

        let challenge = Self::challenge(
            a_group,
            b_group,
            a.commitment_value(),
            b.commitment_value(),
            &t1,
            &t2,
        );

        // Responses over the integers.
        Ok(CommitmentProofOfKnowledge {
            s1: &r1 + &(a.content() * &challenge),
            s2: &r2 + &(a.randomness() * &challenge),
            s3: &r3 + &(b.randomness() * &challenge),
            challenge,
        })
    }

    /// Verifies the proof against the two public commitment values.
    pub fn verify(
        &self,
        a_group: &IntegerGroupParams,
        b_group: &IntegerGroupParams,
        a_value: &BigNum,
        b_value: &BigNum,
    ) -> Result<()> {
        let blinder_bits = u64::from(
            COMMITMENT_EQUALITY_CHALLENGE_SIZE + COMMITMENT_EQUALITY_SECMARGIN,
        ) + a_group.modulus.bits().max(b_group.modulus.bits());
        let max_response = BigNum::from_u64(2).pow(blinder_bits as u32 + 1);

        if self.s1.is_negative()
            || self.s2.is_negative()
            || self.s3.is_negative()
            || self.s1 > max_response
            || self.s2 > max_response
            || self.s3 > max_response
            || self.challenge.bits() > u64::from(COMMITMENT_EQUALITY_CHALLENGE_SIZE)
        {
            return Err(Error::BadProof(ProofKind::Commitment));
        }

        let neg_c = -&self.challenge;
        let t1 = a_value
            .pow_mod(&neg_c, &a_group.modulus)
            .mul_mod(&a_group.g.pow_mod(&self.s1, &a_group.modulus), &a_group.modulus)
            .mul_mod(&a_group.h.pow_mod(&self.s2, &a_group.modulus), &a_group.modulus);
        let t2 = b_value
            .pow_mod(&neg_c, &b_group.modulus)
            .mul_mod(&b_group.g.pow_mod(&self.s1, &b_group.modulus), &b_group.modulus)
            .mul_mod(&b_group.h.pow_mod(&self.s3, &b_group.modulus), &b_group.modulus);

        let expected = Self::challenge(a_group, b_group, a_value, b_value, &t1, &t2);
        if expected != self.challenge {
            return Err(Error::BadProof(ProofKind::Commitment));
        }
        Ok(())
    }

    fn challenge(
        a_group: &IntegerGroupParams,
        b_group: &IntegerGroupParams,
        a_value: &BigNum,
        b_value: &BigNum,
        t1: &BigNum,
        t2: &BigNum,
    ) -> BigNum {
        let mut transcript = Transcript::new(b"zeroct.commitment-equality");
        transcript.append_group(b"group-a", a_group);
        transcript.append_group(b"group-b", b_group);
        transcript.append_bignum(b"a", a_value);
        transcript.append_bignum(b"b", b_value);
        transcript.append_bignum(b"t1", t1);
        transcript.append_bignum(b"t2", t2);
        let bound = BigNum::from_u64(2).pow(COMMITMENT_EQUALITY_CHALLENGE_SIZE);
        transcript.challenge_bignum(b"challenge", &bound)
    }
}

impl Encodable for CommitmentProofOfKnowledge {
    fn encode(&self, out: &mut Vec<u8>) {
        self.s1.encode(out);
        self.s2.encode(out);
        self.s3.encode(out);
        self.challenge.encode(out);
    }
}

impl Decodable for CommitmentProofOfKnowledge {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(CommitmentProofOfKnowledge {
            s1: BigNum::decode(r)?,
            s2: BigNum::decode(r)?,
            s3: BigNum::decode(r)?,
            challenge: BigNum::decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::params::{calculate_seed, derive_integer_group};

    fn two_groups() -> (IntegerGroupParams, IntegerGroupParams) {
        let modulus = BigNum::from_hex(crate::crypto::params::TUTORIAL_TEST_MODULUS).unwrap();
        let a = derive_integer_group(
            calculate_seed(&modulus, "eq-a", 256, "A"),
            256,
            160,
            0,
        )
        .unwrap();
        let b = derive_integer_group(
            calculate_seed(&modulus, "eq-b", 256, "B"),
            320,
            160,
            0,
        )
        .unwrap();
        (a, b)
    }

    #[test]
    fn equality_proof_roundtrip() {
        let (a_group, b_group) = two_groups();
        // The shared value must fit both exponent groups.
        let value = BigNum::random(&a_group.group_order);

        let a = Commitment::new(&a_group, value.clone());
        let b = Commitment::new(&b_group, value);
        let proof = CommitmentProofOfKnowledge::new(&a_group, &b_group, &a, &b).unwrap();
        proof
            .verify(&a_group, &b_group, a.commitment_value(), b.commitment_value())
            .unwrap();

        // Serialized copy verifies as well.
        let restored =
            CommitmentProofOfKnowledge::from_bytes(&proof.to_bytes()).unwrap();
        restored
            .verify(&a_group, &b_group, a.commitment_value(), b.commitment_value())
            .unwrap();
    }

    #[test]
    fn tampered_proof_fails() {
        let (a_group, b_group) = two_groups();
        let value = BigNum::random(&a_group.group_order);
        let a = Commitment::new(&a_group, value.clone());
        let b = Commitment::new(&b_group, value);
        let proof = CommitmentProofOfKnowledge::new(&a_group, &b_group, &a, &b).unwrap();

        let mut bytes = proof.to_bytes();
        bytes[10] ^= 0x40;
        if let Ok(bad) = CommitmentProofOfKnowledge::from_bytes(&bytes) {
            assert!(bad
                .verify(&a_group, &b_group, a.commitment_value(), b.commitment_value())
                .is_err());
        }
    }

    #[test]
    fn mismatched_contents_are_rejected_up_front() {
        let (a_group, b_group) = two_groups();
        let a = Commitment::new(&a_group, BigNum::from_u64(1));
        let b = Commitment::new(&b_group, BigNum::from_u64(2));
        assert!(CommitmentProofOfKnowledge::new(&a_group, &b_group, &a, &b).is_err());
    }
}

//! Serial-number statements: the bare proof of knowledge of a discrete
//! log, the signature of knowledge binding a spend to its transaction
//! hash, and the amount-balance check built from the former.

use merlin::Transcript;

use crate::crypto::bignum::BigNum;
use crate::crypto::commitment::Commitment;
use crate::crypto::params::{IntegerGroupParams, ZeroCtParams};
use crate::crypto::transcript::TranscriptProtocol;
use crate::error::{Error, ProofKind, Result};
use crate::hash::Hash256;
use crate::ser::{Decodable, Encodable, Reader};

/// Schnorr proof of knowledge of `log_base(y)` in a prime-order subgroup.
///
/// Beyond its role in the spend proof this prevents small-subgroup tricks
/// with the revealed serial: a verifying proof pins the discrete log into
/// `Z_q`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialNumberProofOfKnowledge {
    t: BigNum,
    r: BigNum,
}

impl SerialNumberProofOfKnowledge {
    pub fn new(group: &IntegerGroupParams, base: &BigNum, secret: &BigNum) -> Self {
        let v = group.random_exponent();
        let t = base.pow_mod(&v, &group.modulus);
        let y = base.pow_mod(secret, &group.modulus);
        let c = Self::challenge(group, base, &y, &t);
        let r = (&v - &(&c * secret)).mod_floor(&group.group_order);
        SerialNumberProofOfKnowledge { t, r }
    }

    pub fn verify(&self, group: &IntegerGroupParams, base: &BigNum, y: &BigNum) -> Result<()> {
        let c = Self::challenge(group, base, y, &self.t);
        let u = base
            .pow_mod(&self.r, &group.modulus)
            .mul_mod(&y.pow_mod(&c, &group.modulus), &group.modulus);
        if u != self.t {
            return Err(Error::BadProof(ProofKind::SerialPok));
        }
        Ok(())
    }

    fn challenge(
        group: &IntegerGroupParams,
        base: &BigNum,
        y: &BigNum,
        t: &BigNum,
    ) -> BigNum {
        let mut transcript = Transcript::new(b"zeroct.serial-pok");
        transcript.append_group(b"group", group);
        transcript.append_bignum(b"base", base);
        transcript.append_bignum(b"y", y);
        transcript.append_bignum(b"t", t);
        transcript.challenge_bignum(b"challenge", &group.group_order)
    }
}

impl Encodable for SerialNumberProofOfKnowledge {
    fn encode(&self, out: &mut Vec<u8>) {
        self.t.encode(out);
        self.r.encode(out);
    }
}

impl Decodable for SerialNumberProofOfKnowledge {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(SerialNumberProofOfKnowledge {
            t: BigNum::decode(r)?,
            r: BigNum::decode(r)?,
        })
    }
}

/// Signature of knowledge over a transaction hash.
///
/// Two statements share one Fiat–Shamir challenge that also hashes the
/// message: a Schnorr proof of the discrete log of the revealed serial
/// pubkey `y = g^σ` in the coin commitment group, and a Pedersen-opening
/// proof for the commitment to the coin value in the serial group. Flipping
/// a single message bit invalidates the challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialNumberSignatureOfKnowledge {
    t1: BigNum,
    t2: BigNum,
    z_s: BigNum,
    z_v: BigNum,
    z_r: BigNum,
}

impl SerialNumberSignatureOfKnowledge {
    /// Signs `message` with knowledge of the spend serial `sigma` and the
    /// opening of `serial_commitment` (a commitment to the coin value in
    /// the serial group).
    pub fn new(
        params: &ZeroCtParams,
        sigma: &BigNum,
        serial_commitment: &Commitment,
        message: &Hash256,
    ) -> Self {
        let coin_group = &params.coin_commitment_group;
        let sok_group = &params.serial_sok_group;

        let y = coin_group.g.pow_mod(sigma, &coin_group.modulus);

        let k_s = coin_group.random_exponent();
        let t1 = coin_group.g.pow_mod(&k_s, &coin_group.modulus);
        let k_v = sok_group.random_exponent();
        let k_r = sok_group.random_exponent();
        let t2 = sok_group
            .g
            .pow_mod(&k_v, &sok_group.modulus)
            .mul_mod(&sok_group.h.pow_mod(&k_r, &sok_group.modulus), &sok_group.modulus);

        let c = Self::challenge(
            params,
            serial_commitment.commitment_value(),
            &y,
            &t1,
            &t2,
            message,
        );

        SerialNumberSignatureOfKnowledge {
            t1,
            t2,
            z_s: (&k_s + &(&c * sigma)).mod_floor(&coin_group.group_order),
            z_v: (&k_v + &(&c * serial_commitment.content()))
                .mod_floor(&sok_group.group_order),
            z_r: (&k_r + &(&c * serial_commitment.randomness()))
                .mod_floor(&sok_group.group_order),
        }
    }

    /// Verifies against the revealed serial pubkey, the public commitment
    /// value and the bound message.
    pub fn verify(
        &self,
        params: &ZeroCtParams,
        coin_serial_number: &BigNum,
        serial_commitment_value: &BigNum,
        message: &Hash256,
    ) -> Result<()> {
        let coin_group = &params.coin_commitment_group;
        let sok_group = &params.serial_sok_group;

        let c = Self::challenge(
            params,
            serial_commitment_value,
            coin_serial_number,
            &self.t1,
            &self.t2,
            message,
        );

        let lhs1 = coin_group.g.pow_mod(&self.z_s, &coin_group.modulus);
        let rhs1 = self.t1.mul_mod(
            &coin_serial_number.pow_mod(&c, &coin_group.modulus),
            &coin_group.modulus,
        );
        if lhs1 != rhs1 {
            return Err(Error::BadProof(ProofKind::SerialSok));
        }

        let lhs2 = sok_group
            .g
            .pow_mod(&self.z_v, &sok_group.modulus)
            .mul_mod(&sok_group.h.pow_mod(&self.z_r, &sok_group.modulus), &sok_group.modulus);
        let rhs2 = self.t2.mul_mod(
            &serial_commitment_value.pow_mod(&c, &sok_group.modulus),
            &sok_group.modulus,
        );
        if lhs2 != rhs2 {
            return Err(Error::BadProof(ProofKind::SerialSok));
        }
        Ok(())
    }

    fn challenge(
        params: &ZeroCtParams,
        serial_commitment_value: &BigNum,
        y: &BigNum,
        t1: &BigNum,
        t2: &BigNum,
        message: &Hash256,
    ) -> BigNum {
        let mut transcript = Transcript::new(b"zeroct.serial-sok");
        transcript.append_group(b"coin-group", &params.coin_commitment_group);
        transcript.append_group(b"sok-group", &params.serial_sok_group);
        transcript.append_bignum(b"commitment", serial_commitment_value);
        transcript.append_bignum(b"serial-pubkey", y);
        transcript.append_bignum(b"t1", t1);
        transcript.append_bignum(b"t2", t2);
        transcript.append_hash(b"message", message);
        // The smaller exponent group bounds the shared challenge.
        let bound = if params.coin_commitment_group.group_order
            < params.serial_sok_group.group_order
        {
            &params.coin_commitment_group.group_order
        } else {
            &params.serial_sok_group.group_order
        };
        transcript.challenge_bignum(b"challenge", bound)
    }
}

impl Encodable for SerialNumberSignatureOfKnowledge {
    fn encode(&self, out: &mut Vec<u8>) {
        self.t1.encode(out);
        self.t2.encode(out);
        self.z_s.encode(out);
        self.z_v.encode(out);
        self.z_r.encode(out);
    }
}

impl Decodable for SerialNumberSignatureOfKnowledge {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(SerialNumberSignatureOfKnowledge {
            t1: BigNum::decode(r)?,
            t2: BigNum::decode(r)?,
            z_s: BigNum::decode(r)?,
            z_v: BigNum::decode(r)?,
            z_r: BigNum::decode(r)?,
        })
    }
}

/// `g^amount mod p`: the canonical commitment to a plaintext amount.
pub fn plain_amount_commitment(group: &IntegerGroupParams, amount: u64) -> BigNum {
    group
        .g
        .pow_mod(&BigNum::from_u64(amount), &group.modulus)
}

/// Proves that committed inputs and outputs conserve value.
///
/// When inputs and outputs commit to the same total, the quotient of the
/// commitment products is `h` raised to the blinding difference; the proof
/// is a discrete-log PoK in base `h` with that difference as the secret.
pub fn prove_balance(
    group: &IntegerGroupParams,
    input_gammas: &[BigNum],
    output_gammas: &[BigNum],
) -> SerialNumberProofOfKnowledge {
    let mut secret = BigNum::zero();
    for gamma in input_gammas {
        secret = secret + gamma;
    }
    for gamma in output_gammas {
        secret = secret - gamma;
    }
    let secret = secret.mod_floor(&group.group_order);
    SerialNumberProofOfKnowledge::new(group, &group.h, &secret)
}

/// Verifies a balance proof over the products of input and output
/// commitments; fails with [`Error::Unbalanced`].
pub fn verify_balance(
    group: &IntegerGroupParams,
    input_commitments: &[BigNum],
    output_commitments: &[BigNum],
    proof: &SerialNumberProofOfKnowledge,
) -> Result<()> {
    let mut quotient = BigNum::one();
    for commitment in input_commitments {
        quotient = quotient.mul_mod(commitment, &group.modulus);
    }
    for commitment in output_commitments {
        let inv = commitment
            .inverse(&group.modulus)
            .ok_or(Error::Unbalanced)?;
        quotient = quotient.mul_mod(&inv, &group.modulus);
    }
    proof
        .verify(group, &group.h, &quotient)
        .map_err(|_| Error::Unbalanced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::params::TUTORIAL_TEST_MODULUS;
    use lazy_static::lazy_static;

    lazy_static! {
        static ref PARAMS: ZeroCtParams = ZeroCtParams::with_group_sizes(
            BigNum::from_hex(TUTORIAL_TEST_MODULUS).unwrap(),
            256,
            160,
            1,
        )
        .unwrap();
    }

    #[test]
    fn serial_pok_roundtrip() {
        let group = &PARAMS.coin_commitment_group;
        let secret = group.random_exponent();
        let y = group.g.pow_mod(&secret, &group.modulus);
        let proof = SerialNumberProofOfKnowledge::new(group, &group.g, &secret);
        proof.verify(group, &group.g, &y).unwrap();

        let restored = SerialNumberProofOfKnowledge::from_bytes(&proof.to_bytes()).unwrap();
        restored.verify(group, &group.g, &y).unwrap();

        let wrong_y = group.g.pow_mod(&(&secret + &BigNum::one()), &group.modulus);
        assert!(proof.verify(group, &group.g, &wrong_y).is_err());
    }

    #[test]
    fn sok_binds_the_message() {
        let coin_group = &PARAMS.coin_commitment_group;
        let sigma = coin_group.random_exponent();
        let y = coin_group.g.pow_mod(&sigma, &coin_group.modulus);
        let coin_value = BigNum::random(&coin_group.modulus);
        let commitment = Commitment::new(&PARAMS.serial_sok_group, coin_value);

        let message = Hash256::hash(b"spend this");
        let sok = SerialNumberSignatureOfKnowledge::new(&PARAMS, &sigma, &commitment, &message);
        sok.verify(&PARAMS, &y, commitment.commitment_value(), &message)
            .unwrap();

        let other_message = Hash256::hash(b"spend that");
        assert!(sok
            .verify(&PARAMS, &y, commitment.commitment_value(), &other_message)
            .is_err());
    }

    #[test]
    fn balance_accepts_conserving_sums_and_rejects_others() {
        let group = &PARAMS.coin_commitment_group;
        let commit = |amount: u64, gamma: &BigNum| {
            group
                .g
                .pow_mod(&BigNum::from_u64(amount), &group.modulus)
                .mul_mod(&group.h.pow_mod(gamma, &group.modulus), &group.modulus)
        };

        let input_amounts = [3u64, 2, 5, 0];
        let output_amounts = [4u64, 4, 2];
        let input_gammas: Vec<BigNum> =
            input_amounts.iter().map(|_| group.random_exponent()).collect();
        let output_gammas: Vec<BigNum> =
            output_amounts.iter().map(|_| group.random_exponent()).collect();

        let inputs: Vec<BigNum> = input_amounts
            .iter()
            .zip(&input_gammas)
            .map(|(a, g)| commit(*a, g))
            .collect();
        let outputs: Vec<BigNum> = output_amounts
            .iter()
            .zip(&output_gammas)
            .map(|(a, g)| commit(*a, g))
            .collect();

        let proof = prove_balance(group, &input_gammas, &output_gammas);
        verify_balance(group, &inputs, &outputs, &proof).unwrap();

        // 4 + 4 + 2 != 3 + 2 + 5 + 0 once an output changes to 3.
        let mut bad_outputs = outputs;
        bad_outputs[0] = commit(3, &output_gammas[0]);
        assert!(matches!(
            verify_balance(group, &inputs, &bad_outputs, &proof),
            Err(Error::Unbalanced)
        ));
    }
}

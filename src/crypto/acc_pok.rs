//! Σ-protocol proving that a committed coin value is accumulated, without
//! revealing which coin it is.
//!
//! The layout follows the Camenisch–Lysyanskaya accumulator proof: the
//! prover commits to its witness inside the quadratic-residue group modulo
//! `N`, blinds the coin value and commitment randomness with wide integer
//! blinders, and answers a Fiat–Shamir challenge with integer linear
//! combinations. The verifier checks three equations in the commitment
//! group, four in the QR group, and an integer range bound on `s_alpha`.

use merlin::Transcript;

use crate::crypto::accumulator::{Accumulator, AccumulatorWitness};
use crate::crypto::bignum::BigNum;
use crate::crypto::commitment::Commitment;
use crate::crypto::params::AccumulatorParams;
use crate::crypto::transcript::TranscriptProtocol;
use crate::error::{Error, ProofKind, Result};
use crate::ser::{Decodable, Encodable, Reader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatorProofOfKnowledge {
    c_e: BigNum,
    c_u: BigNum,
    c_r: BigNum,
    st_1: BigNum,
    st_2: BigNum,
    st_3: BigNum,
    t_1: BigNum,
    t_2: BigNum,
    t_3: BigNum,
    t_4: BigNum,
    s_alpha: BigNum,
    s_beta: BigNum,
    s_zeta: BigNum,
    s_sigma: BigNum,
    s_eta: BigNum,
    s_epsilon: BigNum,
    s_delta: BigNum,
    s_xi: BigNum,
    s_phi: BigNum,
    s_gamma: BigNum,
    s_psi: BigNum,
}

/// Uniform sample from `[0, bound)` with a uniform sign.
fn random_signed(bound: &BigNum) -> BigNum {
    let magnitude = BigNum::random(bound);
    if BigNum::random(&BigNum::from_u64(2)).is_zero() {
        -magnitude
    } else {
        magnitude
    }
}

impl AccumulatorProofOfKnowledge {
    /// Proves that the coin committed to by `commitment_to_coin` (a
    /// commitment in the accumulator PoK group) is contained in
    /// `accumulator`, using the prover-held `witness`.
    pub fn new(
        params: &AccumulatorParams,
        commitment_to_coin: &Commitment,
        witness: &AccumulatorWitness,
        accumulator: &Accumulator,
    ) -> Result<Self> {
        let group = &params.acc_pok_group;
        let modulus_n = &params.accumulator_modulus;
        let g_n = &params.qrn_group.g_n;
        let h_n = &params.qrn_group.h_n;

        let e = commitment_to_coin.content();
        let r = commitment_to_coin.randomness();
        let c_value = commitment_to_coin.commitment_value();

        let quarter_n = modulus_n >> 2;
        let r_1 = BigNum::random(&quarter_n);
        let r_2 = BigNum::random(&quarter_n);
        let r_3 = BigNum::random(&quarter_n);

        let c_e = g_n
            .pow_mod(e, modulus_n)
            .mul_mod(&h_n.pow_mod(&r_1, modulus_n), modulus_n);
        let c_u = witness
            .value()
            .mul_mod(&h_n.pow_mod(&r_2, modulus_n), modulus_n);
        let c_r = g_n
            .pow_mod(&r_2, modulus_n)
            .mul_mod(&h_n.pow_mod(&r_3, modulus_n), modulus_n);

        let slack = BigNum::from_u64(2).pow(params.k_prime + params.k_dprime);
        let r_alpha = random_signed(&(&params.max_coin_value * &slack));
        let r_gamma = BigNum::random(&group.modulus);
        let r_phi = BigNum::random(&group.modulus);
        let r_psi = BigNum::random(&group.modulus);
        let r_sigma = BigNum::random(&group.modulus);
        let r_xi = BigNum::random(&group.modulus);
        let wide = &quarter_n * &slack;
        let r_epsilon = random_signed(&wide);
        let r_eta = random_signed(&wide);
        let r_zeta = random_signed(&wide);
        let wider = &wide * &params.max_coin_value;
        let r_beta = random_signed(&wider);
        let r_delta = random_signed(&wider);

        let st_1 = group
            .g
            .pow_mod(&r_alpha, &group.modulus)
            .mul_mod(&group.h.pow_mod(&r_phi, &group.modulus), &group.modulus);
        let g_inv = group
            .g
            .inverse(&group.modulus)
            .ok_or_else(|| Error::Param("non-invertible group generator".into()))?;
        let st_2 = c_value
            .mul_mod(&g_inv, &group.modulus)
            .pow_mod(&r_gamma, &group.modulus)
            .mul_mod(&group.h.pow_mod(&r_psi, &group.modulus), &group.modulus);
        let st_3 = group
            .g
            .mul_mod(c_value, &group.modulus)
            .pow_mod(&r_sigma, &group.modulus)
            .mul_mod(&group.h.pow_mod(&r_xi, &group.modulus), &group.modulus);

        let h_n_inv = h_n
            .inverse(modulus_n)
            .ok_or_else(|| Error::Param("non-invertible QR generator".into()))?;
        let g_n_inv = g_n
            .inverse(modulus_n)
            .ok_or_else(|| Error::Param("non-invertible QR generator".into()))?;
        let t_1 = h_n
            .pow_mod(&r_zeta, modulus_n)
            .mul_mod(&g_n.pow_mod(&r_epsilon, modulus_n), modulus_n);
        let t_2 = h_n
            .pow_mod(&r_eta, modulus_n)
            .mul_mod(&g_n.pow_mod(&r_alpha, modulus_n), modulus_n);
        let t_3 = c_u
            .pow_mod(&r_alpha, modulus_n)
            .mul_mod(&h_n_inv.pow_mod(&r_beta, modulus_n), modulus_n);
        let t_4 = c_r
            .pow_mod(&r_alpha, modulus_n)
            .mul_mod(&h_n_inv.pow_mod(&r_delta, modulus_n), modulus_n)
            .mul_mod(&g_n_inv.pow_mod(&r_beta, modulus_n), modulus_n);

        let c = Self::challenge(
            params, c_value, &c_e, &c_u, &c_r, &st_1, &st_2, &st_3, &t_1, &t_2, &t_3, &t_4,
        );

        let order = &group.group_order;
        let e_plus_inv = (e + &BigNum::one())
            .inverse(order)
            .ok_or_else(|| Error::Param("coin value collides with the group order".into()))?;
        let e_minus_inv = (e - &BigNum::one())
            .inverse(order)
            .ok_or_else(|| Error::Param("coin value collides with the group order".into()))?;

        Ok(AccumulatorProofOfKnowledge {
            s_alpha: &r_alpha - &(&c * e),
            s_beta: &r_beta - &(&(&c * &r_2) * e),
            s_zeta: &r_zeta - &(&c * &r_3),
            s_sigma: &r_sigma - &(&c * &e_plus_inv),
            s_eta: &r_eta - &(&c * &r_1),
            s_epsilon: &r_epsilon - &(&c * &r_2),
            s_delta: &r_delta - &(&(&c * &r_3) * e),
            s_xi: &r_xi + &(&(&c * r) * &e_plus_inv),
            s_phi: (&r_phi - &(&c * r)).mod_floor(order),
            s_gamma: &r_gamma - &(&c * &e_minus_inv),
            s_psi: &r_psi + &(&(&c * r) * &e_minus_inv),
            c_e,
            c_u,
            c_r,
            st_1,
            st_2,
            st_3,
            t_1,
            t_2,
            t_3,
            t_4,
        })
    }

    /// Verifies against the accumulator and the public commitment value.
    pub fn verify(
        &self,
        params: &AccumulatorParams,
        accumulator: &Accumulator,
        commitment_value: &BigNum,
    ) -> Result<()> {
        let group = &params.acc_pok_group;
        let modulus_n = &params.accumulator_modulus;
        let g_n = &params.qrn_group.g_n;
        let h_n = &params.qrn_group.h_n;

        let c = Self::challenge(
            params,
            commitment_value,
            &self.c_e,
            &self.c_u,
            &self.c_r,
            &self.st_1,
            &self.st_2,
            &self.st_3,
            &self.t_1,
            &self.t_2,
            &self.t_3,
            &self.t_4,
        );

        let st_1_prime = commitment_value
            .pow_mod(&c, &group.modulus)
            .mul_mod(&group.g.pow_mod(&self.s_alpha, &group.modulus), &group.modulus)
            .mul_mod(&group.h.pow_mod(&self.s_phi, &group.modulus), &group.modulus);
        let g_inv = group
            .g
            .inverse(&group.modulus)
            .ok_or_else(|| Error::Param("non-invertible group generator".into()))?;
        let st_2_prime = group
            .g
            .pow_mod(&c, &group.modulus)
            .mul_mod(
                &commitment_value
                    .mul_mod(&g_inv, &group.modulus)
                    .pow_mod(&self.s_gamma, &group.modulus),
                &group.modulus,
            )
            .mul_mod(&group.h.pow_mod(&self.s_psi, &group.modulus), &group.modulus);
        let st_3_prime = group
            .g
            .pow_mod(&c, &group.modulus)
            .mul_mod(
                &group
                    .g
                    .mul_mod(commitment_value, &group.modulus)
                    .pow_mod(&self.s_sigma, &group.modulus),
                &group.modulus,
            )
            .mul_mod(&group.h.pow_mod(&self.s_xi, &group.modulus), &group.modulus);

        let h_n_inv = h_n
            .inverse(modulus_n)
            .ok_or_else(|| Error::Param("non-invertible QR generator".into()))?;
        let g_n_inv = g_n
            .inverse(modulus_n)
            .ok_or_else(|| Error::Param("non-invertible QR generator".into()))?;
        let t_1_prime = self
            .c_r
            .pow_mod(&c, modulus_n)
            .mul_mod(&h_n.pow_mod(&self.s_zeta, modulus_n), modulus_n)
            .mul_mod(&g_n.pow_mod(&self.s_epsilon, modulus_n), modulus_n);
        let t_2_prime = self
            .c_e
            .pow_mod(&c, modulus_n)
            .mul_mod(&h_n.pow_mod(&self.s_eta, modulus_n), modulus_n)
            .mul_mod(&g_n.pow_mod(&self.s_alpha, modulus_n), modulus_n);
        let t_3_prime = accumulator
            .value()
            .pow_mod(&c, modulus_n)
            .mul_mod(&self.c_u.pow_mod(&self.s_alpha, modulus_n), modulus_n)
            .mul_mod(&h_n_inv.pow_mod(&self.s_beta, modulus_n), modulus_n);
        let t_4_prime = self
            .c_r
            .pow_mod(&self.s_alpha, modulus_n)
            .mul_mod(&h_n_inv.pow_mod(&self.s_delta, modulus_n), modulus_n)
            .mul_mod(&g_n_inv.pow_mod(&self.s_beta, modulus_n), modulus_n);

        // Integer range bound on the blinded coin value.
        let range = &params.max_coin_value
            * &BigNum::from_u64(2).pow(params.k_prime + params.k_dprime + 1);
        let in_range = self.s_alpha <= range && -&self.s_alpha <= range;

        let ok = self.st_1 == st_1_prime
            && self.st_2 == st_2_prime
            && self.st_3 == st_3_prime
            && self.t_1 == t_1_prime
            && self.t_2 == t_2_prime
            && self.t_3 == t_3_prime
            && self.t_4 == t_4_prime
            && in_range;
        if !ok {
            return Err(Error::BadProof(ProofKind::Accumulator));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn challenge(
        params: &AccumulatorParams,
        commitment_value: &BigNum,
        c_e: &BigNum,
        c_u: &BigNum,
        c_r: &BigNum,
        st_1: &BigNum,
        st_2: &BigNum,
        st_3: &BigNum,
        t_1: &BigNum,
        t_2: &BigNum,
        t_3: &BigNum,
        t_4: &BigNum,
    ) -> BigNum {
        let mut transcript = Transcript::new(b"zeroct.accumulator-pok");
        transcript.append_group(b"pok-group", &params.acc_pok_group);
        transcript.append_bignum(b"modulus-n", &params.accumulator_modulus);
        transcript.append_bignum(b"g_n", &params.qrn_group.g_n);
        transcript.append_bignum(b"h_n", &params.qrn_group.h_n);
        transcript.append_bignum(b"commitment", commitment_value);
        transcript.append_bignum(b"c_e", c_e);
        transcript.append_bignum(b"c_u", c_u);
        transcript.append_bignum(b"c_r", c_r);
        transcript.append_bignum(b"st_1", st_1);
        transcript.append_bignum(b"st_2", st_2);
        transcript.append_bignum(b"st_3", st_3);
        transcript.append_bignum(b"t_1", t_1);
        transcript.append_bignum(b"t_2", t_2);
        transcript.append_bignum(b"t_3", t_3);
        transcript.append_bignum(b"t_4", t_4);
        let bound = BigNum::from_u64(2).pow(params.k_prime);
        transcript.challenge_bignum(b"challenge", &bound)
    }
}

impl Encodable for AccumulatorProofOfKnowledge {
    fn encode(&self, out: &mut Vec<u8>) {
        for field in [
            &self.c_e,
            &self.c_u,
            &self.c_r,
            &self.st_1,
            &self.st_2,
            &self.st_3,
            &self.t_1,
            &self.t_2,
            &self.t_3,
            &self.t_4,
            &self.s_alpha,
            &self.s_beta,
            &self.s_zeta,
            &self.s_sigma,
            &self.s_eta,
            &self.s_epsilon,
            &self.s_delta,
            &self.s_xi,
            &self.s_phi,
            &self.s_gamma,
            &self.s_psi,
        ] {
            field.encode(out);
        }
    }
}

impl Decodable for AccumulatorProofOfKnowledge {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(AccumulatorProofOfKnowledge {
            c_e: BigNum::decode(r)?,
            c_u: BigNum::decode(r)?,
            c_r: BigNum::decode(r)?,
            st_1: BigNum::decode(r)?,
            st_2: BigNum::decode(r)?,
            st_3: BigNum::decode(r)?,
            t_1: BigNum::decode(r)?,
            t_2: BigNum::decode(r)?,
            t_3: BigNum::decode(r)?,
            t_4: BigNum::decode(r)?,
            s_alpha: BigNum::decode(r)?,
            s_beta: BigNum::decode(r)?,
            s_zeta: BigNum::decode(r)?,
            s_sigma: BigNum::decode(r)?,
            s_eta: BigNum::decode(r)?,
            s_epsilon: BigNum::decode(r)?,
            s_delta: BigNum::decode(r)?,
            s_xi: BigNum::decode(r)?,
            s_phi: BigNum::decode(r)?,
            s_gamma: BigNum::decode(r)?,
            s_psi: BigNum::decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::coin::PublicCoin;
    use crate::crypto::keys::generate_spend_key;
    use crate::crypto::params::{ZeroCtParams, TUTORIAL_TEST_MODULUS};
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

    fn mint_coin() -> PublicCoin {
        let key = generate_spend_key(&PARAMS);
        let address = key.address(&PARAMS);
        PublicCoin::mint(
            &PARAMS,
            &address.zero_pub_key,
            &address.blinding_commitment,
            "",
            1,
            1 << 20,
        )
        .unwrap()
        .0
    }

    #[test]
    fn accumulated_coin_proof_verifies() {
        let acc_params = &PARAMS.accumulator_params;
        let coins: Vec<PublicCoin> = (0..3).map(|_| mint_coin()).collect();

        let mut accumulator = Accumulator::new(acc_params);
        let mut witness =
            AccumulatorWitness::new(Accumulator::new(acc_params), coins[0].clone());
        for coin in &coins {
            accumulator.accumulate(&PARAMS, coin).unwrap();
            witness.add_element(acc_params, coin);
        }

        let commitment = Commitment::new(&acc_params.acc_pok_group, coins[0].value().clone());
        let proof =
            AccumulatorProofOfKnowledge::new(acc_params, &commitment, &witness, &accumulator)
                .unwrap();
        proof
            .verify(acc_params, &accumulator, commitment.commitment_value())
            .unwrap();

        let restored =
            AccumulatorProofOfKnowledge::from_bytes(&proof.to_bytes()).unwrap();
        restored
            .verify(acc_params, &accumulator, commitment.commitment_value())
            .unwrap();
    }

    #[test]
    fn proof_fails_against_wrong_accumulator() {
        let acc_params = &PARAMS.accumulator_params;
        let coin = mint_coin();
        let stranger = mint_coin();

        let mut accumulator = Accumulator::new(acc_params);
        let mut witness =
            AccumulatorWitness::new(Accumulator::new(acc_params), coin.clone());
        accumulator.accumulate(&PARAMS, &coin).unwrap();
        witness.add_element(acc_params, &coin);

        let commitment = Commitment::new(&acc_params.acc_pok_group, coin.value().clone());
        let proof =
            AccumulatorProofOfKnowledge::new(acc_params, &commitment, &witness, &accumulator)
                .unwrap();

        let mut other = accumulator.clone();
        other.accumulate(&PARAMS, &stranger).unwrap();
        assert!(proof
            .verify(acc_params, &other, commitment.commitment_value())
            .is_err());
    }
}

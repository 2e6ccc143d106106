//! Aggregated Bulletproofs range proofs over the integer commitment group.
//!
//! Proves that each committed amount lies in `[0, 2^64)` with a proof of
//! `2·log2(M·64) + 9` group elements plus two scalars. Verification folds
//! any number of proofs into a single multi-exponentiation equal to the
//! multiplicative identity, combining proofs under fresh random weights so
//! that batch acceptance implies individual acceptance.

use merlin::Transcript;

use crate::crypto::bignum::BigNum;
use crate::crypto::math::{
    hadamard, inner_product, multi_exp, vector_add, vector_add_scalar, vector_powers,
    vector_power_sum, vector_scalar, vector_sub_scalar,
};
use crate::crypto::params::{IntegerGroupParams, RANGE_PROOF_BITS};
use crate::crypto::transcript::TranscriptProtocol;
use crate::error::{Error, ProofKind, Result};
use crate::ser::{Decodable, Encodable, Reader};

/// Maximum number of amounts aggregated into one proof.
pub const MAX_AGGREGATED: usize = 16;

const TRANSCRIPT_LABEL: &[u8] = b"zeroct.range-proof";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletproofRangeproof {
    /// Commitments `g^{v_j}·h^{γ_j}` to the proved amounts.
    pub v: Vec<BigNum>,
    pub l: Vec<BigNum>,
    pub r: Vec<BigNum>,
    pub a_commit: BigNum,
    pub s_commit: BigNum,
    pub t1: BigNum,
    pub t2: BigNum,
    pub taux: BigNum,
    pub mu: BigNum,
    pub a: BigNum,
    pub b: BigNum,
    pub t: BigNum,
}

impl BulletproofRangeproof {
    /// Proves that every `values[j]`, committed under `gammas[j]`, lies in
    /// `[0, 2^64)`. Values outside the range are rejected up front; the
    /// prover cannot produce a verifying proof for them.
    pub fn prove(
        group: &IntegerGroupParams,
        values: &[BigNum],
        gammas: &[BigNum],
    ) -> Result<Self> {
        let n = RANGE_PROOF_BITS;
        if values.is_empty() || values.len() != gammas.len() {
            return Err(Error::Param("mismatched value and blinding vectors".into()));
        }
        for value in values {
            if value.is_negative() || value.bits() > n as u64 {
                return Err(Error::BadProof(ProofKind::RangeProof));
            }
        }

        let m = values.len().next_power_of_two();
        if m > group.max_aggregation().min(MAX_AGGREGATED) {
            return Err(Error::Param("too many amounts for the generator vector".into()));
        }
        let mn = m * n;
        let p = &group.modulus;
        let q = &group.group_order;
        let gs = &group.gis[1..=mn];
        let hs = &group.gis[mn + 1..=2 * mn];
        let u = &group.gis[0];

        // Zero-value padding up to the next power of two.
        let mut padded_values = values.to_vec();
        let mut padded_gammas = gammas.to_vec();
        padded_values.resize(m, BigNum::zero());
        padded_gammas.resize(m, BigNum::zero());

        let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
        let mut v_commitments = Vec::with_capacity(m);
        for (value, gamma) in padded_values.iter().zip(&padded_gammas) {
            let commitment = group
                .g
                .pow_mod(value, p)
                .mul_mod(&group.h.pow_mod(gamma, p), p);
            transcript.append_bignum(b"V", &commitment);
            v_commitments.push(commitment);
        }

        // Bit-decompose the amounts: a_L holds the bits, a_R = a_L - 1.
        let mut a_l = vec![BigNum::zero(); mn];
        let minus_one = (q - &BigNum::one()).mod_floor(q);
        let mut a_r = vec![minus_one; mn];
        for (j, value) in padded_values.iter().enumerate() {
            for i in 0..n {
                if value.bit(i as u64) {
                    a_l[j * n + i] = BigNum::one();
                    a_r[j * n + i] = BigNum::zero();
                }
            }
        }

        let alpha = group.random_exponent();
        let a_commit = {
            let pairs = gs.iter().zip(&a_l).chain(hs.iter().zip(&a_r));
            group
                .h
                .pow_mod(&alpha, p)
                .mul_mod(&multi_exp(pairs, p, q), p)
        };

        let s_l: Vec<BigNum> = (0..mn).map(|_| group.random_exponent()).collect();
        let s_r: Vec<BigNum> = (0..mn).map(|_| group.random_exponent()).collect();
        let rho = group.random_exponent();
        let s_commit = {
            let pairs = gs.iter().zip(&s_l).chain(hs.iter().zip(&s_r));
            group
                .h
                .pow_mod(&rho, p)
                .mul_mod(&multi_exp(pairs, p, q), p)
        };

        transcript.append_bignum(b"A", &a_commit);
        transcript.append_bignum(b"S", &s_commit);
        let y = transcript.challenge_bignum(b"y", q);
        let z = transcript.challenge_bignum(b"z", q);

        // l(X) = (a_L - z·1) + s_L·X
        let l0 = vector_sub_scalar(&a_l, &z, q);
        let l1 = s_l;

        // r(X) = y^{MN} ∘ (a_R + z·1 + s_R·X) + zeros-and-twos
        let z_pow = vector_powers(&z, m + 3, q);
        let two_pows = vector_powers(&BigNum::from_u64(2), n, q);
        let mut zeros_twos = Vec::with_capacity(mn);
        for i in 0..mn {
            zeros_twos.push(z_pow[2 + i / n].mul_mod(&two_pows[i % n], q));
        }
        let y_pows = vector_powers(&y, mn, q);
        let r0 = vector_add(
            &hadamard(&vector_add_scalar(&a_r, &z, q), &y_pows, q),
            &zeros_twos,
            q,
        );
        let r1 = hadamard(&y_pows, &s_r, q);

        let t1_scalar = (&inner_product(&l0, &r1, q) + &inner_product(&l1, &r0, q)).mod_floor(q);
        let t2_scalar = inner_product(&l1, &r1, q);

        let tau1 = group.random_exponent();
        let tau2 = group.random_exponent();
        let t1_commit = group
            .g
            .pow_mod(&t1_scalar, p)
            .mul_mod(&group.h.pow_mod(&tau1, p), p);
        let t2_commit = group
            .g
            .pow_mod(&t2_scalar, p)
            .mul_mod(&group.h.pow_mod(&tau2, p), p);

        transcript.append_bignum(b"T1", &t1_commit);
        transcript.append_bignum(b"T2", &t2_commit);
        let x = transcript.challenge_bignum(b"x", q);

        let l_vec = vector_add(&l0, &vector_scalar(&l1, &x, q), q);
        let r_vec = vector_add(&r0, &vector_scalar(&r1, &x, q), q);
        let t = inner_product(&l_vec, &r_vec, q);

        let mut taux = tau2.mul_mod(&x.mul_mod(&x, q), q);
        taux = (&taux + &tau1.mul_mod(&x, q)).mod_floor(q);
        for (j, gamma) in padded_gammas.iter().enumerate() {
            taux = (&taux + &z_pow[j + 2].mul_mod(gamma, q)).mod_floor(q);
        }
        let mu = (&alpha + &rho.mul_mod(&x, q)).mod_floor(q);

        transcript.append_bignum(b"taux", &taux);
        transcript.append_bignum(b"mu", &mu);
        transcript.append_bignum(b"t", &t);
        let x_ip = transcript.challenge_bignum(b"x_ip", q);

        // Inner-product argument over folded generators. The h-side
        // generators absorb y^{-i} once, then both sides fold per round.
        let y_inv = y.inverse(q).expect("y is non-zero mod a prime");
        let y_inv_pows = vector_powers(&y_inv, mn, q);
        let mut g_vec: Vec<BigNum> = gs.to_vec();
        let mut h_vec: Vec<BigNum> = hs
            .iter()
            .zip(&y_inv_pows)
            .map(|(h_i, y_i)| h_i.pow_mod(y_i, p))
            .collect();
        let mut a_vec = l_vec;
        let mut b_vec = r_vec;

        let mut l_rounds = Vec::new();
        let mut r_rounds = Vec::new();
        let mut n_prime = mn;
        while n_prime > 1 {
            n_prime /= 2;

            let c_l = inner_product(&a_vec[..n_prime], &b_vec[n_prime..], q);
            let c_r = inner_product(&a_vec[n_prime..], &b_vec[..n_prime], q);

            let l_round = {
                let pairs = g_vec[n_prime..]
                    .iter()
                    .zip(&a_vec[..n_prime])
                    .chain(h_vec[..n_prime].iter().zip(&b_vec[n_prime..]));
                multi_exp(pairs, p, q).mul_mod(&u.pow_mod(&c_l.mul_mod(&x_ip, q), p), p)
            };
            let r_round = {
                let pairs = g_vec[..n_prime]
                    .iter()
                    .zip(&a_vec[n_prime..])
                    .chain(h_vec[n_prime..].iter().zip(&b_vec[..n_prime]));
                multi_exp(pairs, p, q).mul_mod(&u.pow_mod(&c_r.mul_mod(&x_ip, q), p), p)
            };

            transcript.append_bignum(b"L", &l_round);
            transcript.append_bignum(b"R", &r_round);
            l_rounds.push(l_round);
            r_rounds.push(r_round);

            let w = transcript.challenge_bignum(b"w", q);
            let w_inv = w.inverse(q).expect("w is non-zero mod a prime");

            if n_prime > 1 {
                for i in 0..n_prime {
                    g_vec[i] = g_vec[i]
                        .pow_mod(&w_inv, p)
                        .mul_mod(&g_vec[n_prime + i].pow_mod(&w, p), p);
                    h_vec[i] = h_vec[i]
                        .pow_mod(&w, p)
                        .mul_mod(&h_vec[n_prime + i].pow_mod(&w_inv, p), p);
                }
            }
            for i in 0..n_prime {
                a_vec[i] = (&a_vec[i].mul_mod(&w, q) + &a_vec[n_prime + i].mul_mod(&w_inv, q))
                    .mod_floor(q);
                b_vec[i] = (&b_vec[i].mul_mod(&w_inv, q) + &b_vec[n_prime + i].mul_mod(&w, q))
                    .mod_floor(q);
            }
            a_vec.truncate(n_prime);
            b_vec.truncate(n_prime);
            g_vec.truncate(n_prime.max(1));
            h_vec.truncate(n_prime.max(1));
        }

        Ok(BulletproofRangeproof {
            v: v_commitments,
            l: l_rounds,
            r: r_rounds,
            a_commit,
            s_commit,
            t1: t1_commit,
            t2: t2_commit,
            taux,
            mu,
            a: a_vec.remove(0),
            b: b_vec.remove(0),
            t,
        })
    }

    /// The commitments this proof covers.
    pub fn value_commitments(&self) -> &[BigNum] {
        &self.v
    }

    /// Verifies this proof alone.
    pub fn verify(&self, group: &IntegerGroupParams) -> Result<()> {
        verify_bulletproofs(group, std::slice::from_ref(self))
    }
}

/// Per-proof data recomputed from the transcript before the combined check.
struct ProofTranscript {
    y: BigNum,
    z: BigNum,
    x: BigNum,
    x_ip: BigNum,
    w: Vec<BigNum>,
    mn: usize,
}

/// Batch verification: all proofs are folded into one multi-exponentiation
/// under independent random weights, and the result must be the
/// multiplicative identity of `Z_p^*`.
pub fn verify_bulletproofs(
    group: &IntegerGroupParams,
    proofs: &[BulletproofRangeproof],
) -> Result<()> {
    let n = RANGE_PROOF_BITS;
    if proofs.is_empty() {
        return Err(Error::Param("empty proof batch".into()));
    }
    let p = &group.modulus;
    let q = &group.group_order;

    // ⟨1^n, 2^n⟩ = 2^n - 1
    let ip12 = (&BigNum::from_u64(2).pow(n as u32) - &BigNum::one()).mod_floor(q);

    let mut max_mn = 0usize;
    let mut transcripts = Vec::with_capacity(proofs.len());
    for proof in proofs {
        let m = proof.v.len();
        if m == 0
            || !m.is_power_of_two()
            || proof.l.len() != proof.r.len()
            || proof.l.is_empty()
        {
            return Err(Error::BadProof(ProofKind::RangeProof));
        }
        let mn = m * n;
        if proof.l.len() != mn.trailing_zeros() as usize {
            return Err(Error::BadProof(ProofKind::RangeProof));
        }
        if m > group.max_aggregation().min(MAX_AGGREGATED) {
            return Err(Error::BadProof(ProofKind::RangeProof));
        }
        max_mn = max_mn.max(mn);

        let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
        for commitment in &proof.v {
            transcript.append_bignum(b"V", commitment);
        }
        transcript.append_bignum(b"A", &proof.a_commit);
        transcript.append_bignum(b"S", &proof.s_commit);
        let y = transcript.challenge_bignum(b"y", q);
        let z = transcript.challenge_bignum(b"z", q);
        transcript.append_bignum(b"T1", &proof.t1);
        transcript.append_bignum(b"T2", &proof.t2);
        let x = transcript.challenge_bignum(b"x", q);
        transcript.append_bignum(b"taux", &proof.taux);
        transcript.append_bignum(b"mu", &proof.mu);
        transcript.append_bignum(b"t", &proof.t);
        let x_ip = transcript.challenge_bignum(b"x_ip", q);
        let mut w = Vec::with_capacity(proof.l.len());
        for (l_round, r_round) in proof.l.iter().zip(&proof.r) {
            transcript.append_bignum(b"L", l_round);
            transcript.append_bignum(b"R", r_round);
            w.push(transcript.challenge_bignum(b"w", q));
        }
        transcripts.push(ProofTranscript { y, z, x, x_ip, w, mn });
    }

    let mut scalar_g = BigNum::zero();
    let mut scalar_h = BigNum::zero();
    let mut scalar_u = BigNum::zero();
    let mut z4 = vec![BigNum::zero(); max_mn];
    let mut z5 = vec![BigNum::zero(); max_mn];
    let mut dynamic: Vec<(BigNum, BigNum)> = Vec::new();

    for (proof, pt) in proofs.iter().zip(&transcripts) {
        let m = proof.v.len();
        let mn = pt.mn;
        let rounds = pt.w.len();

        // Independent weights per proof; drawn fresh on every call.
        let weight_y = group.random_exponent();
        let weight_z = group.random_exponent();

        let z_pow = vector_powers(&pt.z, m + 3, q);
        let ip1y = vector_power_sum(&pt.y, mn, q);

        // delta(y, z) = (z - z^2)·⟨1, y^{MN}⟩ - Σ_j z^{j+2}·⟨1, 2^n⟩
        let mut delta = (&pt.z - &z_pow[2]).mod_floor(q).mul_mod(&ip1y, q);
        for j in 1..=m {
            delta = (&delta - &z_pow[j + 2].mul_mod(&ip12, q)).mod_floor(q);
        }

        // First equation, weighted by weight_y:
        // g^{delta - t} · h^{-taux} · Π V^{z^{j+2}} · T1^x · T2^{x^2} == 1
        scalar_g = (&scalar_g + &(&delta - &proof.t).mul_mod(&weight_y, q)).mod_floor(q);
        scalar_h = (&scalar_h - &proof.taux.mul_mod(&weight_y, q)).mod_floor(q);
        for (j, commitment) in proof.v.iter().enumerate() {
            dynamic.push((
                commitment.clone(),
                z_pow[j + 2].mul_mod(&weight_y, q),
            ));
        }
        dynamic.push((proof.t1.clone(), pt.x.mul_mod(&weight_y, q)));
        dynamic.push((
            proof.t2.clone(),
            pt.x.mul_mod(&pt.x, q).mul_mod(&weight_y, q),
        ));

        // Second equation, weighted by weight_z: the expanded
        // inner-product check.
        dynamic.push((proof.a_commit.clone(), weight_z.clone()));
        dynamic.push((proof.s_commit.clone(), pt.x.mul_mod(&weight_z, q)));

        let w_inv: Vec<BigNum> = pt
            .w
            .iter()
            .map(|w| w.inverse(q).expect("challenge is non-zero mod a prime"))
            .collect();
        for (k, (l_round, r_round)) in proof.l.iter().zip(&proof.r).enumerate() {
            dynamic.push((
                l_round.clone(),
                pt.w[k].mul_mod(&pt.w[k], q).mul_mod(&weight_z, q),
            ));
            dynamic.push((
                r_round.clone(),
                w_inv[k].mul_mod(&w_inv[k], q).mul_mod(&weight_z, q),
            ));
        }

        // w_cache[i] = Π_k w_k^{±1} following the bits of i.
        let mut w_cache = vec![BigNum::one(); 1 << rounds];
        w_cache[0] = w_inv[0].clone();
        w_cache[1] = pt.w[0].clone();
        for j in 1..rounds {
            let slots = 1usize << (j + 1);
            let mut s = slots as isize - 1;
            while s > 0 {
                let parent = w_cache[(s / 2) as usize].clone();
                w_cache[s as usize] = parent.mul_mod(&pt.w[j], q);
                w_cache[(s - 1) as usize] = parent.mul_mod(&w_inv[j], q);
                s -= 2;
            }
        }

        let y_inv = pt.y.inverse(q).expect("challenge is non-zero mod a prime");
        let y_pows = vector_powers(&pt.y, mn, q);
        let y_inv_pows = vector_powers(&y_inv, mn, q);
        let two_pows = vector_powers(&BigNum::from_u64(2), n, q);
        for i in 0..mn {
            let g_scalar = (&pt.z + &proof.a.mul_mod(&w_cache[i], q)).mod_floor(q);
            z4[i] = (&z4[i] - &g_scalar.mul_mod(&weight_z, q)).mod_floor(q);

            let zt = (&pt.z.mul_mod(&y_pows[i], q)
                + &z_pow[2 + i / n].mul_mod(&two_pows[i % n], q))
                .mod_floor(q);
            let folded = proof.b.mul_mod(&w_cache[(!i) & (mn - 1)], q);
            let h_scalar = (&zt - &folded).mul_mod(&y_inv_pows[i], q);
            z5[i] = (&z5[i] + &h_scalar.mul_mod(&weight_z, q)).mod_floor(q);
        }

        scalar_h = (&scalar_h - &proof.mu.mul_mod(&weight_z, q)).mod_floor(q);
        let t_minus_ab = (&proof.t - &proof.a.mul_mod(&proof.b, q)).mod_floor(q);
        scalar_u = (&scalar_u + &t_minus_ab.mul_mod(&pt.x_ip, q).mul_mod(&weight_z, q))
            .mod_floor(q);
    }

    let gs = &group.gis[1..=max_mn];
    let hs = &group.gis[max_mn + 1..=2 * max_mn];
    let u = &group.gis[0];

    let fixed = [
        (&group.g, &scalar_g),
        (&group.h, &scalar_h),
        (u, &scalar_u),
    ];
    let result = multi_exp(
        fixed
            .iter()
            .copied()
            .chain(dynamic.iter().map(|(b, e)| (b, e)))
            .chain(gs.iter().zip(z4.iter()))
            .chain(hs.iter().zip(z5.iter())),
        p,
        q,
    );

    if !result.is_one() {
        log::trace!("range proof batch check result {}", result);
        return Err(Error::BadProof(ProofKind::RangeProof));
    }
    Ok(())
}

impl Encodable for BulletproofRangeproof {
    fn encode(&self, out: &mut Vec<u8>) {
        self.v.encode(out);
        self.l.encode(out);
        self.r.encode(out);
        self.a_commit.encode(out);
        self.s_commit.encode(out);
        self.t1.encode(out);
        self.t2.encode(out);
        self.taux.encode(out);
        self.mu.encode(out);
        self.a.encode(out);
        self.b.encode(out);
        self.t.encode(out);
    }
}

impl Decodable for BulletproofRangeproof {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(BulletproofRangeproof {
            v: Vec::decode(r)?,
            l: Vec::decode(r)?,
            r: Vec::decode(r)?,
            a_commit: BigNum::decode(r)?,
            s_commit: BigNum::decode(r)?,
            t1: BigNum::decode(r)?,
            t2: BigNum::decode(r)?,
            taux: BigNum::decode(r)?,
            mu: BigNum::decode(r)?,
            a: BigNum::decode(r)?,
            b: BigNum::decode(r)?,
            t: BigNum::decode(r)?,
        })
    }
}

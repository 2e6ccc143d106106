//! Cryptographic parameter sets and their deterministic derivation.
//!
//! Every group is derived from the trusted accumulator modulus `N` by a
//! hash-to-candidate loop, so all participants reconstruct identical
//! parameters from `N` alone. Four groups form a tower:
//!
//! * `coin_commitment_group` — coin commitments `g^s·h^r·B mod p₁`; its
//!   generator vector `gis` also backs the Bulletproofs range proof
//!   (`gis[0]` is the inner-product generator, then the g- and h-vectors);
//! * `serial_sok_group` — derived with order `p₁`, so a coin value is a
//!   valid exponent; hosts serial-number statements;
//! * `acc_pok_group` — hosts the commitment side of the accumulator proof;
//! * `qrn_group` — quadratic residues modulo `N` for the accumulator proof.

use crate::crypto::bignum::BigNum;
use crate::error::{Error, Result};
use crate::hash::Hash256;
use crate::ser::Encodable;

/// Hardcoded 2048-bit RSA modulus for tests and tutorials.
///
/// We generated this for testing only. Don't use it in production!
pub const TUTORIAL_TEST_MODULUS: &str =
    "a8852ebf7c49f01cd196e35394f3b74dd86283a07f57e0a262928e7493d4a3961d93d93c90ea3369719641d626d28b9cddc6d9307b9aabdbffc40b6d6da2e329d079b4187ff784b2893d9f53e9ab913a04ff02668114695b07d8ce877c4c8cac1b12b9beff3c51294ebe349eca41c24cd32a6d09dd1579d3947e5c4dcc30b2090b0454edb98c6336e7571db09e0fdafbd68d8f0470223836e90666a5b143b73b9cd71547c917bf24c0efc86af2eba046ed781d9acb05c80f007ef5a0a5dfca23236f37e698e8728def12554bc80f294f71c040a88eff144d130b24211016a97ce0f5fe520f477e555c9997683d762aff8bd1402ae6938dd5c994780b1bf6aa7239e9d8101630ecfeaa730d2bbc97d39beb057f016db2e28bf12fab4989c0170c2593383fd04660b5229adcd8486ba78f6cc1b558bcd92f344100dff239a8c00dbc4c2825277f24bdd04475bcc9a8c39fd895eff97c1967e434effcb9bd394e0577f4cf98c30d9e6b54cd47d6e447dcf34d67e48e4421691dbe4a7d9bd503abb9";

/// Default security level, in bits of soundness for the Σ-protocols.
pub const DEFAULT_SECURITY_LEVEL: u32 = 80;

/// Bit width of the range proved for each committed amount.
pub const RANGE_PROOF_BITS: usize = 64;

/// Miller–Rabin rounds used while deriving parameters.
const PARAMGEN_MR_ROUNDS: u32 = 25;

/// Cap on hash-to-candidate iterations before giving up on a seed.
const MAX_PRIMEGEN_ATTEMPTS: u32 = 1_000_000;

/// A prime-order subgroup of `Z_p^*` with independent generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerGroupParams {
    /// The prime modulus `p`.
    pub modulus: BigNum,
    /// The prime order `q` of the subgroup, with `q | p-1`.
    pub group_order: BigNum,
    /// First generator.
    pub g: BigNum,
    /// Second generator; `log_g(h)` is unknown by construction.
    pub h: BigNum,
    /// Extra generators with pairwise-unknown discrete logs, used by the
    /// range proof. May be empty for groups that never host one.
    pub gis: Vec<BigNum>,
}

impl IntegerGroupParams {
    /// Uniform exponent in `[0, q)`.
    pub fn random_exponent(&self) -> BigNum {
        BigNum::random(&self.group_order)
    }

    /// Checks the structural invariants of the group: `p`, `q` prime,
    /// `q | p-1`, and every generator of order `q` and not the identity.
    pub fn validate(&self) -> Result<()> {
        if !self.modulus.is_prime(PARAMGEN_MR_ROUNDS) {
            return Err(Error::Param("group modulus is not prime".into()));
        }
        if !self.group_order.is_prime(PARAMGEN_MR_ROUNDS) {
            return Err(Error::Param("group order is not prime".into()));
        }
        let p_minus_one = &self.modulus - &BigNum::one();
        if !p_minus_one.mod_floor(&self.group_order).is_zero() {
            return Err(Error::Param("group order does not divide p-1".into()));
        }
        for gen in [&self.g, &self.h].iter().copied().chain(self.gis.iter()) {
            if gen.is_one() || gen.is_zero() {
                return Err(Error::Param("degenerate group generator".into()));
            }
            if !gen.pow_mod(&self.group_order, &self.modulus).is_one() {
                return Err(Error::Param("generator is not of the subgroup order".into()));
            }
        }
        if self.g == self.h {
            return Err(Error::Param("group generators coincide".into()));
        }
        Ok(())
    }

    /// Largest number of simultaneously aggregated range proofs the
    /// generator vector supports.
    pub fn max_aggregation(&self) -> usize {
        if self.gis.len() <= 1 {
            return 0;
        }
        (self.gis.len() - 1) / (2 * RANGE_PROOF_BITS)
    }
}

/// Generators of the quadratic-residue subgroup modulo the accumulator
/// modulus, used inside the accumulator membership proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrnGroup {
    pub g_n: BigNum,
    pub h_n: BigNum,
}

/// Parameters of the RSA accumulator and its membership proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatorParams {
    /// The RSA modulus `N`; its factorization must have been discarded.
    pub accumulator_modulus: BigNum,
    /// Initial accumulator value, a quadratic residue modulo `N`.
    pub accumulator_base: BigNum,
    /// Lower bound (exclusive) on accumulated coin values.
    pub min_coin_value: BigNum,
    /// Upper bound (inclusive) on accumulated coin values.
    pub max_coin_value: BigNum,
    /// Commitment group for the membership proof.
    pub acc_pok_group: IntegerGroupParams,
    /// Quadratic-residue generators modulo `N`.
    pub qrn_group: QrnGroup,
    /// Challenge-length security parameter of the membership proof.
    pub k_prime: u32,
    /// Statistical-hiding security parameter of the membership proof.
    pub k_dprime: u32,
}

/// The complete parameter bundle shared by all protocol operations.
///
/// Instances are immutable; callers share one behind an `Arc` and pass the
/// handle into every cryptographic operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZeroCtParams {
    pub coin_commitment_group: IntegerGroupParams,
    pub serial_sok_group: IntegerGroupParams,
    pub accumulator_params: AccumulatorParams,
    /// Miller–Rabin iterations for full coin validation.
    pub zkp_iterations: u32,
}

impl ZeroCtParams {
    /// Derives a full parameter set from a trusted RSA modulus at the given
    /// security level, supporting up to `max_aggregation` simultaneously
    /// aggregated range proofs.
    pub fn new(modulus: BigNum, security_level: u32, max_aggregation: usize) -> Result<Self> {
        let (p_len, q_len) = group_param_lengths(security_level)?;
        Self::with_group_sizes(modulus, p_len, q_len, max_aggregation)
    }

    /// Same derivation with explicit group bit lengths. Shorter sizes keep
    /// test suites fast; production code should go through [`Self::new`].
    pub fn with_group_sizes(
        modulus: BigNum,
        p_len: u64,
        q_len: u64,
        max_aggregation: usize,
    ) -> Result<Self> {
        if modulus.bits() < 1024 {
            return Err(Error::Param("accumulator modulus is too short".into()));
        }
        if q_len + 2 > p_len {
            return Err(Error::Param("group order length too close to modulus".into()));
        }
        let num_gis = 2 * RANGE_PROOF_BITS * max_aggregation.max(1) + 1;

        let coin_seed = calculate_seed(&modulus, "", p_len, "COIN_COMMITMENT_GROUP");
        let coin_commitment_group = derive_integer_group(coin_seed, p_len, q_len, num_gis)?;

        // The serial group's order equals the coin group's modulus, so coin
        // values are valid exponents there.
        let sok_seed = calculate_seed(&modulus, "", p_len, "SERIAL_SOK_GROUP");
        let serial_sok_group =
            derive_group_from_order(sok_seed, coin_commitment_group.modulus.clone())?;

        let pok_seed = calculate_seed(&modulus, "", p_len, "ACCUMULATOR_POK_GROUP");
        let acc_pok_group = derive_integer_group(pok_seed, p_len, q_len, 0)?;

        let qrn_seed = calculate_seed(&modulus, "", p_len, "ACCUMULATOR_QRN_GROUP");
        let qrn_group = derive_qrn_group(qrn_seed, &modulus)?;

        let k_prime = 160u32;
        let k_dprime = 128u32;

        // A floor above the small primes; prime commitments are uniform in
        // (0, p₁), so in practice every candidate clears it.
        let min_coin_value = BigNum::from_u64(2).pow(k_prime + 2);
        let max_coin_value = &coin_commitment_group.modulus - &BigNum::one();

        let accumulator_params = AccumulatorParams {
            accumulator_modulus: modulus,
            // 31^2: a quadratic residue for any modulus.
            accumulator_base: BigNum::from_u64(961),
            min_coin_value,
            max_coin_value,
            acc_pok_group,
            qrn_group,
            k_prime,
            k_dprime,
        };

        let params = ZeroCtParams {
            coin_commitment_group,
            serial_sok_group,
            accumulator_params,
            zkp_iterations: crate::DEFAULT_ZKP_ITERATIONS,
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks every group of the tower.
    pub fn validate(&self) -> Result<()> {
        self.coin_commitment_group.validate()?;
        self.serial_sok_group.validate()?;
        self.accumulator_params.acc_pok_group.validate()?;
        if self.serial_sok_group.group_order != self.coin_commitment_group.modulus {
            return Err(Error::Param(
                "serial group order must equal the coin commitment modulus".into(),
            ));
        }
        if self.accumulator_params.accumulator_base.is_zero()
            || self.accumulator_params.accumulator_base.is_one()
        {
            return Err(Error::Param("degenerate accumulator base".into()));
        }
        Ok(())
    }
}

fn group_param_lengths(security_level: u32) -> Result<(u64, u64)> {
    match security_level {
        0..=80 => Ok((1024, 256)),
        81..=96 => Ok((2048, 256)),
        97..=128 => Ok((3072, 320)),
        _ => Err(Error::Param("unsupported security level".into())),
    }
}

/// Deterministic stream of 256-bit blocks derived from a seed.
struct SeedStream {
    seed: Hash256,
    counter: u32,
}

impl SeedStream {
    fn new(seed: Hash256) -> Self {
        SeedStream { seed, counter: 0 }
    }

    fn next_block(&mut self) -> Hash256 {
        let mut data = Vec::with_capacity(36);
        self.seed.encode(&mut data);
        self.counter.encode(&mut data);
        self.counter = self.counter.wrapping_add(1);
        Hash256::sha256(&data)
    }

    /// Produces an integer of exactly `bits` bits (top bit set).
    fn next_integer(&mut self, bits: u64) -> BigNum {
        let bytes_needed = ((bits + 7) / 8) as usize;
        let mut raw = Vec::with_capacity(bytes_needed + 32);
        while raw.len() < bytes_needed {
            raw.extend_from_slice(self.next_block().as_bytes());
        }
        raw.truncate(bytes_needed);
        // Mask down to the requested width, then pin the top bit.
        let excess = (bytes_needed as u64) * 8 - bits;
        raw[0] &= 0xffu8 >> excess;
        raw[0] |= 1u8 << (7 - excess);
        BigNum::from_bytes_be(&raw)
    }

    /// Produces a prime of exactly `bits` bits.
    fn next_prime(&mut self, bits: u64) -> Result<BigNum> {
        for _ in 0..MAX_PRIMEGEN_ATTEMPTS {
            let mut candidate = self.next_integer(bits);
            if !candidate.is_odd() {
                candidate = candidate + BigNum::one();
            }
            if candidate.is_prime(PARAMGEN_MR_ROUNDS) {
                return Ok(candidate);
            }
        }
        Err(Error::Param("prime generation exhausted its attempts".into()))
    }
}

/// Derives the master seed for one group of the tower.
pub fn calculate_seed(modulus: &BigNum, aux: &str, security_level: u64, name: &str) -> Hash256 {
    let mut data = Vec::new();
    modulus.encode(&mut data);
    data.extend_from_slice(aux.as_bytes());
    security_level.encode(&mut data);
    data.extend_from_slice(name.as_bytes());
    Hash256::sha256(&data)
}

/// Derives a group of `q_len`-bit prime order inside `Z_p^*` for a
/// `p_len`-bit prime `p`, plus `num_gis` extra generators.
pub fn derive_integer_group(
    seed: Hash256,
    p_len: u64,
    q_len: u64,
    num_gis: usize,
) -> Result<IntegerGroupParams> {
    let mut stream = SeedStream::new(seed);
    let group_order = stream.next_prime(q_len)?;

    // p = x - (x mod 2q) + 1 is congruent to 1 mod 2q; retry the candidate
    // x until p is prime and keeps the requested width.
    let two_q = &group_order + &group_order;
    let mut modulus = None;
    for _ in 0..MAX_PRIMEGEN_ATTEMPTS {
        let x = stream.next_integer(p_len);
        let p = &x - &x.mod_floor(&two_q) + BigNum::one();
        if p.bits() == p_len && p.is_prime(PARAMGEN_MR_ROUNDS) {
            modulus = Some(p);
            break;
        }
    }
    let modulus = modulus
        .ok_or_else(|| Error::Param("modulus generation exhausted its attempts".into()))?;

    let mut gen_stream = stream;
    let g = derive_group_generator(&mut gen_stream, &modulus, &group_order)?;
    let h = derive_group_generator(&mut gen_stream, &modulus, &group_order)?;
    let mut gis = Vec::with_capacity(num_gis);
    for _ in 0..num_gis {
        gis.push(derive_group_generator(&mut gen_stream, &modulus, &group_order)?);
    }

    Ok(IntegerGroupParams {
        modulus,
        group_order,
        g,
        h,
        gis,
    })
}

/// Derives a group whose subgroup order is the given prime, scanning
/// `p = 2·t·order + 1` for the first prime `p`.
pub fn derive_group_from_order(seed: Hash256, order: BigNum) -> Result<IntegerGroupParams> {
    if !order.is_prime(PARAMGEN_MR_ROUNDS) {
        return Err(Error::Param("requested group order is not prime".into()));
    }
    let mut modulus = None;
    let two_order = &order + &order;
    let mut p = &two_order + &BigNum::one();
    for _ in 0..MAX_PRIMEGEN_ATTEMPTS {
        if p.is_prime(PARAMGEN_MR_ROUNDS) {
            modulus = Some(p.clone());
            break;
        }
        p = p + &two_order;
    }
    let modulus =
        modulus.ok_or_else(|| Error::Param("no modulus found for the given order".into()))?;

    let mut stream = SeedStream::new(seed);
    let g = derive_group_generator(&mut stream, &modulus, &order)?;
    let h = derive_group_generator(&mut stream, &modulus, &order)?;

    Ok(IntegerGroupParams {
        modulus,
        group_order: order,
        g,
        h,
        gis: Vec::new(),
    })
}

/// Maps hash outputs into the order-`q` subgroup until a non-identity
/// element appears.
fn derive_group_generator(
    stream: &mut SeedStream,
    modulus: &BigNum,
    group_order: &BigNum,
) -> Result<BigNum> {
    let cofactor = divide_exact(&(modulus - &BigNum::one()), group_order)?;
    for _ in 0..MAX_PRIMEGEN_ATTEMPTS {
        let candidate = stream.next_integer(modulus.bits()).mod_floor(modulus);
        if candidate.is_zero() {
            continue;
        }
        let generator = candidate.pow_mod(&cofactor, modulus);
        if !generator.is_one() && !generator.is_zero() {
            return Ok(generator);
        }
    }
    Err(Error::Param("generator derivation exhausted its attempts".into()))
}

/// `(p-1)/q`, failing if the division is not exact.
fn divide_exact(p_minus_one: &BigNum, q: &BigNum) -> Result<BigNum> {
    if !p_minus_one.mod_floor(q).is_zero() {
        return Err(Error::Param("group order does not divide p-1".into()));
    }
    Ok(p_minus_one / q)
}

/// Derives the two quadratic-residue generators modulo `N`.
fn derive_qrn_group(seed: Hash256, modulus: &BigNum) -> Result<QrnGroup> {
    let mut stream = SeedStream::new(seed);
    let mut generators = Vec::with_capacity(2);
    while generators.len() < 2 {
        let candidate = stream.next_integer(modulus.bits()).mod_floor(modulus);
        let square = candidate.mul_mod(&candidate, modulus);
        if !square.is_zero() && !square.is_one() {
            generators.push(square);
        }
    }
    let h_n = generators.pop().expect("two generators");
    let g_n = generators.pop().expect("two generators");
    Ok(QrnGroup { g_n, h_n })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_group_satisfies_order_relation() {
        let modulus = BigNum::from_hex(TUTORIAL_TEST_MODULUS).unwrap();
        let seed = calculate_seed(&modulus, "test", 256, "TEST GROUP");
        let group = derive_integer_group(seed, 256, 160, 3).unwrap();

        assert_eq!(group.modulus.bits(), 256);
        assert_eq!(group.group_order.bits(), 160);
        assert!(group.g.pow_mod(&group.group_order, &group.modulus).is_one());
        assert!(!group.h.is_one());
        group.validate().unwrap();
    }

    #[test]
    fn derivation_is_deterministic() {
        let modulus = BigNum::from_hex(TUTORIAL_TEST_MODULUS).unwrap();
        let seed = calculate_seed(&modulus, "test", 256, "TEST GROUP");
        let one = derive_integer_group(seed, 256, 160, 0).unwrap();
        let two = derive_integer_group(seed, 256, 160, 0).unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn group_from_order_embeds_the_order() {
        let modulus = BigNum::from_hex(TUTORIAL_TEST_MODULUS).unwrap();
        let seed = calculate_seed(&modulus, "test", 256, "FROM ORDER");
        let order = BigNum::generate_prime(128);
        let group = derive_group_from_order(seed, order.clone()).unwrap();
        assert_eq!(group.group_order, order);
        group.validate().unwrap();
    }

    #[test]
    fn exact_division_helper() {
        let q = BigNum::from_u64(97);
        let t = BigNum::from_u64(1234);
        let product = &q * &t;
        assert_eq!(divide_exact(&product, &q).unwrap(), t);
    }
}

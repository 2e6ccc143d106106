//! Arbitrary-precision signed integers with the modular arithmetic,
//! primality testing and sampling operations the protocol needs.
//!
//! Exponents in Σ-protocol responses are computed over the integers and may
//! be negative, so the representation is signed throughout. Negative
//! exponents in [`BigNum::pow_mod`] denote exponentiation of the modular
//! inverse, which exists for every group element handled here because the
//! moduli in use are primes or RSA moduli coprime to the elements.

use num_bigint::{BigInt, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Pow, Signed, Zero};
use rand::thread_rng;

use std::fmt;
use std::ops;

use crate::error::{Error, Result};
use crate::ser::{write_varint, Decodable, Encodable, Reader};

/// A signed big integer.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BigNum(BigInt);

impl BigNum {
    pub fn zero() -> Self {
        BigNum(BigInt::zero())
    }

    pub fn one() -> Self {
        BigNum(BigInt::one())
    }

    pub fn from_u64(value: u64) -> Self {
        BigNum(BigInt::from(value))
    }

    /// Parses a hexadecimal string (no sign, no prefix).
    pub fn from_hex(hex: &str) -> Option<Self> {
        BigInt::parse_bytes(hex.as_bytes(), 16).map(BigNum)
    }

    /// Interprets `bytes` as an unsigned big-endian magnitude.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        BigNum(BigInt::from_bytes_be(Sign::Plus, bytes))
    }

    /// Big-endian magnitude without the sign.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be().1
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_odd(&self) -> bool {
        self.0.is_odd()
    }

    /// Bit length of the magnitude.
    pub fn bits(&self) -> u64 {
        self.0.bits()
    }

    /// Value of bit `i` of the magnitude.
    pub fn bit(&self, i: u64) -> bool {
        self.0.bit(i)
    }

    pub fn to_u64(&self) -> Option<u64> {
        use num_traits::ToPrimitive;
        self.0.to_u64()
    }

    /// `self` reduced into `[0, modulus)`.
    pub fn mod_floor(&self, modulus: &BigNum) -> BigNum {
        BigNum(self.0.mod_floor(&modulus.0))
    }

    /// `self * rhs mod modulus`, result in `[0, modulus)`.
    pub fn mul_mod(&self, rhs: &BigNum, modulus: &BigNum) -> BigNum {
        BigNum((&self.0 * &rhs.0).mod_floor(&modulus.0))
    }

    /// `self ^ exponent mod modulus`.
    ///
    /// A negative exponent exponentiates the modular inverse of `self`.
    ///
    /// # Panics
    ///
    /// Panics if a negative exponent is used on an element that is not
    /// invertible modulo `modulus`; group elements always are.
    pub fn pow_mod(&self, exponent: &BigNum, modulus: &BigNum) -> BigNum {
        if exponent.is_negative() {
            let inv = self
                .inverse(modulus)
                .expect("non-invertible base with negative exponent");
            let positive = BigNum(-&exponent.0);
            inv.pow_mod(&positive, modulus)
        } else {
            let base = self.0.mod_floor(&modulus.0);
            BigNum(base.modpow(&exponent.0, &modulus.0))
        }
    }

    /// Plain integer power with a small exponent.
    pub fn pow(&self, exponent: u32) -> BigNum {
        BigNum(Pow::pow(&self.0, exponent))
    }

    /// Modular inverse, if `gcd(self, modulus) == 1`.
    pub fn inverse(&self, modulus: &BigNum) -> Option<BigNum> {
        let a = self.0.mod_floor(&modulus.0);
        let egcd = a.extended_gcd(&modulus.0);
        if !egcd.gcd.is_one() {
            return None;
        }
        Some(BigNum(egcd.x.mod_floor(&modulus.0)))
    }

    /// Bitwise XOR of the magnitudes; both operands must be non-negative.
    pub fn xor(&self, other: &BigNum) -> BigNum {
        let a = self.to_bytes_be();
        let b = other.to_bytes_be();
        let len = a.len().max(b.len());
        let mut out = vec![0u8; len];
        for (i, byte) in a.iter().rev().enumerate() {
            out[len - 1 - i] ^= byte;
        }
        for (i, byte) in b.iter().rev().enumerate() {
            out[len - 1 - i] ^= byte;
        }
        BigNum::from_bytes_be(&out)
    }

    /// Uniform sample from `[0, bound)`.
    pub fn random(bound: &BigNum) -> BigNum {
        let mut rng = thread_rng();
        BigNum(rng.gen_bigint_range(&BigInt::zero(), &bound.0))
    }

    /// Uniform sample with at most `bits` bits.
    pub fn random_bits(bits: u64) -> BigNum {
        let mut rng = thread_rng();
        BigNum(BigInt::from(rng.gen_biguint(bits)))
    }

    /// Generates a random prime of exactly `bits` bits.
    pub fn generate_prime(bits: u64) -> BigNum {
        loop {
            let mut candidate = BigNum::random_bits(bits).0;
            candidate.set_bit(bits - 1, true);
            candidate.set_bit(0, true);
            let candidate = BigNum(candidate);
            if candidate.is_prime(MR_ROUNDS_DEFAULT) {
                return candidate;
            }
        }
    }

    /// Miller–Rabin primality test with `rounds` random witnesses,
    /// preceded by trial division against small primes. The error
    /// probability of a composite passing is at most `4^-rounds`.
    pub fn is_prime(&self, rounds: u32) -> bool {
        if self.is_negative() {
            return false;
        }
        let n = &self.0;
        if *n < BigInt::from(2u8) {
            return false;
        }
        for &p in SMALL_PRIMES {
            let p = BigInt::from(p);
            if *n == p {
                return true;
            }
            if (n % &p).is_zero() {
                return false;
            }
        }

        // n - 1 = d * 2^s with d odd
        let n_minus_one = n - 1u8;
        let mut d = n_minus_one.clone();
        let mut s = 0u64;
        while d.is_even() {
            d >>= 1;
            s += 1;
        }

        let mut rng = thread_rng();
        let two = BigInt::from(2u8);
        'witness: for _ in 0..rounds {
            let a = rng.gen_bigint_range(&two, &n_minus_one);
            let mut x = a.modpow(&d, n);
            if x.is_one() || x == n_minus_one {
                continue;
            }
            for _ in 0..s.saturating_sub(1) {
                x = x.modpow(&two, n);
                if x == n_minus_one {
                    continue 'witness;
                }
            }
            return false;
        }
        true
    }
}

/// Default witness count when the caller does not supply one.
const MR_ROUNDS_DEFAULT: u32 = 25;

const SMALL_PRIMES: &[u32] = &[
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

macro_rules! forward_binop {
    ($trait:ident, $method:ident, $op:tt) => {
        impl ops::$trait for BigNum {
            type Output = BigNum;
            fn $method(self, rhs: BigNum) -> BigNum {
                BigNum(self.0 $op rhs.0)
            }
        }

        impl<'a, 'b> ops::$trait<&'b BigNum> for &'a BigNum {
            type Output = BigNum;
            fn $method(self, rhs: &'b BigNum) -> BigNum {
                BigNum(&self.0 $op &rhs.0)
            }
        }

        impl<'a> ops::$trait<&'a BigNum> for BigNum {
            type Output = BigNum;
            fn $method(self, rhs: &'a BigNum) -> BigNum {
                BigNum(self.0 $op &rhs.0)
            }
        }

        impl<'a> ops::$trait<BigNum> for &'a BigNum {
            type Output = BigNum;
            fn $method(self, rhs: BigNum) -> BigNum {
                BigNum(&self.0 $op rhs.0)
            }
        }
    };
}

forward_binop!(Add, add, +);
forward_binop!(Sub, sub, -);
forward_binop!(Mul, mul, *);
forward_binop!(Div, div, /);
forward_binop!(Rem, rem, %);

impl ops::Neg for BigNum {
    type Output = BigNum;
    fn neg(self) -> BigNum {
        BigNum(-self.0)
    }
}

impl<'a> ops::Neg for &'a BigNum {
    type Output = BigNum;
    fn neg(self) -> BigNum {
        BigNum(-&self.0)
    }
}

impl ops::Shr<u32> for &BigNum {
    type Output = BigNum;
    fn shr(self, shift: u32) -> BigNum {
        BigNum(&self.0 >> shift)
    }
}

impl fmt::Debug for BigNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigNum({})", self)
    }
}

impl fmt::Display for BigNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-")?;
        }
        write!(f, "{}", self.0.magnitude().to_str_radix(16))
    }
}

// Wire format: compact-size magnitude length, big-endian magnitude bytes,
// one trailing sign byte (0 positive, 1 negative).
impl Encodable for BigNum {
    fn encode(&self, out: &mut Vec<u8>) {
        let magnitude = self.to_bytes_be();
        let magnitude = if self.is_zero() { Vec::new() } else { magnitude };
        write_varint(out, magnitude.len() as u64);
        out.extend_from_slice(&magnitude);
        out.push(if self.is_negative() { 1 } else { 0 });
    }
}

impl Decodable for BigNum {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let len = r.read_varint()? as usize;
        if len > r.remaining() {
            return Err(Error::Encoding("bignum length exceeds stream".into()));
        }
        let magnitude = r.take(len)?;
        let sign = r.read_u8()?;
        let value = BigNum::from_bytes_be(magnitude);
        match sign {
            0 => Ok(value),
            1 => Ok(-value),
            other => Err(Error::Encoding(format!("invalid sign byte {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow_mod_matches_small_cases() {
        let p = BigNum::from_u64(101);
        let base = BigNum::from_u64(3);
        assert_eq!(base.pow_mod(&BigNum::from_u64(100), &p), BigNum::one());
        // 3^-1 mod 101 == 34
        assert_eq!(
            base.pow_mod(&-BigNum::one(), &p),
            BigNum::from_u64(34)
        );
    }

    #[test]
    fn inverse_of_multiple_of_modulus_is_none() {
        let p = BigNum::from_u64(101);
        assert!(BigNum::from_u64(202).inverse(&p).is_none());
        assert!(BigNum::from_u64(5).inverse(&p).is_some());
    }

    #[test]
    fn miller_rabin_agrees_with_known_values() {
        assert!(BigNum::from_u64(2).is_prime(10));
        assert!(BigNum::from_u64(65_537).is_prime(10));
        assert!(!BigNum::from_u64(65_536).is_prime(10));
        // Carmichael number 561 must be detected.
        assert!(!BigNum::from_u64(561).is_prime(10));
        let prime = BigNum::generate_prime(96);
        assert_eq!(prime.bits(), 96);
        assert!(prime.is_prime(25));
    }

    #[test]
    fn serialization_roundtrip_preserves_sign() {
        for value in &[
            BigNum::zero(),
            BigNum::from_u64(1),
            BigNum::from_u64(u64::MAX),
            -BigNum::from_u64(12_345),
            BigNum::from_hex("a8852ebf7c49f01cd196e35394f3b74d").unwrap(),
        ] {
            let bytes = value.to_bytes();
            assert_eq!(&BigNum::from_bytes(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn xor_is_an_involution() {
        let a = BigNum::from_hex("deadbeef00112233").unwrap();
        let key = BigNum::from_hex("0102030405060708090a").unwrap();
        assert_eq!(a.xor(&key).xor(&key), a);
    }

    #[test]
    fn mod_floor_is_never_negative() {
        let q = BigNum::from_u64(97);
        let negative = -BigNum::from_u64(5);
        assert_eq!(negative.mod_floor(&q), BigNum::from_u64(92));
    }
}

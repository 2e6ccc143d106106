//! Scalar-vector arithmetic for the range proof, all modulo the group
//! order.

use crate::crypto::bignum::BigNum;

/// `[1, x, x^2, ..., x^{n-1}] mod q`.
pub fn vector_powers(x: &BigNum, n: usize, q: &BigNum) -> Vec<BigNum> {
    let mut out = Vec::with_capacity(n);
    let mut acc = BigNum::one();
    for _ in 0..n {
        out.push(acc.clone());
        acc = acc.mul_mod(x, q);
    }
    out
}

/// `Σ_{i<n} x^i mod q`.
pub fn vector_power_sum(x: &BigNum, n: usize, q: &BigNum) -> BigNum {
    let mut sum = BigNum::zero();
    let mut acc = BigNum::one();
    for _ in 0..n {
        sum = (&sum + &acc).mod_floor(q);
        acc = acc.mul_mod(x, q);
    }
    sum
}

/// `⟨a, b⟩ mod q`.
pub fn inner_product(a: &[BigNum], b: &[BigNum], q: &BigNum) -> BigNum {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = BigNum::zero();
    for (x, y) in a.iter().zip(b) {
        sum = (&sum + &x.mul_mod(y, q)).mod_floor(q);
    }
    sum
}

/// Element-wise product mod q.
pub fn hadamard(a: &[BigNum], b: &[BigNum], q: &BigNum) -> Vec<BigNum> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x.mul_mod(y, q)).collect()
}

/// Element-wise sum mod q.
pub fn vector_add(a: &[BigNum], b: &[BigNum], q: &BigNum) -> Vec<BigNum> {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x + y).mod_floor(q))
        .collect()
}

/// Adds a scalar to every element, mod q.
pub fn vector_add_scalar(a: &[BigNum], x: &BigNum, q: &BigNum) -> Vec<BigNum> {
    a.iter().map(|v| (v + x).mod_floor(q)).collect()
}

/// Subtracts a scalar from every element, mod q.
pub fn vector_sub_scalar(a: &[BigNum], x: &BigNum, q: &BigNum) -> Vec<BigNum> {
    a.iter().map(|v| (v - x).mod_floor(q)).collect()
}

/// Scales every element, mod q.
pub fn vector_scalar(a: &[BigNum], x: &BigNum, q: &BigNum) -> Vec<BigNum> {
    a.iter().map(|v| v.mul_mod(x, q)).collect()
}

/// `Π base_i ^ exp_i mod p`, with exponents first reduced into `[0, q)`.
pub fn multi_exp<'a, I>(pairs: I, p: &BigNum, q: &BigNum) -> BigNum
where
    I: IntoIterator<Item = (&'a BigNum, &'a BigNum)>,
{
    let mut acc = BigNum::one();
    for (base, exp) in pairs {
        let exp = exp.mod_floor(q);
        if exp.is_zero() {
            continue;
        }
        acc = acc.mul_mod(&base.pow_mod(&exp, p), p);
    }
    acc
}

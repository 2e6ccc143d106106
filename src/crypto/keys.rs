//! Wallet key material for the coin protocol.
//!
//! A wallet holds a two-phase obfuscation secret `(j₁,j₂), (k₁,k₂)` and a
//! secp256k1 "zero key". The published blinding commitments
//! `B_i = g^{j_i}·h^{k_i}` let senders mint coins that only the owner can
//! recognize; the pairs also transform the coin serial at spend time.

use rand::thread_rng;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

use crate::crypto::bignum::BigNum;
use crate::crypto::params::ZeroCtParams;

/// A pair of exponents used for two-phase obfuscation.
pub type ObfuscationValue = (BigNum, BigNum);

/// The pair of published Pedersen commitments `(B₁, B₂)`.
pub type BlindingCommitment = (BigNum, BigNum);

/// The shareable destination of a mint: blinding commitments plus the
/// public half of the zero key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateAddress {
    pub blinding_commitment: BlindingCommitment,
    pub zero_pub_key: PublicKey,
}

/// View key: enough to recognize incoming coins, not to spend them.
#[derive(Debug, Clone)]
pub struct PrivateViewKey {
    pub blinding_commitment: BlindingCommitment,
    pub zero_priv_key: SecretKey,
}

/// Spend key: the obfuscation pairs plus the private zero key.
#[derive(Debug, Clone)]
pub struct PrivateSpendKey {
    pub obfuscation_j: ObfuscationValue,
    pub obfuscation_k: ObfuscationValue,
    pub zero_priv_key: SecretKey,
}

impl PrivateSpendKey {
    /// Blinding commitment `B_i = g^{j_i}·h^{k_i}` for phase `i`.
    fn blinding_commitment(&self, params: &ZeroCtParams) -> BlindingCommitment {
        let group = &params.coin_commitment_group;
        let commit = |j: &BigNum, k: &BigNum| {
            group
                .g
                .pow_mod(j, &group.modulus)
                .mul_mod(&group.h.pow_mod(k, &group.modulus), &group.modulus)
        };
        (
            commit(&self.obfuscation_j.0, &self.obfuscation_k.0),
            commit(&self.obfuscation_j.1, &self.obfuscation_k.1),
        )
    }

    /// Derives the matching view key.
    pub fn view_key(&self, params: &ZeroCtParams) -> PrivateViewKey {
        PrivateViewKey {
            blinding_commitment: self.blinding_commitment(params),
            zero_priv_key: self.zero_priv_key,
        }
    }

    /// Derives the matching public address.
    pub fn address(&self, params: &ZeroCtParams) -> PrivateAddress {
        let secp = Secp256k1::new();
        PrivateAddress {
            blinding_commitment: self.blinding_commitment(params),
            zero_pub_key: PublicKey::from_secret_key(&secp, &self.zero_priv_key),
        }
    }
}

/// Generates a fresh spend key: two uniform obfuscation pairs and a random
/// zero key.
pub fn generate_spend_key(params: &ZeroCtParams) -> PrivateSpendKey {
    let group = &params.coin_commitment_group;
    let secp = Secp256k1::new();
    let (zero_priv_key, _) = secp.generate_keypair(&mut thread_rng());
    PrivateSpendKey {
        obfuscation_j: (
            BigNum::random(&group.group_order),
            BigNum::random(&group.group_order),
        ),
        obfuscation_k: (
            BigNum::random(&group.group_order),
            BigNum::random(&group.group_order),
        ),
        zero_priv_key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::params::TUTORIAL_TEST_MODULUS;

    #[test]
    fn derived_keys_share_the_blinding_commitment() {
        let modulus = BigNum::from_hex(TUTORIAL_TEST_MODULUS).unwrap();
        let params = ZeroCtParams::with_group_sizes(modulus, 256, 160, 1).unwrap();
        let spend = generate_spend_key(&params);
        let view = spend.view_key(&params);
        let address = spend.address(&params);
        assert_eq!(view.blinding_commitment, address.blinding_commitment);
        assert!(!address.blinding_commitment.0.is_one());
        assert_ne!(
            address.blinding_commitment.0,
            address.blinding_commitment.1
        );
    }
}

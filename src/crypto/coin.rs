//! Public and private coins.
//!
//! A public coin is the network-visible part: a prime Pedersen commitment
//! hiding the serial number, the ephemeral mint key, and the obfuscated
//! payment id, amount and amount commitment. The private coin holds the
//! serial number and randomness recovered by the owner and must never leave
//! the wallet.

use rand::thread_rng;
use secp256k1::ecdh::SharedSecret;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

use crate::crypto::bignum::BigNum;
use crate::crypto::keys::{BlindingCommitment, ObfuscationValue, PrivateSpendKey};
use crate::crypto::params::ZeroCtParams;
use crate::error::{CoinError, Error, Result};
use crate::ser::{Decodable, Encodable, Reader};

/// Current coin format version.
pub const COIN_VERSION: u8 = 1;

/// Miller–Rabin iterations for the fast primality screen inside the mint
/// rejection-sampling loop; full validation uses `zkp_iterations`.
pub const MINT_PRIME_PARAM: u32 = 20;

/// Byte width of the obfuscated payment-id field.
const PID_FIELD_LEN: usize = 32;

/// The deterministic key chain both endpoints derive from the ECDH secret.
///
/// Each link is a double-SHA256 of the previous one, mirroring the
/// hash-twice derivation of `s` and `r` and extending it for the payment-id
/// pad, the amount pad and the amount-commitment randomness.
struct DerivationChain {
    s: BigNum,
    r: BigNum,
    pid_key: BigNum,
    amount_key: BigNum,
    gamma: BigNum,
}

impl DerivationChain {
    fn new(params: &ZeroCtParams, shared_secret: &[u8]) -> Self {
        let group = &params.coin_commitment_group;
        let half_order = &group.group_order >> 1;

        let pre_s = crate::hash::Hash256::hash(shared_secret);
        let pre_r = crate::hash::Hash256::hash(pre_s.as_bytes());
        let pre_k = crate::hash::Hash256::hash(pre_r.as_bytes());
        let pre_a = crate::hash::Hash256::hash(pre_k.as_bytes());
        let pre_g = crate::hash::Hash256::hash(pre_a.as_bytes());

        DerivationChain {
            s: BigNum::from_bytes_be(pre_s.as_bytes()).mod_floor(&half_order),
            r: BigNum::from_bytes_be(pre_r.as_bytes()).mod_floor(&half_order),
            pid_key: BigNum::from_bytes_be(pre_k.as_bytes()),
            amount_key: BigNum::from_bytes_be(pre_a.as_bytes()),
            gamma: BigNum::from_bytes_be(pre_g.as_bytes()).mod_floor(&group.group_order),
        }
    }
}

/// Obfuscates a payment id: length byte, contents, random padding, XORed
/// with the derived pad.
fn xor_obfuscate_pid(payment_id: &str, key: &BigNum) -> BigNum {
    use rand::Rng;

    let truncated: Vec<u8> = payment_id
        .bytes()
        .take(PID_FIELD_LEN - 1)
        .collect();
    let mut field = Vec::with_capacity(PID_FIELD_LEN);
    field.push(truncated.len() as u8);
    field.extend_from_slice(&truncated);
    let mut rng = thread_rng();
    field.resize_with(PID_FIELD_LEN, || rng.gen());
    BigNum::from_bytes_be(&field).xor(key)
}

/// Inverse of [`xor_obfuscate_pid`]; returns `None` for malformed fields.
fn xor_deobfuscate_pid(obfuscated: &BigNum, key: &BigNum) -> Option<String> {
    let clear = obfuscated.xor(key).to_bytes_be();
    if clear.len() > PID_FIELD_LEN {
        return None;
    }
    // Re-left-pad: leading zero bytes vanish in the integer representation.
    let mut field = vec![0u8; PID_FIELD_LEN - clear.len()];
    field.extend_from_slice(&clear);
    let len = field[0] as usize;
    if len >= PID_FIELD_LEN {
        return None;
    }
    String::from_utf8(field[1..=len].to_vec()).ok()
}

/// The part of a coin that is published to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicCoin {
    version: u8,
    value: BigNum,
    pub_key: PublicKey,
    obfuscated_pid: BigNum,
    obfuscated_amount: BigNum,
    amount_commitment: BigNum,
}

impl PublicCoin {
    /// Mints a new coin for `dest`.
    ///
    /// Draws ephemeral keypairs and derives `(s, r)` from the ECDH secret
    /// until the commitment `g^s·B₁·h^r mod p` is a prime in the admissible
    /// range, up to `max_attempts` times.
    ///
    /// # Return value
    ///
    /// The coin and the amount-commitment randomness `γ`, which the caller
    /// needs to build the range proof.
    pub fn mint(
        params: &ZeroCtParams,
        dest_pub_key: &PublicKey,
        blinding_commitment: &BlindingCommitment,
        payment_id: &str,
        amount: u64,
        max_attempts: u32,
    ) -> Result<(PublicCoin, BigNum)> {
        let group = &params.coin_commitment_group;
        let acc = &params.accumulator_params;
        let secp = Secp256k1::new();

        for _ in 0..max_attempts {
            let (eph_priv, eph_pub) = secp.generate_keypair(&mut thread_rng());
            let shared = SharedSecret::new(dest_pub_key, &eph_priv);
            let chain = DerivationChain::new(params, &shared.secret_bytes());

            // C = g^s * B1 * h^r mod p
            let commitment = group
                .g
                .pow_mod(&chain.s, &group.modulus)
                .mul_mod(&blinding_commitment.0, &group.modulus)
                .mul_mod(&group.h.pow_mod(&chain.r, &group.modulus), &group.modulus);

            if commitment.is_prime(MINT_PRIME_PARAM)
                && commitment > acc.min_coin_value
                && commitment <= acc.max_coin_value
            {
                let amount_commitment = group
                    .g
                    .pow_mod(&BigNum::from_u64(amount), &group.modulus)
                    .mul_mod(&group.h.pow_mod(&chain.gamma, &group.modulus), &group.modulus);
                let coin = PublicCoin {
                    version: COIN_VERSION,
                    value: commitment,
                    pub_key: eph_pub,
                    obfuscated_pid: xor_obfuscate_pid(payment_id, &chain.pid_key),
                    obfuscated_amount: BigNum::from_u64(amount).xor(&chain.amount_key),
                    amount_commitment,
                };
                return Ok((coin, chain.gamma));
            }
        }
        Err(Error::MintExhausted)
    }

    /// Rebuilds a coin from its published parts, optionally running full
    /// validation.
    pub fn from_parts(
        params: &ZeroCtParams,
        value: BigNum,
        pub_key: PublicKey,
        obfuscated_pid: BigNum,
        obfuscated_amount: BigNum,
        amount_commitment: BigNum,
        check: bool,
    ) -> Result<Self> {
        let coin = PublicCoin {
            version: COIN_VERSION,
            value,
            pub_key,
            obfuscated_pid,
            obfuscated_amount,
            amount_commitment,
        };
        if check {
            coin.validate(params)?;
        }
        Ok(coin)
    }

    /// Full structural validation of the commitment value.
    pub fn validate(&self, params: &ZeroCtParams) -> Result<()> {
        let acc = &params.accumulator_params;
        if self.value <= acc.min_coin_value {
            return Err(Error::InvalidCoin(CoinError::TooSmall));
        }
        if self.value > acc.max_coin_value {
            return Err(Error::InvalidCoin(CoinError::TooLarge));
        }
        if !self.value.is_prime(params.zkp_iterations) {
            return Err(Error::InvalidCoin(CoinError::NotPrime));
        }
        Ok(())
    }

    pub fn value(&self) -> &BigNum {
        &self.value
    }

    pub fn pub_key(&self) -> &PublicKey {
        &self.pub_key
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn obfuscated_pid(&self) -> &BigNum {
        &self.obfuscated_pid
    }

    pub fn obfuscated_amount(&self) -> &BigNum {
        &self.obfuscated_amount
    }

    pub fn amount_commitment(&self) -> &BigNum {
        &self.amount_commitment
    }
}

impl Encodable for PublicCoin {
    fn encode(&self, out: &mut Vec<u8>) {
        self.version.encode(out);
        self.value.encode(out);
        out.extend_from_slice(&self.pub_key.serialize());
        self.obfuscated_pid.encode(out);
        self.obfuscated_amount.encode(out);
        self.amount_commitment.encode(out);
    }
}

impl Decodable for PublicCoin {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let version = u8::decode(r)?;
        let value = BigNum::decode(r)?;
        let key_bytes = r.take(33)?;
        let pub_key = PublicKey::from_slice(key_bytes)
            .map_err(|e| Error::Encoding(format!("invalid coin public key: {}", e)))?;
        Ok(PublicCoin {
            version,
            value,
            pub_key,
            obfuscated_pid: BigNum::decode(r)?,
            obfuscated_amount: BigNum::decode(r)?,
            amount_commitment: BigNum::decode(r)?,
        })
    }
}

/// The owner-side secret state of a coin.
///
/// Failure to keep this secret will result in the theft of the coin and a
/// total loss of anonymity.
#[derive(Debug, Clone)]
pub struct PrivateCoin {
    public_coin: PublicCoin,
    serial_number: BigNum,
    randomness: BigNum,
    payment_id: String,
    amount: u64,
    gamma: BigNum,
}

impl PrivateCoin {
    /// Attempts to recover the private parameters of `coin` with the
    /// owner's spend key.
    ///
    /// # Return value
    ///
    /// `Ok(None)` when the coin does not belong to this key; the recovered
    /// coin otherwise.
    pub fn recover(
        params: &ZeroCtParams,
        spend_key: &PrivateSpendKey,
        coin: &PublicCoin,
    ) -> Result<Option<PrivateCoin>> {
        let group = &params.coin_commitment_group;
        let shared = SharedSecret::new(coin.pub_key(), &spend_key.zero_priv_key);
        let chain = DerivationChain::new(params, &shared.secret_bytes());

        // C' = g^(s+j1) * h^(r+k1) mod p must match the published value.
        let serial_number = (&chain.s + &spend_key.obfuscation_j.0).mod_floor(&group.group_order);
        let randomness = (&chain.r + &spend_key.obfuscation_k.0).mod_floor(&group.group_order);
        let expected = group
            .g
            .pow_mod(&serial_number, &group.modulus)
            .mul_mod(&group.h.pow_mod(&randomness, &group.modulus), &group.modulus);
        if &expected != coin.value() {
            return Ok(None);
        }

        let amount_bn = coin.obfuscated_amount().xor(&chain.amount_key);
        let amount = match amount_bn.to_u64() {
            Some(amount) => amount,
            None => return Ok(None),
        };
        let amount_commitment = group
            .g
            .pow_mod(&BigNum::from_u64(amount), &group.modulus)
            .mul_mod(&group.h.pow_mod(&chain.gamma, &group.modulus), &group.modulus);
        if &amount_commitment != coin.amount_commitment() {
            return Ok(None);
        }

        let payment_id =
            xor_deobfuscate_pid(coin.obfuscated_pid(), &chain.pid_key).unwrap_or_default();

        Ok(Some(PrivateCoin {
            public_coin: coin.clone(),
            serial_number,
            randomness,
            payment_id,
            amount,
            gamma: chain.gamma,
        }))
    }

    /// Quick ownership check without building the full private coin: only
    /// the commitment equation is recomputed.
    pub fn quick_check_is_mine(
        params: &ZeroCtParams,
        view_priv_key: &SecretKey,
        blinding_commitment: &BlindingCommitment,
        coin: &PublicCoin,
    ) -> bool {
        let group = &params.coin_commitment_group;
        let shared = SharedSecret::new(coin.pub_key(), view_priv_key);
        let chain = DerivationChain::new(params, &shared.secret_bytes());
        let expected = group
            .g
            .pow_mod(&chain.s, &group.modulus)
            .mul_mod(&blinding_commitment.0, &group.modulus)
            .mul_mod(&group.h.pow_mod(&chain.r, &group.modulus), &group.modulus);
        &expected == coin.value()
    }

    /// Structural validity: the serial must be a non-zero exponent and the
    /// public coin must validate.
    pub fn validate(&self, params: &ZeroCtParams) -> Result<()> {
        if !is_valid_private_serial(params, &self.serial_number) {
            return Err(Error::InvalidCoin(CoinError::BadSerial));
        }
        self.public_coin.validate(params)
    }

    /// The spend-time serial `σ = (j₁·s + j₂) mod q`.
    pub fn private_serial_number(
        &self,
        params: &ZeroCtParams,
        obfuscation_j: &ObfuscationValue,
    ) -> BigNum {
        let q = &params.coin_commitment_group.group_order;
        (&(&obfuscation_j.0 * &self.serial_number) + &obfuscation_j.1).mod_floor(q)
    }

    /// The published serial `g^σ mod p`.
    pub fn public_serial_number(
        &self,
        params: &ZeroCtParams,
        obfuscation_j: &ObfuscationValue,
    ) -> BigNum {
        let group = &params.coin_commitment_group;
        group
            .g
            .pow_mod(&self.private_serial_number(params, obfuscation_j), &group.modulus)
    }

    pub fn public_coin(&self) -> &PublicCoin {
        &self.public_coin
    }

    pub fn serial_number(&self) -> &BigNum {
        &self.serial_number
    }

    pub fn randomness(&self) -> &BigNum {
        &self.randomness
    }

    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn gamma(&self) -> &BigNum {
        &self.gamma
    }
}

/// `0 < serial < q`.
pub fn is_valid_private_serial(params: &ZeroCtParams, serial: &BigNum) -> bool {
    !serial.is_zero()
        && !serial.is_negative()
        && serial < &params.coin_commitment_group.group_order
}

/// A revealed public serial must be a non-trivial element of the coin
/// commitment group.
pub fn is_valid_public_serial(params: &ZeroCtParams, serial: &BigNum) -> bool {
    !serial.is_zero() && !serial.is_one() && serial < &params.coin_commitment_group.modulus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::generate_spend_key;
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
    fn pid_obfuscation_roundtrip() {
        let key = BigNum::random_bits(256);
        let obfuscated = xor_obfuscate_pid("invoice-421", &key);
        assert_eq!(
            xor_deobfuscate_pid(&obfuscated, &key).unwrap(),
            "invoice-421"
        );
        assert_eq!(xor_deobfuscate_pid(&xor_obfuscate_pid("", &key), &key).unwrap(), "");
    }

    #[test]
    fn mint_then_recover() {
        let spend_key = generate_spend_key(&PARAMS);
        let address = spend_key.address(&PARAMS);
        let (coin, gamma) = PublicCoin::mint(
            &PARAMS,
            &address.zero_pub_key,
            &address.blinding_commitment,
            "test_payment_id",
            100_000_000,
            1 << 20,
        )
        .unwrap();
        coin.validate(&PARAMS).unwrap();

        let private = PrivateCoin::recover(&PARAMS, &spend_key, &coin)
            .unwrap()
            .expect("coin belongs to this key");
        assert_eq!(private.amount(), 100_000_000);
        assert_eq!(private.payment_id(), "test_payment_id");
        assert_eq!(private.gamma(), &gamma);
        private.validate(&PARAMS).unwrap();

        // g^s * h^r recomposes the published commitment.
        let group = &PARAMS.coin_commitment_group;
        let recomposed = group
            .g
            .pow_mod(private.serial_number(), &group.modulus)
            .mul_mod(
                &group.h.pow_mod(private.randomness(), &group.modulus),
                &group.modulus,
            );
        assert_eq!(&recomposed, coin.value());
    }

    #[test]
    fn foreign_coin_is_not_recovered() {
        let owner = generate_spend_key(&PARAMS);
        let address = owner.address(&PARAMS);
        let (coin, _) = PublicCoin::mint(
            &PARAMS,
            &address.zero_pub_key,
            &address.blinding_commitment,
            "",
            1,
            1 << 20,
        )
        .unwrap();

        let stranger = generate_spend_key(&PARAMS);
        assert!(PrivateCoin::recover(&PARAMS, &stranger, &coin)
            .unwrap()
            .is_none());
        assert!(!PrivateCoin::quick_check_is_mine(
            &PARAMS,
            &stranger.zero_priv_key,
            &stranger.address(&PARAMS).blinding_commitment,
            &coin,
        ));
    }

    #[test]
    fn non_prime_coin_is_rejected() {
        let group = &PARAMS.coin_commitment_group;
        let secp = Secp256k1::new();
        let (_, pub_key) = secp.generate_keypair(&mut thread_rng());
        // p - 1 is even, in range, and therefore composite.
        let even = &group.modulus - &BigNum::one();
        let coin = PublicCoin::from_parts(
            &PARAMS,
            even,
            pub_key,
            BigNum::zero(),
            BigNum::zero(),
            BigNum::one(),
            false,
        )
        .unwrap();
        assert!(matches!(
            coin.validate(&PARAMS),
            Err(Error::InvalidCoin(_))
        ));
    }

    #[test]
    fn serialization_roundtrip() {
        let spend_key = generate_spend_key(&PARAMS);
        let address = spend_key.address(&PARAMS);
        let (coin, _) = PublicCoin::mint(
            &PARAMS,
            &address.zero_pub_key,
            &address.blinding_commitment,
            "roundtrip",
            42,
            1 << 20,
        )
        .unwrap();
        let restored = PublicCoin::from_bytes(&coin.to_bytes()).unwrap();
        assert_eq!(coin, restored);
    }
}

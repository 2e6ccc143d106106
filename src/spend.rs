//! The complete proof needed to spend a coin.
//!
//! A [`CoinSpend`] composes a proof that some accumulated coin is being
//! spent with a signature of knowledge over the spending transaction's
//! hash, without revealing which coin it is. Verification here only checks
//! the proofs against the supplied accumulator; the chain engine
//! additionally checks that the accumulator matches a block, that the
//! serial is unspent, and that amounts balance.

use crate::crypto::accumulator::{Accumulator, AccumulatorWitness};
use crate::crypto::acc_pok::AccumulatorProofOfKnowledge;
use crate::crypto::bignum::BigNum;
use crate::crypto::coin::{is_valid_public_serial, PrivateCoin};
use crate::crypto::commitment::{Commitment, CommitmentProofOfKnowledge};
use crate::crypto::keys::ObfuscationValue;
use crate::crypto::params::ZeroCtParams;
use crate::crypto::serial::{SerialNumberProofOfKnowledge, SerialNumberSignatureOfKnowledge};
use crate::error::{CoinError, Error, Result};
use crate::hash::Hash256;
use crate::ser::{Decodable, Encodable, Reader};

/// Current spend format version.
pub const SPEND_VERSION: u8 = 1;

/// What a spend is used for; stakes reuse the same proof machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendType {
    Spend,
    Stake,
}

impl SpendType {
    fn to_u8(self) -> u8 {
        match self {
            SpendType::Spend => 0,
            SpendType::Stake => 1,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SpendType::Spend),
            1 => Ok(SpendType::Stake),
            other => Err(Error::Encoding(format!("unknown spend type {}", other))),
        }
    }
}

impl Encodable for SpendType {
    fn encode(&self, out: &mut Vec<u8>) {
        self.to_u8().encode(out);
    }
}

impl Decodable for SpendType {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        SpendType::from_u8(u8::decode(r)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSpend {
    ptx_hash: Hash256,
    block_accumulator_hash: Hash256,
    acc_commitment_to_coin_value: BigNum,
    serial_commitment_to_coin_value: BigNum,
    coin_serial_number: BigNum,
    accumulator_pok: AccumulatorProofOfKnowledge,
    serial_number_sok: SerialNumberSignatureOfKnowledge,
    commitment_pok: CommitmentProofOfKnowledge,
    serial_number_pok: SerialNumberProofOfKnowledge,
    version: u8,
    spend_type: SpendType,
    amount_commitment: BigNum,
}

impl CoinSpend {
    /// Generates the spend proof for `coin` against `accumulator`.
    ///
    /// The witness must already verify for the coin and accumulator;
    /// `block_accumulator_hash` names the block whose stamped accumulator
    /// value the verifier will look up. The proof is bound to `ptx_hash`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        params: &ZeroCtParams,
        coin: &PrivateCoin,
        accumulator: &Accumulator,
        block_accumulator_hash: Hash256,
        witness: &AccumulatorWitness,
        ptx_hash: Hash256,
        spend_type: SpendType,
        obfuscation_j: &ObfuscationValue,
    ) -> Result<Self> {
        witness.verify(&params.accumulator_params, accumulator, coin.public_coin())?;

        // Two commitments to the coin value, one per proof domain: the
        // serial group for the signature of knowledge, the accumulator PoK
        // group for the membership proof, linked by an equality proof.
        let serial_commitment = Commitment::new(
            &params.serial_sok_group,
            coin.public_coin().value().clone(),
        );
        let acc_commitment = Commitment::new(
            &params.accumulator_params.acc_pok_group,
            coin.public_coin().value().clone(),
        );

        let commitment_pok = CommitmentProofOfKnowledge::new(
            &params.serial_sok_group,
            &params.accumulator_params.acc_pok_group,
            &serial_commitment,
            &acc_commitment,
        )?;
        let accumulator_pok = AccumulatorProofOfKnowledge::new(
            &params.accumulator_params,
            &acc_commitment,
            witness,
            accumulator,
        )?;

        let sigma = coin.private_serial_number(params, obfuscation_j);
        let coin_group = &params.coin_commitment_group;
        let coin_serial_number = coin_group.g.pow_mod(&sigma, &coin_group.modulus);

        let amount_commitment = coin.public_coin().amount_commitment().clone();
        let hash_sig = signature_hash(
            serial_commitment.commitment_value(),
            acc_commitment.commitment_value(),
            &commitment_pok,
            &accumulator_pok,
            &ptx_hash,
            &coin_serial_number,
            &block_accumulator_hash,
            spend_type,
            &amount_commitment,
        );

        let serial_number_sok =
            SerialNumberSignatureOfKnowledge::new(params, &sigma, &serial_commitment, &hash_sig);
        let serial_number_pok =
            SerialNumberProofOfKnowledge::new(coin_group, &coin_group.g, &sigma);

        Ok(CoinSpend {
            ptx_hash,
            block_accumulator_hash,
            acc_commitment_to_coin_value: acc_commitment.commitment_value().clone(),
            serial_commitment_to_coin_value: serial_commitment.commitment_value().clone(),
            coin_serial_number,
            accumulator_pok,
            serial_number_sok,
            commitment_pok,
            serial_number_pok,
            version: SPEND_VERSION,
            spend_type,
            amount_commitment,
        })
    }

    /// Verifies every sub-proof against the given accumulator.
    pub fn verify(&self, params: &ZeroCtParams, accumulator: &Accumulator) -> Result<()> {
        if !is_valid_public_serial(params, &self.coin_serial_number) {
            return Err(Error::InvalidCoin(CoinError::BadSerial));
        }

        self.commitment_pok.verify(
            &params.serial_sok_group,
            &params.accumulator_params.acc_pok_group,
            &self.serial_commitment_to_coin_value,
            &self.acc_commitment_to_coin_value,
        )?;

        self.accumulator_pok.verify(
            &params.accumulator_params,
            accumulator,
            &self.acc_commitment_to_coin_value,
        )?;

        self.serial_number_sok.verify(
            params,
            &self.coin_serial_number,
            &self.serial_commitment_to_coin_value,
            &self.signature_hash(),
        )?;

        let coin_group = &params.coin_commitment_group;
        self.serial_number_pok
            .verify(coin_group, &coin_group.g, &self.coin_serial_number)?;

        Ok(())
    }

    /// The message every spend signature binds: all proof material
    /// assembled before the signature itself.
    pub fn signature_hash(&self) -> Hash256 {
        signature_hash(
            &self.serial_commitment_to_coin_value,
            &self.acc_commitment_to_coin_value,
            &self.commitment_pok,
            &self.accumulator_pok,
            &self.ptx_hash,
            &self.coin_serial_number,
            &self.block_accumulator_hash,
            self.spend_type,
            &self.amount_commitment,
        )
    }

    /// Identifier for the verification cache.
    pub fn spend_hash(&self) -> Hash256 {
        Hash256::hash(&self.to_bytes())
    }

    pub fn coin_serial_number(&self) -> &BigNum {
        &self.coin_serial_number
    }

    pub fn block_accumulator_hash(&self) -> Hash256 {
        self.block_accumulator_hash
    }

    pub fn ptx_hash(&self) -> Hash256 {
        self.ptx_hash
    }

    pub fn amount_commitment(&self) -> &BigNum {
        &self.amount_commitment
    }

    pub fn spend_type(&self) -> SpendType {
        self.spend_type
    }

    pub fn version(&self) -> u8 {
        self.version
    }
}

#[allow(clippy::too_many_arguments)]
fn signature_hash(
    serial_commitment: &BigNum,
    acc_commitment: &BigNum,
    commitment_pok: &CommitmentProofOfKnowledge,
    accumulator_pok: &AccumulatorProofOfKnowledge,
    ptx_hash: &Hash256,
    coin_serial_number: &BigNum,
    block_accumulator_hash: &Hash256,
    spend_type: SpendType,
    amount_commitment: &BigNum,
) -> Hash256 {
    let mut data = Vec::new();
    serial_commitment.encode(&mut data);
    acc_commitment.encode(&mut data);
    commitment_pok.encode(&mut data);
    accumulator_pok.encode(&mut data);
    ptx_hash.encode(&mut data);
    coin_serial_number.encode(&mut data);
    block_accumulator_hash.encode(&mut data);
    spend_type.encode(&mut data);
    amount_commitment.encode(&mut data);
    Hash256::hash(&data)
}

impl Encodable for CoinSpend {
    fn encode(&self, out: &mut Vec<u8>) {
        self.ptx_hash.encode(out);
        self.block_accumulator_hash.encode(out);
        self.acc_commitment_to_coin_value.encode(out);
        self.serial_commitment_to_coin_value.encode(out);
        self.coin_serial_number.encode(out);
        self.accumulator_pok.encode(out);
        self.serial_number_sok.encode(out);
        self.commitment_pok.encode(out);
        self.serial_number_pok.encode(out);
        self.version.encode(out);
        self.spend_type.encode(out);
        self.amount_commitment.encode(out);
    }
}

impl Decodable for CoinSpend {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(CoinSpend {
            ptx_hash: Hash256::decode(r)?,
            block_accumulator_hash: Hash256::decode(r)?,
            acc_commitment_to_coin_value: BigNum::decode(r)?,
            serial_commitment_to_coin_value: BigNum::decode(r)?,
            coin_serial_number: BigNum::decode(r)?,
            accumulator_pok: AccumulatorProofOfKnowledge::decode(r)?,
            serial_number_sok: SerialNumberSignatureOfKnowledge::decode(r)?,
            commitment_pok: CommitmentProofOfKnowledge::decode(r)?,
            serial_number_pok: SerialNumberProofOfKnowledge::decode(r)?,
            version: u8::decode(r)?,
            spend_type: SpendType::decode(r)?,
            amount_commitment: BigNum::decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::coin::PublicCoin;
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
    fn spend_roundtrip_and_bit_flip() {
        let spend_key = generate_spend_key(&PARAMS);
        let address = spend_key.address(&PARAMS);
        let acc_params = &PARAMS.accumulator_params;

        let mut accumulator = Accumulator::new(acc_params);
        let mut owned = None;
        for i in 0..4 {
            let (coin, _) = PublicCoin::mint(
                &PARAMS,
                &address.zero_pub_key,
                &address.blinding_commitment,
                "",
                10 + i,
                1 << 20,
            )
            .unwrap();
            if owned.is_none() {
                owned = Some((
                    PrivateCoin::recover(&PARAMS, &spend_key, &coin)
                        .unwrap()
                        .expect("own coin"),
                    AccumulatorWitness::new(accumulator.clone(), coin.clone()),
                ));
            }
            accumulator.accumulate(&PARAMS, &coin).unwrap();
            if let Some((_, witness)) = owned.as_mut() {
                witness.add_element(acc_params, &coin);
            }
        }
        let (private_coin, witness) = owned.unwrap();

        let ptx_hash = Hash256::hash(b"deadbeef");
        let spend = CoinSpend::new(
            &PARAMS,
            &private_coin,
            &accumulator,
            Hash256::hash(b"some block"),
            &witness,
            ptx_hash,
            SpendType::Spend,
            &spend_key.obfuscation_j,
        )
        .unwrap();
        spend.verify(&PARAMS, &accumulator).unwrap();

        // Serialize, deserialize, re-verify.
        let bytes = spend.to_bytes();
        let restored = CoinSpend::from_bytes(&bytes).unwrap();
        restored.verify(&PARAMS, &accumulator).unwrap();
        assert_eq!(restored, spend);

        // One flipped bit anywhere must kill the proof.
        let mut corrupted = bytes;
        let index = corrupted.len() / 2;
        corrupted[index] ^= 0x01;
        match CoinSpend::from_bytes(&corrupted) {
            Ok(bad) => assert!(bad.verify(&PARAMS, &accumulator).is_err()),
            Err(_) => {}
        }
    }

    #[test]
    fn spend_does_not_verify_for_different_tx_hash() {
        let spend_key = generate_spend_key(&PARAMS);
        let address = spend_key.address(&PARAMS);
        let acc_params = &PARAMS.accumulator_params;

        let (coin, _) = PublicCoin::mint(
            &PARAMS,
            &address.zero_pub_key,
            &address.blinding_commitment,
            "",
            5,
            1 << 20,
        )
        .unwrap();
        let private_coin = PrivateCoin::recover(&PARAMS, &spend_key, &coin)
            .unwrap()
            .expect("own coin");

        let mut accumulator = Accumulator::new(acc_params);
        let mut witness = AccumulatorWitness::new(accumulator.clone(), coin.clone());
        accumulator.accumulate(&PARAMS, &coin).unwrap();
        witness.add_element(acc_params, &coin);

        let spend = CoinSpend::new(
            &PARAMS,
            &private_coin,
            &accumulator,
            Hash256::zero(),
            &witness,
            Hash256::hash(b"tx one"),
            SpendType::Spend,
            &spend_key.obfuscation_j,
        )
        .unwrap();

        // Re-binding the proof to a different transaction hash must fail:
        // the signature hash covers ptx_hash.
        let mut bytes = spend.to_bytes();
        let forged_ptx = Hash256::hash(b"tx two");
        bytes[..32].copy_from_slice(forged_ptx.as_bytes());
        let forged = CoinSpend::from_bytes(&bytes).unwrap();
        assert!(forged.verify(&PARAMS, &accumulator).is_err());
    }
}

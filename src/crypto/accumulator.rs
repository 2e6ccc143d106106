//! The RSA accumulator and per-coin membership witnesses.
//!
//! The accumulator is the single value `A = A0^{∏ v_i} mod N` over the
//! multiset of accepted coin values. Insertion order does not matter;
//! block-level determinism comes from the chain engine inserting in
//! transaction and output order.

use crate::crypto::bignum::BigNum;
use crate::crypto::coin::PublicCoin;
use crate::crypto::params::{AccumulatorParams, ZeroCtParams};
use crate::error::{Error, Result};
use crate::ser::{Decodable, Encodable, Reader};

/// An RSA accumulator value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulator {
    value: BigNum,
}

impl Accumulator {
    /// A fresh accumulator at the base value `A0`.
    pub fn new(params: &AccumulatorParams) -> Self {
        Accumulator {
            value: params.accumulator_base.clone(),
        }
    }

    /// Restores an accumulator from a stored value; a zero value falls back
    /// to the base, mirroring the "unset snapshot" convention of the block
    /// index.
    pub fn from_value(params: &AccumulatorParams, value: BigNum) -> Self {
        if value.is_zero() {
            Accumulator::new(params)
        } else {
            Accumulator { value }
        }
    }

    /// Raw insertion: `A ← A^v mod N`. The caller vouches for `v`.
    pub fn increment(&mut self, params: &AccumulatorParams, value: &BigNum) {
        self.value = self.value.pow_mod(value, &params.accumulator_modulus);
    }

    /// Validated insertion of a public coin.
    pub fn accumulate(&mut self, params: &ZeroCtParams, coin: &PublicCoin) -> Result<()> {
        coin.validate(params)?;
        self.increment(&params.accumulator_params, coin.value());
        Ok(())
    }

    pub fn value(&self) -> &BigNum {
        &self.value
    }

    /// Bulk-set from a snapshot.
    pub fn set_value(&mut self, value: BigNum) {
        self.value = value;
    }
}

impl Encodable for Accumulator {
    fn encode(&self, out: &mut Vec<u8>) {
        self.value.encode(out);
    }
}

impl Decodable for Accumulator {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Accumulator {
            value: BigNum::decode(r)?,
        })
    }
}

/// A witness that one specific coin is contained in an accumulator.
///
/// The witness is the accumulator value taken *before* the coin was
/// inserted and advanced by every other accumulated coin, so that
/// `W^v ≡ A (mod N)` holds at the tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatorWitness {
    witness: Accumulator,
    element: PublicCoin,
}

impl AccumulatorWitness {
    /// Starts a witness for `coin` from the checkpoint accumulator that
    /// does not yet contain it.
    pub fn new(checkpoint: Accumulator, coin: PublicCoin) -> Self {
        AccumulatorWitness {
            witness: checkpoint,
            element: coin,
        }
    }

    /// Rebases the witness onto a new checkpoint.
    pub fn reset(&mut self, checkpoint: &Accumulator, coin: PublicCoin) {
        self.witness.set_value(checkpoint.value().clone());
        self.element = coin;
    }

    /// Folds another accumulated coin into the witness; the witnessed coin
    /// itself is skipped.
    pub fn add_element(&mut self, params: &AccumulatorParams, coin: &PublicCoin) {
        if self.element.value() != coin.value() {
            self.witness.increment(params, coin.value());
        }
    }

    /// Folds a raw coin value; the caller checks validity and identity.
    pub fn add_raw_value(&mut self, params: &AccumulatorParams, value: &BigNum) {
        if self.element.value() != value {
            self.witness.increment(params, value);
        }
    }

    pub fn value(&self) -> &BigNum {
        self.witness.value()
    }

    pub fn element(&self) -> &PublicCoin {
        &self.element
    }

    /// Checks `W^v ≡ A (mod N)` for the given tip accumulator, and that the
    /// witnessed coin is the expected one.
    pub fn verify(
        &self,
        params: &AccumulatorParams,
        accumulator: &Accumulator,
        coin: &PublicCoin,
    ) -> Result<()> {
        if self.element != *coin {
            return Err(Error::Param("witness is for a different coin".into()));
        }
        let mut advanced = self.witness.clone();
        advanced.increment(params, self.element.value());
        if advanced != *accumulator {
            return Err(Error::WrongAccumulatorState);
        }
        Ok(())
    }
}

impl Encodable for AccumulatorWitness {
    fn encode(&self, out: &mut Vec<u8>) {
        self.witness.encode(out);
        self.element.encode(out);
    }
}

impl Decodable for AccumulatorWitness {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(AccumulatorWitness {
            witness: Accumulator::decode(r)?,
            element: PublicCoin::decode(r)?,
        })
    }
}

//! Script markers embedding coin data in transaction outputs and inputs.
//!
//! A mint output's script starts with [`OP_ZEROCOINMINT`]; a spend input's
//! script starts with [`OP_ZEROCOINSPEND`]. In both cases the next
//! [`BIGNUM_SIZE`] bytes carry the little-endian length of the serialized
//! payload that follows.

use byteorder::{ByteOrder, LittleEndian};

use crate::crypto::bulletproofs::BulletproofRangeproof;
use crate::crypto::coin::PublicCoin;
use crate::crypto::params::ZeroCtParams;
use crate::error::{Error, Result};
use crate::ser::{Decodable, Encodable, Reader};
use crate::spend::CoinSpend;

/// Marker opcode of a mint output.
pub const OP_ZEROCOINMINT: u8 = 0xc1;

/// Marker opcode of a spend input.
pub const OP_ZEROCOINSPEND: u8 = 0xc2;

/// Bytes of the length prefix following the marker opcode.
pub const BIGNUM_SIZE: usize = 4;

/// A raw script.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script(pub Vec<u8>);

impl Script {
    /// An opaque, non-zerocoin script (plaintext outputs and inputs).
    pub fn plain(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }

    pub fn is_zerocoin_mint(&self) -> bool {
        self.0.first() == Some(&OP_ZEROCOINMINT) && self.0.len() > 1 + BIGNUM_SIZE
    }

    pub fn is_zerocoin_spend(&self) -> bool {
        self.0.first() == Some(&OP_ZEROCOINSPEND) && self.0.len() > 1 + BIGNUM_SIZE
    }

    fn tagged(opcode: u8, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(1 + BIGNUM_SIZE + payload.len());
        bytes.push(opcode);
        let mut len = [0u8; BIGNUM_SIZE];
        LittleEndian::write_u32(&mut len, payload.len() as u32);
        bytes.extend_from_slice(&len);
        bytes.extend_from_slice(payload);
        Script(bytes)
    }

    fn payload(&self, opcode: u8) -> Result<&[u8]> {
        if self.0.first() != Some(&opcode) || self.0.len() < 1 + BIGNUM_SIZE {
            return Err(Error::Encoding("script carries no such marker".into()));
        }
        let len = LittleEndian::read_u32(&self.0[1..1 + BIGNUM_SIZE]) as usize;
        let payload = &self.0[1 + BIGNUM_SIZE..];
        if payload.len() != len {
            return Err(Error::Encoding("script length prefix mismatch".into()));
        }
        Ok(payload)
    }

    /// Builds a mint output script from a coin and its range proof.
    pub fn zerocoin_mint(coin: &PublicCoin, range_proof: &BulletproofRangeproof) -> Self {
        let mut payload = Vec::new();
        coin.encode(&mut payload);
        range_proof.encode(&mut payload);
        Self::tagged(OP_ZEROCOINMINT, &payload)
    }

    /// Parses the mint data back out of the script.
    ///
    /// With `check` set, the coin undergoes full validation (range and
    /// primality); parsing alone never does.
    pub fn extract_mint_data(
        &self,
        params: &ZeroCtParams,
        check: bool,
    ) -> Result<(PublicCoin, BulletproofRangeproof)> {
        let payload = self.payload(OP_ZEROCOINMINT)?;
        let mut reader = Reader::new(payload);
        let coin = PublicCoin::decode(&mut reader)?;
        let range_proof = BulletproofRangeproof::decode(&mut reader)?;
        if !reader.is_empty() {
            return Err(Error::Encoding("trailing bytes in mint script".into()));
        }
        if check {
            coin.validate(params)?;
        }
        Ok((coin, range_proof))
    }

    /// Builds a spend input script.
    pub fn zerocoin_spend(spend: &CoinSpend) -> Self {
        Self::tagged(OP_ZEROCOINSPEND, &spend.to_bytes())
    }

    /// Parses the serialized [`CoinSpend`] out of the script.
    pub fn extract_coin_spend(&self) -> Result<CoinSpend> {
        let payload = self.payload(OP_ZEROCOINSPEND)?;
        CoinSpend::from_bytes(payload)
    }
}

impl Encodable for Script {
    fn encode(&self, out: &mut Vec<u8>) {
        self.0.encode(out);
    }
}

impl Decodable for Script {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Script(Vec::<u8>::decode(r)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_script_is_neither_marker() {
        let script = Script::plain(vec![0x76, 0xa9, 0x14]);
        assert!(!script.is_zerocoin_mint());
        assert!(!script.is_zerocoin_spend());
        assert!(script.extract_coin_spend().is_err());
    }

    #[test]
    fn length_prefix_is_validated() {
        let mut bytes = vec![OP_ZEROCOINSPEND, 0xff, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[1, 2, 3]);
        let script = Script(bytes);
        assert!(script.extract_coin_spend().is_err());
    }
}

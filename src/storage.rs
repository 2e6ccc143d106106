//! Storage logic: the key-value persistence contract between the chain
//! engine and the node's database layer.
//!
//! The engine only ever needs four index families: commitment value → mint
//! chain data, serial number → spending transaction, block hash → block,
//! and nothing else. [`MemoryStore`] is the reference in-memory
//! implementation; a node backs the same trait with its database.

use std::collections::HashMap;

use crate::block::{Block, OutPoint};
use crate::crypto::bignum::BigNum;
use crate::error::Result;
use crate::hash::Hash256;
use crate::ser::{Decodable, Encodable, Reader};

/// Chain location of an accepted mint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublicMintChainData {
    out_point: OutPoint,
    block_hash: Hash256,
}

impl PublicMintChainData {
    pub fn new(out_point: OutPoint, block_hash: Hash256) -> Self {
        PublicMintChainData {
            out_point,
            block_hash,
        }
    }

    pub fn block_hash(&self) -> Hash256 {
        self.block_hash
    }

    pub fn tx_hash(&self) -> Hash256 {
        self.out_point.txid
    }

    pub fn output(&self) -> u32 {
        self.out_point.vout
    }

    pub fn out_point(&self) -> OutPoint {
        self.out_point
    }

    pub fn is_null(&self) -> bool {
        self.out_point.is_null() && self.block_hash.is_zero()
    }
}

impl Encodable for PublicMintChainData {
    fn encode(&self, out: &mut Vec<u8>) {
        self.out_point.encode(out);
        self.block_hash.encode(out);
    }
}

impl Decodable for PublicMintChainData {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(PublicMintChainData {
            out_point: OutPoint::decode(r)?,
            block_hash: Hash256::decode(r)?,
        })
    }
}

/// The persistence interface the chain engine drives.
///
/// Implementations map to whatever database the node uses; failures
/// surface as [`crate::error::Error::Storage`] and halt block acceptance.
pub trait ZeroStore: Send {
    fn read_coin_mint(&self, value: &BigNum) -> Result<Option<PublicMintChainData>>;
    fn write_coin_mint(&mut self, value: &BigNum, data: PublicMintChainData) -> Result<()>;
    fn erase_coin_mint(&mut self, value: &BigNum) -> Result<()>;

    fn read_coin_spend(&self, serial: &BigNum) -> Result<Option<Hash256>>;
    fn write_coin_spend(&mut self, serial: &BigNum, tx_hash: Hash256) -> Result<()>;
    fn erase_coin_spend(&mut self, serial: &BigNum) -> Result<()>;

    fn read_block(&self, hash: &Hash256) -> Result<Option<Block>>;
    fn write_block(&mut self, block: &Block) -> Result<()>;
}

/// In-memory store used by tests and light embedders.
#[derive(Debug, Default)]
pub struct MemoryStore {
    mints: HashMap<BigNum, PublicMintChainData>,
    spends: HashMap<BigNum, Hash256>,
    blocks: HashMap<Hash256, Block>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl ZeroStore for MemoryStore {
    fn read_coin_mint(&self, value: &BigNum) -> Result<Option<PublicMintChainData>> {
        Ok(self.mints.get(value).cloned())
    }

    fn write_coin_mint(&mut self, value: &BigNum, data: PublicMintChainData) -> Result<()> {
        self.mints.insert(value.clone(), data);
        Ok(())
    }

    fn erase_coin_mint(&mut self, value: &BigNum) -> Result<()> {
        self.mints.remove(value);
        Ok(())
    }

    fn read_coin_spend(&self, serial: &BigNum) -> Result<Option<Hash256>> {
        Ok(self.spends.get(serial).copied())
    }

    fn write_coin_spend(&mut self, serial: &BigNum, tx_hash: Hash256) -> Result<()> {
        self.spends.insert(serial.clone(), tx_hash);
        Ok(())
    }

    fn erase_coin_spend(&mut self, serial: &BigNum) -> Result<()> {
        self.spends.remove(serial);
        Ok(())
    }

    fn read_block(&self, hash: &Hash256) -> Result<Option<Block>> {
        Ok(self.blocks.get(hash).cloned())
    }

    fn write_block(&mut self, block: &Block) -> Result<()> {
        self.blocks.insert(block.hash(), block.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrips() {
        let mut store = MemoryStore::new();
        let value = BigNum::from_u64(12_345);
        let data = PublicMintChainData::new(
            OutPoint::new(Hash256::hash(b"tx"), 1),
            Hash256::hash(b"block"),
        );

        assert!(store.read_coin_mint(&value).unwrap().is_none());
        store.write_coin_mint(&value, data.clone()).unwrap();
        assert_eq!(store.read_coin_mint(&value).unwrap(), Some(data));
        store.erase_coin_mint(&value).unwrap();
        assert!(store.read_coin_mint(&value).unwrap().is_none());

        let serial = BigNum::from_u64(777);
        store.write_coin_spend(&serial, Hash256::hash(b"spender")).unwrap();
        assert!(store.read_coin_spend(&serial).unwrap().is_some());
        store.erase_coin_spend(&serial).unwrap();
        assert!(store.read_coin_spend(&serial).unwrap().is_none());
    }
}

//! Types of the block feed contract.
//!
//! The surrounding node hands the chain engine a monotonically ordered
//! stream of blocks; on reorganizations it delivers a disconnect sequence
//! down to the fork point followed by the new branch. These types carry
//! only what the engine needs: scripts, plaintext values, and the optional
//! balance proof for transactions that mix plaintext and committed
//! amounts.

use crate::crypto::serial::SerialNumberProofOfKnowledge;
use crate::error::{Error, Result};
use crate::hash::Hash256;
use crate::script::Script;
use crate::ser::{Decodable, Encodable, Reader};

/// Reference to a transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        OutPoint { txid, vout }
    }

    pub fn is_null(&self) -> bool {
        self.txid.is_zero() && self.vout == 0
    }
}

impl Encodable for OutPoint {
    fn encode(&self, out: &mut Vec<u8>) {
        self.txid.encode(out);
        self.vout.encode(out);
    }
}

impl Decodable for OutPoint {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(OutPoint {
            txid: Hash256::decode(r)?,
            vout: u32::decode(r)?,
        })
    }
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Script,
}

impl Encodable for TxIn {
    fn encode(&self, out: &mut Vec<u8>) {
        self.prevout.encode(out);
        self.script_sig.encode(out);
    }
}

impl Decodable for TxIn {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(TxIn {
            prevout: OutPoint::decode(r)?,
            script_sig: Script::decode(r)?,
        })
    }
}

/// A transaction output. Mint outputs carry a zero `value`; their amount
/// hides inside the script's commitment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxOut {
    pub value: u64,
    pub script_pub_key: Script,
}

impl Encodable for TxOut {
    fn encode(&self, out: &mut Vec<u8>) {
        self.value.encode(out);
        self.script_pub_key.encode(out);
    }
}

impl Decodable for TxOut {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(TxOut {
            value: u64::decode(r)?,
            script_pub_key: Script::decode(r)?,
        })
    }
}

/// A transaction as delivered by the block feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    /// Sum of the plaintext inputs, as validated by the UTXO layer, which
    /// is outside this crate.
    pub plain_input_value: u64,
    /// Balance proof for transactions touching committed amounts.
    pub balance_proof: Option<SerialNumberProofOfKnowledge>,
}

impl Transaction {
    pub fn hash(&self) -> Hash256 {
        Hash256::hash(&self.to_bytes())
    }

    /// Whether any input or output uses the coin protocol.
    pub fn has_zerocoin_component(&self) -> bool {
        self.inputs.iter().any(|i| i.script_sig.is_zerocoin_spend())
            || self
                .outputs
                .iter()
                .any(|o| o.script_pub_key.is_zerocoin_mint())
    }
}

impl Encodable for Transaction {
    fn encode(&self, out: &mut Vec<u8>) {
        self.version.encode(out);
        self.inputs.encode(out);
        self.outputs.encode(out);
        self.plain_input_value.encode(out);
        match &self.balance_proof {
            Some(proof) => {
                1u8.encode(out);
                proof.encode(out);
            }
            None => 0u8.encode(out),
        }
    }
}

impl Decodable for Transaction {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let version = u32::decode(r)?;
        let inputs = Vec::decode(r)?;
        let outputs = Vec::decode(r)?;
        let plain_input_value = u64::decode(r)?;
        let balance_proof = match u8::decode(r)? {
            0 => None,
            1 => Some(SerialNumberProofOfKnowledge::decode(r)?),
            other => {
                return Err(Error::Encoding(format!(
                    "invalid balance proof tag {}",
                    other
                )))
            }
        };
        Ok(Transaction {
            version,
            inputs,
            outputs,
            plain_input_value,
            balance_proof,
        })
    }
}

/// A block as delivered by the block feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub version: u32,
    pub prev_block_hash: Hash256,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Block identifier: hash over the header fields and the transaction
    /// hashes.
    pub fn hash(&self) -> Hash256 {
        let mut data = Vec::new();
        self.version.encode(&mut data);
        self.prev_block_hash.encode(&mut data);
        for tx in &self.transactions {
            tx.hash().encode(&mut data);
        }
        Hash256::hash(&data)
    }
}

impl Encodable for Block {
    fn encode(&self, out: &mut Vec<u8>) {
        self.version.encode(out);
        self.prev_block_hash.encode(out);
        self.transactions.encode(out);
    }
}

impl Decodable for Block {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Block {
            version: u32::decode(r)?,
            prev_block_hash: Hash256::decode(r)?,
            transactions: Vec::decode(r)?,
        })
    }
}

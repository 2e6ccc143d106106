//! The chain-state engine.
//!
//! Drives the global accumulator forward block by block, validates mints
//! and spends against chain state, stamps every block index entry with the
//! post-block accumulator value, and replays from the fork point on
//! reorganizations (the accumulator is never decremented in place).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::block::{Block, OutPoint, Transaction, TxIn, TxOut};
use crate::crypto::accumulator::{Accumulator, AccumulatorWitness};
use crate::crypto::bignum::BigNum;
use crate::crypto::bulletproofs::{verify_bulletproofs, BulletproofRangeproof};
use crate::crypto::coin::{is_valid_public_serial, PublicCoin};
use crate::crypto::params::ZeroCtParams;
use crate::crypto::serial::{plain_amount_commitment, verify_balance};
use crate::error::{Error, ProofKind, Result};
use crate::hash::Hash256;
use crate::spend::CoinSpend;
use crate::storage::{PublicMintChainData, ZeroStore};
use crate::Config;

/// Per-block entry of the in-memory block index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIndexEntry {
    pub hash: Hash256,
    pub prev_hash: Hash256,
    pub height: u32,
    /// Accumulator value after connecting this block.
    pub accumulator_value: BigNum,
}

/// The chain state the engine and the witness updater share.
///
/// One instance models one chain; callers wanting concurrency wrap it in
/// `Arc<Mutex<..>>` (the `cs_main` of this crate).
pub struct ChainState<S: ZeroStore> {
    params: Arc<ZeroCtParams>,
    config: Config,
    store: S,
    block_index: HashMap<Hash256, BlockIndexEntry>,
    active_chain: Vec<Hash256>,
    accumulator: Accumulator,
    // Verified/failed status per spend hash; cleared wholesale when full.
    spend_cache: Mutex<HashMap<Hash256, Option<ProofKind>>>,
}

impl<S: ZeroStore> ChainState<S> {
    pub fn new(params: Arc<ZeroCtParams>, config: Config, store: S) -> Self {
        let accumulator = Accumulator::new(&params.accumulator_params);
        ChainState {
            params,
            config,
            store,
            block_index: HashMap::new(),
            active_chain: Vec::new(),
            accumulator,
            spend_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn params(&self) -> &Arc<ZeroCtParams> {
        &self.params
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Hash of the current tip; zero before the first block.
    pub fn tip_hash(&self) -> Hash256 {
        self.active_chain.last().copied().unwrap_or_else(Hash256::zero)
    }

    /// Number of connected blocks.
    pub fn block_count(&self) -> u32 {
        self.active_chain.len() as u32
    }

    pub fn block_index(&self, hash: &Hash256) -> Option<&BlockIndexEntry> {
        self.block_index.get(hash)
    }

    /// Whether `hash` lies on the active chain.
    pub fn contains(&self, hash: &Hash256) -> bool {
        self.block_index
            .get(hash)
            .map(|entry| self.active_chain.get(entry.height as usize) == Some(hash))
            .unwrap_or(false)
    }

    /// The active-chain successor of `hash`, if any.
    pub fn next_in_chain(&self, hash: &Hash256) -> Option<Hash256> {
        let entry = self.block_index.get(hash)?;
        if !self.contains(hash) {
            return None;
        }
        self.active_chain.get(entry.height as usize + 1).copied()
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// The accumulator value stamped on a main-chain block.
    pub fn accumulator_value_at(&self, hash: &Hash256) -> Option<BigNum> {
        if !self.contains(hash) {
            return None;
        }
        self.block_index
            .get(hash)
            .map(|entry| entry.accumulator_value.clone())
    }

    /// Validates and connects `block` on top of the current tip.
    ///
    /// Validation failures reject the whole block and leave the state
    /// untouched; storage failures halt acceptance.
    pub fn connect_block(&mut self, block: &Block) -> Result<()> {
        let block_hash = block.hash();
        if block.prev_block_hash != self.tip_hash() {
            return Err(Error::Param("block does not extend the current tip".into()));
        }

        // Validation pass: nothing is written until the whole block checks
        // out.
        let mut block_mints: Vec<(PublicCoin, OutPoint)> = Vec::new();
        let mut block_proofs: Vec<BulletproofRangeproof> = Vec::new();
        let mut block_serials: Vec<(BigNum, Hash256)> = Vec::new();

        for tx in &block.transactions {
            let tx_hash = tx.hash();
            for input in &tx.inputs {
                if !input.script_sig.is_zerocoin_spend() {
                    continue;
                }
                let spend = self.check_spend(input, &block_serials)?;
                block_serials.push((spend.coin_serial_number().clone(), tx_hash));
            }
            for (vout, output) in tx.outputs.iter().enumerate() {
                if !output.script_pub_key.is_zerocoin_mint() {
                    continue;
                }
                let (coin, proof) = self.check_mint(output, &block_mints)?;
                block_mints.push((coin, OutPoint::new(tx_hash, vout as u32)));
                block_proofs.push(proof);
            }
            self.check_transaction_balance(tx)?;
        }

        // All range proofs of the block verify as one batch.
        if !block_proofs.is_empty() {
            verify_bulletproofs(&self.params.coin_commitment_group, &block_proofs)?;
        }

        // Apply pass: accumulate mints in transaction and output order,
        // record spends, stamp the index entry.
        for (coin, out_point) in &block_mints {
            self.accumulator
                .increment(&self.params.accumulator_params, coin.value());
            self.store.write_coin_mint(
                coin.value(),
                PublicMintChainData::new(*out_point, block_hash),
            )?;
        }
        for (serial, tx_hash) in &block_serials {
            self.store.write_coin_spend(serial, *tx_hash)?;
        }
        self.store.write_block(block)?;

        let entry = BlockIndexEntry {
            hash: block_hash,
            prev_hash: block.prev_block_hash,
            height: self.active_chain.len() as u32,
            accumulator_value: self.accumulator.value().clone(),
        };
        self.block_index.insert(block_hash, entry);
        self.active_chain.push(block_hash);

        debug!(
            "connected block {} at height {}: {} mints, {} spends",
            block_hash,
            self.active_chain.len() - 1,
            block_mints.len(),
            block_serials.len(),
        );
        Ok(())
    }

    /// Disconnects the tip block, erasing its mint and spend records and
    /// restoring the accumulator from the previous stamp.
    pub fn disconnect_tip(&mut self) -> Result<Hash256> {
        let tip = self
            .active_chain
            .pop()
            .ok_or_else(|| Error::Param("no block to disconnect".into()))?;
        self.block_index.remove(&tip);

        let block = self
            .store
            .read_block(&tip)?
            .ok_or_else(|| Error::Storage(format!("missing block {}", tip)))?;
        for tx in block.transactions.iter().rev() {
            for output in &tx.outputs {
                if !output.script_pub_key.is_zerocoin_mint() {
                    continue;
                }
                let (coin, _) = output.script_pub_key.extract_mint_data(&self.params, false)?;
                self.store.erase_coin_mint(coin.value())?;
            }
            for input in &tx.inputs {
                if !input.script_sig.is_zerocoin_spend() {
                    continue;
                }
                let spend = input.script_sig.extract_coin_spend()?;
                self.store.erase_coin_spend(spend.coin_serial_number())?;
            }
        }

        self.accumulator = match self.active_chain.last() {
            Some(prev) => {
                let value = self
                    .block_index
                    .get(prev)
                    .map(|entry| entry.accumulator_value.clone())
                    .ok_or_else(|| Error::Storage("tip missing from block index".into()))?;
                Accumulator::from_value(&self.params.accumulator_params, value)
            }
            None => Accumulator::new(&self.params.accumulator_params),
        };

        debug!("disconnected block {}", tip);
        Ok(tip)
    }

    /// Validates one mint output: parse, structural coin validation,
    /// uniqueness against the index and within the block, and consistency
    /// between the coin's amount commitment and the attached range proof.
    fn check_mint(
        &self,
        output: &TxOut,
        seen: &[(PublicCoin, OutPoint)],
    ) -> Result<(PublicCoin, BulletproofRangeproof)> {
        let (coin, proof) = output.script_pub_key.extract_mint_data(&self.params, true)?;
        if self.store.read_coin_mint(coin.value())?.is_some() {
            return Err(Error::DuplicateMint);
        }
        if seen.iter().any(|(other, _)| other.value() == coin.value()) {
            return Err(Error::DuplicateMint);
        }
        if proof.value_commitments().first() != Some(coin.amount_commitment()) {
            return Err(Error::BadProof(ProofKind::RangeProof));
        }
        Ok((coin, proof))
    }

    /// Validates one spend input: parse, serial checks, accumulator state
    /// lookup, and the full proof (through the verification cache).
    fn check_spend(&self, input: &TxIn, seen: &[(BigNum, Hash256)]) -> Result<CoinSpend> {
        let spend = input.script_sig.extract_coin_spend()?;

        if !is_valid_public_serial(&self.params, spend.coin_serial_number()) {
            return Err(Error::InvalidCoin(crate::error::CoinError::BadSerial));
        }
        if self
            .store
            .read_coin_spend(spend.coin_serial_number())?
            .is_some()
        {
            return Err(Error::DoubleSpend);
        }
        if seen
            .iter()
            .any(|(serial, _)| serial == spend.coin_serial_number())
        {
            return Err(Error::DoubleSpend);
        }

        let accumulator_value = self
            .accumulator_value_at(&spend.block_accumulator_hash())
            .ok_or(Error::WrongAccumulatorState)?;
        let accumulator =
            Accumulator::from_value(&self.params.accumulator_params, accumulator_value);

        self.verify_spend_cached(&spend, &accumulator)?;
        Ok(spend)
    }

    /// Proof verification behind the bounded result cache.
    fn verify_spend_cached(&self, spend: &CoinSpend, accumulator: &Accumulator) -> Result<()> {
        let key = spend.spend_hash();
        {
            let cache = self.spend_cache.lock().expect("spend cache poisoned");
            if let Some(status) = cache.get(&key) {
                return match status {
                    None => Ok(()),
                    Some(kind) => Err(Error::BadProof(*kind)),
                };
            }
        }

        let outcome = spend.verify(&self.params, accumulator);
        let status = match &outcome {
            Ok(()) => None,
            Err(Error::BadProof(kind)) => Some(*kind),
            // Non-proof failures are not cached.
            Err(_) => return outcome,
        };

        let mut cache = self.spend_cache.lock().expect("spend cache poisoned");
        if cache.len() >= self.config.coinspend_cache_size {
            cache.clear();
        }
        cache.insert(key, status);
        outcome
    }

    /// Verifies value conservation for a transaction mixing plaintext and
    /// committed amounts (§ amount balance).
    pub fn check_transaction_balance(&self, tx: &Transaction) -> Result<()> {
        if !tx.has_zerocoin_component() {
            return Ok(());
        }
        let group = &self.params.coin_commitment_group;

        let mut inputs = Vec::new();
        if tx.plain_input_value > 0 {
            inputs.push(plain_amount_commitment(group, tx.plain_input_value));
        }
        for input in &tx.inputs {
            if input.script_sig.is_zerocoin_spend() {
                let spend = input.script_sig.extract_coin_spend()?;
                inputs.push(spend.amount_commitment().clone());
            }
        }

        let mut outputs = Vec::new();
        for output in &tx.outputs {
            if output.script_pub_key.is_zerocoin_mint() {
                let (coin, _) = output.script_pub_key.extract_mint_data(&self.params, false)?;
                outputs.push(coin.amount_commitment().clone());
            } else if output.value > 0 {
                outputs.push(plain_amount_commitment(group, output.value));
            }
        }

        let proof = tx.balance_proof.as_ref().ok_or(Error::Unbalanced)?;
        verify_balance(group, &inputs, &outputs, proof)
    }

    /// Rebuilds the initial witness triple for a mint that is already on
    /// the main chain: the accumulator stamped on its block, a witness
    /// covering every other mint of that block, and the block hash.
    pub fn calculate_witness_for_mint(
        &self,
        coin: &PublicCoin,
    ) -> Result<(Accumulator, AccumulatorWitness, Hash256)> {
        let data = self
            .store
            .read_coin_mint(coin.value())?
            .ok_or_else(|| Error::Storage("mint is not indexed".into()))?;
        let entry = self
            .block_index
            .get(&data.block_hash())
            .filter(|_| self.contains(&data.block_hash()))
            .ok_or(Error::WrongAccumulatorState)?;

        let checkpoint = if entry.height == 0 {
            Accumulator::new(&self.params.accumulator_params)
        } else {
            let prev = self
                .block_index
                .get(&entry.prev_hash)
                .ok_or(Error::WrongAccumulatorState)?;
            Accumulator::from_value(
                &self.params.accumulator_params,
                prev.accumulator_value.clone(),
            )
        };

        let block = self
            .store
            .read_block(&data.block_hash())?
            .ok_or_else(|| Error::Storage(format!("missing block {}", data.block_hash())))?;
        let mut witness = AccumulatorWitness::new(checkpoint, coin.clone());
        for other in block_zerocoin_mints(&self.params, &block)? {
            witness.add_raw_value(&self.params.accumulator_params, other.value());
        }

        let accumulator = Accumulator::from_value(
            &self.params.accumulator_params,
            entry.accumulator_value.clone(),
        );
        witness.verify(&self.params.accumulator_params, &accumulator, coin)?;
        Ok((accumulator, witness, data.block_hash()))
    }
}

/// All mint coins of a block, in transaction and output order, parsed
/// without re-running validation.
pub fn block_zerocoin_mints(params: &ZeroCtParams, block: &Block) -> Result<Vec<PublicCoin>> {
    let mut coins = Vec::new();
    for tx in &block.transactions {
        for output in &tx.outputs {
            if output.script_pub_key.is_zerocoin_mint() {
                let (coin, _) = output.script_pub_key.extract_mint_data(params, false)?;
                coins.push(coin);
            }
        }
    }
    Ok(coins)
}

//! Wallet-side state: key custody, coin recognition, per-mint witness
//! bookkeeping, and the recipient planner that breaks a send amount into
//! mintable chunks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

use crate::block::TxOut;
use crate::chain::ChainState;
use crate::crypto::accumulator::{Accumulator, AccumulatorWitness};
use crate::crypto::bignum::BigNum;
use crate::crypto::bulletproofs::BulletproofRangeproof;
use crate::crypto::coin::{PrivateCoin, PublicCoin};
use crate::crypto::keys::{generate_spend_key, PrivateAddress, PrivateSpendKey, PrivateViewKey};
use crate::crypto::params::ZeroCtParams;
use crate::error::{Error, Result};
use crate::hash::Hash256;
use crate::script::Script;
use crate::spend::{CoinSpend, SpendType};
use crate::storage::{PublicMintChainData, ZeroStore};
use crate::{Config, COIN};

/// Denominations the planner splits amounts into, in coin units,
/// descending.
const DENOMINATIONS: &[u64] = &[5000, 1000, 500, 100, 50, 10, 5, 1];

/// One planned mint output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub amount: u64,
    pub payment_id: String,
}

/// Splits `total` into denomination-sized mint recipients, shuffled so the
/// output order leaks nothing about the split.
///
/// # Return value
///
/// The recipients and the sub-denomination remainder, which the caller
/// sends as plaintext change.
pub fn plan_recipients(total: u64, payment_id: &str) -> (Vec<Recipient>, u64) {
    let mut recipients = Vec::new();
    let mut remaining = total;
    for denomination in DENOMINATIONS {
        let chunk = denomination * COIN;
        while remaining >= chunk {
            recipients.push(Recipient {
                amount: chunk,
                payment_id: payment_id.to_owned(),
            });
            remaining -= chunk;
        }
    }
    recipients.shuffle(&mut thread_rng());
    (recipients, remaining)
}

/// Mints a coin for `address` and wraps it into a mint output with its
/// range proof.
///
/// # Return value
///
/// The output, the minted coin, and the amount-commitment randomness the
/// caller folds into the transaction's balance proof.
pub fn build_mint_output(
    params: &ZeroCtParams,
    address: &PrivateAddress,
    amount: u64,
    payment_id: &str,
    max_attempts: u32,
) -> Result<(TxOut, PublicCoin, BigNum)> {
    let (coin, gamma) = PublicCoin::mint(
        params,
        &address.zero_pub_key,
        &address.blinding_commitment,
        payment_id,
        amount,
        max_attempts,
    )?;
    let proof = BulletproofRangeproof::prove(
        &params.coin_commitment_group,
        &[BigNum::from_u64(amount)],
        &[gamma.clone()],
    )?;
    let output = TxOut {
        value: 0,
        script_pub_key: Script::zerocoin_mint(&coin, &proof),
    };
    Ok((output, coin, gamma))
}

/// One rollback-capable witness snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessState {
    accumulator: Accumulator,
    witness: AccumulatorWitness,
    block_accumulator_hash: Hash256,
    count: u32,
}

impl WitnessState {
    fn new(
        accumulator: Accumulator,
        witness: AccumulatorWitness,
        block_accumulator_hash: Hash256,
    ) -> Self {
        WitnessState {
            accumulator,
            witness,
            block_accumulator_hash,
            count: 0,
        }
    }

    /// Folds a foreign mint into both sides of the witness relation.
    fn accumulate(&mut self, params: &ZeroCtParams, value: &BigNum) {
        self.accumulator
            .increment(&params.accumulator_params, value);
        self.witness
            .add_raw_value(&params.accumulator_params, value);
    }

    /// Marks one block as fully folded in.
    fn advance(&mut self, block_hash: Hash256) {
        self.block_accumulator_hash = block_hash;
        self.count += 1;
    }

    fn verify(&self, params: &ZeroCtParams) -> bool {
        self.witness
            .verify(
                &params.accumulator_params,
                &self.accumulator,
                self.witness.element(),
            )
            .is_ok()
    }
}

/// Witness data for one of the wallet's mints.
///
/// Keeps three states: `current` advances with the chain, `prev` is a
/// periodic snapshot bounding recovery depth, and `initial` allows a full
/// restart after deep reorganizations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicMintWitnessData {
    pub_coin: PublicCoin,
    chain_data: PublicMintChainData,
    current: WitnessState,
    prev: WitnessState,
    initial: WitnessState,
}

impl PublicMintWitnessData {
    pub fn new(
        pub_coin: PublicCoin,
        chain_data: PublicMintChainData,
        accumulator: Accumulator,
        witness: AccumulatorWitness,
        block_accumulator_hash: Hash256,
    ) -> Self {
        let state = WitnessState::new(accumulator, witness, block_accumulator_hash);
        PublicMintWitnessData {
            pub_coin,
            chain_data,
            current: state.clone(),
            prev: state.clone(),
            initial: state,
        }
    }

    pub fn accumulate(&mut self, params: &ZeroCtParams, value: &BigNum) {
        self.current.accumulate(params, value);
    }

    pub fn advance(&mut self, block_hash: Hash256) {
        self.current.advance(block_hash);
    }

    /// Copies `current` into `prev`, bounding how far recovery rolls back.
    pub fn backup(&mut self) {
        self.prev = self.current.clone();
    }

    /// Restores `current` from the previous snapshot.
    pub fn recover(&mut self) {
        self.current = self.prev.clone();
    }

    /// Restarts from the state recorded when the mint was first seen.
    pub fn reset(&mut self) {
        self.current = self.initial.clone();
        self.prev = self.initial.clone();
    }

    pub fn verify(&self, params: &ZeroCtParams) -> bool {
        self.current.verify(params)
    }

    pub fn block_accumulator_hash(&self) -> Hash256 {
        self.current.block_accumulator_hash
    }

    pub fn prev_block_accumulator_hash(&self) -> Hash256 {
        self.prev.block_accumulator_hash
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.current.accumulator
    }

    pub fn witness(&self) -> &AccumulatorWitness {
        &self.current.witness
    }

    pub fn public_coin(&self) -> &PublicCoin {
        &self.pub_coin
    }

    pub fn chain_data(&self) -> &PublicMintChainData {
        &self.chain_data
    }

    /// Blocks folded in since the mint's own block.
    pub fn count(&self) -> u32 {
        self.current.count
    }
}

/// The secret state of one wallet.
///
/// The wallet can recognize and recover incoming coins, tracks a witness
/// per owned mint (advanced by the background updater), and signs spends.
pub struct Wallet {
    params: Arc<ZeroCtParams>,
    config: Config,
    spend_key: PrivateSpendKey,
    witness_map: HashMap<BigNum, PublicMintWitnessData>,
    spent: HashSet<BigNum>,
}

impl Wallet {
    /// Creates a wallet with freshly generated keys.
    pub fn new(params: Arc<ZeroCtParams>, config: Config) -> Self {
        let spend_key = generate_spend_key(&params);
        Wallet {
            params,
            config,
            spend_key,
            witness_map: HashMap::new(),
            spent: HashSet::new(),
        }
    }

    pub fn address(&self) -> PrivateAddress {
        self.spend_key.address(&self.params)
    }

    pub fn view_key(&self) -> PrivateViewKey {
        self.spend_key.view_key(&self.params)
    }

    pub fn spend_key(&self) -> &PrivateSpendKey {
        &self.spend_key
    }

    /// Attempts to recover `coin` as one of ours.
    pub fn recover_coin(&self, coin: &PublicCoin) -> Result<Option<PrivateCoin>> {
        PrivateCoin::recover(&self.params, &self.spend_key, coin)
    }

    /// Mints a coin to this wallet's own address and wraps it into a mint
    /// output, honoring the configured attempt cap.
    pub fn create_mint_output(
        &self,
        amount: u64,
        payment_id: &str,
    ) -> Result<(TxOut, PublicCoin, BigNum)> {
        build_mint_output(
            &self.params,
            &self.address(),
            amount,
            payment_id,
            self.config.max_coinmint_attempts,
        )
    }

    /// Registers an owned mint that the chain has accepted, bootstrapping
    /// its witness from the chain state.
    pub fn add_mint<S: ZeroStore>(
        &mut self,
        chain: &ChainState<S>,
        coin: &PublicCoin,
    ) -> Result<()> {
        let (accumulator, witness, block_hash) = chain.calculate_witness_for_mint(coin)?;
        let chain_data = chain
            .store()
            .read_coin_mint(coin.value())?
            .ok_or_else(|| Error::Storage("mint is not indexed".into()))?;
        let data = PublicMintWitnessData::new(
            coin.clone(),
            chain_data,
            accumulator,
            witness,
            block_hash,
        );
        self.witness_map.insert(coin.value().clone(), data);
        Ok(())
    }

    pub fn witness(&self, value: &BigNum) -> Option<&PublicMintWitnessData> {
        self.witness_map.get(value)
    }

    /// Snapshot of the witness map for a lock-free updater round.
    pub fn witness_snapshot(&self) -> Vec<(BigNum, PublicMintWitnessData)> {
        self.witness_map
            .iter()
            .map(|(value, data)| (value.clone(), data.clone()))
            .collect()
    }

    /// Writes an updated witness back.
    pub fn write_witness(&mut self, value: &BigNum, data: PublicMintWitnessData) {
        self.witness_map.insert(value.clone(), data);
    }

    pub fn mark_spent(&mut self, value: &BigNum) {
        self.spent.insert(value.clone());
    }

    pub fn is_spent(&self, value: &BigNum) -> bool {
        self.spent.contains(value)
    }

    /// Signs a spend of the mint with commitment `value`, bound to
    /// `ptx_hash`, using the current witness.
    ///
    /// Refuses with [`Error::InsufficientMintSecurity`] when the witness
    /// has not yet covered enough later blocks; the randomized slack keeps
    /// the anonymity-set floor unpredictable.
    pub fn prepare_spend(
        &self,
        value: &BigNum,
        ptx_hash: Hash256,
        spend_type: SpendType,
    ) -> Result<CoinSpend> {
        let data = self
            .witness_map
            .get(value)
            .ok_or_else(|| Error::Param("no witness for this mint".into()))?;

        let jitter: u32 = thread_rng().gen_range(0..crate::MINT_SECURITY_ENTROPY);
        if data.count() < self.config.min_mint_security + jitter {
            return Err(Error::InsufficientMintSecurity);
        }
        if !data.verify(&self.params) {
            return Err(Error::WrongAccumulatorState);
        }

        let private_coin = self
            .recover_coin(data.public_coin())?
            .ok_or_else(|| Error::Param("mint does not belong to this wallet".into()))?;

        CoinSpend::new(
            &self.params,
            &private_coin,
            data.accumulator(),
            data.block_accumulator_hash(),
            data.witness(),
            ptx_hash,
            spend_type,
            &self.spend_key.obfuscation_j,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planner_splits_and_conserves() {
        let (recipients, change) = plan_recipients(1_617 * COIN + 33, "batch");
        let total: u64 = recipients.iter().map(|r| r.amount).sum();
        assert_eq!(total + change, 1_617 * COIN + 33);
        assert_eq!(change, 33);
        // 1617 = 1000 + 500 + 100 + 10 + 5 + 1 + 1
        assert_eq!(recipients.len(), 7);
        for recipient in &recipients {
            assert!(DENOMINATIONS.contains(&(recipient.amount / COIN)));
            assert_eq!(recipient.payment_id, "batch");
        }
    }

    #[test]
    fn planner_handles_dust_only() {
        let (recipients, change) = plan_recipients(COIN - 1, "");
        assert!(recipients.is_empty());
        assert_eq!(change, COIN - 1);
    }
}

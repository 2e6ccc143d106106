//! The background witness updater.
//!
//! One cooperative loop per wallet walks the chain in small batches and
//! folds every foreign mint into the witnesses of the wallet's own mints,
//! so the owner can prove membership the moment a spend is needed. The
//! loop never runs ahead of the chain tip, verifies against the stamped
//! accumulator value after every block, and falls back to the previous or
//! initial snapshot when verification or block reads fail.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::chain::{block_zerocoin_mints, ChainState};
use crate::crypto::bignum::BigNum;
use crate::error::{Error, Result};
use crate::storage::ZeroStore;
use crate::wallet::{PublicMintWitnessData, Wallet};

/// Pause between updater rounds.
pub const ROUND_DELAY: Duration = Duration::from_millis(250);

/// Cooperative cancellation flag with a waitable delay.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        let (flag, condvar) = &*self.inner;
        *flag.lock().expect("cancellation flag poisoned") = true;
        condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().expect("cancellation flag poisoned")
    }

    /// Sleeps up to `duration`; returns `true` when cancelled.
    pub fn wait_for(&self, duration: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let mut cancelled = flag.lock().expect("cancellation flag poisoned");
        let deadline = std::time::Instant::now() + duration;
        while !*cancelled {
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = condvar
                .wait_timeout(cancelled, deadline - now)
                .expect("cancellation flag poisoned");
            cancelled = guard;
        }
        true
    }
}

/// The witness updater for one wallet.
///
/// Lock order is chain state before wallet, matching the chain engine.
pub struct WitnessUpdater<S: ZeroStore> {
    chain: Arc<Mutex<ChainState<S>>>,
    wallet: Arc<Mutex<Wallet>>,
    token: CancellationToken,
}

impl<S: ZeroStore + 'static> WitnessUpdater<S> {
    pub fn new(chain: Arc<Mutex<ChainState<S>>>, wallet: Arc<Mutex<Wallet>>) -> Self {
        WitnessUpdater {
            chain,
            wallet,
            token: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs the loop on a dedicated thread until cancelled.
    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    /// The updater loop: one round, then a cancellable sleep.
    pub fn run(&self) {
        info!("witnesser thread started");
        loop {
            match self.round() {
                Ok(()) => {}
                Err(Error::Cancelled) => break,
                // Storage hiccups are transient; retry next tick.
                Err(err) => warn!("witnesser round failed: {}", err),
            }
            if self.token.wait_for(ROUND_DELAY) {
                break;
            }
        }
        info!("witnesser thread terminated");
    }

    /// One pass over a snapshot of the wallet's witness map.
    pub fn round(&self) -> Result<()> {
        let snapshot = {
            let wallet = self.wallet.lock().expect("wallet lock poisoned");
            wallet.witness_snapshot()
        };

        for (value, mut data) in snapshot {
            if self.token.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let (blocks_per_round, block_snapshot) = {
                let chain = self.chain.lock().expect("chain lock poisoned");
                let wallet = self.wallet.lock().expect("wallet lock poisoned");

                if wallet.is_spent(&value) {
                    continue;
                }
                match chain.store().read_coin_mint(&value)? {
                    Some(mint) if chain.contains(&mint.block_hash()) => {}
                    // Not on the main chain (yet, or anymore): leave the
                    // witness alone until the mint reappears.
                    _ => continue,
                }
                (
                    chain.config().witnesser_blocks_per_round,
                    chain.config().witnesser_block_snapshot,
                )
            };

            let mut should_write = false;

            // The recorded block may have been reorged away entirely.
            {
                let chain = self.chain.lock().expect("chain lock poisoned");
                if !chain.contains(&data.block_accumulator_hash()) {
                    data.recover();
                    if !chain.contains(&data.block_accumulator_hash()) {
                        data.reset();
                    }
                    self.write_back(&value, data);
                    continue;
                }
            }

            let mut remaining = blocks_per_round;
            while remaining > 0 {
                if self.token.is_cancelled() {
                    if should_write {
                        self.write_back(&value, data);
                    }
                    return Err(Error::Cancelled);
                }

                let step = {
                    let chain = self.chain.lock().expect("chain lock poisoned");
                    match chain.next_in_chain(&data.block_accumulator_hash()) {
                        None => None,
                        Some(next) => {
                            let block = chain.store().read_block(&next)?;
                            let stamped = chain.accumulator_value_at(&next);
                            Some((next, block, stamped))
                        }
                    }
                };
                let (next_hash, block, stamped) = match step {
                    Some(step) => step,
                    None => break, // caught up with the tip
                };
                let (block, stamped) = match (block, stamped) {
                    (Some(block), Some(stamped)) => (block, stamped),
                    _ => {
                        // Transient read failure: roll back to the snapshot
                        // and retry next round.
                        data.recover();
                        should_write = true;
                        break;
                    }
                };

                let params = {
                    let chain = self.chain.lock().expect("chain lock poisoned");
                    chain.params().clone()
                };
                let mints = match block_zerocoin_mints(&params, &block) {
                    Ok(mints) => mints,
                    Err(_) => {
                        data.recover();
                        should_write = true;
                        break;
                    }
                };
                for mint in &mints {
                    data.accumulate(&params, mint.value());
                }
                data.advance(next_hash);
                should_write = true;

                if !data.verify(&params) || data.accumulator().value() != &stamped {
                    warn!(
                        "witness for {} diverged at block {}, recovering",
                        value, next_hash
                    );
                    data.recover();
                    break;
                }

                remaining -= 1;
            }

            {
                let chain = self.chain.lock().expect("chain lock poisoned");
                let params = chain.params().clone();

                if !data.verify(&params) {
                    data.recover();
                    if !data.verify(&params) {
                        data.reset();
                    }
                    should_write = true;
                }

                if !chain.contains(&data.prev_block_accumulator_hash()) {
                    data.reset();
                    should_write = true;
                }

                // Periodic snapshot keeps the recovery depth bounded.
                let current_height = chain
                    .block_index(&data.block_accumulator_hash())
                    .map(|entry| entry.height);
                let prev_height = chain
                    .block_index(&data.prev_block_accumulator_hash())
                    .map(|entry| entry.height);
                if let (Some(current), Some(prev)) = (current_height, prev_height) {
                    if current.saturating_sub(prev) >= block_snapshot {
                        data.backup();
                        should_write = true;
                    }
                }
            }

            if should_write {
                debug!("witness for {} advanced to {}", value, data.count());
                self.write_back(&value, data);
            }
        }
        Ok(())
    }

    fn write_back(&self, value: &BigNum, data: PublicMintWitnessData) {
        let mut wallet = self.wallet.lock().expect("wallet lock poisoned");
        wallet.write_witness(value, data);
    }
}

//! Cryptographic and chain-state core of a confidential, Zerocoin-style
//! coin subsystem for a UTXO chain.
//!
//! A user *mints* a coin by publishing a prime Pedersen commitment hiding
//! a serial number; anyone holding the matching secrets later *spends* it
//! by proving, in zero knowledge, that the coin is a member of the global
//! RSA accumulator and that the revealed serial number opens it — without
//! disclosing which coin was spent. Bulletproofs range proofs bind the
//! committed amounts, so value conservation is checkable over commitments
//! alone.
//!
//! The crate deliberately stops at three external interfaces: an
//! append-only block feed ([`block`]), a key-value mint/spend index
//! ([`storage::ZeroStore`]), and a byte-stream serialization contract
//! ([`ser`]). Networking, UTXO storage, RPC and key derivation beyond the
//! coin protocol belong to the embedding node.

pub mod block;
pub mod chain;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod script;
pub mod ser;
pub mod spend;
pub mod storage;
pub mod wallet;
pub mod witnesser;

use serde_derive::{Deserialize, Serialize};

pub use crate::chain::ChainState;
pub use crate::crypto::params::ZeroCtParams;
pub use crate::error::{Error, Result};
pub use crate::spend::CoinSpend;
pub use crate::wallet::Wallet;
pub use crate::witnesser::WitnessUpdater;

/// Atomic units per coin.
pub const COIN: u64 = 100_000_000;

/// Default blocks folded into a witness per updater step.
pub const DEFAULT_BLOCKS_PER_ROUND: u32 = 10;

/// Default stride, in blocks, between witness recovery snapshots.
pub const DEFAULT_BLOCK_SNAPSHOT: u32 = 50;

/// Default Miller–Rabin iterations for full coin validation.
pub const DEFAULT_ZKP_ITERATIONS: u32 = 80;

/// Default cap on mint rejection sampling.
pub const DEFAULT_MAX_COINMINT_ATTEMPTS: u32 = 1 << 20;

/// Default bound on the spend verification cache.
pub const DEFAULT_COINSPEND_CACHE_SIZE: usize = 2048;

/// Default floor on the blocks a witness must cover before spending.
pub const DEFAULT_MIN_MINT_SECURITY: u32 = 20;

/// Randomized slack added on top of the mint-security floor.
pub const MINT_SECURITY_ENTROPY: u32 = 10;

/// Runtime options recognized by the engine, the wallet and the witness
/// updater.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Batch size per witness updater step.
    pub witnesser_blocks_per_round: u32,
    /// Stride for the `prev` witness snapshot.
    pub witnesser_block_snapshot: u32,
    /// Miller–Rabin iterations for coin primality.
    pub zkp_iterations: u32,
    /// Cap on mint rejection sampling.
    pub max_coinmint_attempts: u32,
    /// Maximum entries in the spend verification cache.
    pub coinspend_cache_size: usize,
    /// Minimum number of later blocks a spend's witness must cover.
    pub min_mint_security: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            witnesser_blocks_per_round: DEFAULT_BLOCKS_PER_ROUND,
            witnesser_block_snapshot: DEFAULT_BLOCK_SNAPSHOT,
            zkp_iterations: DEFAULT_ZKP_ITERATIONS,
            max_coinmint_attempts: DEFAULT_MAX_COINMINT_ATTEMPTS,
            coinspend_cache_size: DEFAULT_COINSPEND_CACHE_SIZE,
            min_mint_security: DEFAULT_MIN_MINT_SECURITY,
        }
    }
}

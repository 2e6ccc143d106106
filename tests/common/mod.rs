//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::sync::Arc;

use lazy_static::lazy_static;

use zeroct::block::{Block, Transaction, TxIn, TxOut};
use zeroct::chain::ChainState;
use zeroct::crypto::bignum::BigNum;
use zeroct::crypto::params::{ZeroCtParams, TUTORIAL_TEST_MODULUS};
use zeroct::crypto::serial::prove_balance;
use zeroct::crypto::PublicCoin;
use zeroct::script::Script;
use zeroct::spend::CoinSpend;
use zeroct::storage::MemoryStore;
use zeroct::wallet::Wallet;
use zeroct::Config;

lazy_static! {
    /// One short-group parameter set per test binary; deriving the group
    /// tower is the expensive part of setup.
    pub static ref PARAMS: Arc<ZeroCtParams> = {
        let mut params = ZeroCtParams::with_group_sizes(
            BigNum::from_hex(TUTORIAL_TEST_MODULUS).expect("tutorial modulus"),
            256,
            160,
            4,
        )
        .expect("test parameters");
        // Short chains do not need the production-strength primality
        // screen on every validation.
        params.zkp_iterations = 15;
        Arc::new(params)
    };
}

/// Settings tuned for short synthetic chains.
pub fn test_config() -> Config {
    Config {
        zkp_iterations: 15,
        min_mint_security: 2,
        witnesser_blocks_per_round: 10,
        witnesser_block_snapshot: 5,
        ..Config::default()
    }
}

pub fn new_chain() -> ChainState<MemoryStore> {
    ChainState::new(PARAMS.clone(), test_config(), MemoryStore::new())
}

pub fn new_wallet() -> Wallet {
    Wallet::new(PARAMS.clone(), test_config())
}

/// A transaction funding one mint for `wallet` out of plaintext inputs.
pub fn mint_transaction(wallet: &Wallet, amount: u64, payment_id: &str) -> (Transaction, PublicCoin) {
    let (output, coin, gamma) = wallet
        .create_mint_output(amount, payment_id)
        .expect("mint output");
    let balance_proof = prove_balance(&PARAMS.coin_commitment_group, &[], &[gamma]);
    let tx = Transaction {
        version: 1,
        inputs: Vec::new(),
        outputs: vec![output],
        plain_input_value: amount,
        balance_proof: Some(balance_proof),
    };
    (tx, coin)
}

/// A transaction consuming a spend proof into a plaintext output of
/// `amount`; `gamma` is the spent coin's amount-commitment randomness.
pub fn spend_transaction(spend: &CoinSpend, amount: u64, gamma: &BigNum) -> Transaction {
    let balance_proof = prove_balance(
        &PARAMS.coin_commitment_group,
        std::slice::from_ref(gamma),
        &[],
    );
    Transaction {
        version: 1,
        inputs: vec![TxIn {
            prevout: Default::default(),
            script_sig: Script::zerocoin_spend(spend),
        }],
        outputs: vec![TxOut {
            value: amount,
            script_pub_key: Script::plain(vec![0x51]),
        }],
        plain_input_value: 0,
        balance_proof: Some(balance_proof),
    }
}

/// A block extending the current tip.
pub fn next_block(chain: &ChainState<MemoryStore>, transactions: Vec<Transaction>) -> Block {
    Block {
        version: 1,
        prev_block_hash: chain.tip_hash(),
        transactions,
    }
}

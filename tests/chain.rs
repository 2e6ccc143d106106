//! Tests for the chain engine and the background witness updater.

mod common;

use std::sync::{Arc, Mutex};

use common::{mint_transaction, new_chain, new_wallet, next_block, spend_transaction, PARAMS};

use zeroct::crypto::accumulator::{Accumulator, AccumulatorWitness};
use zeroct::crypto::coin::{PrivateCoin, PublicCoin};
use zeroct::storage::ZeroStore;
use zeroct::crypto::keys::generate_spend_key;
use zeroct::error::Error;
use zeroct::hash::Hash256;
use zeroct::spend::{CoinSpend, SpendType};
use zeroct::witnesser::WitnessUpdater;
use zeroct::COIN;

#[test]
fn mints_are_accepted_once() {
    let mut chain = new_chain();
    let wallet = new_wallet();

    let (tx, coin) = mint_transaction(&wallet, COIN, "first");
    let block = next_block(&chain, vec![tx.clone()]);
    chain.connect_block(&block).unwrap();

    let record = chain
        .store()
        .read_coin_mint(coin.value())
        .unwrap()
        .expect("mint indexed");
    assert_eq!(record.block_hash(), block.hash());
    assert_ne!(
        chain.accumulator().value(),
        &PARAMS.accumulator_params.accumulator_base
    );

    // The same commitment cannot enter the chain twice.
    let replay = next_block(&chain, vec![tx]);
    assert!(matches!(
        chain.connect_block(&replay),
        Err(Error::DuplicateMint)
    ));
}

#[test]
fn duplicate_mint_within_one_block_is_rejected() {
    let mut chain = new_chain();
    let wallet = new_wallet();

    let (tx, _) = mint_transaction(&wallet, COIN, "");
    let block = next_block(&chain, vec![tx.clone(), tx]);
    assert!(matches!(
        chain.connect_block(&block),
        Err(Error::DuplicateMint)
    ));
    // Nothing was applied.
    assert_eq!(chain.block_count(), 0);
}

#[test]
fn unbalanced_transaction_rejects_the_block() {
    let mut chain = new_chain();
    let wallet = new_wallet();

    let (mut tx, _) = mint_transaction(&wallet, COIN, "");
    tx.plain_input_value = COIN - 1;
    let block = next_block(&chain, vec![tx]);
    assert!(matches!(
        chain.connect_block(&block),
        Err(Error::Unbalanced)
    ));
}

#[test]
fn spend_lifecycle_with_double_spend_prevention() {
    let mut chain = new_chain();
    let mut wallet = new_wallet();

    let (tx, coin) = mint_transaction(&wallet, 5 * COIN, "to spend");
    let block = next_block(&chain, vec![tx]);
    chain.connect_block(&block).unwrap();
    wallet.add_mint(&chain, &coin).unwrap();

    // Enough empty blocks for the witness to clear the anonymity floor.
    for _ in 0..12 {
        let filler = next_block(&chain, Vec::new());
        chain.connect_block(&filler).unwrap();
    }

    let gamma = wallet
        .recover_coin(&coin)
        .unwrap()
        .expect("own coin")
        .gamma()
        .clone();

    let chain = Arc::new(Mutex::new(chain));
    let wallet = Arc::new(Mutex::new(wallet));
    let updater = WitnessUpdater::new(chain.clone(), wallet.clone());
    for _ in 0..3 {
        updater.round().unwrap();
    }

    let spend = {
        let wallet = wallet.lock().unwrap();
        wallet
            .prepare_spend(coin.value(), Hash256::hash(b"payment tx"), SpendType::Spend)
            .unwrap()
    };
    let serial = spend.coin_serial_number().clone();

    drop(updater);
    let mut chain = Arc::try_unwrap(chain)
        .map_err(|_| ())
        .expect("updater dropped")
        .into_inner()
        .unwrap();

    let spend_tx = spend_transaction(&spend, 5 * COIN, &gamma);
    let spend_tx_hash = spend_tx.hash();
    let block = next_block(&chain, vec![spend_tx]);
    chain.connect_block(&block).unwrap();

    assert_eq!(
        chain.store().read_coin_spend(&serial).unwrap(),
        Some(spend_tx_hash)
    );

    // Publishing the same serial again must fail.
    let again = spend_transaction(&spend, 5 * COIN, &gamma);
    let block = next_block(&chain, vec![again]);
    assert!(matches!(
        chain.connect_block(&block),
        Err(Error::DoubleSpend)
    ));
}

#[test]
fn spend_referencing_unknown_accumulator_state_is_rejected() {
    let mut chain = new_chain();

    // A perfectly valid proof against a local accumulator nobody stamped.
    let spend_key = generate_spend_key(&PARAMS);
    let address = spend_key.address(&PARAMS);
    let (coin, _) = PublicCoin::mint(
        &PARAMS,
        &address.zero_pub_key,
        &address.blinding_commitment,
        "",
        COIN,
        1 << 20,
    )
    .unwrap();
    let private = PrivateCoin::recover(&PARAMS, &spend_key, &coin)
        .unwrap()
        .expect("own coin");

    let acc_params = &PARAMS.accumulator_params;
    let mut accumulator = Accumulator::new(acc_params);
    let mut witness = AccumulatorWitness::new(accumulator.clone(), coin.clone());
    accumulator.accumulate(&PARAMS, &coin).unwrap();
    witness.add_element(acc_params, &coin);

    let spend = CoinSpend::new(
        &PARAMS,
        &private,
        &accumulator,
        Hash256::hash(b"no such block"),
        &witness,
        Hash256::hash(b"ptx"),
        SpendType::Spend,
        &spend_key.obfuscation_j,
    )
    .unwrap();

    let gamma = private.gamma().clone();
    let tx = spend_transaction(&spend, COIN, &gamma);
    let block = next_block(&chain, vec![tx]);
    assert!(matches!(
        chain.connect_block(&block),
        Err(Error::WrongAccumulatorState)
    ));
}

#[test]
fn reorg_replays_identical_accumulator_stamps() {
    let mut chain = new_chain();
    let wallet = new_wallet();

    // Anchor block plus a two-block branch.
    let (tx, _) = mint_transaction(&wallet, COIN, "anchor");
    let anchor = next_block(&chain, vec![tx]);
    chain.connect_block(&anchor).unwrap();

    let mut branch = Vec::new();
    let mut branch_coins = Vec::new();
    for i in 0..2u64 {
        let (tx, coin) = mint_transaction(&wallet, (i + 2) * COIN, "branch");
        let block = next_block(&chain, vec![tx]);
        chain.connect_block(&block).unwrap();
        branch_coins.push(coin);
        branch.push(block);
    }

    let stamps: Vec<_> = branch
        .iter()
        .map(|b| chain.accumulator_value_at(&b.hash()).expect("stamped"))
        .collect();
    let tip_value = chain.accumulator().value().clone();

    // Unwind to the fork point.
    chain.disconnect_tip().unwrap();
    chain.disconnect_tip().unwrap();
    assert_eq!(chain.tip_hash(), anchor.hash());
    for coin in &branch_coins {
        assert!(chain.store().read_coin_mint(coin.value()).unwrap().is_none());
    }

    // Replaying the branch reproduces every stamp.
    for (block, stamp) in branch.iter().zip(&stamps) {
        chain.connect_block(block).unwrap();
        assert_eq!(
            chain.accumulator_value_at(&block.hash()).as_ref(),
            Some(stamp)
        );
    }
    assert_eq!(chain.accumulator().value(), &tip_value);
}

#[test]
fn witnesser_follows_a_synthetic_chain() {
    const BLOCKS: usize = 12;

    let mut chain = new_chain();
    let mut owner = new_wallet();
    let foreign = new_wallet();

    // Every block carries one foreign mint and one owner mint.
    let mut owner_coins = Vec::new();
    for height in 0..BLOCKS {
        let (foreign_tx, _) = mint_transaction(&foreign, COIN, "foreign");
        let (owner_tx, owner_coin) = mint_transaction(&owner, 2 * COIN, "mine");
        let block = next_block(&chain, vec![foreign_tx, owner_tx]);
        chain.connect_block(&block).unwrap();
        owner_coins.push((owner_coin, height));
    }
    for (coin, _) in &owner_coins {
        owner.add_mint(&chain, coin).unwrap();
    }

    let tip = chain.tip_hash();
    let tip_value = chain.accumulator().value().clone();
    let chain = Arc::new(Mutex::new(chain));
    let wallet = Arc::new(Mutex::new(owner));
    let updater = WitnessUpdater::new(chain.clone(), wallet.clone());

    for _ in 0..BLOCKS {
        updater.round().unwrap();
    }

    let wallet = wallet.lock().unwrap();
    for (coin, height) in &owner_coins {
        let data = wallet.witness(coin.value()).expect("witness tracked");
        // Caught up with the tip, witness intact.
        assert_eq!(data.block_accumulator_hash(), tip);
        assert!(data.verify(&PARAMS));
        assert_eq!(data.accumulator().value(), &tip_value);
        // One block folded per height above the mint's own.
        assert_eq!(data.count() as usize, BLOCKS - height - 1);
    }
}

#[test]
fn witnesser_thread_stops_on_cancellation() {
    let chain = Arc::new(Mutex::new(new_chain()));
    let wallet = Arc::new(Mutex::new(new_wallet()));
    let updater = WitnessUpdater::new(chain, wallet);
    let token = updater.token();

    let handle = updater.spawn();
    std::thread::sleep(std::time::Duration::from_millis(50));
    token.cancel();
    handle.join().expect("clean shutdown");
}

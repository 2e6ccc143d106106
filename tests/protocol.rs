//! End-to-end tests of the cryptographic protocol, independent of the
//! chain engine.

mod common;

use common::PARAMS;

use zeroct::crypto::accumulator::{Accumulator, AccumulatorWitness};
use zeroct::crypto::bignum::BigNum;
use zeroct::crypto::bulletproofs::{verify_bulletproofs, BulletproofRangeproof};
use zeroct::crypto::coin::{PrivateCoin, PublicCoin};
use zeroct::crypto::keys::generate_spend_key;
use zeroct::crypto::serial::{prove_balance, verify_balance};
use zeroct::error::Error;
use zeroct::hash::Hash256;
use zeroct::ser::{Decodable, Encodable};
use zeroct::spend::{CoinSpend, SpendType};

const COINS_TO_ACCUMULATE: usize = 10;

fn mint_coins(count: usize) -> (zeroct::crypto::PrivateSpendKey, Vec<PublicCoin>) {
    let spend_key = generate_spend_key(&PARAMS);
    let address = spend_key.address(&PARAMS);
    let coins = (0..count)
        .map(|i| {
            PublicCoin::mint(
                &PARAMS,
                &address.zero_pub_key,
                &address.blinding_commitment,
                "",
                (i as u64 + 1) * 1_000,
                1 << 20,
            )
            .expect("mint")
            .0
        })
        .collect();
    (spend_key, coins)
}

#[test]
fn accumulator_is_order_independent() {
    let (_, coins) = mint_coins(COINS_TO_ACCUMULATE);
    let acc_params = &PARAMS.accumulator_params;

    let mut forward = Accumulator::new(acc_params);
    let mut reverse = Accumulator::new(acc_params);
    for coin in &coins {
        forward.accumulate(&PARAMS, coin).unwrap();
    }
    for coin in coins.iter().rev() {
        reverse.accumulate(&PARAMS, coin).unwrap();
    }
    assert_eq!(forward, reverse);
}

#[test]
fn witness_distinguishes_membership() {
    let (_, coins) = mint_coins(COINS_TO_ACCUMULATE);
    let acc_params = &PARAMS.accumulator_params;

    // Witness for c0 built against the accumulation of c1..c9.
    let mut with_c0 = Accumulator::new(acc_params);
    let mut witness = AccumulatorWitness::new(Accumulator::new(acc_params), coins[0].clone());
    for coin in &coins {
        with_c0.accumulate(&PARAMS, coin).unwrap();
        witness.add_element(acc_params, coin);
    }
    witness.verify(acc_params, &with_c0, &coins[0]).unwrap();

    // Without c0 in the accumulator the relation must not hold.
    let mut without_c0 = Accumulator::new(acc_params);
    for coin in &coins[1..] {
        without_c0.accumulate(&PARAMS, coin).unwrap();
    }
    assert!(witness.verify(acc_params, &without_c0, &coins[0]).is_err());
}

#[test]
fn spend_survives_serialization_but_not_bit_flips() {
    let spend_key = generate_spend_key(&PARAMS);
    let address = spend_key.address(&PARAMS);
    let acc_params = &PARAMS.accumulator_params;

    let mut accumulator = Accumulator::new(acc_params);
    let mut target = None;
    for i in 0..4u64 {
        let (coin, _) = PublicCoin::mint(
            &PARAMS,
            &address.zero_pub_key,
            &address.blinding_commitment,
            "",
            1_000 * (i + 1),
            1 << 20,
        )
        .unwrap();
        if target.is_none() {
            let private = PrivateCoin::recover(&PARAMS, &spend_key, &coin)
                .unwrap()
                .expect("own coin");
            target = Some((private, AccumulatorWitness::new(accumulator.clone(), coin.clone())));
        }
        accumulator.accumulate(&PARAMS, &coin).unwrap();
        if let Some((_, witness)) = target.as_mut() {
            witness.add_element(acc_params, &coin);
        }
    }
    let (private_coin, witness) = target.unwrap();

    let ptx_hash = Hash256::hash(b"\xde\xad\xbe\xef");
    let spend = CoinSpend::new(
        &PARAMS,
        &private_coin,
        &accumulator,
        Hash256::hash(b"checkpoint block"),
        &witness,
        ptx_hash,
        SpendType::Spend,
        &spend_key.obfuscation_j,
    )
    .unwrap();
    spend.verify(&PARAMS, &accumulator).unwrap();

    let bytes = spend.to_bytes();
    let restored = CoinSpend::from_bytes(&bytes).unwrap();
    restored.verify(&PARAMS, &accumulator).unwrap();

    // Flip one bit anywhere in the serialized proof; the trailing bytes
    // fall in the amount commitment, which the signature hash also covers.
    for index in [7usize, bytes.len() / 3, bytes.len() - 2] {
        let mut corrupted = bytes.clone();
        corrupted[index] ^= 0x10;
        match CoinSpend::from_bytes(&corrupted) {
            Ok(bad) => assert!(bad.verify(&PARAMS, &accumulator).is_err()),
            Err(_) => {}
        }
    }
}

#[test]
fn range_proof_covers_a_real_amount_and_rejects_overflow() {
    let group = &PARAMS.coin_commitment_group;

    // 10 coins at 1e8 atomic units.
    let amount = BigNum::from_u64(1_000_000_000);
    let gamma = group.random_exponent();
    let proof = BulletproofRangeproof::prove(group, &[amount], &[gamma]).unwrap();
    proof.verify(group).unwrap();
    verify_bulletproofs(group, &[proof.clone()]).unwrap();

    let serialized = proof.to_bytes();
    let restored = BulletproofRangeproof::from_bytes(&serialized).unwrap();
    restored.verify(group).unwrap();

    // 2^65 is out of range; the prover must refuse outright.
    let over = BigNum::from_u64(2).pow(65);
    let gamma = group.random_exponent();
    assert!(BulletproofRangeproof::prove(group, &[over], &[gamma]).is_err());
}

#[test]
fn balance_proof_accepts_conserving_transfers() {
    let group = &PARAMS.coin_commitment_group;
    let commit = |amount: u64, gamma: &BigNum| {
        group
            .g
            .pow_mod(&BigNum::from_u64(amount), &group.modulus)
            .mul_mod(&group.h.pow_mod(gamma, &group.modulus), &group.modulus)
    };

    let input_amounts = [3u64, 2, 5, 0];
    let output_amounts = [4u64, 4, 2];
    let input_gammas: Vec<BigNum> = input_amounts
        .iter()
        .map(|_| group.random_exponent())
        .collect();
    let output_gammas: Vec<BigNum> = output_amounts
        .iter()
        .map(|_| group.random_exponent())
        .collect();

    let inputs: Vec<BigNum> = input_amounts
        .iter()
        .zip(&input_gammas)
        .map(|(a, g)| commit(*a, g))
        .collect();
    let mut outputs: Vec<BigNum> = output_amounts
        .iter()
        .zip(&output_gammas)
        .map(|(a, g)| commit(*a, g))
        .collect();

    let proof = prove_balance(group, &input_gammas, &output_gammas);
    verify_balance(group, &inputs, &outputs, &proof).unwrap();

    outputs[1] = commit(3, &output_gammas[1]);
    assert!(matches!(
        verify_balance(group, &inputs, &outputs, &proof),
        Err(Error::Unbalanced)
    ));
}

#[test]
fn minted_coin_roundtrips_through_its_owner() {
    let spend_key = generate_spend_key(&PARAMS);
    let address = spend_key.address(&PARAMS);

    let (coin, _) = PublicCoin::mint(
        &PARAMS,
        &address.zero_pub_key,
        &address.blinding_commitment,
        "tutorial payment",
        zeroct::COIN,
        1 << 20,
    )
    .unwrap();
    coin.validate(&PARAMS).unwrap();

    // Network-side roundtrip, then owner-side recovery.
    let restored = PublicCoin::from_bytes(&coin.to_bytes()).unwrap();
    let private = PrivateCoin::recover(&PARAMS, &spend_key, &restored)
        .unwrap()
        .expect("own coin");
    assert_eq!(private.amount(), zeroct::COIN);
    assert_eq!(private.payment_id(), "tutorial payment");

    // g^{s} · h^{r} recomposes the published commitment value.
    let group = &PARAMS.coin_commitment_group;
    let recomposed = group
        .g
        .pow_mod(private.serial_number(), &group.modulus)
        .mul_mod(
            &group.h.pow_mod(private.randomness(), &group.modulus),
            &group.modulus,
        );
    assert_eq!(&recomposed, restored.value());
}

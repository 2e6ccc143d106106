//! Cryptographic primitives of the coin protocol.
//!
//! # Commitments and proofs
//!
//! Coins are prime Pedersen commitments hiding a serial number; spending
//! one publishes a [`crate::spend::CoinSpend`] assembled from the proofs in
//! this module: commitments to the coin value in two groups with an
//! equality proof ([`commitment`]), a Camenisch–Lysyanskaya accumulator
//! membership proof ([`acc_pok`]), and the serial-number statements that
//! bind the transaction hash ([`serial`]). Committed amounts carry
//! aggregated Bulletproofs range proofs ([`bulletproofs`]).
//!
//! All arithmetic runs over [`bignum::BigNum`] in groups derived
//! deterministically from the accumulator modulus ([`params`]).

pub mod acc_pok;
pub mod accumulator;
pub mod bignum;
pub mod bulletproofs;
pub mod coin;
pub mod commitment;
pub mod keys;
pub mod math;
pub mod params;
pub mod serial;
pub mod transcript;

pub use self::acc_pok::AccumulatorProofOfKnowledge;
pub use self::accumulator::{Accumulator, AccumulatorWitness};
pub use self::bignum::BigNum;
pub use self::bulletproofs::{verify_bulletproofs, BulletproofRangeproof};
pub use self::coin::{PrivateCoin, PublicCoin};
pub use self::commitment::{Commitment, CommitmentProofOfKnowledge};
pub use self::keys::{
    generate_spend_key, BlindingCommitment, ObfuscationValue, PrivateAddress, PrivateSpendKey,
    PrivateViewKey,
};
pub use self::params::{IntegerGroupParams, ZeroCtParams, TUTORIAL_TEST_MODULUS};
pub use self::serial::{SerialNumberProofOfKnowledge, SerialNumberSignatureOfKnowledge};

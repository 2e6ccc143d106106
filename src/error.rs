//! Error types shared by the cryptographic core and the chain engine.

use thiserror::Error;

/// Reason a coin commitment failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinError {
    /// Commitment value is at or below the admissible minimum.
    TooSmall,
    /// Commitment value exceeds the admissible maximum.
    TooLarge,
    /// Commitment value is composite.
    NotPrime,
    /// Serial number is zero or not an element of the exponent group.
    BadSerial,
}

impl std::fmt::Display for CoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CoinError::TooSmall => "value is too small",
            CoinError::TooLarge => "value is too large",
            CoinError::NotPrime => "value is not prime",
            CoinError::BadSerial => "serial number is out of range",
        };
        f.write_str(s)
    }
}

/// The sub-proof of a spend that failed to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofKind {
    /// Equality proof between the two commitments to the coin value.
    Commitment,
    /// Camenisch–Lysyanskaya accumulator membership proof.
    Accumulator,
    /// Serial-number signature of knowledge.
    SerialSok,
    /// Serial-number proof of knowledge.
    SerialPok,
    /// Bulletproofs range proof.
    RangeProof,
}

impl std::fmt::Display for ProofKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProofKind::Commitment => "commitment equality proof",
            ProofKind::Accumulator => "accumulator proof",
            ProofKind::SerialSok => "serial number signature of knowledge",
            ProofKind::SerialPok => "serial number proof of knowledge",
            ProofKind::RangeProof => "range proof",
        };
        f.write_str(s)
    }
}

/// Errors produced by the core.
///
/// Cryptographic failures surface to the chain engine as rejection of the
/// containing transaction or block; storage failures halt block acceptance
/// and are retried by background tasks at their next tick.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or uninitialized parameters.
    #[error("invalid parameters: {0}")]
    Param(String),

    /// A coin failed structural validation.
    #[error("invalid coin: {0}")]
    InvalidCoin(CoinError),

    /// A zero-knowledge proof failed to verify.
    #[error("proof did not verify: {0}")]
    BadProof(ProofKind),

    /// The amount-commitment sum check failed.
    #[error("amount commitments do not balance")]
    Unbalanced,

    /// A mint with the same commitment value was already accepted.
    #[error("duplicate mint")]
    DuplicateMint,

    /// The revealed serial number was already spent.
    #[error("serial number already spent")]
    DoubleSpend,

    /// A spend references a block whose accumulator value does not match.
    #[error("spend references an unknown or mismatched accumulator state")]
    WrongAccumulatorState,

    /// Rejection sampling during minting hit its attempt cap.
    #[error("unable to mint a coin: too many attempts")]
    MintExhausted,

    /// A spend's witness does not cover enough later mints.
    #[error("witness covers too few mints to spend safely")]
    InsufficientMintSecurity,

    /// A byte stream could not be decoded into the expected record.
    #[error("malformed encoding: {0}")]
    Encoding(String),

    /// I/O or index lookup failure.
    #[error("storage failure: {0}")]
    Storage(String),

    /// A background task observed its cancellation token.
    #[error("operation cancelled")]
    Cancelled,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

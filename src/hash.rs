//! 256-bit hashes and the double-SHA256 convention used for transaction,
//! block and proof identifiers.

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::ser::{Decodable, Encodable, Reader};

/// A 256-bit hash, stored big-endian as produced by SHA-256.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The all-zero hash, used as the "no block" sentinel.
    pub fn zero() -> Self {
        Hash256([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Double-SHA256 of `data`.
    pub fn hash(data: &[u8]) -> Self {
        let first = Sha256::digest(data);
        let second = Sha256::digest(&first);
        let mut out = [0u8; 32];
        out.copy_from_slice(&second);
        Hash256(out)
    }

    /// Single SHA-256, used by the deterministic derivation chains where the
    /// original hashes hash outputs repeatedly.
    pub fn sha256(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Hash256(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(slice);
        Some(Hash256(out))
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash256({})", self)
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Encodable for Hash256 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
}

impl Decodable for Hash256 {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let bytes = r.take(32)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Ok(Hash256(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_hash_differs_from_single() {
        let data = b"zeroct";
        assert_ne!(Hash256::hash(data), Hash256::sha256(data));
    }

    #[test]
    fn roundtrip() {
        let h = Hash256::hash(b"roundtrip");
        let decoded = Hash256::from_bytes(&h.to_bytes()).unwrap();
        assert_eq!(h, decoded);
    }
}

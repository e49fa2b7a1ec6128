//! Commit hash for the commit-reveal vote
//!
//! `hash = BLAKE3("{salt}:{exchange_rates}:{validator}")[..20]`
//!
//! The validator is rendered as its hex operator address. Only byte equality
//! between commit and reveal matters.

use crate::error::{OracleError, Result};
use crate::types::ValAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Truncated digest length in bytes
pub const HASH_LEN: usize = 20;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AggregateVoteHash([u8; HASH_LEN]);

impl AggregateVoteHash {
    /// Hash the reveal payload
    pub fn compute(salt: &str, exchange_rates: &str, voter: &ValAddress) -> Self {
        let payload = format!("{}:{}:{}", salt, exchange_rates, voter);
        let digest = blake3::hash(payload.as_bytes());
        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(&digest.as_bytes()[..HASH_LEN]);
        Self(hash)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let hash: [u8; HASH_LEN] =
            bytes
                .try_into()
                .map_err(|_| OracleError::InvalidHashLength {
                    expected: HASH_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(hash))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| OracleError::InvalidHash(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Recompute from the reveal and compare
    pub fn verify(&self, salt: &str, exchange_rates: &str, voter: &ValAddress) -> bool {
        Self::compute(salt, exchange_rates, voter) == *self
    }
}

impl fmt::Display for AggregateVoteHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AggregateVoteHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AggregateVoteHash({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ADDRESS_LEN;
    use proptest::prelude::*;

    fn voter() -> ValAddress {
        ValAddress::new([1; ADDRESS_LEN])
    }

    #[test]
    fn test_hash_deterministic() {
        let a = AggregateVoteHash::compute("salt", "1700uatom", &voter());
        let b = AggregateVoteHash::compute("salt", "1700uatom", &voter());
        assert_eq!(a, b);
        assert!(a.verify("salt", "1700uatom", &voter()));
        assert!(!a.verify("pepper", "1700uatom", &voter()));
        assert!(!a.verify("salt", "1700uatom", &ValAddress::new([2; ADDRESS_LEN])));
    }

    #[test]
    fn test_hex_round_trip() {
        let hash = AggregateVoteHash::compute("s", "1uatom", &voter());
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 2 * HASH_LEN);
        assert_eq!(AggregateVoteHash::from_hex(&hex).unwrap(), hash);
    }

    #[test]
    fn test_bad_hash_input() {
        assert!(matches!(
            AggregateVoteHash::from_hex("abcd"),
            Err(OracleError::InvalidHashLength { expected: 20, actual: 2 })
        ));
        assert!(matches!(
            AggregateVoteHash::from_hex("not hex"),
            Err(OracleError::InvalidHash(_))
        ));
    }

    proptest! {
        #[test]
        fn test_flipped_bit_fails(salt in "[a-z0-9]{1,16}", byte in 0usize..HASH_LEN, bit in 0u8..8) {
            let hash = AggregateVoteHash::compute(&salt, "1700uatom", &voter());
            let mut bytes = *hash.as_bytes();
            bytes[byte] ^= 1 << bit;
            let tampered = AggregateVoteHash::from_bytes(&bytes).unwrap();
            prop_assert!(!tampered.verify(&salt, "1700uatom", &voter()));
        }
    }
}

//! ContentHash: BLAKE3 truncated to 128 bits (32 hex chars).
//!
//! Identifies a MIDI file's bytes for the result cache, independent of
//! where the file sits in the corpus.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn from_data(data: &[u8]) -> Self {
        let hash_bytes = blake3::hash(data);
        Self(hex::encode(&hash_bytes.as_bytes()[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_produces_32_hex_chars() {
        let hash = ContentHash::from_data(b"MThd");
        assert_eq!(hash.as_str().len(), 32);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_from_data_is_deterministic() {
        assert_eq!(ContentHash::from_data(b"song"), ContentHash::from_data(b"song"));
        assert_ne!(ContentHash::from_data(b"song a"), ContentHash::from_data(b"song b"));
    }
}

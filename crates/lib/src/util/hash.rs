//! Content hashing.
//!
//! Module sources are stored by the SHA-256 of their bytes; attachment
//! records carry the digest of the uploaded file.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA-256 hash in lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  /// Parses a hash read from an untrusted place (a directory listing, a CLI
  /// argument). Returns `None` unless it is exactly 64 lowercase hex digits.
  pub fn parse(s: &str) -> Option<Self> {
    let valid = s.len() == 64 && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'));
    valid.then(|| ContentHash(s.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}

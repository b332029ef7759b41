//! MediaHash: the address of a stored still or clip.
//!
//! BLAKE3 truncated to 128 bits, rendered as 32 lowercase hex chars. The
//! first two chars shard the on-disk directories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const HEX_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaHash(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("media hash must be {HEX_LEN} hex chars, got {0}")]
    InvalidLength(usize),

    #[error("media hash contains a non-hex character")]
    InvalidHex,
}

impl MediaHash {
    pub fn of(data: &[u8]) -> Self {
        let digest = blake3::hash(data);
        Self(hex::encode(&digest.as_bytes()[..HEX_LEN / 2]))
    }

    pub fn parse(s: &str) -> Result<Self, HashError> {
        if s.len() != HEX_LEN {
            return Err(HashError::InvalidLength(s.len()));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HashError::InvalidHex);
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Shard directory name.
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }

    /// File name inside the shard.
    pub fn file_stem(&self) -> &str {
        &self.0[2..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MediaHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

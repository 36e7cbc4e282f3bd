//! Outpoints and voter identities.
//!
//! An [`Outpoint`] names one spendable output of a transaction. Voters are
//! identified by the outpoint of their collateral, wrapped in [`VoterId`] so
//! the two roles cannot be mixed up at a call site.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InstalockError;
use crate::hash::TxHash;

/// Reference to output `index` of transaction `txid`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    pub txid: TxHash,
    pub index: u32,
}

impl Outpoint {
    pub fn new(txid: TxHash, index: u32) -> Self {
        Self { txid, index }
    }

    /// Short textual form `"<txid>-<index>"`.
    ///
    /// This exact string is part of the signed vote message, so its format
    /// must not change.
    pub fn to_short_string(&self) -> String {
        format!("{}-{}", self.txid, self.index)
    }

    /// Canonical byte encoding: txid followed by the little-endian index.
    pub fn to_bytes(&self) -> [u8; 36] {
        let mut out = [0u8; 36];
        out[..32].copy_from_slice(self.txid.as_bytes());
        out[32..].copy_from_slice(&self.index.to_le_bytes());
        out
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.txid, self.index)
    }
}

impl FromStr for Outpoint {
    type Err = InstalockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, index) = s
            .rsplit_once('-')
            .ok_or_else(|| InstalockError::InvalidOutpoint(s.to_string()))?;
        let txid =
            TxHash::from_hex(txid).ok_or_else(|| InstalockError::InvalidOutpoint(s.to_string()))?;
        let index = index
            .parse::<u32>()
            .map_err(|_| InstalockError::InvalidOutpoint(s.to_string()))?;
        Ok(Self { txid, index })
    }
}

/// Identity of an eligible voter: the outpoint of its collateral.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoterId(pub Outpoint);

impl VoterId {
    pub fn new(collateral: Outpoint) -> Self {
        Self(collateral)
    }

    pub fn collateral(&self) -> &Outpoint {
        &self.0
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

//! Runtime switches for the lock manager.

use instalock_types::{Amount, LockParams};
use serde::{Deserialize, Serialize};

/// Network-wide feature switches plus the protocol constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    pub params: LockParams,
    /// Master switch: voting and finalization are skipped while off.
    pub enabled: bool,
    /// Whether finalized locks are reported (and thus enforced against blocks).
    pub block_filtering: bool,
    /// Ceiling on a request's total input value, in whole coins.
    pub max_value_coins: u64,
    /// Confirmations reported for a locked transaction.
    pub depth: u32,
}

impl LockConfig {
    /// The value ceiling in base units.
    pub fn max_value(&self) -> Amount {
        Amount::new(self.max_value_coins.saturating_mul(self.params.coin))
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            params: LockParams::default(),
            enabled: true,
            block_filtering: true,
            max_value_coins: 1000,
            depth: 5,
        }
    }
}

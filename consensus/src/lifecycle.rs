//! The three expiry clocks shared by candidates and votes.
//!
//! - **Expired**: the transaction was mined and the chain has moved more than
//!   `keep_lock_blocks` past it (or a proven conflict forced expiry).
//! - **TimedOut**: wall-clock age exceeds `lock_timeout_secs`.
//! - **Failed**: wall-clock age exceeds `failed_timeout_secs` and the
//!   transaction never became a finalized lock.
//!
//! The predicates are independent. [`LockClock::stage`] folds them into one
//! [`Lifecycle`] tag, checking them in a fixed order so callers never depend on
//! the order they happen to test them in.

use instalock_types::{LockParams, Timestamp};
use serde::{Deserialize, Serialize};

/// Where the owning transaction stands relative to the chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    /// Not (or no longer) in a block.
    #[default]
    Unconfirmed,
    /// Included in the block at this height.
    AtHeight(u32),
    /// Expired immediately, regardless of height. Set after a proven conflict.
    ForcedExpired,
}

impl Confirmation {
    pub fn from_height(height: Option<u32>) -> Self {
        height.map_or(Confirmation::Unconfirmed, Confirmation::AtHeight)
    }
}

/// Most advanced lifecycle stage that currently applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    Live,
    TimedOut,
    Failed,
    Expired,
}

/// Creation time plus confirmation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockClock {
    pub created_at: Timestamp,
    pub confirmation: Confirmation,
}

impl LockClock {
    pub fn new(created_at: Timestamp) -> Self {
        Self {
            created_at,
            confirmation: Confirmation::Unconfirmed,
        }
    }

    pub fn is_expired(&self, height: u32, params: &LockParams) -> bool {
        match self.confirmation {
            Confirmation::Unconfirmed => false,
            Confirmation::ForcedExpired => true,
            Confirmation::AtHeight(confirmed) => {
                height.saturating_sub(confirmed) > params.keep_lock_blocks
            }
        }
    }

    pub fn is_timed_out(&self, now: Timestamp, params: &LockParams) -> bool {
        self.created_at.elapsed_since(now) > params.lock_timeout_secs
    }

    /// `locked` is whether the owning transaction is a finalized lock.
    pub fn is_failed(&self, now: Timestamp, locked: bool, params: &LockParams) -> bool {
        self.created_at.elapsed_since(now) > params.failed_timeout_secs && !locked
    }

    pub fn stage(&self, now: Timestamp, height: u32, locked: bool, params: &LockParams) -> Lifecycle {
        if self.is_expired(height, params) {
            Lifecycle::Expired
        } else if self.is_failed(now, locked, params) {
            Lifecycle::Failed
        } else if self.is_timed_out(now, params) {
            Lifecycle::TimedOut
        } else {
            Lifecycle::Live
        }
    }
}

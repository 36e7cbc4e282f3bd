//! Protocol constants for transaction locking.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// Every tunable constant of the locking protocol.
///
/// Defaults match the live network. Tests usually shrink the quorum with
/// struct update syntax, e.g. `LockParams { signatures_required: 5, ..Default::default() }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockParams {
    /// Distinct voter endorsements needed before one outpoint counts as locked.
    pub signatures_required: usize,
    /// Number of top-ranked voters allowed to sign for each outpoint (K).
    pub signatures_total: u32,
    /// Confirmations an input needs in the wallet; the protocol accepts one less.
    pub confirmations_required: u32,
    /// Blocks after inclusion during which locks and votes are retained.
    pub keep_lock_blocks: u32,
    /// Seconds a candidate or vote has to gather a full quorum.
    pub lock_timeout_secs: u64,
    /// Seconds after which an unlocked vote is considered a failed attempt.
    pub failed_timeout_secs: u64,
    /// Fee floor per input, in base units.
    pub min_fee_per_input: Amount,
    /// Base units per whole coin.
    pub coin: u64,
    /// Input count above which a request is logged as unusually large.
    pub warn_many_inputs: usize,
    /// Seconds an orphan-vote rate-limit entry is kept per voter.
    pub orphan_voter_keep_secs: u64,
    /// Voter rank is computed at the input's confirmation height plus this offset.
    pub rank_height_offset: u32,
    /// Minimum protocol version a voter must run to be ranked.
    pub min_protocol_version: u32,
}

impl LockParams {
    /// Minimum fee for a request spending `input_count` inputs.
    pub fn min_fee(&self, input_count: usize) -> Amount {
        let per_input = self.min_fee_per_input;
        let scaled = per_input
            .checked_mul(input_count as u64)
            .unwrap_or(Amount::new(u64::MAX));
        per_input.max(scaled)
    }

    /// Maximum number of signatures a request with `input_count` inputs can gather.
    pub fn max_signatures(&self, input_count: usize) -> usize {
        input_count.saturating_mul(self.signatures_total as usize)
    }

    /// Minimum input age (in blocks, inclusive) accepted by request validation.
    pub fn min_input_age(&self) -> u32 {
        self.confirmations_required.saturating_sub(1)
    }
}

impl Default for LockParams {
    fn default() -> Self {
        Self {
            signatures_required: 6,
            signatures_total: 10,
            confirmations_required: 6,
            keep_lock_blocks: 24,
            lock_timeout_secs: 15,
            failed_timeout_secs: 60,
            min_fee_per_input: Amount::new(10_000),
            coin: 100_000_000,
            warn_many_inputs: 100,
            orphan_voter_keep_secs: 600,
            rank_height_offset: 4,
            min_protocol_version: 70_900,
        }
    }
}

//! Span constructors for lock traffic, so request and vote handling can be
//! filtered and correlated by transaction.

use tracing::{info_span, Span};

use instalock_types::{Outpoint, TxHash, VoterId};

/// Handling of one inbound lock request.
pub fn lock_request_span(tx_hash: &TxHash) -> Span {
    info_span!("lock_request", txid = %tx_hash)
}

/// Handling of one inbound vote.
pub fn lock_vote_span(tx_hash: &TxHash, outpoint: &Outpoint, voter: &VoterId) -> Span {
    info_span!("lock_vote", txid = %tx_hash, %outpoint, %voter)
}

/// One maintenance sweep.
pub fn sweep_span(height: u32) -> Span {
    info_span!("lock_sweep", height)
}

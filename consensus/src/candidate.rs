//! Per-transaction aggregate of outpoint lock states.

use std::collections::BTreeMap;

use instalock_types::{LockParams, Outpoint, Timestamp, TxHash, VoterId};

use crate::lifecycle::{Confirmation, LockClock};
use crate::outpoint_lock::OutpointLockState;
use crate::request::LockRequest;
use crate::vote::Vote;

/// Voting progress for one transaction.
///
/// A candidate may exist without its request ("empty") when votes arrive
/// before the transaction itself; it then only anchors the orphan votes and
/// the timeout countdown.
#[derive(Clone, Debug)]
pub struct LockCandidate {
    tx_hash: TxHash,
    request: Option<LockRequest>,
    outpoint_locks: BTreeMap<Outpoint, OutpointLockState>,
    pub clock: LockClock,
    signatures_required: usize,
}

impl LockCandidate {
    /// A candidate for `request` with one empty outpoint state per input.
    pub fn new(request: LockRequest, now: Timestamp, signatures_required: usize) -> Self {
        let mut candidate = Self::empty(request.hash(), now, signatures_required);
        candidate.attach_request(request);
        candidate
    }

    /// A request-less anchor for orphan votes.
    pub fn empty(tx_hash: TxHash, now: Timestamp, signatures_required: usize) -> Self {
        Self {
            tx_hash,
            request: None,
            outpoint_locks: BTreeMap::new(),
            clock: LockClock::new(now),
            signatures_required,
        }
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    pub fn request(&self) -> Option<&LockRequest> {
        self.request.as_ref()
    }

    pub fn has_request(&self) -> bool {
        self.request.is_some()
    }

    /// Attach the request payload and track every input it spends.
    pub fn attach_request(&mut self, request: LockRequest) {
        for outpoint in request.transaction().spent_outpoints() {
            self.add_outpoint_lock(*outpoint);
        }
        self.request = Some(request);
    }

    /// Start tracking `outpoint`. No-op if already tracked.
    pub fn add_outpoint_lock(&mut self, outpoint: Outpoint) {
        let required = self.signatures_required;
        self.outpoint_locks
            .entry(outpoint)
            .or_insert_with(|| OutpointLockState::new(outpoint, required));
    }

    /// Route `vote` to its outpoint. Returns `false` for an untracked outpoint
    /// or a duplicate voter.
    pub fn add_vote(&mut self, vote: Vote) -> bool {
        match self.outpoint_locks.get_mut(&vote.outpoint) {
            Some(state) => state.add_vote(vote),
            None => false,
        }
    }

    pub fn mark_outpoint_attacked(&mut self, outpoint: &Outpoint) {
        if let Some(state) = self.outpoint_locks.get_mut(outpoint) {
            state.mark_attacked();
        }
    }

    /// True only when at least one outpoint is tracked and every one is ready.
    pub fn is_all_outpoints_ready(&self) -> bool {
        !self.outpoint_locks.is_empty() && self.outpoint_locks.values().all(|s| s.is_ready())
    }

    pub fn has_voter_voted(&self, outpoint: &Outpoint, voter: &VoterId) -> bool {
        self.outpoint_locks
            .get(outpoint)
            .is_some_and(|s| s.has_voted(voter))
    }

    /// Total votes across all outpoints. Informational only: completion is
    /// decided per outpoint by [`is_all_outpoints_ready`](Self::is_all_outpoints_ready).
    pub fn count_votes(&self) -> usize {
        self.outpoint_locks.values().map(|s| s.count_votes()).sum()
    }

    pub fn outpoints(&self) -> impl Iterator<Item = &Outpoint> {
        self.outpoint_locks.keys()
    }

    pub fn outpoint_lock(&self, outpoint: &Outpoint) -> Option<&OutpointLockState> {
        self.outpoint_locks.get(outpoint)
    }

    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.outpoint_locks.values().flat_map(|s| s.votes())
    }

    pub fn set_confirmation(&mut self, confirmation: Confirmation) {
        self.clock.confirmation = confirmation;
    }

    pub fn is_expired(&self, height: u32, params: &LockParams) -> bool {
        self.clock.is_expired(height, params)
    }

    pub fn is_timed_out(&self, now: Timestamp, params: &LockParams) -> bool {
        self.clock.is_timed_out(now, params)
    }
}

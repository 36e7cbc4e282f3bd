//! Storage trait for every index the lock manager owns.
//!
//! The manager depends only on [`LockStore`]; [`MemoryLockStore`] is the
//! in-memory implementation used by nodes and tests. All state is rebuilt
//! from chain re-sync, so there is no persistent backend.

use std::collections::{BTreeSet, HashMap};

use instalock_types::{Outpoint, TxHash};

use crate::candidate::LockCandidate;
use crate::orphan::OrphanVotes;
use crate::request::LockRequest;
use crate::vote::Vote;

/// Which request pool a lock request sits in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestPool {
    /// Accepted into the mempool; eligible for local voting.
    Accepted,
    /// Refused by the mempool or invalidated by a proven conflict.
    Rejected,
}

pub trait LockStore: Send {
    // --- candidates: tx hash -> candidate ---

    fn candidate(&self, tx_hash: &TxHash) -> Option<&LockCandidate>;
    fn candidate_mut(&mut self, tx_hash: &TxHash) -> Option<&mut LockCandidate>;
    fn insert_candidate(&mut self, candidate: LockCandidate);
    fn remove_candidate(&mut self, tx_hash: &TxHash) -> Option<LockCandidate>;
    fn candidate_hashes(&self) -> Vec<TxHash>;
    fn candidate_count(&self) -> usize;

    // --- flat vote index: vote hash -> vote ---

    fn vote(&self, vote_hash: &TxHash) -> Option<&Vote>;
    fn vote_mut(&mut self, vote_hash: &TxHash) -> Option<&mut Vote>;
    fn insert_vote(&mut self, vote_hash: TxHash, vote: Vote);
    fn remove_vote(&mut self, vote_hash: &TxHash) -> Option<Vote>;
    fn vote_hashes(&self) -> Vec<TxHash>;
    fn vote_count(&self) -> usize;

    // --- finalized locks: outpoint -> tx hash ---

    fn locked_outpoint(&self, outpoint: &Outpoint) -> Option<TxHash>;
    /// Record a lock. An existing lock on the outpoint is kept.
    fn lock_outpoint(&mut self, outpoint: Outpoint, tx_hash: TxHash);
    fn unlock_outpoint(&mut self, outpoint: &Outpoint) -> Option<TxHash>;
    fn locked_count(&self) -> usize;

    // --- voted outpoints: outpoint -> candidates holding a vote on it ---

    fn voted_candidates(&self, outpoint: &Outpoint) -> Vec<TxHash>;
    /// Add `tx_hash` to the outpoint's set; returns the resulting set size.
    fn add_voted_outpoint(&mut self, outpoint: Outpoint, tx_hash: TxHash) -> usize;
    /// Remove `tx_hash` from the outpoint's set, dropping the set once empty.
    fn remove_voted(&mut self, outpoint: &Outpoint, tx_hash: &TxHash);

    // --- request pools ---

    fn insert_request(&mut self, pool: RequestPool, request: LockRequest);
    fn request(&self, pool: RequestPool, tx_hash: &TxHash) -> Option<&LockRequest>;
    /// Drop `tx_hash` from both pools.
    fn forget_request(&mut self, tx_hash: &TxHash);

    // --- orphan votes and per-voter rate limits ---

    fn orphans(&self) -> &OrphanVotes;
    fn orphans_mut(&mut self) -> &mut OrphanVotes;
}

#[derive(Debug, Default)]
pub struct MemoryLockStore {
    candidates: HashMap<TxHash, LockCandidate>,
    votes: HashMap<TxHash, Vote>,
    locked_outpoints: HashMap<Outpoint, TxHash>,
    voted_outpoints: HashMap<Outpoint, BTreeSet<TxHash>>,
    accepted: HashMap<TxHash, LockRequest>,
    rejected: HashMap<TxHash, LockRequest>,
    orphans: OrphanVotes,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn pool(&self, pool: RequestPool) -> &HashMap<TxHash, LockRequest> {
        match pool {
            RequestPool::Accepted => &self.accepted,
            RequestPool::Rejected => &self.rejected,
        }
    }
}

impl LockStore for MemoryLockStore {
    fn candidate(&self, tx_hash: &TxHash) -> Option<&LockCandidate> {
        self.candidates.get(tx_hash)
    }

    fn candidate_mut(&mut self, tx_hash: &TxHash) -> Option<&mut LockCandidate> {
        self.candidates.get_mut(tx_hash)
    }

    fn insert_candidate(&mut self, candidate: LockCandidate) {
        self.candidates.insert(candidate.tx_hash(), candidate);
    }

    fn remove_candidate(&mut self, tx_hash: &TxHash) -> Option<LockCandidate> {
        self.candidates.remove(tx_hash)
    }

    fn candidate_hashes(&self) -> Vec<TxHash> {
        self.candidates.keys().copied().collect()
    }

    fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    fn vote(&self, vote_hash: &TxHash) -> Option<&Vote> {
        self.votes.get(vote_hash)
    }

    fn vote_mut(&mut self, vote_hash: &TxHash) -> Option<&mut Vote> {
        self.votes.get_mut(vote_hash)
    }

    fn insert_vote(&mut self, vote_hash: TxHash, vote: Vote) {
        self.votes.insert(vote_hash, vote);
    }

    fn remove_vote(&mut self, vote_hash: &TxHash) -> Option<Vote> {
        self.votes.remove(vote_hash)
    }

    fn vote_hashes(&self) -> Vec<TxHash> {
        self.votes.keys().copied().collect()
    }

    fn vote_count(&self) -> usize {
        self.votes.len()
    }

    fn locked_outpoint(&self, outpoint: &Outpoint) -> Option<TxHash> {
        self.locked_outpoints.get(outpoint).copied()
    }

    fn lock_outpoint(&mut self, outpoint: Outpoint, tx_hash: TxHash) {
        self.locked_outpoints.entry(outpoint).or_insert(tx_hash);
    }

    fn unlock_outpoint(&mut self, outpoint: &Outpoint) -> Option<TxHash> {
        self.locked_outpoints.remove(outpoint)
    }

    fn locked_count(&self) -> usize {
        self.locked_outpoints.len()
    }

    fn voted_candidates(&self, outpoint: &Outpoint) -> Vec<TxHash> {
        self.voted_outpoints
            .get(outpoint)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn add_voted_outpoint(&mut self, outpoint: Outpoint, tx_hash: TxHash) -> usize {
        let set = self.voted_outpoints.entry(outpoint).or_default();
        set.insert(tx_hash);
        set.len()
    }

    fn remove_voted(&mut self, outpoint: &Outpoint, tx_hash: &TxHash) {
        if let Some(set) = self.voted_outpoints.get_mut(outpoint) {
            set.remove(tx_hash);
            if set.is_empty() {
                self.voted_outpoints.remove(outpoint);
            }
        }
    }

    fn insert_request(&mut self, pool: RequestPool, request: LockRequest) {
        let map = match pool {
            RequestPool::Accepted => &mut self.accepted,
            RequestPool::Rejected => &mut self.rejected,
        };
        map.insert(request.hash(), request);
    }

    fn request(&self, pool: RequestPool, tx_hash: &TxHash) -> Option<&LockRequest> {
        self.pool(pool).get(tx_hash)
    }

    fn forget_request(&mut self, tx_hash: &TxHash) {
        self.accepted.remove(tx_hash);
        self.rejected.remove(tx_hash);
    }

    fn orphans(&self) -> &OrphanVotes {
        &self.orphans
    }

    fn orphans_mut(&mut self) -> &mut OrphanVotes {
        &mut self.orphans
    }
}

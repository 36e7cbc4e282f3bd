//! Per-outpoint vote collection.

use std::collections::HashMap;

use instalock_types::{Outpoint, VoterId};

use crate::vote::Vote;

/// Votes endorsing the lock of one outpoint under one candidate transaction.
///
/// At most one vote per voter is kept; the first one wins. Once marked
/// attacked the outpoint can never become ready again.
#[derive(Clone, Debug)]
pub struct OutpointLockState {
    outpoint: Outpoint,
    votes: HashMap<VoterId, Vote>,
    attacked: bool,
    signatures_required: usize,
}

impl OutpointLockState {
    pub fn new(outpoint: Outpoint, signatures_required: usize) -> Self {
        Self {
            outpoint,
            votes: HashMap::new(),
            attacked: false,
            signatures_required,
        }
    }

    pub fn outpoint(&self) -> &Outpoint {
        &self.outpoint
    }

    /// Record `vote`. Returns `false`, leaving state untouched, if its voter
    /// already has a vote here.
    pub fn add_vote(&mut self, vote: Vote) -> bool {
        if self.votes.contains_key(&vote.voter) {
            return false;
        }
        self.votes.insert(vote.voter, vote);
        true
    }

    pub fn has_voted(&self, voter: &VoterId) -> bool {
        self.votes.contains_key(voter)
    }

    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub fn count_votes(&self) -> usize {
        self.votes.len()
    }

    pub fn is_ready(&self) -> bool {
        !self.attacked && self.votes.len() >= self.signatures_required
    }

    pub fn mark_attacked(&mut self) {
        self.attacked = true;
    }

    pub fn is_attacked(&self) -> bool {
        self.attacked
    }
}

//! Equivocation bookkeeping: voters that endorse one outpoint for two transactions.
//!
//! A voter may sign each outpoint exactly once. Seeing its signature on the
//! same outpoint under two different lock candidates is provable
//! misbehaviour: the outpoint is vetoed in both candidates and the voter is
//! penalized. The manager detects the conflict through its voted-outpoint
//! index; this log remembers which conflicts were already punished so a
//! replayed vote cannot trigger a second penalty for the same pair.

use std::collections::HashMap;

use instalock_types::{Outpoint, Timestamp, TxHash, VoterId};

/// Evidence that `voter` signed `outpoint` for two different transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquivocationProof {
    pub voter: VoterId,
    pub outpoint: Outpoint,
    /// Transaction the voter endorsed first.
    pub first: TxHash,
    /// Conflicting transaction endorsed later.
    pub second: TxHash,
    pub detected_at: Timestamp,
}

type ConflictKey = (VoterId, Outpoint, TxHash, TxHash);

fn conflict_key(voter: &VoterId, outpoint: &Outpoint, a: TxHash, b: TxHash) -> ConflictKey {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    (*voter, *outpoint, low, high)
}

#[derive(Debug, Default)]
pub struct EquivocationLog {
    proofs: HashMap<ConflictKey, EquivocationProof>,
}

impl EquivocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a conflict between `existing` and `incoming`.
    ///
    /// Returns the proof the first time this (voter, outpoint, transaction
    /// pair) is seen, in either order; `None` afterwards.
    pub fn record(
        &mut self,
        voter: &VoterId,
        outpoint: &Outpoint,
        existing: TxHash,
        incoming: TxHash,
        now: Timestamp,
    ) -> Option<EquivocationProof> {
        if existing == incoming {
            return None;
        }
        let key = conflict_key(voter, outpoint, existing, incoming);
        if self.proofs.contains_key(&key) {
            return None;
        }
        let proof = EquivocationProof {
            voter: *voter,
            outpoint: *outpoint,
            first: existing,
            second: incoming,
            detected_at: now,
        };
        self.proofs.insert(key, proof.clone());
        Some(proof)
    }

    pub fn has_equivocated(&self, voter: &VoterId) -> bool {
        self.proofs.keys().any(|(v, ..)| v == voter)
    }

    pub fn proofs(&self) -> impl Iterator<Item = &EquivocationProof> {
        self.proofs.values()
    }

    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }

    /// Forget proofs detected more than `keep_secs` before `now`.
    pub fn prune(&mut self, now: Timestamp, keep_secs: u64) -> usize {
        let before = self.proofs.len();
        self.proofs
            .retain(|_, proof| proof.detected_at.elapsed_since(now) <= keep_secs);
        before - self.proofs.len()
    }
}

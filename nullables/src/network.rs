//! Nullable relay and lock listener: record outbound calls without sending them.

use std::sync::Mutex;

use instalock_consensus::{LockListener, Relay, Vote};
use instalock_types::{Transaction, TxHash};

use crate::lock;

/// A relay that records every vote and transaction it is asked to gossip.
#[derive(Default)]
pub struct NullRelay {
    votes: Mutex<Vec<Vote>>,
    transactions: Mutex<Vec<Transaction>>,
}

impl NullRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relayed_votes(&self) -> Vec<Vote> {
        lock(&self.votes).clone()
    }

    pub fn relayed_transactions(&self) -> Vec<Transaction> {
        lock(&self.transactions).clone()
    }

    pub fn reset(&self) {
        lock(&self.votes).clear();
        lock(&self.transactions).clear();
    }
}

impl Relay for NullRelay {
    fn relay_vote(&self, vote: &Vote) {
        lock(&self.votes).push(vote.clone());
    }

    fn relay_transaction(&self, tx: &Transaction) {
        lock(&self.transactions).push(tx.clone());
    }
}

/// Records the hash of every transaction reported as locked.
#[derive(Default)]
pub struct NullListener {
    locked: Mutex<Vec<TxHash>>,
}

impl NullListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locked(&self) -> Vec<TxHash> {
        lock(&self.locked).clone()
    }
}

impl LockListener for NullListener {
    fn transaction_locked(&self, tx: &Transaction) {
        lock(&self.locked).push(tx.hash());
    }
}

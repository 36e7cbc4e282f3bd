//! Votes that arrived before their transaction, plus per-voter spam limits.
//!
//! Voters routinely gossip votes ahead of the lock request, so an early vote
//! is buffered rather than dropped. To keep a single voter from filling the
//! buffer, each voter gets an expiry timestamp that is refreshed with every
//! orphan it sends; a voter whose pending expiry is still in the future and
//! later than the network-wide average is sending faster than everyone else
//! and is throttled.

use std::collections::HashMap;

use instalock_types::{LockParams, Outpoint, Timestamp, TxHash, VoterId};

use crate::vote::Vote;

#[derive(Clone, Debug, Default)]
pub struct OrphanVotes {
    /// Vote hash -> vote.
    votes: HashMap<TxHash, Vote>,
    /// Voter -> time its orphan rate-limit entry lapses.
    voter_expiry: HashMap<VoterId, Timestamp>,
}

impl OrphanVotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, vote_hash: &TxHash) -> bool {
        self.votes.contains_key(vote_hash)
    }

    pub fn get(&self, vote_hash: &TxHash) -> Option<&Vote> {
        self.votes.get(vote_hash)
    }

    pub fn insert(&mut self, vote_hash: TxHash, vote: Vote) {
        self.votes.insert(vote_hash, vote);
    }

    pub fn remove(&mut self, vote_hash: &TxHash) -> Option<Vote> {
        self.votes.remove(vote_hash)
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Hashes of orphan votes for `tx_hash`.
    pub fn hashes_for_tx(&self, tx_hash: &TxHash) -> Vec<TxHash> {
        self.votes
            .iter()
            .filter(|(_, v)| v.tx_hash == *tx_hash)
            .map(|(h, _)| *h)
            .collect()
    }

    pub fn all_hashes(&self) -> Vec<TxHash> {
        self.votes.keys().copied().collect()
    }

    /// Number of orphan votes for (`tx_hash`, `outpoint`), counting no further than `limit`.
    pub fn count_for(&self, tx_hash: &TxHash, outpoint: &Outpoint, limit: usize) -> usize {
        self.votes
            .values()
            .filter(|v| v.tx_hash == *tx_hash && v.outpoint == *outpoint)
            .take(limit)
            .count()
    }

    /// Average of all voter expiry timestamps; `None` when no voter is tracked.
    pub fn average_voter_expiry(&self) -> Option<Timestamp> {
        if self.voter_expiry.is_empty() {
            return None;
        }
        let total: u128 = self
            .voter_expiry
            .values()
            .map(|t| u128::from(t.as_secs()))
            .sum();
        let average = total / self.voter_expiry.len() as u128;
        Some(Timestamp::new(average as u64))
    }

    /// Rate-limit bookkeeping for one orphan vote from `voter`.
    ///
    /// Returns `false` if the voter is sending orphans faster than the
    /// network average; its entry is then left untouched. Otherwise the
    /// entry is (re)set to `now + orphan_voter_keep_secs`.
    pub fn admit_voter(&mut self, voter: &VoterId, now: Timestamp, params: &LockParams) -> bool {
        let expires = now.plus_secs(params.orphan_voter_keep_secs);
        if let Some(previous) = self.voter_expiry.get(voter).copied() {
            let average = self.average_voter_expiry().unwrap_or(Timestamp::EPOCH);
            if previous > now && previous > average {
                return false;
            }
        }
        self.voter_expiry.insert(*voter, expires);
        true
    }

    pub fn voter_expiry(&self, voter: &VoterId) -> Option<Timestamp> {
        self.voter_expiry.get(voter).copied()
    }

    pub fn tracked_voters(&self) -> usize {
        self.voter_expiry.len()
    }

    /// Drop rate-limit entries that lapsed before `now`.
    pub fn prune_voters(&mut self, now: Timestamp) -> Vec<VoterId> {
        let lapsed: Vec<VoterId> = self
            .voter_expiry
            .iter()
            .filter(|(_, expires)| **expires < now)
            .map(|(voter, _)| *voter)
            .collect();
        for voter in &lapsed {
            self.voter_expiry.remove(voter);
        }
        lapsed
    }

    /// Remove orphan votes older than the lock timeout.
    pub fn remove_timed_out(&mut self, now: Timestamp, params: &LockParams) -> Vec<(TxHash, Vote)> {
        let timed_out: Vec<TxHash> = self
            .votes
            .iter()
            .filter(|(_, v)| v.is_timed_out(now, params))
            .map(|(h, _)| *h)
            .collect();
        timed_out
            .into_iter()
            .filter_map(|h| self.votes.remove(&h).map(|v| (h, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voter(byte: u8) -> VoterId {
        VoterId::new(Outpoint::new(TxHash::new([byte; 32]), 0))
    }

    fn orphan(tx: u8, voter_byte: u8, at: u64) -> Vote {
        Vote::new(
            TxHash::new([tx; 32]),
            Outpoint::new(TxHash::new([50; 32]), 0),
            voter(voter_byte),
            Timestamp::new(at),
        )
    }

    #[test]
    fn first_orphan_always_admitted() {
        let mut orphans = OrphanVotes::new();
        assert!(orphans.admit_voter(&voter(1), Timestamp::new(1000), &LockParams::default()));
        assert_eq!(orphans.voter_expiry(&voter(1)), Some(Timestamp::new(1600)));
    }

    #[test]
    fn lone_voter_is_not_above_its_own_average() {
        let mut orphans = OrphanVotes::new();
        let params = LockParams::default();
        orphans.admit_voter(&voter(1), Timestamp::new(1000), &params);
        assert!(orphans.admit_voter(&voter(1), Timestamp::new(1001), &params));
        assert_eq!(orphans.voter_expiry(&voter(1)), Some(Timestamp::new(1601)));
    }

    #[test]
    fn voter_faster_than_average_is_throttled() {
        let mut orphans = OrphanVotes::new();
        let params = LockParams::default();
        orphans.admit_voter(&voter(1), Timestamp::new(1000), &params);
        orphans.admit_voter(&voter(2), Timestamp::new(1000), &params);
        // voter 2 refreshes later, pushing its expiry above the average
        orphans.admit_voter(&voter(2), Timestamp::new(1100), &params);
        assert!(!orphans.admit_voter(&voter(2), Timestamp::new(1101), &params));
        assert_eq!(orphans.voter_expiry(&voter(2)), Some(Timestamp::new(1700)));
        assert!(orphans.admit_voter(&voter(1), Timestamp::new(1101), &params));
    }

    #[test]
    fn lapsed_entry_allows_refresh() {
        let mut orphans = OrphanVotes::new();
        let params = LockParams::default();
        orphans.admit_voter(&voter(1), Timestamp::new(0), &params);
        orphans.admit_voter(&voter(2), Timestamp::new(1000), &params);
        assert!(orphans.admit_voter(&voter(2), Timestamp::new(1700), &params));
    }

    #[test]
    fn prune_drops_lapsed_voters() {
        let mut orphans = OrphanVotes::new();
        let params = LockParams::default();
        orphans.admit_voter(&voter(1), Timestamp::new(0), &params);
        orphans.admit_voter(&voter(2), Timestamp::new(500), &params);
        assert_eq!(orphans.prune_voters(Timestamp::new(700)), vec![voter(1)]);
        assert_eq!(orphans.tracked_voters(), 1);
    }

    #[test]
    fn count_for_respects_limit() {
        let mut orphans = OrphanVotes::new();
        for v in 1..=4 {
            let vote = orphan(1, v, 0);
            orphans.insert(vote.hash(), vote);
        }
        let outpoint = Outpoint::new(TxHash::new([50; 32]), 0);
        assert_eq!(orphans.count_for(&TxHash::new([1; 32]), &outpoint, 10), 4);
        assert_eq!(orphans.count_for(&TxHash::new([1; 32]), &outpoint, 2), 2);
        assert_eq!(orphans.count_for(&TxHash::new([2; 32]), &outpoint, 10), 0);
    }

    #[test]
    fn timed_out_orphans_removed() {
        let mut orphans = OrphanVotes::new();
        let old = orphan(1, 1, 0);
        let fresh = orphan(1, 2, 100);
        orphans.insert(old.hash(), old.clone());
        orphans.insert(fresh.hash(), fresh);
        let removed = orphans.remove_timed_out(Timestamp::new(110), &LockParams::default());
        assert_eq!(removed, vec![(old.hash(), old)]);
        assert_eq!(orphans.len(), 1);
    }
}

//! Nullable voter registry.

use std::collections::HashMap;
use std::sync::Mutex;

use instalock_consensus::{VoterInfo, VoterRegistry};
use instalock_types::{PublicKey, VoterId};

use crate::lock;

struct Entry {
    public_key: PublicKey,
    rank: Option<u32>,
}

/// A fixed voter list with preset ranks.
///
/// Ranks do not depend on height; the last height asked for is recorded so
/// tests can check the rank-height offset. Starts synced.
pub struct NullVoterRegistry {
    voters: Mutex<HashMap<VoterId, Entry>>,
    synced: Mutex<bool>,
    asked_for: Mutex<Vec<VoterId>>,
    penalized: Mutex<Vec<VoterId>>,
    last_rank_height: Mutex<Option<u32>>,
}

impl NullVoterRegistry {
    pub fn new() -> Self {
        Self {
            voters: Mutex::new(HashMap::new()),
            synced: Mutex::new(true),
            asked_for: Mutex::new(Vec::new()),
            penalized: Mutex::new(Vec::new()),
            last_rank_height: Mutex::new(None),
        }
    }

    pub fn add_voter(&self, voter: VoterId, public_key: PublicKey, rank: u32) {
        lock(&self.voters).insert(
            voter,
            Entry {
                public_key,
                rank: Some(rank),
            },
        );
    }

    /// Change a known voter's rank; `None` makes it unrankable.
    pub fn set_rank(&self, voter: &VoterId, rank: Option<u32>) {
        if let Some(entry) = lock(&self.voters).get_mut(voter) {
            entry.rank = rank;
        }
    }

    pub fn set_synced(&self, synced: bool) {
        *lock(&self.synced) = synced;
    }

    /// Voters whose announcement was requested, in order.
    pub fn asked_for(&self) -> Vec<VoterId> {
        lock(&self.asked_for).clone()
    }

    /// Voters penalized, one entry per call.
    pub fn penalized(&self) -> Vec<VoterId> {
        lock(&self.penalized).clone()
    }

    pub fn last_rank_height(&self) -> Option<u32> {
        *lock(&self.last_rank_height)
    }
}

impl Default for NullVoterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VoterRegistry for NullVoterRegistry {
    fn is_synced(&self) -> bool {
        *lock(&self.synced)
    }

    fn voter_info(&self, voter: &VoterId) -> Option<VoterInfo> {
        lock(&self.voters).get(voter).map(|entry| VoterInfo {
            public_key: entry.public_key.clone(),
        })
    }

    fn rank(&self, voter: &VoterId, height: u32, _min_protocol: u32) -> Option<u32> {
        *lock(&self.last_rank_height) = Some(height);
        lock(&self.voters).get(voter).and_then(|entry| entry.rank)
    }

    fn ask_for_voter(&self, voter: &VoterId) {
        lock(&self.asked_for).push(*voter);
    }

    fn penalize(&self, voter: &VoterId) {
        lock(&self.penalized).push(*voter);
    }
}

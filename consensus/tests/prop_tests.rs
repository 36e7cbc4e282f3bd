mod common;

use std::collections::{HashMap, HashSet};

use common::*;
use instalock_consensus::{OutpointLockState, Vote};
use instalock_types::{Outpoint, Timestamp, TxHash, VoterId};
use proptest::prelude::*;

fn unsigned_vote(voter: u8) -> Vote {
    Vote::new(
        TxHash::new([7; 32]),
        input(1),
        VoterId::new(Outpoint::new(TxHash::new([voter; 32]), 0)),
        Timestamp::new(0),
    )
}

proptest! {
    /// Each voter counts once, no matter how often it votes.
    #[test]
    fn outpoint_counts_distinct_voters(voters in prop::collection::vec(0u8..8, 0..30)) {
        let mut state = OutpointLockState::new(input(1), THRESHOLD);
        let mut seen = HashSet::new();
        for voter in voters {
            prop_assert_eq!(state.add_vote(unsigned_vote(voter)), seen.insert(voter));
        }
        prop_assert_eq!(state.count_votes(), seen.len());
        prop_assert_eq!(state.is_ready(), seen.len() >= THRESHOLD);
    }

    /// An attacked outpoint stays unready whatever arrives afterwards.
    #[test]
    fn attacked_outpoint_never_ready(
        before in prop::collection::vec(0u8..10, 0..10),
        after in prop::collection::vec(0u8..10, 0..20),
    ) {
        let mut state = OutpointLockState::new(input(1), THRESHOLD);
        for voter in before {
            state.add_vote(unsigned_vote(voter));
        }
        state.mark_attacked();
        for voter in after {
            state.add_vote(unsigned_vote(voter));
            prop_assert!(!state.is_ready());
        }
        prop_assert!(!state.is_ready());
    }
}

/// Every (voter, input) pair for voters `1..=7` and inputs 1 and 2.
fn all_pairs() -> Vec<(u8, u8)> {
    (1..=7u8).flat_map(|v| [(v, 1), (v, 2)]).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A transaction locks exactly when every input has reached the quorum,
    /// independent of arrival order.
    #[test]
    fn locks_iff_every_input_has_quorum(
        pairs in prop::sample::subsequence(all_pairs(), 0..=14).prop_shuffle()
    ) {
        let env = env();
        let voters = register_voters(&env, 7);
        fund(&env, input(1));
        fund(&env, input(2));
        let req = request(&[input(1), input(2)], 0);
        let hash = req.hash();
        let now = Timestamp::new(1_000_000);
        let mut mgr = manager(&env);
        mgr.receive_lock_request(req, true, now);

        let mut per_input: HashMap<u8, usize> = HashMap::new();
        for (voter, n) in &pairs {
            let vote = voters[usize::from(*voter) - 1].vote(hash, input(*n), now);
            mgr.handle_vote_message(vote, now);
            *per_input.entry(*n).or_default() += 1;
        }

        let expected = [1u8, 2].iter().all(|n| per_input.get(n).copied().unwrap_or(0) >= THRESHOLD);
        prop_assert_eq!(mgr.is_locked_transaction(&hash), expected);
        prop_assert_eq!(env.listener.locked().len(), usize::from(expected));
        prop_assert_eq!(mgr.locked_outpoint(&input(1)).is_some(), expected);
    }
}

//! Shared fixtures for the consensus integration tests.
#![allow(dead_code)]

use instalock_consensus::{LockConfig, LockManager, LockRequest, Vote};
use instalock_crypto::keypair_from_seed;
use instalock_nullables::{NullClock, NullEnv};
use instalock_types::{
    Amount, KeyPair, LockParams, Outpoint, Timestamp, Transaction, TxHash, TxIn, TxOut, VoterId,
};

pub const TIP: u32 = 1_000;
pub const COIN: u64 = 100_000_000;
pub const THRESHOLD: usize = 5;

pub struct TestVoter {
    pub id: VoterId,
    pub keys: KeyPair,
}

impl TestVoter {
    /// Voter `n`, with a collateral outpoint that never collides with [`input`].
    pub fn new(n: u8) -> Self {
        Self {
            id: VoterId::new(Outpoint::new(TxHash::new([n; 32]), 1_000)),
            keys: keypair_from_seed(&[n; 32]),
        }
    }

    pub fn vote(&self, tx_hash: TxHash, outpoint: Outpoint, now: Timestamp) -> Vote {
        let mut vote = Vote::new(tx_hash, outpoint, self.id, now);
        vote.sign(&self.keys).expect("sign");
        vote
    }
}

pub fn input(n: u8) -> Outpoint {
    Outpoint::new(TxHash::new([n; 32]), 0)
}

pub fn config() -> LockConfig {
    LockConfig {
        params: LockParams {
            signatures_required: THRESHOLD,
            ..LockParams::default()
        },
        ..LockConfig::default()
    }
}

/// A synced environment at [`TIP`].
pub fn env() -> NullEnv {
    NullEnv::new(TIP)
}

/// Register voters `1..=count` with rank equal to their number.
pub fn register_voters(env: &NullEnv, count: u8) -> Vec<TestVoter> {
    (1..=count)
        .map(|n| {
            let voter = TestVoter::new(n);
            env.voters
                .add_voter(voter.id, voter.keys.public.clone(), u32::from(n));
            voter
        })
        .collect()
}

/// A one-coin output, confirmed well past the minimum input age.
pub fn fund(env: &NullEnv, outpoint: Outpoint) {
    env.chain.add_utxo(outpoint, TIP - 10, Amount::new(COIN));
}

/// A request spending `inputs` (one coin each) with a fee of `fee` units.
/// `tag` varies the output script so two requests over the same inputs differ.
pub fn request_with_fee(inputs: &[Outpoint], fee: u64, tag: u8) -> LockRequest {
    let value_in = COIN * inputs.len() as u64;
    LockRequest::new(Transaction::new(
        inputs.iter().map(|o| TxIn::new(*o)).collect(),
        vec![TxOut::new(Amount::new(value_in - fee), vec![tag])],
    ))
}

pub fn request(inputs: &[Outpoint], tag: u8) -> LockRequest {
    request_with_fee(inputs, 100_000, tag)
}

pub fn manager(env: &NullEnv) -> LockManager {
    LockManager::new(config(), env.collaborators())
}

pub fn clock() -> NullClock {
    NullClock::new(1_000_000)
}

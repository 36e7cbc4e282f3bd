//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the lock manager consumes (chain view, mempool, voter
//! list, relay, lock listener) has a test-friendly implementation here that:
//! - returns values set up programmatically by the test
//! - records outbound calls for assertions
//! - never touches the network or a real chain
//!
//! [`NullEnv`] bundles one of each and hands out a
//! [`Collaborators`](instalock_consensus::Collaborators) for the manager.

use std::sync::{Arc, Mutex, MutexGuard};

use instalock_consensus::Collaborators;

pub mod chain;
pub mod clock;
pub mod network;
pub mod voters;

pub use chain::{NullChain, NullMempool};
pub use clock::NullClock;
pub use network::{NullListener, NullRelay};
pub use voters::NullVoterRegistry;

/// Lock a mutex, recovering the data if a panicking test poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One nullable of each collaborator, shared with the manager through `Arc`s.
#[derive(Clone)]
pub struct NullEnv {
    pub chain: Arc<NullChain>,
    pub mempool: Arc<NullMempool>,
    pub voters: Arc<NullVoterRegistry>,
    pub relay: Arc<NullRelay>,
    pub listener: Arc<NullListener>,
}

impl NullEnv {
    /// A synced environment with the chain tip at `height`.
    pub fn new(height: u32) -> Self {
        Self {
            chain: Arc::new(NullChain::new(height)),
            mempool: Arc::new(NullMempool::new()),
            voters: Arc::new(NullVoterRegistry::new()),
            relay: Arc::new(NullRelay::new()),
            listener: Arc::new(NullListener::new()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            chain: self.chain.clone(),
            mempool: self.mempool.clone(),
            voters: self.voters.clone(),
            relay: self.relay.clone(),
            listener: self.listener.clone(),
        }
    }
}

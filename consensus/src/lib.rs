//! Consensus: quorum-based transaction locking.
//!
//! A lock request proposes a transaction. The top-ranked voters for each of
//! its inputs sign a vote binding (transaction, outpoint, voter). Once every
//! input has gathered enough distinct votes, the manager resolves conflicts
//! against the mempool and chain and finalizes the lock, so wallets can treat
//! the transaction as confirmed before it is mined.
//!
//! ## Module overview
//!
//! - [`outpoint_lock`]: votes for one input, with duplicate and attack vetoes.
//! - [`candidate`]: per-transaction aggregate of outpoint lock states.
//! - [`vote`]: the signed endorsement and its validity checks.
//! - [`request`]: the proposed transaction and its protocol checks.
//! - [`lifecycle`]: the Expired / Failed / TimedOut clocks.
//! - [`orphan`]: early votes and per-voter orphan rate limits.
//! - [`equivocation`]: proofs of voters signing one outpoint twice.
//! - [`store`]: the index storage trait and its in-memory backend.
//! - [`manager`]: the orchestrator.
//! - [`collaborators`]: traits for the chain, mempool, voter list, relay and listener.

pub mod candidate;
pub mod collaborators;
pub mod config;
pub mod equivocation;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod orphan;
pub mod outpoint_lock;
pub mod request;
pub mod store;
pub mod vote;

pub use candidate::LockCandidate;
pub use collaborators::{
    ChainView, Coin, Collaborators, LockListener, MempoolView, Relay, VoterInfo, VoterRegistry,
};
pub use config::LockConfig;
pub use equivocation::{EquivocationLog, EquivocationProof};
pub use error::{ConsensusError, RequestRejection, VoteRejection};
pub use lifecycle::{Confirmation, Lifecycle, LockClock};
pub use manager::{LocalVoter, LockManager, LockSignatures, LockSummary, SweepReport, VoteOutcome};
pub use orphan::OrphanVotes;
pub use outpoint_lock::OutpointLockState;
pub use request::LockRequest;
pub use store::{LockStore, MemoryLockStore, RequestPool};
pub use vote::Vote;

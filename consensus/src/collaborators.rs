//! External collaborators consumed by the lock manager.
//!
//! The P2P layer, the voter list, the UTXO view, the mempool and the wallet
//! live outside this crate. Each is reached through one narrow trait so the
//! manager can be driven by real services in a node and by the
//! `instalock-nullables` doubles in tests.

use std::sync::Arc;

use instalock_types::{Amount, BlockHash, Outpoint, PublicKey, Transaction, TxHash, VoterId};

use crate::vote::Vote;

/// An unspent output as seen by the chain-state view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    /// Height of the block that created the output.
    pub height: u32,
    pub value: Amount,
    pub script_pubkey: Vec<u8>,
}

/// Read access to the active chain and its UTXO set.
pub trait ChainView: Send + Sync {
    /// Height of the active tip.
    fn height(&self) -> u32;

    /// The output behind `outpoint`, if it is still unspent.
    fn utxo(&self, outpoint: &Outpoint) -> Option<Coin>;

    /// Whether `tx` passes absolute and relative lock-time finality at the tip.
    fn is_final(&self, tx: &Transaction) -> bool;

    /// The block that mined `tx_hash`, if any.
    fn containing_block(&self, tx_hash: &TxHash) -> Option<BlockHash>;

    /// Set while a large-work fork or invalid chain is visible; lock reporting is suppressed.
    fn fork_warning(&self) -> bool {
        false
    }
}

/// Read access to pending transactions.
pub trait MempoolView: Send + Sync {
    /// Hash of the mempool transaction spending `outpoint`, if any.
    fn spender_of(&self, outpoint: &Outpoint) -> Option<TxHash>;
}

/// Public data the voter list knows about one voter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoterInfo {
    pub public_key: PublicKey,
}

/// The deterministic voter list.
pub trait VoterRegistry: Send + Sync {
    /// Whether the local view of the voter list has finished syncing.
    fn is_synced(&self) -> bool;

    fn voter_info(&self, voter: &VoterId) -> Option<VoterInfo>;

    /// 1-based rank of `voter` among voters running at least `min_protocol`
    /// at `height`, or `None` if it cannot be ranked.
    fn rank(&self, voter: &VoterId, height: u32, min_protocol: u32) -> Option<u32>;

    /// Ask peers for the announcement of an unknown voter.
    fn ask_for_voter(&self, voter: &VoterId);

    /// Apply the maximum misbehaviour score to `voter`.
    fn penalize(&self, voter: &VoterId);
}

/// Outbound gossip.
pub trait Relay: Send + Sync {
    fn relay_vote(&self, vote: &Vote);
    fn relay_transaction(&self, tx: &Transaction);
}

/// Receives finalized locks (wallet, UI, notification hooks).
pub trait LockListener: Send + Sync {
    fn transaction_locked(&self, tx: &Transaction);
}

/// Every collaborator the manager needs, bundled for injection.
#[derive(Clone)]
pub struct Collaborators {
    pub chain: Arc<dyn ChainView>,
    pub mempool: Arc<dyn MempoolView>,
    pub voters: Arc<dyn VoterRegistry>,
    pub relay: Arc<dyn Relay>,
    pub listener: Arc<dyn LockListener>,
}

//! Nullable chain view and mempool.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use instalock_consensus::{ChainView, Coin, MempoolView};
use instalock_types::{Amount, BlockHash, Outpoint, Transaction, TxHash};

use crate::lock;

/// An in-memory UTXO set and tip height.
///
/// Every transaction is final unless marked otherwise with
/// [`mark_non_final`](Self::mark_non_final).
pub struct NullChain {
    height: Mutex<u32>,
    utxos: Mutex<HashMap<Outpoint, Coin>>,
    non_final: Mutex<HashSet<TxHash>>,
    mined: Mutex<HashMap<TxHash, BlockHash>>,
    fork_warning: Mutex<bool>,
}

impl NullChain {
    pub fn new(height: u32) -> Self {
        Self {
            height: Mutex::new(height),
            utxos: Mutex::new(HashMap::new()),
            non_final: Mutex::new(HashSet::new()),
            mined: Mutex::new(HashMap::new()),
            fork_warning: Mutex::new(false),
        }
    }

    pub fn set_height(&self, height: u32) {
        *lock(&self.height) = height;
    }

    /// Add an unspent output created at `height`.
    pub fn add_utxo(&self, outpoint: Outpoint, height: u32, value: Amount) {
        lock(&self.utxos).insert(
            outpoint,
            Coin {
                height,
                value,
                script_pubkey: Vec::new(),
            },
        );
    }

    pub fn spend(&self, outpoint: &Outpoint) {
        lock(&self.utxos).remove(outpoint);
    }

    pub fn mark_non_final(&self, tx_hash: TxHash) {
        lock(&self.non_final).insert(tx_hash);
    }

    /// Record `tx_hash` as included in `block`.
    pub fn mine(&self, tx_hash: TxHash, block: BlockHash) {
        lock(&self.mined).insert(tx_hash, block);
    }

    pub fn set_fork_warning(&self, warning: bool) {
        *lock(&self.fork_warning) = warning;
    }
}

impl ChainView for NullChain {
    fn height(&self) -> u32 {
        *lock(&self.height)
    }

    fn utxo(&self, outpoint: &Outpoint) -> Option<Coin> {
        lock(&self.utxos).get(outpoint).cloned()
    }

    fn is_final(&self, tx: &Transaction) -> bool {
        !lock(&self.non_final).contains(&tx.hash())
    }

    fn containing_block(&self, tx_hash: &TxHash) -> Option<BlockHash> {
        lock(&self.mined).get(tx_hash).copied()
    }

    fn fork_warning(&self) -> bool {
        *lock(&self.fork_warning)
    }
}

/// A mempool reduced to its next-spend index.
#[derive(Default)]
pub struct NullMempool {
    spenders: Mutex<HashMap<Outpoint, TxHash>>,
}

impl NullMempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `tx_hash` as the pending spender of `outpoint`.
    pub fn add_spender(&self, outpoint: Outpoint, tx_hash: TxHash) {
        lock(&self.spenders).insert(outpoint, tx_hash);
    }

    pub fn remove_spender(&self, outpoint: &Outpoint) {
        lock(&self.spenders).remove(outpoint);
    }
}

impl MempoolView for NullMempool {
    fn spender_of(&self, outpoint: &Outpoint) -> Option<TxHash> {
        lock(&self.spenders).get(outpoint).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instalock_types::{TxIn, TxOut};

    fn outpoint(byte: u8) -> Outpoint {
        Outpoint::new(TxHash::new([byte; 32]), 0)
    }

    #[test]
    fn utxo_lifecycle() {
        let chain = NullChain::new(100);
        assert!(chain.utxo(&outpoint(1)).is_none());
        chain.add_utxo(outpoint(1), 90, Amount::new(5));
        let coin = chain.utxo(&outpoint(1)).expect("added");
        assert_eq!(coin.height, 90);
        assert_eq!(coin.value, Amount::new(5));
        chain.spend(&outpoint(1));
        assert!(chain.utxo(&outpoint(1)).is_none());
    }

    #[test]
    fn finality_and_mining() {
        let chain = NullChain::new(100);
        let tx = Transaction::new(
            vec![TxIn::new(outpoint(1))],
            vec![TxOut::new(Amount::new(1), Vec::new())],
        );
        assert!(chain.is_final(&tx));
        chain.mark_non_final(tx.hash());
        assert!(!chain.is_final(&tx));

        assert!(chain.containing_block(&tx.hash()).is_none());
        chain.mine(tx.hash(), BlockHash::new([3; 32]));
        assert_eq!(chain.containing_block(&tx.hash()), Some(BlockHash::new([3; 32])));
    }

    #[test]
    fn mempool_spenders() {
        let mempool = NullMempool::new();
        mempool.add_spender(outpoint(1), TxHash::new([9; 32]));
        assert_eq!(mempool.spender_of(&outpoint(1)), Some(TxHash::new([9; 32])));
        mempool.remove_spender(&outpoint(1));
        assert!(mempool.spender_of(&outpoint(1)).is_none());
    }
}

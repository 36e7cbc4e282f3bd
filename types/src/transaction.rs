//! The transaction shape carried by a lock request.
//!
//! Only the fields the locking protocol reads are modelled: the spent
//! outpoints, the created outputs and the lock-time fields consulted by the
//! external finality check.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::hash::TxHash;
use crate::outpoint::Outpoint;

type Blake2b256 = Blake2b<U32>;

/// A transaction input spending `prevout`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: Outpoint,
    pub sequence: u32,
}

impl TxIn {
    pub fn new(prevout: Outpoint) -> Self {
        Self {
            prevout,
            sequence: u32::MAX,
        }
    }
}

/// A transaction output paying `value` to `script_pubkey`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: Amount,
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    pub fn new(value: Amount, script_pubkey: Vec<u8>) -> Self {
        Self {
            value,
            script_pubkey,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub lock_time: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

impl Transaction {
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self {
            version: 1,
            lock_time: 0,
            inputs,
            outputs,
        }
    }

    /// Blake2b-256 over the canonical little-endian encoding of every field.
    pub fn hash(&self) -> TxHash {
        let mut hasher = Blake2b256::new();
        hasher.update(self.version.to_le_bytes());
        hasher.update(self.lock_time.to_le_bytes());
        hasher.update((self.inputs.len() as u64).to_le_bytes());
        for input in &self.inputs {
            hasher.update(input.prevout.to_bytes());
            hasher.update(input.sequence.to_le_bytes());
        }
        hasher.update((self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            hasher.update(output.value.units().to_le_bytes());
            hasher.update((output.script_pubkey.len() as u64).to_le_bytes());
            hasher.update(&output.script_pubkey);
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        TxHash::new(out)
    }

    /// Sum of all output values, or `None` on overflow.
    pub fn value_out(&self) -> Option<Amount> {
        self.outputs
            .iter()
            .try_fold(Amount::ZERO, |acc, out| acc.checked_add(out.value))
    }

    /// The outpoints this transaction spends, in input order.
    pub fn spent_outpoints(&self) -> impl Iterator<Item = &Outpoint> {
        self.inputs.iter().map(|i| &i.prevout)
    }

    /// A coinbase spends a single null outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].prevout.txid.is_zero()
            && self.inputs[0].prevout.index == u32::MAX
    }
}

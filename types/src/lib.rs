//! Fundamental types for the instalock protocol.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: hashes, outpoints, voter identities, amounts, timestamps, key
//! material, the transaction shape and the protocol constants.

pub mod amount;
pub mod block;
pub mod error;
pub mod hash;
pub mod keys;
pub mod outpoint;
pub mod params;
pub mod time;
pub mod transaction;

pub use amount::Amount;
pub use block::BlockHash;
pub use error::InstalockError;
pub use hash::TxHash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use outpoint::{Outpoint, VoterId};
pub use params::LockParams;
pub use time::Timestamp;
pub use transaction::{Transaction, TxIn, TxOut};

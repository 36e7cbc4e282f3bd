//! Wire message shapes for node-to-node lock traffic.
//!
//! Only the two message kinds the locking protocol consumes are defined
//! here. Transport framing belongs to the P2P layer; [`WireMessage::encode`]
//! and [`WireMessage::decode`] produce and accept a single bincode payload.

use instalock_types::{Outpoint, Signature, Transaction, TxHash, VoterId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum encoded payload accepted by [`WireMessage::decode`].
pub const MAX_MESSAGE_SIZE: usize = 2 * 1024 * 1024;

/// Network command names, as announced in inventory messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    /// `ix`: a transaction proposed for locking.
    TxLockRequest,
    /// `txlvote`: one voter's endorsement of one outpoint.
    TxLockVote,
}

impl MessageType {
    pub fn command(&self) -> &'static str {
        match self {
            MessageType::TxLockRequest => "ix",
            MessageType::TxLockVote => "txlvote",
        }
    }
}

/// A transaction proposed for locking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLockRequestMessage {
    pub transaction: Transaction,
}

/// A signed endorsement binding (transaction, outpoint, voter).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLockVoteMessage {
    pub tx_hash: TxHash,
    pub outpoint: Outpoint,
    pub voter: VoterId,
    pub signature: Signature,
}

/// Envelope for every lock message exchanged between nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireMessage {
    TxLockRequest(TxLockRequestMessage),
    TxLockVote(TxLockVoteMessage),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("message too large: {size} > {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("malformed message: {0}")]
    Malformed(String),
}

impl WireMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            WireMessage::TxLockRequest(_) => MessageType::TxLockRequest,
            WireMessage::TxLockVote(_) => MessageType::TxLockVote,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let bytes = bincode::serialize(self).map_err(|e| CodecError::Malformed(e.to_string()))?;
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge {
                size: bytes.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        Ok(bytes)
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge {
                size: data.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        bincode::deserialize(data).map_err(|e| CodecError::Malformed(e.to_string()))
    }
}

//! Conversion between consensus values and their wire shapes, and the
//! outbound relay that gossips them.

use tokio::sync::mpsc;
use tracing::warn;

use instalock_consensus::{LockRequest, Relay, Vote};
use instalock_messages::{MessageType, TxLockRequestMessage, TxLockVoteMessage, WireMessage};
use instalock_types::{Timestamp, Transaction};

pub fn vote_to_wire(vote: &Vote) -> WireMessage {
    WireMessage::TxLockVote(TxLockVoteMessage {
        tx_hash: vote.tx_hash,
        outpoint: vote.outpoint,
        voter: vote.voter,
        signature: vote.signature.clone(),
    })
}

/// A vote received from a peer, stamped with its arrival time.
pub fn vote_from_wire(msg: TxLockVoteMessage, now: Timestamp) -> Vote {
    Vote::received(msg.tx_hash, msg.outpoint, msg.voter, msg.signature, now)
}

pub fn request_to_wire(tx: &Transaction) -> WireMessage {
    WireMessage::TxLockRequest(TxLockRequestMessage {
        transaction: tx.clone(),
    })
}

pub fn request_from_wire(msg: TxLockRequestMessage) -> LockRequest {
    LockRequest::new(msg.transaction)
}

/// One encoded message queued for the P2P layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    pub kind: MessageType,
    pub payload: Vec<u8>,
}

/// [`Relay`] that encodes each message and hands it to the P2P layer
/// through an unbounded channel.
pub struct ChannelRelay {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelRelay {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, msg: WireMessage) {
        let kind = msg.message_type();
        let payload = match msg.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(command = kind.command(), error = %e, "failed to encode outbound message");
                return;
            }
        };
        // a closed channel means the P2P layer is shutting down
        let _ = self.tx.send(Outbound { kind, payload });
    }
}

impl Relay for ChannelRelay {
    fn relay_vote(&self, vote: &Vote) {
        self.send(vote_to_wire(vote));
    }

    fn relay_transaction(&self, tx: &Transaction) {
        self.send(request_to_wire(tx));
    }
}

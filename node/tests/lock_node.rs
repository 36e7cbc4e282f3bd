//! End-to-end tests driving a [`LockNode`] through encoded wire messages.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use instalock_consensus::{LockRequest, Vote, VoteOutcome};
use instalock_crypto::keypair_from_seed;
use instalock_messages::{MessageType, WireMessage};
use instalock_node::wire::{request_to_wire, vote_to_wire};
use instalock_node::{Dispatched, LockNode, NodeConfig, NodeServices, Outbound, TxAdmission};
use instalock_nullables::NullEnv;
use instalock_types::{
    Amount, KeyPair, LockParams, Outpoint, Timestamp, Transaction, TxHash, TxIn, TxOut, VoterId,
};
use tokio::sync::mpsc::UnboundedReceiver;

const TIP: u32 = 500;
const COIN: u64 = 100_000_000;

struct Admission {
    accept: AtomicBool,
    offered: AtomicUsize,
}

impl Admission {
    fn offered(&self) -> usize {
        self.offered.load(Ordering::Relaxed)
    }
}

impl TxAdmission for Admission {
    fn accept_to_mempool(&self, _tx: &Transaction) -> bool {
        self.offered.fetch_add(1, Ordering::Relaxed);
        self.accept.load(Ordering::Relaxed)
    }
}

struct Voter {
    id: VoterId,
    keys: KeyPair,
}

impl Voter {
    fn new(n: u8) -> Self {
        Self {
            id: VoterId::new(Outpoint::new(TxHash::new([n; 32]), 7)),
            keys: keypair_from_seed(&[n; 32]),
        }
    }

    fn vote(&self, tx_hash: TxHash, outpoint: Outpoint) -> Vote {
        let mut vote = Vote::new(tx_hash, outpoint, self.id, Timestamp::new(0));
        vote.sign(&self.keys).expect("sign");
        vote
    }
}

struct Harness {
    env: NullEnv,
    node: LockNode,
    admission: Arc<Admission>,
    outbound: UnboundedReceiver<Outbound>,
    voters: Vec<Voter>,
}

fn input() -> Outpoint {
    Outpoint::new(TxHash::new([0xee; 32]), 0)
}

fn request() -> LockRequest {
    LockRequest::new(Transaction::new(
        vec![TxIn::new(input())],
        vec![TxOut::new(Amount::new(COIN - 50_000), vec![0x51])],
    ))
}

fn harness(config: NodeConfig, accept: bool) -> Harness {
    let env = NullEnv::new(TIP);
    env.chain.add_utxo(input(), TIP - 20, Amount::new(COIN));
    let voters: Vec<Voter> = (1..=3).map(Voter::new).collect();
    for (rank, voter) in voters.iter().enumerate() {
        env.voters
            .add_voter(voter.id, voter.keys.public.clone(), rank as u32 + 1);
    }

    let admission = Arc::new(Admission {
        accept: AtomicBool::new(accept),
        offered: AtomicUsize::new(0),
    });
    let services = NodeServices {
        chain: env.chain.clone(),
        mempool: env.mempool.clone(),
        voters: env.voters.clone(),
        admission: admission.clone(),
    };
    let (node, outbound) = LockNode::new(config, services).expect("node");
    Harness {
        env,
        node,
        admission,
        outbound,
        voters,
    }
}

fn small_quorum() -> NodeConfig {
    NodeConfig {
        params: LockParams {
            signatures_required: 3,
            ..LockParams::default()
        },
        enable_metrics: true,
        ..NodeConfig::default()
    }
}

fn drain(rx: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

fn encode(msg: &WireMessage) -> Vec<u8> {
    msg.encode().expect("encode")
}

#[tokio::test]
async fn wire_traffic_completes_a_lock() {
    let mut h = harness(small_quorum(), true);
    let req = request();
    let hash = req.hash();
    let now = Timestamp::new(10_000);

    let payload = encode(&request_to_wire(req.transaction()));
    let dispatched = h.node.handle_message(&payload, now).await.expect("dispatch");
    assert_eq!(
        dispatched,
        Dispatched::Request {
            accepted_by_mempool: true,
            processed: true
        }
    );
    let relayed = drain(&mut h.outbound);
    assert_eq!(relayed.len(), 1);
    assert_eq!(relayed[0].kind, MessageType::TxLockRequest);

    for voter in &h.voters {
        let payload = encode(&vote_to_wire(&voter.vote(hash, input())));
        let dispatched = h.node.handle_message(&payload, now).await.expect("dispatch");
        assert_eq!(dispatched, Dispatched::Vote(VoteOutcome::Accepted));
    }

    assert_eq!(h.node.completed_locks(), 1);
    assert!(h.node.manager.lock().await.is_locked_transaction(&hash));
    assert_eq!(h.node.metrics.votes_accepted.get(), 3);
    assert_eq!(h.node.metrics.locks_completed.get(), 1);
    assert_eq!(drain(&mut h.outbound).len(), 3);

    // the same request again is suppressed
    let again = h.node.handle_message(&payload, now).await.expect("dispatch");
    assert_eq!(again, Dispatched::AlreadyHave);
}

#[tokio::test]
async fn mempool_rejection_still_tracks_request() {
    let mut h = harness(small_quorum(), false);
    let req = request();
    let hash = req.hash();

    let dispatched = h.node.submit_request(req, Timestamp::new(1)).await;
    assert_eq!(
        dispatched,
        Dispatched::Request {
            accepted_by_mempool: false,
            processed: true
        }
    );
    assert!(drain(&mut h.outbound).is_empty());
    assert!(h.node.manager.lock().await.already_have(&hash));
}

#[tokio::test]
async fn invalid_request_counted() {
    let h = harness(small_quorum(), true);
    h.env.chain.spend(&input());
    let dispatched = h.node.submit_request(request(), Timestamp::new(1)).await;
    assert_eq!(
        dispatched,
        Dispatched::Request {
            accepted_by_mempool: false,
            processed: false
        }
    );
    assert_eq!(h.node.metrics.requests_invalid.get(), 1);
    assert_eq!(h.admission.offered(), 0);
}

#[tokio::test]
async fn low_fee_request_never_reaches_mempool() {
    let mut h = harness(small_quorum(), true);
    let cheap = LockRequest::new(Transaction::new(
        vec![TxIn::new(input())],
        vec![TxOut::new(Amount::new(COIN - 5_000), vec![0x51])],
    ));
    let hash = cheap.hash();

    let dispatched = h.node.submit_request(cheap, Timestamp::new(1)).await;
    assert_eq!(
        dispatched,
        Dispatched::Request {
            accepted_by_mempool: false,
            processed: false
        }
    );
    assert_eq!(h.admission.offered(), 0);
    assert!(drain(&mut h.outbound).is_empty());
    assert!(!h.node.manager.lock().await.already_have(&hash));

    // a valid request is still offered
    h.node.submit_request(request(), Timestamp::new(1)).await;
    assert_eq!(h.admission.offered(), 1);
}

#[tokio::test]
async fn garbage_payload_is_a_codec_error() {
    let h = harness(small_quorum(), true);
    let result = h.node.handle_message(&[0xff; 3], Timestamp::new(1)).await;
    assert!(matches!(result, Err(instalock_node::NodeError::Codec(_))));
}

#[tokio::test]
async fn equivocation_reaches_metrics() {
    let h = harness(small_quorum(), false);
    let first = request();
    let second = LockRequest::new(Transaction::new(
        vec![TxIn::new(input())],
        vec![TxOut::new(Amount::new(COIN - 60_000), vec![0x52])],
    ));
    h.node.submit_request(first.clone(), Timestamp::new(1)).await;
    h.node.submit_request(second.clone(), Timestamp::new(1)).await;

    let cheater = &h.voters[0];
    h.node
        .submit_vote(cheater.vote(first.hash(), input()), Timestamp::new(1))
        .await;
    h.node
        .submit_vote(cheater.vote(second.hash(), input()), Timestamp::new(1))
        .await;

    assert_eq!(h.node.metrics.equivocations.get(), 1);
    assert_eq!(h.env.voters.penalized(), vec![cheater.id]);
}

#[tokio::test]
async fn maintenance_sweeps_timed_out_candidates() {
    let h = harness(small_quorum(), true);
    let req = request();
    let hash = req.hash();
    h.node.submit_request(req, Timestamp::new(1_000)).await;
    h.node
        .submit_vote(h.voters[0].vote(hash, input()), Timestamp::new(1_000))
        .await;

    let report = h.node.maintain(Timestamp::new(1_020)).await;
    assert_eq!(report.candidates, 1);
    assert_eq!(h.node.metrics.candidates_removed.get(), 1);
    assert_eq!(h.node.metrics.candidates.get(), 0);
    assert!(h.node.relay_candidate(&hash).await.is_err());

    let text = h.node.render_metrics().expect("encode").expect("enabled");
    assert!(text.contains("instalock_candidates_removed_total 1"));
}

#[tokio::test]
async fn mined_lock_expires_after_keep_window() {
    let h = harness(small_quorum(), true);
    let req = request();
    let hash = req.hash();
    let tx = req.transaction().clone();
    let now = Timestamp::new(1_000);
    h.node.submit_request(req, now).await;
    for voter in &h.voters {
        h.node.submit_vote(voter.vote(hash, input()), now).await;
    }

    h.node.block_connected(TIP + 1, &[tx]).await;
    h.node.block_connected(TIP + 25, &[]).await;
    assert_eq!(h.node.maintain(now).await.candidates, 0);

    h.node.block_connected(TIP + 26, &[]).await;
    assert_eq!(h.node.maintain(now).await.candidates, 1);
}

#[tokio::test]
async fn disconnected_block_returns_lock_to_mempool() {
    let h = harness(small_quorum(), true);
    let req = request();
    let hash = req.hash();
    let tx = req.transaction().clone();
    let now = Timestamp::new(1_000);
    h.node.submit_request(req, now).await;
    for voter in &h.voters {
        h.node.submit_vote(voter.vote(hash, input()), now).await;
    }

    h.node.block_connected(TIP + 1, &[tx.clone()]).await;
    h.node.block_disconnected(TIP, &[tx]).await;
    h.node.block_connected(TIP + 100, &[]).await;
    assert_eq!(h.node.maintain(now).await.candidates, 0);
    assert!(h.node.manager.lock().await.is_locked_transaction(&hash));
}

#[tokio::test]
async fn local_voter_signs_accepted_requests() {
    let config = NodeConfig {
        voter_key_seed: Some(hex_seed(1)),
        voter_outpoint: Some(format!("{}-7", TxHash::new([1; 32]))),
        ..small_quorum()
    };
    let mut h = harness(config, true);
    h.node.submit_request(request(), Timestamp::new(1)).await;

    let kinds: Vec<MessageType> = drain(&mut h.outbound).into_iter().map(|o| o.kind).collect();
    assert_eq!(kinds, vec![MessageType::TxLockRequest, MessageType::TxLockVote]);
}

#[tokio::test]
async fn maintenance_loop_stops_on_shutdown() {
    let config = NodeConfig {
        maintenance_interval_secs: 1,
        ..small_quorum()
    };
    let mut h = harness(config, true);
    h.node.start();
    h.node.stop().await;
    assert!(h.node.render_metrics().expect("encode").is_some());
}

#[test]
fn metrics_hidden_when_disabled() {
    let h = harness(NodeConfig::default(), true);
    assert!(h.node.render_metrics().expect("encode").is_none());
}

fn hex_seed(n: u8) -> String {
    format!("{n:02x}").repeat(32)
}

//! The lock node: wires the lock manager to the P2P layer, the mempool,
//! metrics and the maintenance loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use instalock_consensus::{
    ChainView, Collaborators, LockManager, LockRequest, MempoolView, SweepReport, Vote,
    VoteOutcome, VoterRegistry,
};
use instalock_messages::WireMessage;
use instalock_types::{Timestamp, Transaction, TxHash};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::LockMetrics;
use crate::notify::NotifyListener;
use crate::shutdown::ShutdownController;
use crate::tracing_spans::{lock_request_span, lock_vote_span, sweep_span};
use crate::wire::{request_from_wire, vote_from_wire, ChannelRelay, Outbound};

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// The mempool's admission decision for a proposed transaction.
pub trait TxAdmission: Send + Sync {
    /// Try to add `tx` to the mempool. Returns whether it was accepted.
    fn accept_to_mempool(&self, tx: &Transaction) -> bool;
}

/// Services provided by the host node.
pub struct NodeServices {
    pub chain: Arc<dyn ChainView>,
    pub mempool: Arc<dyn MempoolView>,
    pub voters: Arc<dyn VoterRegistry>,
    pub admission: Arc<dyn TxAdmission>,
}

/// What became of one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatched {
    /// Already in a request pool or the vote index; not processed again.
    AlreadyHave,
    Request {
        accepted_by_mempool: bool,
        /// Passed protocol validation.
        processed: bool,
    },
    Vote(VoteOutcome),
}

pub struct LockNode {
    pub config: NodeConfig,
    pub manager: Arc<Mutex<LockManager>>,
    pub metrics: Arc<LockMetrics>,
    pub shutdown: Arc<ShutdownController>,
    listener: Arc<NotifyListener>,
    admission: Arc<dyn TxAdmission>,
    started: Instant,
    task_handles: Vec<JoinHandle<()>>,
}

impl LockNode {
    /// Build the node. The returned receiver yields every message the
    /// manager relays; the P2P layer drains it.
    pub fn new(
        config: NodeConfig,
        services: NodeServices,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Outbound>), NodeError> {
        let metrics = Arc::new(LockMetrics::new()?);
        let listener = Arc::new(
            NotifyListener::new(config.instantsend_notify.clone())
                .with_metrics(Arc::clone(&metrics)),
        );
        let (relay, outbound) = ChannelRelay::new();

        let env = Collaborators {
            chain: services.chain,
            mempool: services.mempool,
            voters: services.voters,
            relay: Arc::new(relay),
            listener: Arc::clone(&listener) as _,
        };
        let mut manager = LockManager::new(config.to_lock_config(), env);
        if let Some(voter) = config.local_voter()? {
            info!(voter = %voter.id, "local voting enabled");
            manager = manager.with_local_voter(voter);
        }

        info!(
            enabled = config.enable_instantsend,
            block_filtering = config.enable_block_filtering,
            max_value = config.max_value,
            depth = config.instantsend_depth,
            "lock node initialised"
        );

        let node = Self {
            config,
            manager: Arc::new(Mutex::new(manager)),
            metrics,
            shutdown: Arc::new(ShutdownController::new()),
            listener,
            admission: services.admission,
            started: Instant::now(),
            task_handles: Vec::new(),
        };
        Ok((node, outbound))
    }

    /// Locks reported since startup.
    pub fn completed_locks(&self) -> u64 {
        self.listener.completed()
    }

    // ---------------------------------------------------------------
    // Inbound traffic
    // ---------------------------------------------------------------

    /// Decode one payload from a peer and route it.
    pub async fn handle_message(&self, payload: &[u8], now: Timestamp) -> Result<Dispatched, NodeError> {
        match WireMessage::decode(payload)? {
            WireMessage::TxLockRequest(msg) => Ok(self.submit_request(request_from_wire(msg), now).await),
            WireMessage::TxLockVote(msg) => Ok(self.submit_vote(vote_from_wire(msg, now), now).await),
        }
    }

    /// A lock request from a peer or the local wallet.
    pub async fn submit_request(&self, request: LockRequest, now: Timestamp) -> Dispatched {
        let tx_hash = request.hash();
        let mut manager = self.manager.lock().await;
        let _span = lock_request_span(&tx_hash).entered();

        if manager.already_have(&tx_hash) {
            debug!("lock request already known");
            return Dispatched::AlreadyHave;
        }
        self.metrics.requests_received.inc();

        // a request that fails validation never reaches the mempool
        if !manager.config().enabled || manager.check_lock_request(&request).is_err() {
            self.metrics.requests_invalid.inc();
            return Dispatched::Request {
                accepted_by_mempool: false,
                processed: false,
            };
        }

        let accepted_by_mempool = self.admission.accept_to_mempool(request.transaction());
        let processed = manager.receive_lock_request(request, accepted_by_mempool, now);
        if !processed {
            self.metrics.requests_invalid.inc();
        }
        Dispatched::Request {
            accepted_by_mempool,
            processed,
        }
    }

    pub async fn submit_vote(&self, vote: Vote, now: Timestamp) -> Dispatched {
        let mut manager = self.manager.lock().await;
        let _span = lock_vote_span(&vote.tx_hash, &vote.outpoint, &vote.voter).entered();

        if manager.already_have(&vote.hash()) {
            return Dispatched::AlreadyHave;
        }
        let known_proofs = manager.equivocations().len();
        let outcome = manager.handle_vote_message(vote, now);
        self.metrics.record_vote(&outcome);
        let new_proofs = manager.equivocations().len().saturating_sub(known_proofs);
        self.metrics.equivocations.inc_by(new_proofs as u64);
        Dispatched::Vote(outcome)
    }

    /// Re-broadcast a candidate, e.g. on a wallet's request.
    pub async fn relay_candidate(&self, tx_hash: &TxHash) -> Result<(), NodeError> {
        self.manager.lock().await.relay_candidate(tx_hash)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Chain events
    // ---------------------------------------------------------------

    pub async fn block_connected(&self, height: u32, txs: &[Transaction]) {
        let mut manager = self.manager.lock().await;
        manager.updated_block_tip(height);
        for tx in txs {
            manager.sync_transaction(tx, Some(height));
        }
    }

    /// The tip at `height + 1` was disconnected; its transactions return to the mempool.
    pub async fn block_disconnected(&self, height: u32, txs: &[Transaction]) {
        let mut manager = self.manager.lock().await;
        manager.updated_block_tip(height);
        for tx in txs {
            manager.sync_transaction(tx, None);
        }
    }

    // ---------------------------------------------------------------
    // Maintenance
    // ---------------------------------------------------------------

    /// Run one maintenance pass now.
    pub async fn maintain(&self, now: Timestamp) -> SweepReport {
        maintain(&self.manager, &self.metrics, now).await
    }

    /// Spawn the maintenance loop.
    pub fn start(&mut self) {
        let manager = Arc::clone(&self.manager);
        let metrics = Arc::clone(&self.metrics);
        let mut shutdown_rx = self.shutdown.subscribe();
        let period = Duration::from_secs(self.config.maintenance_interval_secs);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // skip the immediate first tick
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        info!("lock maintenance task shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        maintain(&manager, &metrics, Timestamp::now()).await;
                    }
                }
            }
        });
        self.task_handles.push(handle);
        info!(interval_secs = period.as_secs(), "lock maintenance started");
    }

    /// Signal background tasks and wait for them, bounded by a timeout.
    pub async fn stop(&mut self) {
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            warn!(timeout = ?SHUTDOWN_TIMEOUT, "background tasks did not stop in time");
        }

        info!(
            uptime = %instalock_utils::format_duration(self.started.elapsed().as_secs()),
            locks = self.completed_locks(),
            "lock node stopped"
        );
    }

    /// Prometheus exposition, if metrics are enabled.
    pub fn render_metrics(&self) -> Result<Option<String>, NodeError> {
        if !self.config.enable_metrics {
            return Ok(None);
        }
        self.metrics.encode().map(Some)
    }
}

async fn maintain(manager: &Mutex<LockManager>, metrics: &LockMetrics, now: Timestamp) -> SweepReport {
    let mut manager = manager.lock().await;
    let _span = sweep_span(manager.height()).entered();
    let started = Instant::now();

    let report = manager.check_and_remove(now);
    let applied = manager.process_orphan_votes(now);
    if applied > 0 {
        debug!(applied, "buffered orphan votes applied");
    }

    metrics.record_sweep(&report);
    metrics.observe_summary(&manager.summary());
    metrics
        .sweep_time_ms
        .observe(started.elapsed().as_secs_f64() * 1000.0);
    report
}

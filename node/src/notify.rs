//! Finalized-lock notifications: a counter plus the optional user command.

use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use instalock_consensus::LockListener;
use instalock_types::Transaction;
use tracing::{debug, warn};

use crate::metrics::LockMetrics;

/// Placeholder replaced by the txid in the notify command.
const TXID_PLACEHOLDER: &str = "%s";

/// Counts locks and runs the configured notify command for each one.
///
/// The command runs through `sh -c` on a detached thread; its exit status
/// is logged and never affects locking.
pub struct NotifyListener {
    command: Option<String>,
    completed: AtomicU64,
    metrics: Option<Arc<LockMetrics>>,
}

impl NotifyListener {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command,
            completed: AtomicU64::new(0),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<LockMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Locks reported since startup.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    fn run_command(template: &str, txid: String) {
        let command = template.replace(TXID_PLACEHOLDER, &txid);
        let spawned = thread::Builder::new()
            .name("lock-notify".into())
            .spawn(move || match Command::new("sh").arg("-c").arg(&command).status() {
                Ok(status) if status.success() => debug!(%command, "notify command finished"),
                Ok(status) => warn!(%command, %status, "notify command failed"),
                Err(e) => warn!(%command, error = %e, "notify command could not start"),
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn notify thread");
        }
    }
}

impl LockListener for NotifyListener {
    fn transaction_locked(&self, tx: &Transaction) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.locks_completed.inc();
        }
        if let Some(template) = &self.command {
            Self::run_command(template, tx.hash().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instalock_types::{Amount, Outpoint, TxHash, TxIn, TxOut};
    use std::time::{Duration, Instant};

    fn tx() -> Transaction {
        Transaction::new(
            vec![TxIn::new(Outpoint::new(TxHash::new([1; 32]), 0))],
            vec![TxOut::new(Amount::new(10), vec![])],
        )
    }

    #[test]
    fn counts_locks_without_command() {
        let metrics = Arc::new(LockMetrics::new().expect("metrics"));
        let listener = NotifyListener::new(None).with_metrics(Arc::clone(&metrics));
        listener.transaction_locked(&tx());
        listener.transaction_locked(&tx());
        assert_eq!(listener.completed(), 2);
        assert_eq!(metrics.locks_completed.get(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn command_receives_txid() {
        let dir = tempfile::tempdir().expect("temp dir");
        let template = format!("touch {}/%s", dir.path().display());
        let listener = NotifyListener::new(Some(template));
        let tx = tx();
        listener.transaction_locked(&tx);

        let expected = dir.path().join(tx.hash().to_string());
        let deadline = Instant::now() + Duration::from_secs(5);
        while !expected.exists() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(expected.exists());
    }
}

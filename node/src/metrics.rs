//! Prometheus metrics for lock traffic.
//!
//! [`LockMetrics`] owns a dedicated [`Registry`]; [`LockMetrics::encode`]
//! renders it in the text exposition format for whatever endpoint scrapes it.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

use instalock_consensus::{LockSummary, SweepReport, VoteOutcome};

use crate::NodeError;

pub struct LockMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub requests_received: IntCounter,
    /// Requests dropped by protocol validation.
    pub requests_invalid: IntCounter,
    pub votes_accepted: IntCounter,
    pub votes_orphaned: IntCounter,
    /// Votes rejected, throttled, duplicated or arriving too late.
    pub votes_rejected: IntCounter,
    pub locks_completed: IntCounter,
    pub equivocations: IntCounter,
    /// Candidates removed by maintenance sweeps.
    pub candidates_removed: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub candidates: IntGauge,
    pub votes: IntGauge,
    pub orphan_votes: IntGauge,
    pub locked_outpoints: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    pub sweep_time_ms: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, NodeError> {
    Ok(register_int_counter_with_registry!(Opts::new(name, help), registry)?)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, NodeError> {
    Ok(register_int_gauge_with_registry!(Opts::new(name, help), registry)?)
}

impl LockMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let sweep_time_ms = register_histogram_with_registry!(
            HistogramOpts::new("instalock_sweep_time_ms", "Maintenance sweep time in milliseconds")
                .buckets(prometheus::exponential_buckets(0.1, 2.0, 12)?),
            registry
        )?;

        Ok(Self {
            requests_received: counter(
                &registry,
                "instalock_requests_received_total",
                "Lock requests received",
            )?,
            requests_invalid: counter(
                &registry,
                "instalock_requests_invalid_total",
                "Lock requests failing validation",
            )?,
            votes_accepted: counter(
                &registry,
                "instalock_votes_accepted_total",
                "Votes recorded in a candidate",
            )?,
            votes_orphaned: counter(
                &registry,
                "instalock_votes_orphaned_total",
                "Votes buffered before their request",
            )?,
            votes_rejected: counter(
                &registry,
                "instalock_votes_rejected_total",
                "Votes refused for any reason",
            )?,
            locks_completed: counter(
                &registry,
                "instalock_locks_completed_total",
                "Transactions locked",
            )?,
            equivocations: counter(
                &registry,
                "instalock_equivocations_total",
                "Conflicting vote pairs detected",
            )?,
            candidates_removed: counter(
                &registry,
                "instalock_candidates_removed_total",
                "Candidates removed by maintenance",
            )?,
            candidates: gauge(&registry, "instalock_candidates", "Current lock candidates")?,
            votes: gauge(&registry, "instalock_votes", "Current votes in the flat index")?,
            orphan_votes: gauge(&registry, "instalock_orphan_votes", "Current orphan votes")?,
            locked_outpoints: gauge(
                &registry,
                "instalock_locked_outpoints",
                "Current locked outpoints",
            )?,
            sweep_time_ms,
            registry,
        })
    }

    /// Count one vote by outcome. `Ignored` votes were never looked at.
    pub fn record_vote(&self, outcome: &VoteOutcome) {
        match outcome {
            VoteOutcome::Accepted => self.votes_accepted.inc(),
            VoteOutcome::Orphaned => self.votes_orphaned.inc(),
            VoteOutcome::Ignored => {}
            _ => self.votes_rejected.inc(),
        }
    }

    pub fn record_sweep(&self, report: &SweepReport) {
        self.candidates_removed.inc_by(report.candidates as u64);
    }

    pub fn observe_summary(&self, summary: &LockSummary) {
        self.candidates.set(summary.candidates as i64);
        self.votes.set(summary.votes as i64);
        self.orphan_votes.set(summary.orphan_votes as i64);
        self.locked_outpoints.set(summary.locked_outpoints as i64);
    }

    /// Prometheus text exposition of every metric.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instalock_consensus::VoteRejection;
    use instalock_types::{Outpoint, TxHash, VoterId};

    #[test]
    fn vote_outcomes_land_in_their_counters() {
        let metrics = LockMetrics::new().expect("metrics");
        metrics.record_vote(&VoteOutcome::Accepted);
        metrics.record_vote(&VoteOutcome::Orphaned);
        metrics.record_vote(&VoteOutcome::Ignored);
        metrics.record_vote(&VoteOutcome::Throttled);
        metrics.record_vote(&VoteOutcome::Rejected(VoteRejection::UnknownVoter(
            VoterId::new(Outpoint::new(TxHash::ZERO, 0)),
        )));
        assert_eq!(metrics.votes_accepted.get(), 1);
        assert_eq!(metrics.votes_orphaned.get(), 1);
        assert_eq!(metrics.votes_rejected.get(), 2);
    }

    #[test]
    fn summary_sets_gauges() {
        let metrics = LockMetrics::new().expect("metrics");
        metrics.observe_summary(&LockSummary {
            candidates: 3,
            votes: 12,
            orphan_votes: 2,
            locked_outpoints: 4,
        });
        assert_eq!(metrics.candidates.get(), 3);
        assert_eq!(metrics.locked_outpoints.get(), 4);
        let text = metrics.encode().expect("encode");
        assert!(text.contains("instalock_votes 12"));
    }

    #[test]
    fn independent_registries() {
        let a = LockMetrics::new().expect("a");
        let b = LockMetrics::new().expect("b");
        a.locks_completed.inc();
        assert_eq!(b.locks_completed.get(), 0);
    }
}

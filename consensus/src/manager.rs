//! The lock manager: routes requests and votes, drives local voting,
//! finalizes locks and sweeps stale state.
//!
//! A candidate moves through four implicit stages:
//!
//! - **Pending**: created by an early vote, request not yet known.
//! - **Active**: request attached, some outpoint still short of its quorum.
//! - **Locked**: every outpoint ready, conflicts resolved, listener notified.
//! - **Removed**: expired after inclusion or timed out (deleted by the
//!   sweep), or revoked by a proven conflict (deleted at once).
//!
//! There is no path from Locked back to Active, and a revoked transaction
//! never gets a candidate again. All operations are
//! synchronous and take the current wall-clock time explicitly; the caller
//! serializes access (the node wraps the manager in one mutex).

use std::collections::HashSet;
use std::fmt;

use instalock_types::{KeyPair, Outpoint, Timestamp, Transaction, TxHash, VoterId};
use tracing::{debug, info, warn};

use crate::candidate::LockCandidate;
use crate::collaborators::Collaborators;
use crate::config::LockConfig;
use crate::equivocation::EquivocationLog;
use crate::error::{ConsensusError, RequestRejection, VoteRejection};
use crate::lifecycle::{Confirmation, Lifecycle};
use crate::request::LockRequest;
use crate::store::{LockStore, MemoryLockStore, RequestPool};
use crate::vote::Vote;

/// Identity and signing key of the voter this node operates, if any.
pub struct LocalVoter {
    pub id: VoterId,
    pub keys: KeyPair,
}

/// What happened to one vote handed to the manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Recorded in its candidate.
    Accepted,
    /// Valid, relayed, and buffered until the lock request arrives.
    Orphaned,
    /// Dropped before validation: duplicate, feature off, or voter list not synced.
    Ignored,
    Rejected(VoteRejection),
    /// The candidate already timed out.
    TooLate,
    /// The voter is sending orphan votes faster than the network average.
    Throttled,
    /// The candidate refused it: unknown outpoint or a second vote from the same voter.
    Duplicate,
}

/// Answer to "how many signatures does this transaction have".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockSignatures {
    /// Locking is switched off.
    FeatureDisabled,
    /// A large-work fork is visible; lock reporting is suppressed.
    ForkWarning,
    /// No candidate for this transaction.
    Unknown,
    Count(usize),
}

/// Items removed by one [`LockManager::check_and_remove`] pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub candidates: usize,
    pub votes: usize,
    pub orphan_votes: usize,
    pub orphan_voters: usize,
    pub proofs: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == SweepReport::default()
    }
}

/// Index sizes, for logs and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockSummary {
    pub candidates: usize,
    pub votes: usize,
    pub orphan_votes: usize,
    pub locked_outpoints: usize,
}

impl fmt::Display for LockSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lock Candidates: {}, Votes {}, Orphan votes {}, Locked outpoints {}",
            self.candidates, self.votes, self.orphan_votes, self.locked_outpoints
        )
    }
}

pub struct LockManager<S: LockStore = MemoryLockStore> {
    store: S,
    config: LockConfig,
    env: Collaborators,
    local_voter: Option<LocalVoter>,
    equivocations: EquivocationLog,
    /// Transactions whose finalized lock was dropped for a conflicting lock.
    revoked: HashSet<TxHash>,
    cached_height: u32,
    completed_locks: u64,
}

impl LockManager<MemoryLockStore> {
    pub fn new(config: LockConfig, env: Collaborators) -> Self {
        Self::with_store(MemoryLockStore::new(), config, env)
    }
}

impl<S: LockStore> LockManager<S> {
    pub fn with_store(store: S, config: LockConfig, env: Collaborators) -> Self {
        let cached_height = env.chain.height();
        Self {
            store,
            config,
            env,
            local_voter: None,
            equivocations: EquivocationLog::new(),
            revoked: HashSet::new(),
            cached_height,
            completed_locks: 0,
        }
    }

    /// Enable local voting as `voter`.
    pub fn with_local_voter(mut self, voter: LocalVoter) -> Self {
        self.local_voter = Some(voter);
        self
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn equivocations(&self) -> &EquivocationLog {
        &self.equivocations
    }

    pub fn local_voter_id(&self) -> Option<VoterId> {
        self.local_voter.as_ref().map(|v| v.id)
    }

    /// Height last reported through [`updated_block_tip`](Self::updated_block_tip).
    pub fn height(&self) -> u32 {
        self.cached_height
    }

    /// Whether `tx_hash` lost a finalized lock to a conflicting one.
    pub fn is_revoked(&self, tx_hash: &TxHash) -> bool {
        self.revoked.contains(tx_hash)
    }

    /// Locks finalized and reported since startup.
    pub fn completed_locks(&self) -> u64 {
        self.completed_locks
    }

    // ---------------------------------------------------------------
    // Inbound messages
    // ---------------------------------------------------------------

    /// Entry point for a vote received from a peer.
    ///
    /// The vote enters the flat index before processing, so
    /// [`already_have`](Self::already_have) suppresses re-downloads even if
    /// processing rejects it.
    pub fn handle_vote_message(&mut self, vote: Vote, now: Timestamp) -> VoteOutcome {
        if !self.config.enabled || !self.env.voters.is_synced() {
            return VoteOutcome::Ignored;
        }
        let vote_hash = vote.hash();
        if self.store.vote(&vote_hash).is_some() {
            return VoteOutcome::Ignored;
        }
        if self.revoked.contains(&vote.tx_hash) {
            debug!(txid = %vote.tx_hash, "vote for a revoked lock");
            return VoteOutcome::Ignored;
        }
        self.store.insert_vote(vote_hash, vote.clone());
        self.process_vote(vote, now)
    }

    /// Entry point for a lock request, after the mempool has ruled on its transaction.
    ///
    /// Requests that fail protocol validation are dropped without touching
    /// either pool. Accepted requests are relayed and voted on.
    pub fn receive_lock_request(
        &mut self,
        request: LockRequest,
        accepted_by_mempool: bool,
        now: Timestamp,
    ) -> bool {
        if !self.config.enabled {
            return false;
        }
        let tx_hash = request.hash();
        if !self.process_lock_request(request.clone(), now) {
            return false;
        }
        if accepted_by_mempool {
            info!(txid = %tx_hash, "lock request accepted by mempool");
            self.env.relay.relay_transaction(request.transaction());
            self.accept_lock_request(request);
            self.vote(&tx_hash, now);
        } else {
            debug!(txid = %tx_hash, "lock request rejected by mempool");
            self.reject_lock_request(request);
        }
        true
    }

    /// Protocol validation of `request` on its own. Hosts run this before
    /// offering the transaction to their mempool.
    pub fn check_lock_request(&self, request: &LockRequest) -> Result<(), RequestRejection> {
        if self.revoked.contains(&request.hash()) {
            return Err(RequestRejection::Revoked);
        }
        request.validate(self.env.chain.as_ref(), &self.config)
    }

    pub fn already_have(&self, hash: &TxHash) -> bool {
        self.store.request(RequestPool::Accepted, hash).is_some()
            || self.store.request(RequestPool::Rejected, hash).is_some()
            || self.store.vote(hash).is_some()
    }

    pub fn accept_lock_request(&mut self, request: LockRequest) {
        self.store.insert_request(RequestPool::Accepted, request);
    }

    pub fn reject_lock_request(&mut self, request: LockRequest) {
        self.store.insert_request(RequestPool::Rejected, request);
    }

    // ---------------------------------------------------------------
    // Requests and candidates
    // ---------------------------------------------------------------

    /// Create or complete the candidate for `request` and try to finalize it.
    ///
    /// Conflicts with finalized locks or competing candidates are only
    /// logged here; they are settled when a candidate tries to finalize.
    pub fn process_lock_request(&mut self, request: LockRequest, now: Timestamp) -> bool {
        let tx_hash = request.hash();

        for outpoint in request.transaction().spent_outpoints() {
            if let Some(holder) = self.store.locked_outpoint(outpoint) {
                if holder != tx_hash {
                    warn!(
                        txid = %tx_hash,
                        locked_txid = %holder,
                        "request conflicts with a completed lock"
                    );
                }
            }
            if self
                .store
                .voted_candidates(outpoint)
                .iter()
                .any(|hash| *hash != tx_hash)
            {
                debug!(txid = %tx_hash, %outpoint, "double spend attempt");
            }
        }

        if !self.create_candidate(request, now) {
            info!(txid = %tx_hash, "lock candidate not created");
            return false;
        }
        info!(txid = %tx_hash, "lock request processed");

        self.apply_orphans_for(&tx_hash, now);
        self.try_finalize(&tx_hash, now);
        true
    }

    /// Validate `request` and create, complete or keep its candidate.
    ///
    /// Returns `false` if validation fails, the transaction was revoked, or
    /// a previously empty candidate had already timed out.
    pub fn create_candidate(&mut self, request: LockRequest, now: Timestamp) -> bool {
        let tx_hash = request.hash();
        if self.revoked.contains(&tx_hash) {
            debug!(txid = %tx_hash, "lock was revoked, not recreating candidate");
            return false;
        }
        if request.validate(self.env.chain.as_ref(), &self.config).is_err() {
            return false;
        }

        let required = self.config.params.signatures_required;
        match self.store.candidate_mut(&tx_hash) {
            None => {
                info!(txid = %tx_hash, "new lock candidate");
                self.store
                    .insert_candidate(LockCandidate::new(request, now, required));
            }
            Some(candidate) if !candidate.has_request() => {
                candidate.attach_request(request);
                if candidate.is_timed_out(now, &self.config.params) {
                    info!(txid = %tx_hash, "empty lock candidate already timed out");
                    return false;
                }
                info!(txid = %tx_hash, "lock candidate completed with request");
            }
            Some(_) => {
                debug!(txid = %tx_hash, "lock candidate seen");
            }
        }
        true
    }

    /// Anchor for early votes; starts the timeout countdown. No-op if a candidate exists.
    pub fn create_empty_candidate(&mut self, tx_hash: TxHash, now: Timestamp) {
        if self.store.candidate(&tx_hash).is_some() || self.revoked.contains(&tx_hash) {
            return;
        }
        info!(txid = %tx_hash, "new empty lock candidate");
        let required = self.config.params.signatures_required;
        self.store
            .insert_candidate(LockCandidate::empty(tx_hash, now, required));
    }

    // ---------------------------------------------------------------
    // Local voting
    // ---------------------------------------------------------------

    /// Cast the local voter's votes for every eligible outpoint of `tx_hash`,
    /// then try to finalize. Returns the number of votes cast.
    pub fn vote(&mut self, tx_hash: &TxHash, now: Timestamp) -> usize {
        let cast = self.cast_votes(tx_hash, now);
        self.try_finalize(tx_hash, now);
        cast
    }

    fn cast_votes(&mut self, tx_hash: &TxHash, now: Timestamp) -> usize {
        let Some(local) = self.local_voter.as_ref() else {
            return 0;
        };
        if !self.config.enabled {
            return 0;
        }
        // never vote ahead of mempool acceptance
        if self.store.request(RequestPool::Accepted, tx_hash).is_none() {
            return 0;
        }
        let Some(candidate) = self.store.candidate(tx_hash) else {
            return 0;
        };

        let params = &self.config.params;
        let outpoints: Vec<Outpoint> = candidate.outpoints().copied().collect();
        let mut cast = 0;

        for outpoint in outpoints {
            let Some(coin) = self.env.chain.utxo(&outpoint) else {
                debug!(%outpoint, "failed to find utxo, not voting");
                return cast;
            };

            let lock_input_height = coin.height.saturating_add(params.rank_height_offset);
            let Some(rank) =
                self.env
                    .voters
                    .rank(&local.id, lock_input_height, params.min_protocol_version)
            else {
                debug!(voter = %local.id, "cannot calculate rank");
                continue;
            };
            if rank > params.signatures_total {
                debug!(rank, total = params.signatures_total, "not in the top voters");
                continue;
            }

            let already_voted = self.store.voted_candidates(&outpoint).iter().any(|hash| {
                self.store
                    .candidate(hash)
                    .is_some_and(|c| c.has_voter_voted(&outpoint, &local.id))
            });
            if already_voted {
                warn!(txid = %tx_hash, %outpoint, "already voted for this outpoint, skipping");
                continue;
            }

            let mut vote = Vote::new(*tx_hash, outpoint, local.id, now);
            if let Err(e) = vote.sign(&local.keys) {
                warn!(error = %e, "failed to sign lock vote");
                return cast;
            }

            let vote_hash = vote.hash();
            self.store.insert_vote(vote_hash, vote.clone());
            let added = self
                .store
                .candidate_mut(tx_hash)
                .is_some_and(|c| c.add_vote(vote.clone()));
            if !added {
                continue;
            }

            info!(txid = %tx_hash, %outpoint, vote = %vote_hash, "vote created, relaying");
            if self.store.add_voted_outpoint(outpoint, *tx_hash) > 1 {
                warn!(txid = %tx_hash, %outpoint, "vote conflicts with existing votes");
            }
            self.env.relay.relay_vote(&vote);
            cast += 1;
        }
        cast
    }

    // ---------------------------------------------------------------
    // Vote processing
    // ---------------------------------------------------------------

    /// Validate, relay and apply (or buffer) one vote.
    pub fn process_vote(&mut self, vote: Vote, now: Timestamp) -> VoteOutcome {
        let tx_hash = vote.tx_hash;

        if let Err(reason) =
            vote.validate(self.env.voters.as_ref(), self.env.chain.as_ref(), &self.config.params)
        {
            debug!(txid = %tx_hash, %reason, "vote invalid");
            return VoteOutcome::Rejected(reason);
        }

        // relay before anything else; peers must not wait on our completeness
        self.env.relay.relay_vote(&vote);

        let has_request = self
            .store
            .candidate(&tx_hash)
            .is_some_and(|c| c.has_request());
        if !has_request {
            return self.buffer_orphan(vote, now);
        }
        self.apply_vote(vote, now)
    }

    fn buffer_orphan(&mut self, vote: Vote, now: Timestamp) -> VoteOutcome {
        let tx_hash = vote.tx_hash;
        let vote_hash = vote.hash();
        let voter = vote.voter;

        if !self.store.orphans().contains(&vote_hash) {
            self.create_empty_candidate(tx_hash, now);
            self.store.orphans_mut().insert(vote_hash, vote);
            debug!(txid = %tx_hash, %voter, "orphan vote, new");

            let request = self
                .store
                .request(RequestPool::Accepted, &tx_hash)
                .or_else(|| self.store.request(RequestPool::Rejected, &tx_hash))
                .cloned();
            if let Some(request) = request {
                if self.is_enough_orphan_votes_for_tx(&request) {
                    debug!(txid = %tx_hash, "enough orphan votes, reprocessing lock request");
                    self.process_lock_request(request, now);
                    return VoteOutcome::Orphaned;
                }
            }
        } else {
            debug!(txid = %tx_hash, %voter, "orphan vote, seen");
        }

        let params = &self.config.params;
        if !self.store.orphans_mut().admit_voter(&voter, now, params) {
            debug!(txid = %tx_hash, %voter, "voter is spamming orphan votes");
            return VoteOutcome::Throttled;
        }
        VoteOutcome::Orphaned
    }

    /// Record an already validated vote in its candidate, checking for
    /// equivocation, then try to finalize. The candidate must carry its request.
    fn apply_vote(&mut self, vote: Vote, now: Timestamp) -> VoteOutcome {
        let tx_hash = vote.tx_hash;
        let outpoint = vote.outpoint;
        let voter = vote.voter;

        let Some(candidate) = self.store.candidate(&tx_hash) else {
            return VoteOutcome::Duplicate;
        };
        if candidate.is_timed_out(now, &self.config.params) {
            debug!(txid = %tx_hash, "too late, lock candidate timed out");
            return VoteOutcome::TooLate;
        }
        if candidate.outpoint_lock(&outpoint).is_none() {
            debug!(txid = %tx_hash, %outpoint, "vote for an outpoint the transaction does not spend");
            return VoteOutcome::Duplicate;
        }

        debug!(txid = %tx_hash, %outpoint, %voter, "lock vote");

        for other in self.store.voted_candidates(&outpoint) {
            if other == tx_hash {
                continue;
            }
            let equivocated = self
                .store
                .candidate(&other)
                .is_some_and(|c| c.has_voter_voted(&outpoint, &voter));
            if !equivocated {
                continue;
            }
            // both candidates lose this outpoint for good
            if let Some(c) = self.store.candidate_mut(&tx_hash) {
                c.mark_outpoint_attacked(&outpoint);
            }
            if let Some(c) = self.store.candidate_mut(&other) {
                c.mark_outpoint_attacked(&outpoint);
            }
            if let Some(proof) = self
                .equivocations
                .record(&voter, &outpoint, other, tx_hash, now)
            {
                warn!(
                    %voter,
                    %outpoint,
                    first = %proof.first,
                    second = %proof.second,
                    "voter sent conflicting votes"
                );
                self.env.voters.penalize(&voter);
            }
        }
        // keep the vote even from an equivocating voter so the attack stays provable
        self.store.add_voted_outpoint(outpoint, tx_hash);

        let Some(candidate) = self.store.candidate_mut(&tx_hash) else {
            return VoteOutcome::Duplicate;
        };
        if !candidate.add_vote(vote) {
            return VoteOutcome::Duplicate;
        }

        let signatures = candidate.count_votes();
        let max = candidate
            .request()
            .map(|r| r.max_signatures(&self.config.params))
            .unwrap_or_default();
        debug!(txid = %tx_hash, signatures, max, "lock signatures");

        self.try_finalize(&tx_hash, now);
        VoteOutcome::Accepted
    }

    /// Retry buffered orphans whose candidate now carries its request.
    ///
    /// Applied orphans leave the buffer; the rest wait for their request or
    /// the sweep. Returns the number applied.
    pub fn process_orphan_votes(&mut self, now: Timestamp) -> usize {
        let mut applied = 0;
        for vote_hash in self.store.orphans().all_hashes() {
            let ready = self
                .store
                .orphans()
                .get(&vote_hash)
                .and_then(|v| self.store.candidate(&v.tx_hash))
                .is_some_and(|c| c.has_request());
            if !ready {
                continue;
            }
            if let Some(vote) = self.store.orphans_mut().remove(&vote_hash) {
                if self.apply_vote(vote, now) == VoteOutcome::Accepted {
                    applied += 1;
                }
            }
        }
        applied
    }

    fn apply_orphans_for(&mut self, tx_hash: &TxHash, now: Timestamp) {
        for vote_hash in self.store.orphans().hashes_for_tx(tx_hash) {
            if let Some(vote) = self.store.orphans_mut().remove(&vote_hash) {
                self.apply_vote(vote, now);
            }
        }
    }

    /// Whether buffered orphans alone meet the quorum on every input of `request`.
    pub fn is_enough_orphan_votes_for_tx(&self, request: &LockRequest) -> bool {
        let required = self.config.params.signatures_required;
        let tx_hash = request.hash();
        request.transaction().spent_outpoints().all(|outpoint| {
            self.store.orphans().count_for(&tx_hash, outpoint, required) >= required
        })
    }

    // ---------------------------------------------------------------
    // Finalization
    // ---------------------------------------------------------------

    /// Lock the candidate if every outpoint is ready and no conflict stands in the way.
    ///
    /// Returns `true` only when this call finalized the lock.
    pub fn try_finalize(&mut self, tx_hash: &TxHash, now: Timestamp) -> bool {
        if !self.config.enabled {
            return false;
        }
        let ready = self
            .store
            .candidate(tx_hash)
            .is_some_and(|c| c.is_all_outpoints_ready());
        if !ready || self.holds_all_locks(tx_hash) {
            return false;
        }

        debug!(txid = %tx_hash, "lock is ready to complete");
        if !self.resolve_conflicts(tx_hash, now) {
            return false;
        }
        self.lock_transaction_inputs(tx_hash);
        self.update_locked_transaction(tx_hash);
        true
    }

    /// Settle conflicts before finalizing `tx_hash`.
    ///
    /// - another finalized lock on an input proves the quorum was
    ///   compromised: both candidates are revoked and deleted, and their
    ///   requests parked in the rejected pool;
    /// - a different mempool spender is an ordinary race and simply blocks
    ///   finalization;
    /// - otherwise the transaction must be mined or have every input unspent.
    pub fn resolve_conflicts(&mut self, tx_hash: &TxHash, now: Timestamp) -> bool {
        let Some(candidate) = self.store.candidate(tx_hash) else {
            return false;
        };
        if !candidate.is_all_outpoints_ready() {
            return false;
        }
        let Some(request) = candidate.request() else {
            return false;
        };
        let inputs: Vec<Outpoint> = request.transaction().spent_outpoints().copied().collect();

        for outpoint in &inputs {
            if let Some(conflicting) = self.store.locked_outpoint(outpoint) {
                if conflicting != *tx_hash {
                    self.drop_conflicting_locks(tx_hash, &conflicting);
                    return false;
                }
            }
            if let Some(spender) = self.env.mempool.spender_of(outpoint) {
                if spender != *tx_hash {
                    warn!(txid = %tx_hash, %outpoint, "failed to complete lock, conflicts with mempool");
                    return false;
                }
            }
        }

        if let Some(block) = self.env.chain.containing_block(tx_hash) {
            debug!(txid = %tx_hash, %block, "lock resolved, transaction already mined");
            return true;
        }

        for outpoint in &inputs {
            if self.env.chain.utxo(outpoint).is_none() {
                warn!(txid = %tx_hash, %outpoint, "input no longer unspent, can't complete lock");
                return false;
            }
        }
        debug!(txid = %tx_hash, "no conflicts");
        true
    }

    fn drop_conflicting_locks(&mut self, tx_hash: &TxHash, conflicting: &TxHash) {
        if self.store.candidate(conflicting).is_none() {
            warn!(
                txid = %tx_hash,
                conflicting = %conflicting,
                "conflicting completed lock has no candidate"
            );
            return;
        }
        warn!(
            txid = %tx_hash,
            conflicting = %conflicting,
            "conflicting completed locks, dropping both"
        );

        let mut requests = Vec::with_capacity(2);
        for hash in [*tx_hash, *conflicting] {
            self.revoked.insert(hash);
            let Some(candidate) = self.remove_candidate(&hash) else {
                continue;
            };
            // votes stay indexed until the next sweep drops them
            for vote in candidate.votes() {
                if let Some(stored) = self.store.vote_mut(&vote.hash()) {
                    stored.set_confirmation(Confirmation::ForcedExpired);
                }
            }
            requests.extend(candidate.request().cloned());
        }
        // both stay known so peers cannot feed them back in
        for request in requests {
            self.store.insert_request(RequestPool::Rejected, request);
        }
    }

    /// Record `tx_hash` as the holder of every outpoint of its candidate.
    pub fn lock_transaction_inputs(&mut self, tx_hash: &TxHash) {
        if !self.config.enabled {
            return;
        }
        let Some(candidate) = self.store.candidate(tx_hash) else {
            return;
        };
        if !candidate.is_all_outpoints_ready() {
            return;
        }
        let outpoints: Vec<Outpoint> = candidate.outpoints().copied().collect();
        for outpoint in outpoints {
            self.store.lock_outpoint(outpoint, *tx_hash);
        }
        debug!(txid = %tx_hash, "transaction inputs locked");
    }

    /// Notify the listener that `tx_hash` is locked. No-op unless it is a reportable lock.
    pub fn update_locked_transaction(&mut self, tx_hash: &TxHash) {
        if !self.is_locked_transaction(tx_hash) {
            return;
        }
        let Some(tx) = self
            .store
            .candidate(tx_hash)
            .and_then(|c| c.request())
            .map(|r| r.transaction().clone())
        else {
            return;
        };
        self.completed_locks += 1;
        self.env.listener.transaction_locked(&tx);
        info!(txid = %tx_hash, "transaction locked");
    }

    /// Every outpoint of the candidate is recorded as locked to `tx_hash`.
    /// Ignores feature flags, unlike [`is_locked_transaction`](Self::is_locked_transaction).
    fn holds_all_locks(&self, tx_hash: &TxHash) -> bool {
        let Some(candidate) = self.store.candidate(tx_hash) else {
            return false;
        };
        let mut outpoints = candidate.outpoints().peekable();
        outpoints.peek().is_some()
            && outpoints.all(|o| self.store.locked_outpoint(o) == Some(*tx_hash))
    }

    // ---------------------------------------------------------------
    // Maintenance
    // ---------------------------------------------------------------

    /// Periodic sweep. Does nothing until the voter list is synced.
    ///
    /// Removes expired candidates and candidates that timed out without
    /// reaching a lock, expired and failed votes, timed-out orphans, lapsed
    /// orphan rate limits and old equivocation proofs.
    pub fn check_and_remove(&mut self, now: Timestamp) -> SweepReport {
        let mut report = SweepReport::default();
        if !self.env.voters.is_synced() {
            return report;
        }
        let params = self.config.params.clone();
        let height = self.cached_height;

        report.candidates = self.purge_candidates(now);

        let timed_out = self.store.orphans_mut().remove_timed_out(now, &params);
        for (vote_hash, vote) in timed_out {
            debug!(txid = %vote.tx_hash, voter = %vote.voter, "removing timed out orphan vote");
            self.store.remove_vote(&vote_hash);
            report.orphan_votes += 1;
        }

        for vote_hash in self.store.vote_hashes() {
            let Some(vote) = self.store.vote(&vote_hash) else {
                continue;
            };
            let locked = self.holds_all_locks(&vote.tx_hash);
            let reason = match vote.clock.stage(now, height, locked, &params) {
                Lifecycle::Expired => "removing expired vote",
                Lifecycle::Failed => "removing vote for failed lock attempt",
                Lifecycle::Live | Lifecycle::TimedOut => continue,
            };
            if let Some(vote) = self.store.remove_vote(&vote_hash) {
                debug!(txid = %vote.tx_hash, voter = %vote.voter, "{reason}");
                report.votes += 1;
            }
        }

        let lapsed = self.store.orphans_mut().prune_voters(now);
        for voter in lapsed {
            debug!(%voter, "removing orphan vote rate limit");
            report.orphan_voters += 1;
        }

        report.proofs = self.equivocations.prune(now, params.orphan_voter_keep_secs);

        info!("{}", self.summary());
        report
    }

    /// Delete expired candidates and those that timed out short of a lock.
    fn purge_candidates(&mut self, now: Timestamp) -> usize {
        let params = &self.config.params;
        let height = self.cached_height;
        let stale: Vec<TxHash> = self
            .store
            .candidate_hashes()
            .into_iter()
            .filter(|hash| {
                self.store.candidate(hash).is_some_and(|c| {
                    let locked = self.holds_all_locks(hash);
                    match c.clock.stage(now, height, locked, params) {
                        Lifecycle::Expired => true,
                        Lifecycle::TimedOut | Lifecycle::Failed => {
                            !locked && !c.is_all_outpoints_ready()
                        }
                        Lifecycle::Live => false,
                    }
                })
            })
            .collect();

        for tx_hash in &stale {
            self.remove_candidate(tx_hash);
        }
        stale.len()
    }

    /// Delete a candidate with its outpoint locks and requests. Its votes
    /// stay in the vote index until they expire or fail, so replays are
    /// still recognised.
    fn remove_candidate(&mut self, tx_hash: &TxHash) -> Option<LockCandidate> {
        let candidate = self.store.remove_candidate(tx_hash)?;
        info!(txid = %tx_hash, "removing lock candidate");
        for outpoint in candidate.outpoints() {
            if self.store.locked_outpoint(outpoint) == Some(*tx_hash) {
                self.store.unlock_outpoint(outpoint);
            }
            self.store.remove_voted(outpoint, tx_hash);
        }
        self.store.forget_request(tx_hash);
        Some(candidate)
    }

    // ---------------------------------------------------------------
    // Chain events
    // ---------------------------------------------------------------

    pub fn updated_block_tip(&mut self, height: u32) {
        self.cached_height = height;
    }

    /// `tx` was mined at `height`, or returned to the mempool (`None`).
    ///
    /// Updates the confirmation of its candidate, the candidate's votes and
    /// any orphan votes for it.
    pub fn sync_transaction(&mut self, tx: &Transaction, height: Option<u32>) {
        if tx.is_coinbase() {
            return;
        }
        let tx_hash = tx.hash();
        let confirmation = Confirmation::from_height(height);
        debug!(txid = %tx_hash, ?height, "sync transaction");

        let mut vote_hashes = Vec::new();
        if let Some(candidate) = self.store.candidate_mut(&tx_hash) {
            candidate.set_confirmation(confirmation);
            vote_hashes.extend(candidate.votes().map(|v| v.hash()));
        }
        vote_hashes.extend(self.store.orphans().hashes_for_tx(&tx_hash));

        for vote_hash in vote_hashes {
            if let Some(vote) = self.store.vote_mut(&vote_hash) {
                vote.set_confirmation(confirmation);
            }
        }
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    fn reporting_enabled(&self) -> bool {
        self.config.enabled && !self.env.chain.fork_warning()
    }

    /// The request behind `tx_hash`, if its candidate has one.
    pub fn lock_request(&self, tx_hash: &TxHash) -> Option<&LockRequest> {
        self.store.candidate(tx_hash).and_then(|c| c.request())
    }

    pub fn has_lock_request(&self, tx_hash: &TxHash) -> bool {
        self.lock_request(tx_hash).is_some()
    }

    pub fn lock_vote(&self, vote_hash: &TxHash) -> Option<&Vote> {
        self.store.vote(vote_hash)
    }

    pub fn candidate(&self, tx_hash: &TxHash) -> Option<&LockCandidate> {
        self.store.candidate(tx_hash)
    }

    pub fn locked_outpoint(&self, outpoint: &Outpoint) -> Option<TxHash> {
        self.store.locked_outpoint(outpoint)
    }

    /// Every outpoint has its quorum (conflicts not yet resolved).
    pub fn is_ready_to_lock(&self, tx_hash: &TxHash) -> bool {
        self.reporting_enabled()
            && self
                .store
                .candidate(tx_hash)
                .is_some_and(|c| c.is_all_outpoints_ready())
    }

    /// A finalized lock that blocks and wallets should honour.
    pub fn is_locked_transaction(&self, tx_hash: &TxHash) -> bool {
        self.reporting_enabled() && self.config.block_filtering && self.holds_all_locks(tx_hash)
    }

    pub fn lock_signatures(&self, tx_hash: &TxHash) -> LockSignatures {
        if !self.config.enabled {
            return LockSignatures::FeatureDisabled;
        }
        if self.env.chain.fork_warning() {
            return LockSignatures::ForkWarning;
        }
        match self.store.candidate(tx_hash) {
            Some(candidate) => LockSignatures::Count(candidate.count_votes()),
            None => LockSignatures::Unknown,
        }
    }

    /// Confirmations a wallet should credit: the configured depth for a lock, else zero.
    pub fn confirmations(&self, tx_hash: &TxHash) -> u32 {
        if self.is_locked_transaction(tx_hash) {
            self.config.depth
        } else {
            0
        }
    }

    pub fn is_candidate_timed_out(&self, tx_hash: &TxHash, now: Timestamp) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.store.candidate(tx_hash).is_some_and(|c| {
            !c.is_all_outpoints_ready() && c.is_timed_out(now, &self.config.params)
        })
    }

    /// Re-broadcast the request and every vote gathered for `tx_hash`.
    pub fn relay_candidate(&self, tx_hash: &TxHash) -> Result<(), ConsensusError> {
        let candidate = self
            .store
            .candidate(tx_hash)
            .ok_or(ConsensusError::CandidateNotFound(*tx_hash))?;
        if let Some(request) = candidate.request() {
            self.env.relay.relay_transaction(request.transaction());
        }
        for vote in candidate.votes() {
            self.env.relay.relay_vote(vote);
        }
        Ok(())
    }

    pub fn summary(&self) -> LockSummary {
        LockSummary {
            candidates: self.store.candidate_count(),
            votes: self.store.vote_count(),
            orphan_votes: self.store.orphans().len(),
            locked_outpoints: self.store.locked_count(),
        }
    }
}

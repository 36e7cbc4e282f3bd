//! A single voter's signed endorsement of one outpoint for one transaction.

use instalock_crypto::{blake2b_256_multi, sign_message, verify_signature};
use instalock_types::{KeyPair, LockParams, Outpoint, Signature, Timestamp, TxHash, VoterId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collaborators::{ChainView, VoterRegistry};
use crate::error::{ConsensusError, VoteRejection};
use crate::lifecycle::{Confirmation, LockClock};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub tx_hash: TxHash,
    pub outpoint: Outpoint,
    pub voter: VoterId,
    pub signature: Signature,
    pub clock: LockClock,
}

impl Vote {
    /// An unsigned vote created at `now`.
    pub fn new(tx_hash: TxHash, outpoint: Outpoint, voter: VoterId, now: Timestamp) -> Self {
        Self {
            tx_hash,
            outpoint,
            voter,
            signature: Signature::EMPTY,
            clock: LockClock::new(now),
        }
    }

    /// A vote received from the network, stamped with its arrival time.
    pub fn received(
        tx_hash: TxHash,
        outpoint: Outpoint,
        voter: VoterId,
        signature: Signature,
        now: Timestamp,
    ) -> Self {
        Self {
            signature,
            ..Self::new(tx_hash, outpoint, voter, now)
        }
    }

    /// Identity of the vote: hash of (transaction, outpoint, voter).
    ///
    /// The signature is not covered, so a re-signed copy is the same vote.
    pub fn hash(&self) -> TxHash {
        TxHash::new(blake2b_256_multi(&[
            self.tx_hash.as_bytes(),
            &self.outpoint.to_bytes(),
            &self.voter.collateral().to_bytes(),
        ]))
    }

    /// The signed message: transaction hash hex followed by the outpoint short form.
    pub fn signed_message(&self) -> Vec<u8> {
        format!("{}{}", self.tx_hash, self.outpoint.to_short_string()).into_bytes()
    }

    /// Sign with the local voter key and verify the result before accepting it.
    pub fn sign(&mut self, keys: &KeyPair) -> Result<(), ConsensusError> {
        let message = self.signed_message();
        let signature = sign_message(&message, &keys.private);
        if !verify_signature(&message, &signature, &keys.public) {
            return Err(ConsensusError::SigningFailed(self.voter));
        }
        self.signature = signature;
        Ok(())
    }

    pub fn check_signature(&self, voters: &dyn VoterRegistry) -> Result<(), VoteRejection> {
        let info = voters
            .voter_info(&self.voter)
            .ok_or(VoteRejection::UnknownVoter(self.voter))?;
        if !verify_signature(&self.signed_message(), &self.signature, &info.public_key) {
            return Err(VoteRejection::BadSignature(self.voter));
        }
        Ok(())
    }

    /// Full validity check for a vote arriving from the network.
    ///
    /// An unknown voter triggers a request for its announcement; the vote may
    /// validate once the voter list catches up.
    pub fn validate(
        &self,
        voters: &dyn VoterRegistry,
        chain: &dyn ChainView,
        params: &LockParams,
    ) -> Result<(), VoteRejection> {
        if voters.voter_info(&self.voter).is_none() {
            debug!(voter = %self.voter, "unknown voter, asking peers");
            voters.ask_for_voter(&self.voter);
            return Err(VoteRejection::UnknownVoter(self.voter));
        }

        let coin = chain
            .utxo(&self.outpoint)
            .ok_or(VoteRejection::MissingUtxo(self.outpoint))?;

        let lock_input_height = coin.height.saturating_add(params.rank_height_offset);
        let rank = voters
            .rank(&self.voter, lock_input_height, params.min_protocol_version)
            .ok_or(VoteRejection::RankUnavailable(self.voter))?;
        debug!(voter = %self.voter, rank, "voter ranked");

        if rank > params.signatures_total {
            return Err(VoteRejection::NotInTop {
                voter: self.voter,
                rank,
                total: params.signatures_total,
            });
        }

        self.check_signature(voters)
    }

    pub fn set_confirmation(&mut self, confirmation: Confirmation) {
        self.clock.confirmation = confirmation;
    }

    pub fn is_expired(&self, height: u32, params: &LockParams) -> bool {
        self.clock.is_expired(height, params)
    }

    pub fn is_timed_out(&self, now: Timestamp, params: &LockParams) -> bool {
        self.clock.is_timed_out(now, params)
    }

    /// `locked` is whether the voted transaction is a finalized lock.
    pub fn is_failed(&self, now: Timestamp, locked: bool, params: &LockParams) -> bool {
        self.clock.is_failed(now, locked, params)
    }
}

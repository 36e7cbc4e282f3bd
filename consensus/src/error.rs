use instalock_types::{Amount, Outpoint, TxHash, VoterId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("lock candidate {0} not found")]
    CandidateNotFound(TxHash),

    #[error("vote signature failed self-verification for voter {0}")]
    SigningFailed(VoterId),
}

/// Why a lock request failed validation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RequestRejection {
    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("transaction is not final")]
    NotFinal,

    #[error("input {0} is not an unspent output")]
    MissingInput(Outpoint),

    #[error("input {outpoint} too new: age {age}, required {required}")]
    InputTooNew {
        outpoint: Outpoint,
        age: i64,
        required: u32,
    },

    #[error("input value overflows")]
    ValueOverflow,

    #[error("transaction value too high: {value} > {max}")]
    ValueTooHigh { value: Amount, max: Amount },

    #[error("insufficient fee: {fee} < {min}")]
    InsufficientFee { fee: Amount, min: Amount },

    #[error("lock was revoked by a conflicting lock")]
    Revoked,
}

/// Why an incoming vote was not accepted.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum VoteRejection {
    #[error("unknown voter {0}")]
    UnknownVoter(VoterId),

    #[error("outpoint {0} is not an unspent output")]
    MissingUtxo(Outpoint),

    #[error("cannot calculate rank for voter {0}")]
    RankUnavailable(VoterId),

    #[error("voter {voter} not in the top {total} ({rank})")]
    NotInTop { voter: VoterId, rank: u32, total: u32 },

    #[error("invalid signature from voter {0}")]
    BadSignature(VoterId),
}

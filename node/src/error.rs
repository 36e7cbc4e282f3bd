use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("consensus error: {0}")]
    Consensus(#[from] instalock_consensus::ConsensusError),

    #[error("codec error: {0}")]
    Codec(#[from] instalock_messages::CodecError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid voter key: {0}")]
    InvalidVoterKey(String),

    #[error("logging error: {0}")]
    Logging(String),
}

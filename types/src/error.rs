//! Error type for parsing shared values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstalockError {
    #[error("invalid outpoint: {0}")]
    InvalidOutpoint(String),
}

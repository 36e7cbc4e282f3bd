//! Lock node: hosts the lock manager inside a running process.
//!
//! The node:
//! - decodes lock requests and votes from peers and routes them to the manager
//! - asks the mempool to admit proposed transactions
//! - relays valid traffic through an outbound channel
//! - runs the periodic maintenance sweep
//! - reports finalized locks through metrics and the notify command

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod notify;
pub mod shutdown;
pub mod tracing_spans;
pub mod wire;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::LockMetrics;
pub use node::{Dispatched, LockNode, NodeServices, TxAdmission};
pub use notify::NotifyListener;
pub use shutdown::ShutdownController;
pub use wire::{ChannelRelay, Outbound};

//! Cryptographic primitives for instalock.
//!
//! - **Ed25519** for vote signing and verification
//! - **Blake2b-256** for vote hashes

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{blake2b_256, blake2b_256_multi};
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};

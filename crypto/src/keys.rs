//! Ed25519 key derivation for voter signing keys.

use ed25519_dalek::SigningKey;
use instalock_types::{KeyPair, PrivateKey, PublicKey};

/// Generate a fresh key pair from the operating system's random source.
pub fn generate_keypair() -> Result<KeyPair, getrandom::Error> {
    let mut seed = [0u8; 32];
    getrandom::getrandom(&mut seed)?;
    Ok(keypair_from_seed(&seed))
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(&private.0);
    PublicKey(signing_key.verifying_key().to_bytes())
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    KeyPair {
        public: PublicKey(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_nonzero() {
        let kp = generate_keypair().expect("os rng");
        assert_ne!(kp.public.0, [0u8; 32]);
    }

    #[test]
    fn seed_derivation_is_deterministic() {
        let a = keypair_from_seed(&[5u8; 32]);
        let b = keypair_from_seed(&[5u8; 32]);
        assert_eq!(a.public, b.public);
    }

    #[test]
    fn public_from_private_matches_pair() {
        let kp = keypair_from_seed(&[8u8; 32]);
        assert_eq!(public_from_private(&kp.private), kp.public);
    }
}

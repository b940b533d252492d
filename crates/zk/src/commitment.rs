//! Secret commitments.
//!
//! A commitment binds a player's 3-digit secret without revealing it.
//! The scheme is fixed for the lifetime of a session: SHA-256 over a
//! domain tag, the protocol salt, and the padded digit sequence. The
//! salt is a shared protocol constant, not a per-session secret — it
//! exists to separate this hash domain from any other use of the same
//! primitive, and callers must not rely on it for secrecy.

use sha2::{Digest, Sha256};
use thiserror::Error;

use game_core::{Commitment, Secret};

/// Protocol-wide domain-separation salt, shared by every client.
pub const PROTOCOL_SALT: &[u8] = b"pass/secret-commitment/v1";

const DOMAIN_TAG: &[u8] = b"pass.commit";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitmentError {
    /// The underlying commitment engine could not produce a value.
    #[error("commitment engine unavailable: {0}")]
    Unavailable(String),
}

/// Deterministic builder wrapping the commitment primitive.
///
/// Identical `(secret, salt)` inputs always yield the identical
/// commitment, so a proof produced later can be checked against the
/// value registered at setup time.
#[derive(Debug, Clone)]
pub struct CommitmentBuilder {
    salt: Vec<u8>,
}

impl CommitmentBuilder {
    pub fn new(salt: impl Into<Vec<u8>>) -> Self {
        Self { salt: salt.into() }
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn commit(&self, secret: Secret) -> Result<Commitment, CommitmentError> {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_TAG);
        hasher.update((self.salt.len() as u64).to_le_bytes());
        hasher.update(&self.salt);
        hasher.update(secret.digits());
        Ok(Commitment(hasher.finalize().into()))
    }
}

impl Default for CommitmentBuilder {
    fn default() -> Self {
        Self::new(PROTOCOL_SALT)
    }
}

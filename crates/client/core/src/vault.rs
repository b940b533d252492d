//! Local custody of plaintext secrets.
//!
//! A secret never leaves the client unencrypted; the vault is the only
//! component allowed to hold it. Storage is keyed by
//! `(SessionId, PlayerAddress)` so a harness simulating both players can
//! switch identities and transparently see the right secret — a testing
//! convenience, not a security boundary.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use game_core::{PlayerAddress, Secret, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("secret storage failed: {0}")]
    Storage(String),
}

/// Pluggable secret storage capability.
///
/// Kept as a trait so the same state machine runs against an in-memory
/// vault in tests and a persistent one in a real client. No network
/// calls, no side effects beyond persistence.
pub trait SecretStore: Send + Sync {
    fn put(
        &self,
        session: SessionId,
        address: &PlayerAddress,
        secret: Secret,
    ) -> Result<(), VaultError>;

    fn get(&self, session: SessionId, address: &PlayerAddress)
    -> Result<Option<Secret>, VaultError>;

    /// Remove every secret stored for a session, all identities included.
    fn clear(&self, session: SessionId) -> Result<(), VaultError>;
}

/// In-memory vault.
#[derive(Debug, Default)]
pub struct MemoryVault {
    entries: Mutex<HashMap<(SessionId, PlayerAddress), Secret>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemoryVault {
    fn put(
        &self,
        session: SessionId,
        address: &PlayerAddress,
        secret: Secret,
    ) -> Result<(), VaultError> {
        self.entries
            .lock()
            .unwrap()
            .insert((session, address.clone()), secret);
        Ok(())
    }

    fn get(
        &self,
        session: SessionId,
        address: &PlayerAddress,
    ) -> Result<Option<Secret>, VaultError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(session, address.clone()))
            .copied())
    }

    fn clear(&self, session: SessionId) -> Result<(), VaultError> {
        self.entries
            .lock()
            .unwrap()
            .retain(|(sid, _), _| *sid != session);
        Ok(())
    }
}

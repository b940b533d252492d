//! Client-facing error taxonomy.
//!
//! Pure components return their own typed errors; this enum is the
//! aggregation the session handle exposes. Every variant maps to one
//! actionable message: fix your input, wait for the opponent, or start
//! a new session.

use thiserror::Error;

use client_blockchain_core::LedgerError;
use game_core::DomainError;
use zk::{CommitmentError, ProverError};

use crate::invitation::InvitationError;
use crate::vault::VaultError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid secret or guess shape; rejected before any remote call.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Invitation(#[from] InvitationError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Commitment(#[from] CommitmentError),

    /// Constraint violations here mean the local secret no longer
    /// matches the registered commitment: unrecoverable for this
    /// session, start a new one.
    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Another user-initiated action is already in flight for this
    /// session; rejected to prevent duplicate submissions.
    #[error("another action is in progress for this session")]
    Busy,

    /// No secret stored locally for this identity and session.
    #[error("no local secret for this session; choose one first")]
    SecretMissing,

    /// The secret is committed remotely; replacing the local plaintext
    /// would make every future proof unverifiable.
    #[error("secret already committed for this session and cannot change")]
    SecretLocked,

    /// Opponent has not guessed yet; there is nothing to score or prove.
    #[error("opponent has not guessed yet; wait for the next poll")]
    OpponentNotReady,

    /// The action is not legal in the current locally derived phase.
    #[error("action not available in phase {0:?}")]
    PhaseGate(game_core::Phase),
}

impl ClientError {
    /// True for conditions that resolve themselves by waiting for the
    /// counterparty or the next poll.
    pub fn is_wait(&self) -> bool {
        match self {
            ClientError::OpponentNotReady => true,
            ClientError::Ledger(err) => err.is_retryable(),
            _ => false,
        }
    }
}

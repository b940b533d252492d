//! Ledger trait surface and failure signals.

use async_trait::async_trait;

use game_core::{Commitment, Guess, PlayerAddress, ProofStats, SessionId, SessionSnapshot};
use zk::ProofArtifact;

/// Failure signals from the remote session contract.
///
/// The retry policy lives entirely in the reconciliation loop; these
/// variants only classify. `NotAllReady` and `Transport` are the benign,
/// retryable ones.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("session {0} already exists")]
    SessionExists(SessionId),

    /// The acting identity is not one of the session's two players.
    /// Fatal for this session from this identity; never retried.
    #[error("address is not a participant in this session")]
    NotAParticipant,

    /// The identity already performed this action for the current round.
    #[error("already acted this round")]
    AlreadyActed,

    /// Action is not legal in the session's current remote phase. When
    /// the remote raises this, the local phase view is stale: re-fetch
    /// and re-derive before retrying.
    #[error("wrong phase for this action")]
    WrongPhase,

    /// Not all participants have acted yet. Benign; wait for the next
    /// poll rather than treating as a failure.
    #[error("not all participants ready yet")]
    NotAllReady,

    /// Network or RPC failure; retried on the next scheduled tick.
    #[error("transport error: {0}")]
    Transport(String),
}

impl LedgerError {
    /// Errors the reconciliation loop absorbs and retries silently.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::NotAllReady | LedgerError::Transport(_))
    }
}

/// Result of a `verify` call.
///
/// `verify` is idempotent from the caller's perspective: once a session
/// is resolved, further calls return [`VerifyOutcome::AlreadyResolved`]
/// and never double-apply the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Winner(PlayerAddress),
    Draw,
    /// Nobody fully matched; round data was cleared for the next round.
    NextRound,
    AlreadyResolved,
}

/// Remote session contract surface consumed by the client core.
///
/// Backends are expected to serialize conflicting writes; two clients
/// racing on the same session must never corrupt it.
#[async_trait]
pub trait SessionLedger: Send + Sync {
    /// Finalize session creation from an invitation: both players,
    /// both stakes, one shot. Either a live session exists afterwards
    /// or nothing does.
    async fn create_session(
        &self,
        session: SessionId,
        player1: PlayerAddress,
        player2: PlayerAddress,
        stake1: i128,
        stake2: i128,
    ) -> Result<(), LedgerError>;

    /// Register a player's secret commitment during setup.
    async fn register_commitment(
        &self,
        session: SessionId,
        player: &PlayerAddress,
        commitment: Commitment,
    ) -> Result<(), LedgerError>;

    /// Submit the player's guess for the current round.
    async fn submit_guess(
        &self,
        session: SessionId,
        player: &PlayerAddress,
        guess: Guess,
    ) -> Result<(), LedgerError>;

    /// Submit the player's proof statistics plus the proof artifact.
    async fn submit_proof(
        &self,
        session: SessionId,
        player: &PlayerAddress,
        stats: ProofStats,
        artifact: ProofArtifact,
    ) -> Result<(), LedgerError>;

    /// Resolve the round once both proofs are present.
    async fn verify(
        &self,
        session: SessionId,
        caller: &PlayerAddress,
    ) -> Result<VerifyOutcome, LedgerError>;

    /// Fetch a fresh snapshot of the session. Never cached client-side.
    async fn get_snapshot(&self, session: SessionId) -> Result<SessionSnapshot, LedgerError>;
}

//! In-memory ledger for testing without a chain.
//!
//! Reproduces the contract's transition rules: commitments only during
//! setup, one guess and one proof per player per round, stats-based
//! resolution, and round clearing when nobody fully matches. Writes are
//! serialized by a single mutex, standing in for the chain's ordering.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use game_core::{
    Commitment, Guess, PlayerAddress, PlayerState, ProofStats, RemoteStatus, SessionId,
    SessionSnapshot,
};
use zk::ProofArtifact;

use crate::traits::{LedgerError, SessionLedger, VerifyOutcome};

#[derive(Debug, Clone)]
struct StoredSession {
    snapshot: SessionSnapshot,
    artifacts: [Option<ProofArtifact>; 2],
}

/// Mock ledger holding sessions in memory.
#[derive(Clone, Default)]
pub struct MockLedger {
    sessions: Arc<Mutex<HashMap<SessionId, StoredSession>>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionLedger for MockLedger {
    async fn create_session(
        &self,
        session: SessionId,
        player1: PlayerAddress,
        player2: PlayerAddress,
        stake1: i128,
        stake2: i128,
    ) -> Result<(), LedgerError> {
        if player1 == player2 {
            return Err(LedgerError::NotAParticipant);
        }

        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&session) {
            return Err(LedgerError::SessionExists(session));
        }

        sessions.insert(
            session,
            StoredSession {
                snapshot: SessionSnapshot {
                    session_id: session,
                    player1: PlayerState::new(player1, stake1),
                    player2: PlayerState::new(player2, stake2),
                    status: RemoteStatus::Setup,
                    winner: None,
                },
                artifacts: [None, None],
            },
        );
        Ok(())
    }

    async fn register_commitment(
        &self,
        session: SessionId,
        player: &PlayerAddress,
        commitment: Commitment,
    ) -> Result<(), LedgerError> {
        let mut sessions = self.sessions.lock().unwrap();
        let stored = sessions
            .get_mut(&session)
            .ok_or(LedgerError::SessionNotFound(session))?;
        let snap = &mut stored.snapshot;

        if snap.status != RemoteStatus::Setup {
            return Err(LedgerError::WrongPhase);
        }

        let slot = snap
            .slot_of(player)
            .ok_or(LedgerError::NotAParticipant)?;
        let state = match slot {
            game_core::PlayerSlot::Player1 => &mut snap.player1,
            game_core::PlayerSlot::Player2 => &mut snap.player2,
        };
        if state.commitment.is_some() {
            return Err(LedgerError::AlreadyActed);
        }
        state.commitment = Some(commitment);

        if snap.both_committed() {
            snap.status = RemoteStatus::Playing;
        }
        Ok(())
    }

    async fn submit_guess(
        &self,
        session: SessionId,
        player: &PlayerAddress,
        guess: Guess,
    ) -> Result<(), LedgerError> {
        let mut sessions = self.sessions.lock().unwrap();
        let stored = sessions
            .get_mut(&session)
            .ok_or(LedgerError::SessionNotFound(session))?;
        let snap = &mut stored.snapshot;

        if snap.status != RemoteStatus::Playing {
            return Err(LedgerError::WrongPhase);
        }

        let slot = snap
            .slot_of(player)
            .ok_or(LedgerError::NotAParticipant)?;
        let state = match slot {
            game_core::PlayerSlot::Player1 => &mut snap.player1,
            game_core::PlayerSlot::Player2 => &mut snap.player2,
        };
        if state.last_guess.is_some() {
            return Err(LedgerError::AlreadyActed);
        }
        state.last_guess = Some(guess);
        Ok(())
    }

    async fn submit_proof(
        &self,
        session: SessionId,
        player: &PlayerAddress,
        stats: ProofStats,
        artifact: ProofArtifact,
    ) -> Result<(), LedgerError> {
        let mut sessions = self.sessions.lock().unwrap();
        let stored = sessions
            .get_mut(&session)
            .ok_or(LedgerError::SessionNotFound(session))?;
        let snap = &mut stored.snapshot;

        if snap.status != RemoteStatus::Playing {
            return Err(LedgerError::WrongPhase);
        }
        if !snap.both_guessed() {
            return Err(LedgerError::NotAllReady);
        }

        let slot = snap
            .slot_of(player)
            .ok_or(LedgerError::NotAParticipant)?;
        let (state, artifact_slot) = match slot {
            game_core::PlayerSlot::Player1 => (&mut snap.player1, &mut stored.artifacts[0]),
            game_core::PlayerSlot::Player2 => (&mut snap.player2, &mut stored.artifacts[1]),
        };
        if state.proof_stats.is_some() {
            return Err(LedgerError::AlreadyActed);
        }
        state.proof_stats = Some(stats);
        *artifact_slot = Some(artifact);
        Ok(())
    }

    async fn verify(
        &self,
        session: SessionId,
        caller: &PlayerAddress,
    ) -> Result<VerifyOutcome, LedgerError> {
        let mut sessions = self.sessions.lock().unwrap();
        let stored = sessions
            .get_mut(&session)
            .ok_or(LedgerError::SessionNotFound(session))?;
        let snap = &mut stored.snapshot;

        snap.slot_of(caller).ok_or(LedgerError::NotAParticipant)?;

        // Redundant verify after resolution re-confirms harmlessly.
        if snap.status == RemoteStatus::Finished {
            return Ok(VerifyOutcome::AlreadyResolved);
        }
        if snap.status != RemoteStatus::Playing {
            return Err(LedgerError::WrongPhase);
        }

        let (p1_stats, p2_stats) = match (snap.player1.proof_stats, snap.player2.proof_stats) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(LedgerError::NotAllReady),
        };

        // A player's stats score the opponent's guess against that
        // player's own secret, so a full match in player1's stats means
        // player2 cracked the secret.
        let p2_cracked = p1_stats.is_full_match();
        let p1_cracked = p2_stats.is_full_match();

        let outcome = match (p1_cracked, p2_cracked) {
            (true, true) => {
                snap.status = RemoteStatus::Finished;
                VerifyOutcome::Draw
            }
            (true, false) => {
                snap.status = RemoteStatus::Finished;
                snap.winner = Some(snap.player1.address.clone());
                VerifyOutcome::Winner(snap.player1.address.clone())
            }
            (false, true) => {
                snap.status = RemoteStatus::Finished;
                snap.winner = Some(snap.player2.address.clone());
                VerifyOutcome::Winner(snap.player2.address.clone())
            }
            (false, false) => {
                // Nobody hit; clear the round so both clients loop back
                // to guessing against fresh state.
                snap.player1.last_guess = None;
                snap.player2.last_guess = None;
                snap.player1.proof_stats = None;
                snap.player2.proof_stats = None;
                stored.artifacts = [None, None];
                VerifyOutcome::NextRound
            }
        };

        debug!(session = %session, ?outcome, "verify resolved");
        Ok(outcome)
    }

    async fn get_snapshot(&self, session: SessionId) -> Result<SessionSnapshot, LedgerError> {
        self.sessions
            .lock()
            .unwrap()
            .get(&session)
            .map(|stored| stored.snapshot.clone())
            .ok_or(LedgerError::SessionNotFound(session))
    }
}

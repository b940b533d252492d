//! Phase derivation: the single place remote state becomes a client phase.
//!
//! The phase is never stored as ground truth. Every poll re-derives it
//! from the freshest snapshot, so the two independently-acting clients
//! can never disagree for longer than one polling interval.

use serde::{Deserialize, Serialize};

use crate::ids::PlayerSlot;
use crate::snapshot::{RemoteStatus, SessionSnapshot};

/// Final result of a resolved session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Both players fully matched in the same round.
    Draw,
    Winner(PlayerSlot),
}

/// Client-visible protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No remote session exists yet and no invitation is outstanding.
    /// Never produced by `derive_phase` or the session client, which
    /// start tracking only once an invitation exists; callers modeling
    /// the pre-invitation state hold this variant themselves.
    Created,
    /// Invitation issued; waiting for the counterparty to finalize.
    WaitingForCounterparty,
    /// Session live, at least one secret commitment missing.
    SecretSetup,
    /// Both commitments registered, at least one guess outstanding.
    Guessing,
    /// Both guesses in; waiting for proof stats and resolution.
    AwaitingProofs,
    /// Outcome recorded on the ledger.
    Resolved(Outcome),
    /// Resolution acknowledged by the caller; the session is spent.
    Terminal,
}

impl Phase {
    /// True once the game can no longer progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Resolved(_) | Phase::Terminal)
    }
}

/// Derive the phase for an existing remote session.
///
/// Pure and idempotent; depends only on presence/absence of commitments,
/// guesses, and proof stats plus the explicit status tag — never on the
/// order in which they arrived.
///
/// A contradictory snapshot (winner recorded but status not finished)
/// must not crash the client mid-game: the winner is the strongest
/// signal, so it takes precedence and the inconsistency is logged.
pub fn derive_phase(snapshot: &SessionSnapshot) -> Phase {
    if let Some(winner) = &snapshot.winner {
        if snapshot.status != RemoteStatus::Finished {
            tracing::warn!(
                session = %snapshot.session_id,
                status = ?snapshot.status,
                "snapshot has a winner but a non-finished status; treating as resolved"
            );
        }
        // A winner we cannot attribute to either slot is equally
        // contradictory; fall back to draw semantics rather than panic.
        return match snapshot.slot_of(winner) {
            Some(slot) => Phase::Resolved(Outcome::Winner(slot)),
            None => {
                tracing::warn!(
                    session = %snapshot.session_id,
                    "winner address matches neither participant; treating as draw"
                );
                Phase::Resolved(Outcome::Draw)
            }
        };
    }

    if snapshot.status == RemoteStatus::Finished {
        return Phase::Resolved(Outcome::Draw);
    }

    if !snapshot.both_committed() {
        return Phase::SecretSetup;
    }

    // A round where nobody fully matched is cleared remotely (guesses and
    // stats wiped), which lands back here as plain Guessing.
    if snapshot.both_guessed() {
        Phase::AwaitingProofs
    } else {
        Phase::Guessing
    }
}

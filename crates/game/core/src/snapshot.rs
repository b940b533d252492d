//! Point-in-time reads of authoritative remote session state.

use serde::{Deserialize, Serialize};

use crate::digits::Guess;
use crate::ids::{PlayerAddress, PlayerSlot, SessionId};
use crate::scoring::ProofStats;

/// A secret commitment as registered on the ledger.
///
/// Opaque to the client: produced by the commitment builder, checked by
/// the external verifier. The client only compares for presence/equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Remote status tag as stored by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteStatus {
    /// Session created, waiting for secret commitments.
    Setup,
    /// Both commitments registered, rounds in progress.
    Playing,
    /// Outcome recorded; `winner` distinguishes win from draw.
    Finished,
}

/// One player's slice of the remote session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub address: PlayerAddress,
    pub stake: i128,
    pub commitment: Option<Commitment>,
    pub last_guess: Option<Guess>,
    /// Proof statistics submitted for the current round, if any.
    pub proof_stats: Option<ProofStats>,
}

impl PlayerState {
    pub fn new(address: PlayerAddress, stake: i128) -> Self {
        Self {
            address,
            stake,
            commitment: None,
            last_guess: None,
            proof_stats: None,
        }
    }
}

/// Immutable read of remote session state at a point in time.
///
/// Owned by the ledger; the client only ever holds copies and re-derives
/// its phase from the latest one rather than trusting local bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub player1: PlayerState,
    pub player2: PlayerState,
    pub status: RemoteStatus,
    pub winner: Option<PlayerAddress>,
}

impl SessionSnapshot {
    /// Resolve the slot the given address occupies, if it is a participant.
    pub fn slot_of(&self, address: &PlayerAddress) -> Option<PlayerSlot> {
        if &self.player1.address == address {
            Some(PlayerSlot::Player1)
        } else if &self.player2.address == address {
            Some(PlayerSlot::Player2)
        } else {
            None
        }
    }

    pub fn player(&self, slot: PlayerSlot) -> &PlayerState {
        match slot {
            PlayerSlot::Player1 => &self.player1,
            PlayerSlot::Player2 => &self.player2,
        }
    }

    pub fn both_committed(&self) -> bool {
        self.player1.commitment.is_some() && self.player2.commitment.is_some()
    }

    pub fn both_guessed(&self) -> bool {
        self.player1.last_guess.is_some() && self.player2.last_guess.is_some()
    }

    pub fn both_proved(&self) -> bool {
        self.player1.proof_stats.is_some() && self.player2.proof_stats.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            session_id: SessionId::new(7).unwrap(),
            player1: PlayerState::new(PlayerAddress::new("alice"), 10),
            player2: PlayerState::new(PlayerAddress::new("bob"), 20),
            status: RemoteStatus::Setup,
            winner: None,
        }
    }

    #[test]
    fn slot_resolution() {
        let snap = snapshot();
        assert_eq!(
            snap.slot_of(&PlayerAddress::new("alice")),
            Some(PlayerSlot::Player1)
        );
        assert_eq!(
            snap.slot_of(&PlayerAddress::new("bob")),
            Some(PlayerSlot::Player2)
        );
        assert_eq!(snap.slot_of(&PlayerAddress::new("mallory")), None);
    }

    #[test]
    fn commitment_displays_as_hex() {
        let commitment = Commitment([0xab; 32]);
        assert_eq!(commitment.to_string(), "ab".repeat(32));
    }
}

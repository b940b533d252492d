//! Session and player identifiers.

use serde::{Deserialize, Serialize};

/// Stable session identifier, chosen client-side at creation time.
///
/// Zero is reserved as the invalid/sentinel value and is rejected by the
/// constructor; every session-scoped structure (local and remote) is keyed
/// by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u32);

impl SessionId {
    pub fn new(raw: u32) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    /// Draw a random nonzero id for a new session.
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        loop {
            let raw: u32 = rng.r#gen();
            if raw != 0 {
                return Self(raw);
            }
        }
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque ledger account identifier for a player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerAddress(String);

impl PlayerAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which of the two session slots an address occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerSlot {
    Player1,
    Player2,
}

impl PlayerSlot {
    pub fn opponent(self) -> Self {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_session_id_rejected() {
        assert!(SessionId::new(0).is_none());
        assert_eq!(SessionId::new(42).map(|s| s.as_u32()), Some(42));
    }

    #[test]
    fn random_session_id_is_nonzero() {
        for _ in 0..64 {
            assert_ne!(SessionId::random().as_u32(), 0);
        }
    }

    #[test]
    fn opponent_slot_flips() {
        assert_eq!(PlayerSlot::Player1.opponent(), PlayerSlot::Player2);
        assert_eq!(PlayerSlot::Player2.opponent(), PlayerSlot::Player1);
    }
}

//! Pure domain types and rules for the sealed-guess duel.
//!
//! Everything in this crate is deterministic and side-effect free: digit
//! values, match scoring, and the phase derivation that turns a remote
//! session snapshot into the client-visible protocol phase. Network,
//! storage, and proving live in the client crates.

pub mod digits;
pub mod ids;
pub mod phase;
pub mod scoring;
pub mod snapshot;

pub use digits::{DIGIT_COUNT, DomainError, Guess, Secret};
pub use ids::{PlayerAddress, PlayerSlot, SessionId};
pub use phase::{Outcome, Phase, derive_phase};
pub use scoring::{ProofStats, score, score_opt};
pub use snapshot::{Commitment, PlayerState, RemoteStatus, SessionSnapshot};

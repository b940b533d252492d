//! Client core for the sealed-guess duel.
//!
//! Coordinates one local identity through the commit/reveal protocol
//! against the remote ledger: secret custody, invitation handshake,
//! per-session handle with phase gating, and the reconciliation loop
//! that polls remote state and drives side effects. Two instances of
//! this crate (one per player) converge on the same session with no
//! coordinator other than the ledger itself.

pub mod config;
pub mod error;
pub mod events;
pub mod handle;
pub mod invitation;
pub mod reconcile;
pub mod vault;

pub use config::ClientConfig;
pub use error::ClientError;
pub use events::{EventBus, SessionEvent};
pub use handle::{ClientContext, SessionHandle};
pub use invitation::{Invitation, InvitationError};
pub use reconcile::{LoopHandle, ReconciliationLoop};
pub use vault::{MemoryVault, SecretStore, VaultError};

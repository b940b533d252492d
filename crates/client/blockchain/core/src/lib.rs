//! Ledger abstraction for the sealed-guess duel.
//!
//! The remote contract is the authoritative holder of session state and
//! the arbiter of legal transitions; this crate defines the trait surface
//! the client core drives and the typed failure signals it reacts to.
//! Concrete chain backends implement [`SessionLedger`]; the in-memory
//! [`MockLedger`] reproduces the contract's transition rules for tests.

pub mod mock;
pub mod traits;

pub use mock::MockLedger;
pub use traits::{LedgerError, SessionLedger, VerifyOutcome};

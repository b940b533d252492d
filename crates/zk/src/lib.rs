//! Commitment and proving interface for the sealed-guess protocol.
//!
//! The client never interprets proofs; it binds a secret to a commitment
//! before play and later obtains an opaque proof artifact attesting that
//! the published statistics match the committed secret. Real circuits
//! live behind the [`SecretProver`] trait; the in-tree [`StubProver`]
//! enforces the same constraints natively for development and tests.

pub mod commitment;
pub mod prover;

pub use commitment::{CommitmentBuilder, CommitmentError, PROTOCOL_SALT};
pub use prover::{ProofArtifact, ProverError, PublicInputs, SecretProver, StubProver};

//! Prover interface for round statistics.
//!
//! A proof attests that `stats == score(secret, guess)` for the secret
//! bound by a previously registered commitment, without revealing the
//! secret. Backends implement [`SecretProver`]; the stub backend checks
//! the same constraints natively and emits a dummy artifact.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use game_core::{Commitment, Guess, ProofStats, Secret, score};

use crate::commitment::{CommitmentBuilder, CommitmentError};

/// Public inputs carried alongside a proof artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs {
    pub commitment: Commitment,
    pub guess: Guess,
    pub stats: ProofStats,
}

/// Opaque proof of one scored round.
///
/// The client treats this as a capability token to submit, never as data
/// to interpret; only the external verifier reads the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact {
    pub bytes: Vec<u8>,
    pub public_inputs: PublicInputs,
}

#[derive(Debug, Clone, Error)]
pub enum ProverError {
    /// The witness does not satisfy the circuit: the locally held secret
    /// is inconsistent with the registered commitment or the claimed
    /// stats. Hard failure — retrying cannot help, the caller must
    /// surface it for manual recovery.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Transient backend failure (process, IO, remote prover). Retryable.
    #[error("proving backend failed: {0}")]
    Backend(String),

    #[error(transparent)]
    Commitment(#[from] CommitmentError),
}

impl ProverError {
    /// Constraint violations are the only non-retryable prover failures.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProverError::ConstraintViolation(_))
    }
}

/// Proving backend seam.
///
/// `prove` is CPU-bound and potentially slow; callers run it off the
/// async timer (`tokio::task::spawn_blocking`) so proving never stalls
/// a poll tick.
pub trait SecretProver: Send + Sync {
    /// Prove that `stats` is the true score of `guess` against the
    /// secret bound by `registered`.
    fn prove(
        &self,
        secret: Secret,
        guess: Guess,
        stats: ProofStats,
        registered: &Commitment,
    ) -> Result<ProofArtifact, ProverError>;
}

/// Development prover.
///
/// Performs the circuit's checks natively — commitment re-derivation and
/// score recomputation — and emits a dummy artifact. No cryptographic
/// guarantees; do not use in production.
#[derive(Debug, Clone, Default)]
pub struct StubProver {
    builder: CommitmentBuilder,
}

impl StubProver {
    pub fn new(builder: CommitmentBuilder) -> Self {
        Self { builder }
    }
}

impl SecretProver for StubProver {
    fn prove(
        &self,
        secret: Secret,
        guess: Guess,
        stats: ProofStats,
        registered: &Commitment,
    ) -> Result<ProofArtifact, ProverError> {
        let derived = self.builder.commit(secret)?;
        if &derived != registered {
            return Err(ProverError::ConstraintViolation(
                "secret does not match the registered commitment".to_string(),
            ));
        }

        let expected = score(secret, guess);
        if expected != stats {
            return Err(ProverError::ConstraintViolation(format!(
                "claimed stats {stats:?} differ from computed {expected:?}"
            )));
        }

        let mut bytes = vec![0x5b, 0x7f];
        bytes.extend_from_slice(registered.as_bytes());
        bytes.extend_from_slice(&guess.value().to_le_bytes());
        bytes.extend_from_slice(&[stats.acertos, stats.permutados, stats.erros]);

        Ok(ProofArtifact {
            bytes,
            public_inputs: PublicInputs {
                commitment: *registered,
                guess,
                stats,
            },
        })
    }
}

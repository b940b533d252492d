//! Three-digit secret and guess values.
//!
//! Both are plain decimal values in `0..=999` where leading zeros are
//! significant: `42` is the digit sequence `0 4 2`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal digits in a secret or guess.
pub const DIGIT_COUNT: usize = 3;

const MAX_VALUE: u16 = 999;

/// Input validation errors for secrets and guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid secret: {0} is not representable as {DIGIT_COUNT} decimal digits")]
    InvalidSecret(u32),

    #[error("invalid guess: {0} is not representable as {DIGIT_COUNT} decimal digits")]
    InvalidGuess(u32),
}

/// A player's private 3-digit value.
///
/// Never transmitted in plaintext; once its commitment is registered
/// remotely the stored value must remain stable for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(u16);

impl Secret {
    pub fn new(value: u32) -> Result<Self, DomainError> {
        u16::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_VALUE)
            .map(Self)
            .ok_or(DomainError::InvalidSecret(value))
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// Digits most-significant first, left-padded with zeros.
    pub fn digits(&self) -> [u8; DIGIT_COUNT] {
        split_digits(self.0)
    }
}

/// A 3-digit guess at the opponent's secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guess(u16);

impl Guess {
    pub fn new(value: u32) -> Result<Self, DomainError> {
        u16::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_VALUE)
            .map(Self)
            .ok_or(DomainError::InvalidGuess(value))
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn digits(&self) -> [u8; DIGIT_COUNT] {
        split_digits(self.0)
    }
}

fn split_digits(value: u16) -> [u8; DIGIT_COUNT] {
    [
        (value / 100 % 10) as u8,
        (value / 10 % 10) as u8,
        (value % 10) as u8,
    ]
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

impl std::fmt::Display for Guess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

//! Match statistics between a secret and an opponent's guess.

use serde::{Deserialize, Serialize};

use crate::digits::{DIGIT_COUNT, Guess, Secret};

/// Proof statistics for one scored guess.
///
/// Invariant: `acertos + permutados + erros == DIGIT_COUNT` for any scored
/// guess. Both clients must compute identical stats for the same inputs,
/// so the scoring order below is part of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStats {
    /// Exact-position matches.
    pub acertos: u8,
    /// Right digit, wrong position.
    pub permutados: u8,
    /// Digits with no match at all.
    pub erros: u8,
}

impl ProofStats {
    /// True when every digit matched in position, i.e. the guess equals
    /// the secret.
    pub fn is_full_match(&self) -> bool {
        self.acertos as usize == DIGIT_COUNT
    }
}

/// Score a guess against a secret.
///
/// Two passes over the padded digit sequences:
///
/// 1. Exact matches: positions where secret and guess agree are counted
///    as `acertos` and consumed on both sides.
/// 2. Displaced matches: each unconsumed guess position, in ascending
///    order, claims the first unconsumed secret position holding the same
///    digit. First-found ascending order is the protocol tie-break; each
///    secret digit satisfies at most one displaced match.
pub fn score(secret: Secret, guess: Guess) -> ProofStats {
    let secret_digits = secret.digits();
    let guess_digits = guess.digits();

    let mut secret_used = [false; DIGIT_COUNT];
    let mut guess_used = [false; DIGIT_COUNT];

    let mut acertos = 0u8;
    for i in 0..DIGIT_COUNT {
        if secret_digits[i] == guess_digits[i] {
            acertos += 1;
            secret_used[i] = true;
            guess_used[i] = true;
        }
    }

    let mut permutados = 0u8;
    for i in 0..DIGIT_COUNT {
        if guess_used[i] {
            continue;
        }
        for j in 0..DIGIT_COUNT {
            if !secret_used[j] && secret_digits[j] == guess_digits[i] {
                permutados += 1;
                secret_used[j] = true;
                break;
            }
        }
    }

    ProofStats {
        acertos,
        permutados,
        erros: DIGIT_COUNT as u8 - acertos - permutados,
    }
}

/// Score against an optional guess.
///
/// `None` means "not yet scoreable" — the opponent has not guessed. This
/// is distinct from an all-`erros` result, which is a legitimate score.
pub fn score_opt(secret: Secret, guess: Option<Guess>) -> Option<ProofStats> {
    guess.map(|g| score(secret, g))
}

// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::secret::Secret;
use subtle::{Choice, ConstantTimeEq};

/// How the per-byte comparison walks the secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    /// Stops at the first missing or differing byte. Running time depends on
    /// the length of the matching prefix.
    #[default]
    EarlyExit,
    /// Always visits every index of the secret. Denials carry no index.
    ConstantTime,
}

/// What happens to input bytes past the secret's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthPolicy {
    /// Extra bytes deny the attempt.
    #[default]
    Exact,
    /// Extra bytes are never examined; a matching prefix is enough.
    Prefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Input ended at `len` bytes, before the secret did.
    ShortInput { len: usize },
    /// A byte differed. `index` is `None` under [`CompareMode::ConstantTime`].
    Mismatch { index: Option<usize> },
    /// Input matched but ran on to `len` bytes under [`LengthPolicy::Exact`].
    TrailingInput { len: usize },
    /// The fault guard saw the decision change between evaluations.
    FaultDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Granted,
    Denied(DenyReason),
}

impl Outcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Outcome::Granted)
    }
}

/// Compares a line against the secret.
///
/// Only indices below `secret.len()` are ever paired up, and a missing input
/// byte is detected from the input's length, never by reading past it.
pub fn compare(
    secret: &Secret<'_>,
    input: &[u8],
    mode: CompareMode,
    length: LengthPolicy,
) -> Outcome {
    let outcome = match mode {
        CompareMode::EarlyExit => compare_early_exit(secret.as_bytes(), input),
        CompareMode::ConstantTime => compare_constant_time(secret.as_bytes(), input),
    };
    match outcome {
        Outcome::Granted if length == LengthPolicy::Exact && input.len() > secret.len() => {
            Outcome::Denied(DenyReason::TrailingInput { len: input.len() })
        }
        other => other,
    }
}

fn compare_early_exit(secret: &[u8], input: &[u8]) -> Outcome {
    for (index, &expected) in secret.iter().enumerate() {
        match input.get(index) {
            None => return Outcome::Denied(DenyReason::ShortInput { len: input.len() }),
            Some(&actual) if actual != expected => {
                return Outcome::Denied(DenyReason::Mismatch { index: Some(index) })
            }
            Some(_) => {}
        }
    }
    Outcome::Granted
}

fn compare_constant_time(secret: &[u8], input: &[u8]) -> Outcome {
    let mut equal = Choice::from(1);
    let mut present = Choice::from(1);
    for (index, expected) in secret.iter().enumerate() {
        let in_range = Choice::from(u8::from(index < input.len()));
        // Missing bytes compare against themselves and are caught by `present`.
        let actual = input.get(index).copied().unwrap_or(*expected);
        equal &= actual.ct_eq(expected);
        present &= in_range;
    }

    if bool::from(equal & present) {
        Outcome::Granted
    } else if !bool::from(present) {
        Outcome::Denied(DenyReason::ShortInput { len: input.len() })
    } else {
        Outcome::Denied(DenyReason::Mismatch { index: None })
    }
}

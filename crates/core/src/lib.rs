// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Core of the PassGate controller: one boot reads one line, compares it to a
//! build-time secret and latches a pin and an indicator light to the result.
//!
//! The crate is `no_std`; the `std` feature adds `tracing` diagnostics and the
//! [`sim`] board used by the host runner and the tests.

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod log;

pub mod buffer;
pub mod compare;
pub mod fault;
pub mod hal;
pub mod secret;
pub mod sequencer;
#[cfg(feature = "std")]
pub mod sim;

pub use buffer::{discard_line, read_line, InputBuffer, LineEnd, LineReader};
pub use compare::{compare, CompareMode, DenyReason, LengthPolicy, Outcome};
pub use fault::{critical_if, FaultDetected, FaultGuard};
pub use hal::{ByteSink, ByteSource, Indicators, Light, LightPair, PinLevels};
pub use secret::Secret;
pub use sequencer::{Board, Messages, Parked, Phase, Sequencer, SequencerConfig};

/// Storage size of the input buffer when a caller does not pick one.
pub const DEFAULT_STORAGE: usize = 64;

/// Construction-time validation failures. The running sequence itself has no
/// error path: every input or channel problem ends in a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("secret must not be empty")]
    EmptySecret,
    #[error("input buffer capacity must be greater than zero")]
    ZeroCapacity,
    #[error("declared capacity {capacity} exceeds buffer storage of {storage} bytes")]
    CapacityExceedsStorage { capacity: usize, storage: usize },
    #[error("capacity {capacity} must exceed the secret length {secret_len}")]
    CapacityTooSmall { capacity: usize, secret_len: usize },
    #[error("at least one line terminator byte is required")]
    NoTerminators,
    #[error("secret contains a line terminator byte and could never be entered")]
    SecretContainsTerminator,
}

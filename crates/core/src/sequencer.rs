// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::buffer::{InputBuffer, LineEnd, LineReader};
use crate::compare::{compare, CompareMode, DenyReason, LengthPolicy, Outcome};
use crate::fault::{FaultDetected, FaultGuard};
use crate::hal::{ByteSink, ByteSource, Indicators, Light, PinLevels};
use crate::secret::Secret;
use crate::{ConfigError, DEFAULT_STORAGE};
use core::num::NonZeroU8;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Text written to the console at each step.
#[derive(Debug, Clone, Copy)]
pub struct Messages<'a> {
    pub announce: &'a str,
    pub prompt: &'a str,
    pub success: &'a str,
    pub failure: &'a str,
    pub retry: &'a str,
}

impl Default for Messages<'static> {
    fn default() -> Self {
        Self {
            announce: "Hello World!\n",
            prompt: "Enter password:\n",
            success: "PASSWORD OK\n",
            failure: "PASSWORD FAIL\n",
            retry: "Try again.\n",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SequencerConfig<'a> {
    pub messages: Messages<'a>,
    pub settle_ms: u32,
    pub idle_ms: u32,
    /// Declared input capacity; `None` uses the whole buffer storage.
    pub capacity: Option<usize>,
    pub terminators: &'a [u8],
    pub compare: CompareMode,
    pub length: LengthPolicy,
    pub levels: PinLevels,
    /// Lines read before the outcome is latched. 1 means a single attempt.
    pub max_attempts: NonZeroU8,
}

impl Default for SequencerConfig<'static> {
    fn default() -> Self {
        Self {
            messages: Messages::default(),
            settle_ms: 500,
            idle_ms: 1000,
            capacity: None,
            terminators: b"\n",
            compare: CompareMode::default(),
            length: LengthPolicy::default(),
            levels: PinLevels::default(),
            max_attempts: NonZeroU8::MIN,
        }
    }
}

/// The external collaborators the sequencer drives.
#[derive(Debug)]
pub struct Board<C, D, P, L> {
    /// Text channel, both directions.
    pub console: C,
    pub delay: D,
    /// Digital output latched to the outcome.
    pub pin: P,
    pub lights: L,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Booting,
    AwaitingInput,
    Granted,
    Denied,
    Idle,
}

/// One boot's worth of authorization.
///
/// [`Sequencer::authorize`] consumes the sequencer and hands back a
/// [`Parked`] device that can only idle, so the outcome is latched exactly
/// once and no further input is ever read.
pub struct Sequencer<'a, C, D, P, L, const N: usize = DEFAULT_STORAGE> {
    board: Board<C, D, P, L>,
    secret: Secret<'a>,
    config: SequencerConfig<'a>,
    capacity: usize,
    guard: Option<FaultGuard<'a>>,
    phase: Phase,
}

impl<'a, C, D, P, L> Sequencer<'a, C, D, P, L>
where
    C: ByteSource + ByteSink,
    D: DelayNs,
    P: OutputPin,
    L: Indicators,
{
    /// Sequencer with [`DEFAULT_STORAGE`] bytes of input storage.
    pub fn new(
        board: Board<C, D, P, L>,
        secret: Secret<'a>,
        config: SequencerConfig<'a>,
    ) -> Result<Self, ConfigError> {
        Self::with_storage(board, secret, config)
    }
}

impl<'a, C, D, P, L, const N: usize> Sequencer<'a, C, D, P, L, N>
where
    C: ByteSource + ByteSink,
    D: DelayNs,
    P: OutputPin,
    L: Indicators,
{
    pub fn with_storage(
        board: Board<C, D, P, L>,
        secret: Secret<'a>,
        config: SequencerConfig<'a>,
    ) -> Result<Self, ConfigError> {
        if config.terminators.is_empty() {
            return Err(ConfigError::NoTerminators);
        }
        if secret
            .as_bytes()
            .iter()
            .any(|b| config.terminators.contains(b))
        {
            return Err(ConfigError::SecretContainsTerminator);
        }
        let capacity = config.capacity.unwrap_or(N);
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if capacity > N {
            return Err(ConfigError::CapacityExceedsStorage {
                capacity,
                storage: N,
            });
        }
        // Room for one byte past the secret, so over-length input is visible.
        if capacity <= secret.len() {
            return Err(ConfigError::CapacityTooSmall {
                capacity,
                secret_len: secret.len(),
            });
        }

        Ok(Self {
            board,
            secret,
            config,
            capacity,
            guard: None,
            phase: Phase::Booting,
        })
    }

    /// Routes the final decision through the fault guard.
    pub fn with_guard(mut self, guard: FaultGuard<'a>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn board(&self) -> &Board<C, D, P, L> {
        &self.board
    }

    /// Runs the whole boot sequence and never returns.
    pub fn run(self) -> ! {
        self.authorize().park()
    }

    /// Announce, settle, prompt, read, compare and latch the outputs.
    pub fn authorize(mut self) -> Parked<C, D, P, L> {
        info!("boot: announcing");
        self.board
            .console
            .write(self.config.messages.announce.as_bytes());
        self.board.delay.delay_ms(self.config.settle_ms);
        self.board
            .console
            .write(self.config.messages.prompt.as_bytes());
        self.enter(Phase::AwaitingInput);

        let attempts = self.config.max_attempts.get();
        let mut attempt = 1;
        let mut reader = LineReader::new(self.config.terminators);
        let outcome = loop {
            let (outcome, end) = self.attempt(&mut reader);
            if outcome.is_granted() || attempt >= attempts {
                break outcome;
            }
            debug!("attempt {}/{} denied: {:?}", attempt, attempts, outcome);
            if end == LineEnd::CapacityReached {
                let _dropped = reader.discard(&mut self.board.console);
                debug!("discarded {} bytes of over-long line", _dropped);
            }
            self.board
                .console
                .write(self.config.messages.retry.as_bytes());
            attempt += 1;
        };

        self.react(outcome);
        self.enter(Phase::Idle);

        Parked {
            board: self.board,
            outcome,
            idle_ms: self.config.idle_ms,
            ticks: 0,
        }
    }

    fn enter(&mut self, next: Phase) {
        debug!("phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    fn attempt(&mut self, reader: &mut LineReader<'a>) -> (Outcome, LineEnd) {
        let mut buf = InputBuffer::<N>::with_checked_limit(self.capacity);
        let end = reader.read(&mut self.board.console, &mut buf);
        debug!("read {} bytes, stopped by {:?}", buf.len(), end);
        (self.evaluate(buf.as_bytes()), end)
    }

    fn evaluate(&mut self, input: &[u8]) -> Outcome {
        let secret = self.secret;
        let mode = self.config.compare;
        let length = self.config.length;
        let verdict = compare(&secret, input, mode, length);

        let Some(guard) = self.guard.as_mut() else {
            return verdict;
        };

        let decided = guard.decide(
            &mut self.board.delay,
            || compare(&secret, input, mode, length).is_granted(),
            || Outcome::Granted,
            || verdict,
        );
        match decided {
            Ok(outcome) if outcome.is_granted() == verdict.is_granted() => outcome,
            Ok(_) | Err(FaultDetected) => {
                warn!("fault injection detected during authorization");
                Outcome::Denied(DenyReason::FaultDetected)
            }
        }
    }

    fn react(&mut self, outcome: Outcome) {
        let (message, level, light, phase) = match outcome {
            Outcome::Granted => {
                info!("authorization granted");
                (
                    self.config.messages.success,
                    self.config.levels.granted,
                    Light::Success,
                    Phase::Granted,
                )
            }
            Outcome::Denied(_reason) => {
                info!("authorization denied");
                debug!("denial reason: {:?}", _reason);
                (
                    self.config.messages.failure,
                    self.config.levels.denied,
                    Light::Failure,
                    Phase::Denied,
                )
            }
        };
        self.enter(phase);

        self.board.console.write(message.as_bytes());
        if let Err(_err) = self.board.pin.set_state(level) {
            warn!("failed to drive gate pin: {:?}", _err);
        }
        self.board.lights.toggle(light);
    }
}

/// A device whose outcome is latched. It only sleeps from here on.
#[derive(Debug)]
pub struct Parked<C, D, P, L> {
    board: Board<C, D, P, L>,
    outcome: Outcome,
    idle_ms: u32,
    ticks: u64,
}

impl<C, D, P, L> Parked<C, D, P, L>
where
    D: DelayNs,
{
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn phase(&self) -> Phase {
        Phase::Idle
    }

    pub fn board(&self) -> &Board<C, D, P, L> {
        &self.board
    }

    pub fn into_board(self) -> Board<C, D, P, L> {
        self.board
    }

    /// Idle iterations performed so far.
    pub fn idle_ticks(&self) -> u64 {
        self.ticks
    }

    /// One no-op idle period.
    pub fn idle_once(&mut self) {
        self.board.delay.delay_ms(self.idle_ms);
        self.ticks = self.ticks.wrapping_add(1);
    }

    /// The terminal idle loop; only a reset leaves it.
    pub fn park(mut self) -> ! {
        info!("parked until reset");
        loop {
            self.idle_once();
        }
    }
}

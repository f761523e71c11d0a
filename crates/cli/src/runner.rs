// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Scripted, deterministic authorization runs against the simulated board.

use anyhow::Result;
use passgate_config::{
    secret_from, AuthScript, ExpectedOutcome, GateManifest, Level, LightName, ScriptAssertion,
    MAX_BUFFER_CAPACITY,
};
use passgate_core::sim::{self, SimUart};
use passgate_core::{DenyReason, FaultGuard, Outcome, Sequencer};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize)]
pub struct LightStates {
    pub success: bool,
    pub failure: bool,
}

/// Everything observable about one boot.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: ExpectedOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub pin_level: Option<Level>,
    pub pin_writes: usize,
    pub lights: LightStates,
    pub simulated_delay_us: u128,
    pub idle_ticks: u64,
    pub uart_bytes: usize,
    /// Captured transcript; the same text lands in `uart.log`.
    pub uart: String,
}

pub fn deny_label(reason: DenyReason) -> &'static str {
    match reason {
        DenyReason::ShortInput { .. } => "short_input",
        DenyReason::Mismatch { .. } => "mismatch",
        DenyReason::TrailingInput { .. } => "trailing_input",
        DenyReason::FaultDetected => "fault_detected",
    }
}

/// Hex SHA-256 of the secret, so artifacts can identify a gate without
/// carrying the secret itself.
pub fn secret_fingerprint(secret: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    format!("{:x}", hasher.finalize())
}

pub fn entropy_source(seed: Option<u64>) -> impl FnMut(&mut [u8]) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(rand::random));
    move |buf: &mut [u8]| rng.fill_bytes(buf)
}

pub fn execute(manifest: &GateManifest, script: &AuthScript, echo_stdout: bool) -> Result<RunReport> {
    let secret_bytes = manifest.secret_bytes()?;
    let secret = secret_from(&secret_bytes)?;
    let config = manifest.sequencer_config()?;

    let mut uart = SimUart::with_input(script.inputs.uart_rx.as_bytes());
    if let Some(n) = script.inputs.stream_error_after {
        uart.fail_after(n);
    }
    let uart_tx = Arc::new(Mutex::new(Vec::new()));
    uart.set_sink(Some(uart_tx.clone()), echo_stdout);

    let mut entropy = entropy_source(manifest.hardening.seed);
    let mut sequencer =
        Sequencer::<_, _, _, _, MAX_BUFFER_CAPACITY>::with_storage(sim::board(uart), secret, config)
            .map_err(|e| anyhow::anyhow!("Invalid gate configuration: {}", e))?;
    if manifest.hardening.enabled {
        sequencer = sequencer.with_guard(FaultGuard::new(
            &mut entropy,
            manifest.hardening.max_jitter_us,
        ));
    }

    let mut parked = sequencer.authorize();
    for _ in 0..script.limits.idle_ticks {
        parked.idle_once();
    }

    let outcome = parked.outcome();
    let idle_ticks = parked.idle_ticks();
    let board = parked.into_board();
    let uart_text = {
        let bytes = uart_tx.lock().map(|g| g.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).to_string()
    };

    Ok(RunReport {
        outcome: match outcome {
            Outcome::Granted => ExpectedOutcome::Granted,
            Outcome::Denied(_) => ExpectedOutcome::Denied,
        },
        reason: match outcome {
            Outcome::Granted => None,
            Outcome::Denied(reason) => Some(deny_label(reason)),
        },
        pin_level: board.pin.level().map(Level::from),
        pin_writes: board.pin.writes(),
        lights: LightStates {
            success: board.lights.success.is_lit(),
            failure: board.lights.failure.is_lit(),
        },
        simulated_delay_us: board.delay.elapsed().as_micros(),
        idle_ticks,
        uart_bytes: uart_text.len(),
        uart: uart_text,
    })
}

pub fn check(assertion: &ScriptAssertion, report: &RunReport) -> bool {
    match assertion {
        ScriptAssertion::ExpectedOutcome(a) => a.expected_outcome == report.outcome,
        ScriptAssertion::UartContains(a) => report.uart.contains(&a.uart_contains),
        ScriptAssertion::UartNotContains(a) => !report.uart.contains(&a.uart_not_contains),
        ScriptAssertion::PinLevel(a) => report.pin_level == Some(a.pin_level),
        ScriptAssertion::LightState(a) => {
            let lit = match a.light_state.light {
                LightName::Success => report.lights.success,
                LightName::Failure => report.lights.failure,
            };
            lit == a.light_state.lit
        }
        ScriptAssertion::PinWrites(a) => a.pin_writes == report.pin_writes,
    }
}

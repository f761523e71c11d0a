// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use embedded_hal::digital::PinState;
use passgate_core::sim::{self, SimBoard, SimUart};
use passgate_core::{
    CompareMode, ConfigError, DenyReason, FaultGuard, LengthPolicy, Outcome, Parked, Phase,
    Secret, Sequencer, SequencerConfig,
};
use std::num::NonZeroU8;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SECRET: &[u8] = b"h0px3";

struct Run {
    parked: Parked<
        SimUart,
        sim::SimDelay,
        sim::SimPin,
        sim::SimLights,
    >,
    transcript: String,
}

fn run_with(input: &[u8], config: SequencerConfig<'static>, prepare: impl FnOnce(&mut SimUart)) -> Run {
    let mut uart = SimUart::with_input(input);
    prepare(&mut uart);
    let sink = Arc::new(Mutex::new(Vec::new()));
    uart.set_sink(Some(sink.clone()), false);

    let board: SimBoard = sim::board(uart);
    let sequencer = Sequencer::new(board, Secret::new(SECRET).unwrap(), config).unwrap();
    assert_eq!(sequencer.phase(), Phase::Booting);
    let parked = sequencer.authorize();

    let transcript = String::from_utf8(sink.lock().unwrap().clone()).unwrap();
    Run { parked, transcript }
}

fn run(input: &[u8]) -> Run {
    run_with(input, SequencerConfig::default(), |_| {})
}

#[test]
fn test_exact_secret_granted() {
    let r = run(b"h0px3\n");
    assert_eq!(r.parked.outcome(), Outcome::Granted);
    assert_eq!(
        r.transcript,
        "Hello World!\nEnter password:\nPASSWORD OK\n"
    );

    let board = r.parked.board();
    assert_eq!(board.pin.level(), Some(PinState::High));
    assert_eq!(board.pin.writes(), 1);
    assert!(board.lights.success.is_lit());
    assert_eq!(board.lights.success.writes(), 1);
    assert_eq!(board.lights.failure.writes(), 0);
}

#[test]
fn test_last_byte_mismatch_denied() {
    let r = run(b"h0px4\n");
    assert_eq!(
        r.parked.outcome(),
        Outcome::Denied(DenyReason::Mismatch { index: Some(4) })
    );
    assert!(r.transcript.ends_with("PASSWORD FAIL\n"));

    let board = r.parked.board();
    assert_eq!(board.pin.level(), Some(PinState::Low));
    assert!(board.lights.failure.is_lit());
    assert_eq!(board.lights.success.writes(), 0);
}

#[test]
fn test_short_line_denied() {
    let r = run(b"h0\n");
    assert_eq!(
        r.parked.outcome(),
        Outcome::Denied(DenyReason::ShortInput { len: 2 })
    );
}

#[test]
fn test_stream_end_without_terminator_denied() {
    let r = run(b"h0p");
    assert_eq!(
        r.parked.outcome(),
        Outcome::Denied(DenyReason::ShortInput { len: 3 })
    );
    assert_eq!(r.parked.board().pin.level(), Some(PinState::Low));
}

#[test]
fn test_channel_fault_is_a_denial() {
    let r = run_with(b"h0px3\n", SequencerConfig::default(), |uart| uart.fail_after(3));
    assert_eq!(
        r.parked.outcome(),
        Outcome::Denied(DenyReason::ShortInput { len: 3 })
    );
    assert!(r.transcript.contains("PASSWORD FAIL"));
}

#[test]
fn test_over_length_input_by_policy() {
    let exact = run(b"h0px3zz\n");
    assert_eq!(
        exact.parked.outcome(),
        Outcome::Denied(DenyReason::TrailingInput { len: 7 })
    );

    let prefix = run_with(
        b"h0px3zz\n",
        SequencerConfig {
            length: LengthPolicy::Prefix,
            ..SequencerConfig::default()
        },
        |_| {},
    );
    assert_eq!(prefix.parked.outcome(), Outcome::Granted);
}

#[test]
fn test_unterminated_flood_stays_within_capacity() {
    let flood = vec![b'A'; 10_000];
    let r = run_with(
        &flood,
        SequencerConfig {
            capacity: Some(8),
            ..SequencerConfig::default()
        },
        |_| {},
    );
    // Exactly `capacity` bytes are pulled; the rest stays in the channel.
    assert_eq!(r.parked.board().console.pending(), 10_000 - 8);
    assert!(!r.parked.outcome().is_granted());
}

#[test]
fn test_no_input_read_after_latching() {
    let mut r = run(b"h0px3\nh0px3\n");
    let reads = r.parked.board().console.read_calls();
    let pending = r.parked.board().console.pending();
    for _ in 0..5 {
        r.parked.idle_once();
    }
    assert_eq!(r.parked.idle_ticks(), 5);
    assert_eq!(r.parked.phase(), Phase::Idle);

    let board = r.parked.into_board();
    assert_eq!(board.console.read_calls(), reads);
    assert_eq!(board.console.pending(), pending);
    assert_eq!(board.pin.writes(), 1);
}

#[test]
fn test_settle_and_idle_delays() {
    let mut r = run(b"nope\n");
    assert_eq!(r.parked.board().delay.elapsed(), Duration::from_millis(500));
    r.parked.idle_once();
    assert_eq!(r.parked.board().delay.elapsed(), Duration::from_millis(1500));
}

#[test]
fn test_bounded_retry_latches_once() {
    let r = run_with(
        b"wrong\nh0px4\nh0px3\n",
        SequencerConfig {
            max_attempts: NonZeroU8::new(3).unwrap(),
            ..SequencerConfig::default()
        },
        |_| {},
    );
    assert_eq!(r.parked.outcome(), Outcome::Granted);
    assert_eq!(r.transcript.matches("Try again.\n").count(), 2);
    assert_eq!(r.parked.board().pin.writes(), 1);
    assert_eq!(r.parked.board().lights.failure.writes(), 0);
}

#[test]
fn test_retry_exhausted_denies() {
    let r = run_with(
        b"a\nb\nh0px3\n",
        SequencerConfig {
            max_attempts: NonZeroU8::new(2).unwrap(),
            ..SequencerConfig::default()
        },
        |_| {},
    );
    assert!(!r.parked.outcome().is_granted());
    assert_eq!(r.transcript.matches("Try again.\n").count(), 1);
    assert_eq!(r.parked.board().console.pending(), b"h0px3\n".len());
}

#[test]
fn test_retry_discards_rest_of_long_line() {
    let r = run_with(
        b"xxxxxxxxxxxxxxxx\nh0px3\n",
        SequencerConfig {
            capacity: Some(6),
            max_attempts: NonZeroU8::new(2).unwrap(),
            ..SequencerConfig::default()
        },
        |_| {},
    );
    assert_eq!(r.parked.outcome(), Outcome::Granted);
}

#[test]
fn test_crlf_retry_reads_next_line() {
    let r = run_with(
        b"wrong\r\nh0px3\r\n",
        SequencerConfig {
            terminators: b"\r\n",
            max_attempts: NonZeroU8::new(2).unwrap(),
            ..SequencerConfig::default()
        },
        |_| {},
    );
    assert_eq!(r.parked.outcome(), Outcome::Granted);
    assert_eq!(r.transcript.matches("Try again.\n").count(), 1);
    assert_eq!(r.parked.board().console.pending(), 0);
}

#[test]
fn test_crlf_empty_line_still_counts() {
    let r = run_with(
        b"\r\nh0px3\r\n",
        SequencerConfig {
            terminators: b"\r\n",
            ..SequencerConfig::default()
        },
        |_| {},
    );
    assert_eq!(
        r.parked.outcome(),
        Outcome::Denied(DenyReason::ShortInput { len: 0 })
    );
}

#[test]
fn test_crlf_retry_after_long_line() {
    let r = run_with(
        b"xxxxxxxxxxxx\r\nh0px3\r\n",
        SequencerConfig {
            terminators: b"\r\n",
            capacity: Some(6),
            max_attempts: NonZeroU8::new(2).unwrap(),
            ..SequencerConfig::default()
        },
        |_| {},
    );
    assert_eq!(r.parked.outcome(), Outcome::Granted);
}

#[test]
fn test_constant_time_mode_same_decisions() {
    for (input, granted) in [
        (&b"h0px3\n"[..], true),
        (&b"h0px4\n"[..], false),
        (&b"h0\n"[..], false),
    ] {
        let r = run_with(
            input,
            SequencerConfig {
                compare: CompareMode::ConstantTime,
                ..SequencerConfig::default()
            },
            |_| {},
        );
        assert_eq!(r.parked.outcome().is_granted(), granted);
    }
}

#[test]
fn test_guarded_decision() {
    let mut entropy = |buf: &mut [u8]| buf.fill(7);
    let uart = SimUart::with_input(b"h0px3\n");
    let sequencer = Sequencer::new(
        sim::board(uart),
        Secret::new(SECRET).unwrap(),
        SequencerConfig::default(),
    )
    .unwrap()
    .with_guard(FaultGuard::new(&mut entropy, 100));

    let parked = sequencer.authorize();
    assert_eq!(parked.outcome(), Outcome::Granted);
    // Settle plus a jitter no longer than the configured bound.
    let elapsed = parked.board().delay.elapsed();
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed <= Duration::from_millis(500) + Duration::from_micros(100));
}

#[test]
fn test_config_validation() {
    let secret = Secret::new(SECRET).unwrap();

    let too_small = Sequencer::new(
        sim::board(SimUart::new()),
        secret,
        SequencerConfig {
            capacity: Some(5),
            ..SequencerConfig::default()
        },
    );
    assert!(matches!(
        too_small,
        Err(ConfigError::CapacityTooSmall {
            capacity: 5,
            secret_len: 5
        })
    ));

    let too_big = Sequencer::new(
        sim::board(SimUart::new()),
        secret,
        SequencerConfig {
            capacity: Some(65),
            ..SequencerConfig::default()
        },
    );
    assert!(matches!(
        too_big,
        Err(ConfigError::CapacityExceedsStorage {
            capacity: 65,
            storage: 64
        })
    ));

    let no_terminators = Sequencer::new(
        sim::board(SimUart::new()),
        secret,
        SequencerConfig {
            terminators: b"",
            ..SequencerConfig::default()
        },
    );
    assert!(matches!(no_terminators, Err(ConfigError::NoTerminators)));

    let unreachable = Sequencer::new(
        sim::board(SimUart::new()),
        Secret::new(b"h0\rx3").unwrap(),
        SequencerConfig {
            terminators: b"\r\n",
            ..SequencerConfig::default()
        },
    );
    assert!(matches!(
        unreachable,
        Err(ConfigError::SecretContainsTerminator)
    ));
}

#[test]
fn test_custom_storage_size() {
    let sequencer = Sequencer::<_, _, _, _, 256>::with_storage(
        sim::board(SimUart::with_input(b"h0px3\n")),
        Secret::new(SECRET).unwrap(),
        SequencerConfig {
            capacity: Some(200),
            ..SequencerConfig::default()
        },
    )
    .unwrap();
    assert_eq!(sequencer.authorize().outcome(), Outcome::Granted);
}

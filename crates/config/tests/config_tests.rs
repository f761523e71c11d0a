// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use passgate_config::{AuthScript, Comparison, GateManifest, LengthMode, Level};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_file(prefix: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("passgate-config-tests");
    let _ = std::fs::create_dir_all(&dir);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = dir.join(format!("{}-{}.yaml", prefix, nonce));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

#[test]
fn test_full_manifest_from_file() {
    let path = write_temp_file(
        "gate",
        r#"
schema_version: "1.0"
name: "door-1"
secret: "h0px3"
buffer_capacity: 16
settle_ms: 10
idle_ms: 20
max_attempts: 3
comparison: constant_time
length_policy: prefix
terminators: "\r\n"
pin:
  granted: low
  denied: high
messages:
  announce: "door-1 up\n"
  failure: "NOPE\n"
hardening:
  enabled: true
  max_jitter_us: 150
  seed: 42
"#,
    );

    let manifest = GateManifest::from_file(&path).unwrap();
    assert_eq!(manifest.name, "door-1");
    assert_eq!(manifest.comparison, Comparison::ConstantTime);
    assert_eq!(manifest.length_policy, LengthMode::Prefix);
    assert_eq!(manifest.pin.granted, Level::Low);
    assert!(manifest.hardening.enabled);
    assert_eq!(manifest.hardening.seed, Some(42));

    let config = manifest.sequencer_config().unwrap();
    assert_eq!(config.capacity, Some(16));
    assert_eq!(config.terminators, b"\r\n");
    assert_eq!(config.max_attempts.get(), 3);
    assert_eq!(config.messages.announce, "door-1 up\n");
    assert_eq!(config.messages.failure, "NOPE\n");
    // Unlisted messages keep their defaults.
    assert_eq!(config.messages.prompt, "Enter password:\n");
}

#[test]
fn test_missing_manifest_file() {
    let err = GateManifest::from_file("/nonexistent/passgate/gate.yaml").unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read gate manifest"));
}

#[test]
fn test_zero_attempts_rejected() {
    let err = GateManifest::from_yaml(
        r#"
name: "g"
secret: "h0px3"
max_attempts: 0
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("max_attempts"));
}

#[test]
fn test_script_from_file_with_fault() {
    let path = write_temp_file(
        "script",
        r#"
schema_version: "1.0"
inputs:
  uart_rx: "h0px3\n"
  stream_error_after: 3
assertions:
  - expected_outcome: denied
  - uart_not_contains: "PASSWORD OK"
"#,
    );
    let script = AuthScript::from_file(&path).unwrap();
    assert_eq!(script.inputs.stream_error_after, Some(3));
    assert!(script.inputs.manifest.is_none());
    assert_eq!(script.limits.idle_ticks, 0);
}

#[test]
fn test_script_unknown_assertion_rejected() {
    let err = AuthScript::from_yaml(
        r#"
schema_version: "1.0"
assertions:
  - memory_value: { address: 0, expected_value: 1 }
"#,
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse Test Script YAML"));
}

// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod console;
mod runner;

use clap::{Parser, Subcommand};
use passgate_config::{secret_from, AuthScript, GateManifest, Level, ScriptAssertion, MAX_BUFFER_CAPACITY};
use passgate_core::sim::{SimDelay, SimPin};
use passgate_core::{Board, FaultGuard, LightPair, Outcome, Sequencer};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use crate::console::StdioConsole;
use crate::runner::RunReport;

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(author, version, about = "PassGate authorization runner", long_about = None)]
struct Cli {
    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Boot one gate against this terminal, with real delays.
    Run(RunArgs),

    /// Deterministic, CI-friendly runner mode driven by a test script (YAML).
    Test(TestArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the gate manifest (YAML)
    #[arg(short, long)]
    manifest: PathBuf,

    /// Stop after this many idle periods instead of parking until Ctrl-C
    #[arg(long)]
    idle_ticks: Option<u64>,
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the test script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Path to the gate manifest (YAML); overrides the script's input
    #[arg(short = 'm', long)]
    manifest: Option<PathBuf>,

    /// Disable UART stdout echo (still captured for assertions/artifacts)
    #[arg(long)]
    no_uart_stdout: bool,

    /// Directory to write test artifacts (result.json, uart.log)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct AssertionResult {
    assertion: ScriptAssertion,
    passed: bool,
}

#[derive(Debug, Serialize)]
struct TestConfig {
    script: PathBuf,
    manifest: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct TestResult {
    result_schema_version: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    gate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    assertions: Vec<AssertionResult>,
    config: TestConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the UART transcript.
    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => run_interactive(args),
        Commands::Test(args) => run_test(args),
    }
}

fn run_interactive(args: RunArgs) -> ExitCode {
    info!("Starting PassGate");

    let manifest = match GateManifest::from_file(&args.manifest) {
        Ok(m) => m,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let secret_bytes = match manifest.secret_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let (secret, config) = match secret_from(&secret_bytes)
        .and_then(|secret| Ok((secret, manifest.sequencer_config()?)))
    {
        Ok(pair) => pair,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    info!(
        "Gate '{}' loaded (secret sha256 {})",
        manifest.name,
        runner::secret_fingerprint(&secret_bytes)
    );

    let board = Board {
        console: StdioConsole::new(),
        delay: SimDelay::realtime(),
        pin: SimPin::new(),
        lights: LightPair::new(SimPin::new(), SimPin::new()),
    };

    let mut entropy = runner::entropy_source(manifest.hardening.seed);
    let mut sequencer =
        match Sequencer::<_, _, _, _, MAX_BUFFER_CAPACITY>::with_storage(board, secret, config) {
            Ok(s) => s,
            Err(e) => {
                error!("Invalid gate configuration: {}", e);
                return ExitCode::from(EXIT_CONFIG_ERROR);
            }
        };
    if manifest.hardening.enabled {
        sequencer = sequencer.with_guard(FaultGuard::new(
            &mut entropy,
            manifest.hardening.max_jitter_us,
        ));
    }

    let mut parked = sequencer.authorize();
    let pin = parked.board().pin.level().map(Level::from);
    info!("Outcome {:?}, gate pin {:?}", parked.outcome(), pin);

    let Some(ticks) = args.idle_ticks else {
        parked.park();
    };
    for _ in 0..ticks {
        parked.idle_once();
    }

    match parked.outcome() {
        Outcome::Granted => ExitCode::from(EXIT_PASS),
        Outcome::Denied(_) => ExitCode::from(EXIT_ASSERT_FAIL),
    }
}

fn run_test(args: TestArgs) -> ExitCode {
    let script = match AuthScript::from_file(&args.script) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(&args, None, msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let manifest_path = match args.manifest.clone().or_else(|| {
        script
            .inputs
            .manifest
            .as_deref()
            .map(|m| resolve_script_path(&args.script, m))
    }) {
        Some(p) => p,
        None => {
            let msg = "No gate manifest: pass --manifest or set inputs.manifest".to_string();
            error!("{}", msg);
            write_config_error_outputs(&args, None, msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let manifest = match GateManifest::from_file(&manifest_path) {
        Ok(m) => m,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(&args, Some(&manifest_path), msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!("Running '{}' against gate '{}'", args.script.display(), manifest.name);

    let report = match runner::execute(&manifest, &script, !args.no_uart_stdout) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(&args, Some(&manifest_path), msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut all_passed = true;
    let mut assertion_results = Vec::new();
    for assertion in &script.assertions {
        let passed = runner::check(assertion, &report);
        if !passed {
            all_passed = false;
            error!(
                "Assertion failed: {:?} (captured len={})",
                assertion,
                report.uart.len()
            );
        }
        assertion_results.push(AssertionResult {
            assertion: assertion.clone(),
            passed,
        });
    }

    let status = if all_passed { "pass" } else { "fail" };
    info!("Outcome {:?}, status {}", report.outcome, status);

    if let Some(dir) = &args.output_dir {
        let fingerprint = manifest
            .secret_bytes()
            .map(|bytes| runner::secret_fingerprint(&bytes))
            .ok();
        let result = TestResult {
            result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
            status: status.to_string(),
            gate: Some(manifest.name.clone()),
            secret_sha256: fingerprint,
            run: Some(report.clone()),
            message: None,
            assertions: assertion_results,
            config: TestConfig {
                script: args.script.clone(),
                manifest: Some(manifest_path.clone()),
            },
        };
        if let Err(e) = write_artifacts(dir, &result, Some(&report)) {
            error!("Failed to write artifacts: {:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    }

    if all_passed {
        ExitCode::from(EXIT_PASS)
    } else {
        ExitCode::from(EXIT_ASSERT_FAIL)
    }
}

fn write_config_error_outputs(args: &TestArgs, manifest: Option<&Path>, message: String) {
    let Some(dir) = &args.output_dir else {
        return;
    };
    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: "error".to_string(),
        gate: None,
        secret_sha256: None,
        run: None,
        message: Some(message),
        assertions: Vec::new(),
        config: TestConfig {
            script: args.script.clone(),
            manifest: manifest.map(Path::to_path_buf),
        },
    };
    if let Err(e) = write_artifacts(dir, &result, None) {
        error!("Failed to write artifacts: {:#}", e);
    }
}

fn write_artifacts(dir: &Path, result: &TestResult, report: Option<&RunReport>) -> anyhow::Result<()> {
    use anyhow::Context;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir {:?}", dir))?;

    let result_path = dir.join("result.json");
    let f = std::fs::File::create(&result_path)
        .with_context(|| format!("Failed to create {:?}", result_path))?;
    serde_json::to_writer_pretty(f, result)
        .with_context(|| format!("Failed to write {:?}", result_path))?;

    if let Some(report) = report {
        let log_path = dir.join("uart.log");
        std::fs::write(&log_path, report.uart.as_bytes())
            .with_context(|| format!("Failed to write {:?}", log_path))?;
    }
    Ok(())
}

fn resolve_script_path(script_path: &Path, value: &str) -> PathBuf {
    let p = PathBuf::from(value);
    if p.is_absolute() {
        return p;
    }
    script_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::LightStates;

    #[test]
    fn test_resolve_script_path() {
        let script = Path::new("/ci/scripts/auth.yaml");
        assert_eq!(
            resolve_script_path(script, "gate.yaml"),
            PathBuf::from("/ci/scripts/gate.yaml")
        );
        assert_eq!(
            resolve_script_path(script, "/etc/gate.yaml"),
            PathBuf::from("/etc/gate.yaml")
        );
    }

    #[test]
    fn test_result_json_shape() {
        let result = TestResult {
            result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
            status: "pass".to_string(),
            gate: None,
            secret_sha256: None,
            run: Some(RunReport {
                outcome: passgate_config::ExpectedOutcome::Granted,
                reason: None,
                pin_level: Some(Level::High),
                pin_writes: 1,
                lights: LightStates {
                    success: true,
                    failure: false,
                },
                simulated_delay_us: 0,
                idle_ticks: 0,
                uart_bytes: 0,
                uart: "PASSWORD OK\n".to_string(),
            }),
            message: None,
            assertions: Vec::new(),
            config: TestConfig {
                script: PathBuf::from("auth.yaml"),
                manifest: None,
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("gate").is_none());
        assert!(json["run"].get("reason").is_none());
        assert_eq!(json["run"]["uart"], "PASSWORD OK\n");
        assert_eq!(json["run"]["pin_level"], "high");
        assert_eq!(json["run"]["outcome"], "granted");
    }
}

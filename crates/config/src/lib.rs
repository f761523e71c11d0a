// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use embedded_hal::digital::PinState;
use passgate_core::{
    CompareMode, LengthPolicy, Messages, PinLevels, Secret, SequencerConfig,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU8;
use std::path::Path;

/// Largest input buffer the host runner allocates.
pub const MAX_BUFFER_CAPACITY: usize = 256;

/// Upper bound on scripted idle iterations.
pub const MAX_IDLE_TICKS: u64 = 1_000_000;

const SUPPORTED_SCHEMA: &str = "1.0";

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    SUPPORTED_SCHEMA.to_string()
}

fn default_capacity() -> usize {
    64
}

fn default_settle_ms() -> u32 {
    500
}

fn default_idle_ms() -> u32 {
    1000
}

fn default_max_attempts() -> u8 {
    1
}

fn default_terminators() -> String {
    "\n".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[default]
    EarlyExit,
    ConstantTime,
}

impl From<Comparison> for CompareMode {
    fn from(value: Comparison) -> Self {
        match value {
            Comparison::EarlyExit => CompareMode::EarlyExit,
            Comparison::ConstantTime => CompareMode::ConstantTime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LengthMode {
    #[default]
    Exact,
    Prefix,
}

impl From<LengthMode> for LengthPolicy {
    fn from(value: LengthMode) -> Self {
        match value {
            LengthMode::Exact => LengthPolicy::Exact,
            LengthMode::Prefix => LengthPolicy::Prefix,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[serde(alias = "on")]
    High,
    #[serde(alias = "off")]
    Low,
}

impl From<Level> for PinState {
    fn from(value: Level) -> Self {
        match value {
            Level::High => PinState::High,
            Level::Low => PinState::Low,
        }
    }
}

impl From<PinState> for Level {
    fn from(value: PinState) -> Self {
        match value {
            PinState::High => Level::High,
            PinState::Low => Level::Low,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PinConfig {
    pub granted: Level,
    pub denied: Level,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            granted: Level::High,
            denied: Level::Low,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct MessageConfig {
    pub announce: String,
    pub prompt: String,
    pub success: String,
    pub failure: String,
    pub retry: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        let m = Messages::default();
        Self {
            announce: m.announce.to_string(),
            prompt: m.prompt.to_string(),
            success: m.success.to_string(),
            failure: m.failure.to_string(),
            retry: m.retry.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields, default)]
pub struct HardeningConfig {
    pub enabled: bool,
    pub max_jitter_us: u32,
    /// Fixed entropy seed for reproducible runs; random when absent.
    pub seed: Option<u64>,
}

/// Description of one gate: the secret and how the sequencer behaves.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct GateManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub secret_hex: Option<String>,
    #[serde(default = "default_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u32,
    #[serde(default = "default_idle_ms")]
    pub idle_ms: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u8,
    #[serde(default)]
    pub comparison: Comparison,
    #[serde(default)]
    pub length_policy: LengthMode,
    #[serde(default = "default_terminators")]
    pub terminators: String,
    #[serde(default)]
    pub pin: PinConfig,
    #[serde(default)]
    pub messages: MessageConfig,
    #[serde(default)]
    pub hardening: HardeningConfig,
}

impl GateManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read gate manifest at {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Gate Manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Secret bytes from whichever of `secret` / `secret_hex` is set.
    pub fn secret_bytes(&self) -> Result<Vec<u8>> {
        match (&self.secret, &self.secret_hex) {
            (Some(text), None) => Ok(text.as_bytes().to_vec()),
            (None, Some(encoded)) => {
                hex::decode(encoded.trim()).context("Field 'secret_hex' is not valid hex")
            }
            (Some(_), Some(_)) => {
                anyhow::bail!("Only one of 'secret' and 'secret_hex' may be set")
            }
            (None, None) => anyhow::bail!("One of 'secret' or 'secret_hex' is required"),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SUPPORTED_SCHEMA {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SUPPORTED_SCHEMA
            );
        }

        if self.name.trim().is_empty() {
            anyhow::bail!("Gate 'name' cannot be empty");
        }

        let secret = self.secret_bytes()?;
        if secret.is_empty() {
            anyhow::bail!("Secret cannot be empty");
        }

        if self.buffer_capacity == 0 || self.buffer_capacity > MAX_BUFFER_CAPACITY {
            anyhow::bail!(
                "'buffer_capacity' must be between 1 and {}, got {}",
                MAX_BUFFER_CAPACITY,
                self.buffer_capacity
            );
        }

        if self.buffer_capacity <= secret.len() {
            anyhow::bail!(
                "'buffer_capacity' ({}) must exceed the secret length ({})",
                self.buffer_capacity,
                secret.len()
            );
        }

        if self.max_attempts == 0 {
            anyhow::bail!("'max_attempts' must be at least 1");
        }

        if self.terminators.is_empty() {
            anyhow::bail!("'terminators' must contain at least one byte");
        }

        if secret.iter().any(|b| self.terminators.as_bytes().contains(b)) {
            anyhow::bail!("Secret contains a line terminator and could never be entered");
        }

        if self.length_policy == LengthMode::Prefix {
            tracing::warn!(
                "Gate '{}' uses length_policy 'prefix': input longer than the secret is accepted",
                self.name
            );
        }

        Ok(())
    }

    /// Sequencer settings borrowing this manifest's strings.
    pub fn sequencer_config(&self) -> Result<SequencerConfig<'_>> {
        let max_attempts = NonZeroU8::new(self.max_attempts)
            .context("'max_attempts' must be at least 1")?;

        Ok(SequencerConfig {
            messages: Messages {
                announce: &self.messages.announce,
                prompt: &self.messages.prompt,
                success: &self.messages.success,
                failure: &self.messages.failure,
                retry: &self.messages.retry,
            },
            settle_ms: self.settle_ms,
            idle_ms: self.idle_ms,
            capacity: Some(self.buffer_capacity),
            terminators: self.terminators.as_bytes(),
            compare: self.comparison.into(),
            length: self.length_policy.into(),
            levels: PinLevels {
                granted: self.pin.granted.into(),
                denied: self.pin.denied.into(),
            },
            max_attempts,
        })
    }
}

/// Builds a [`Secret`] over bytes obtained from [`GateManifest::secret_bytes`].
pub fn secret_from(bytes: &[u8]) -> Result<Secret<'_>> {
    Secret::new(bytes).map_err(|e| anyhow::anyhow!("{}", e))
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScriptInputs {
    /// Gate manifest, relative to the script file.
    #[serde(default)]
    pub manifest: Option<String>,
    /// Bytes the simulated UART delivers, in order.
    #[serde(default)]
    pub uart_rx: String,
    /// Inject a line fault after this many bytes.
    #[serde(default)]
    pub stream_error_after: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScriptLimits {
    /// Idle iterations to run after the outcome is latched.
    #[serde(default)]
    pub idle_ticks: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutcome {
    Granted,
    Denied,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LightName {
    Success,
    Failure,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct OutcomeAssertion {
    pub expected_outcome: ExpectedOutcome,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartContainsAssertion {
    pub uart_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartNotContainsAssertion {
    pub uart_not_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PinLevelAssertion {
    pub pin_level: Level,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LightStateDetails {
    pub light: LightName,
    pub lit: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LightStateAssertion {
    pub light_state: LightStateDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PinWritesAssertion {
    pub pin_writes: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum ScriptAssertion {
    ExpectedOutcome(OutcomeAssertion),
    UartContains(UartContainsAssertion),
    UartNotContains(UartNotContainsAssertion),
    PinLevel(PinLevelAssertion),
    LightState(LightStateAssertion),
    PinWrites(PinWritesAssertion),
}

/// A deterministic authorization run for the `passgate test` runner.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct AuthScript {
    pub schema_version: String,
    #[serde(default)]
    pub inputs: ScriptInputs,
    #[serde(default)]
    pub limits: ScriptLimits,
    #[serde(default)]
    pub assertions: Vec<ScriptAssertion>,
}

impl AuthScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to open test script at {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Test Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SUPPORTED_SCHEMA {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SUPPORTED_SCHEMA
            );
        }

        if let Some(manifest) = &self.inputs.manifest {
            if manifest.trim().is_empty() {
                anyhow::bail!("Input 'manifest' path cannot be empty");
            }
        }

        if self.limits.idle_ticks > MAX_IDLE_TICKS {
            anyhow::bail!(
                "Limit 'idle_ticks' must not exceed {}, got {}",
                MAX_IDLE_TICKS,
                self.limits.idle_ticks
            );
        }

        Ok(())
    }
}

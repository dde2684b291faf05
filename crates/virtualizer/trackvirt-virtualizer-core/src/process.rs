//! Child-process estimator backend.
//!
//! The input record goes to the child's stdin as JSON; the result is read from stdout.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ReconstructionError;
use crate::estimator::{EstimatorBackend, EstimatorInput};

pub const PROGRAM_ENV: &str = "TRACKVIRT_ESTIMATOR_PROGRAM";
pub const ARGS_ENV: &str = "TRACKVIRT_ESTIMATOR_ARGS";
pub const DEFAULT_PROGRAM: &str = "trackvirt-estimator";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessBackendConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for ProcessBackendConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: Vec::new(),
            working_dir: None,
        }
    }
}

impl ProcessBackendConfig {
    /// Read `TRACKVIRT_ESTIMATOR_PROGRAM` and `TRACKVIRT_ESTIMATOR_ARGS` (whitespace separated).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(program) = lookup(PROGRAM_ENV).filter(|p| !p.trim().is_empty()) {
            config.program = program.trim().to_string();
        }
        if let Some(args) = lookup(ARGS_ENV) {
            config.args = args.split_whitespace().map(str::to_string).collect();
        }
        config
    }
}

#[derive(Clone, Debug)]
pub struct ProcessBackend {
    config: ProcessBackendConfig,
}

impl ProcessBackend {
    pub fn new(config: ProcessBackendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessBackendConfig {
        &self.config
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

fn unavailable(reason: String) -> ReconstructionError {
    ReconstructionError::EstimatorUnavailable { reason }
}

fn call_failed(reason: String) -> ReconstructionError {
    ReconstructionError::EstimatorCallFailed { reason }
}

impl EstimatorBackend for ProcessBackend {
    fn name(&self) -> &str {
        &self.config.program
    }

    fn activate(&self) -> Result<(), ReconstructionError> {
        if self.config.program.trim().is_empty() {
            return Err(unavailable("no estimator program configured".to_string()));
        }
        Ok(())
    }

    fn invoke(&self, input: &EstimatorInput) -> Result<JsonValue, ReconstructionError> {
        let payload = serde_json::to_vec(input)
            .map_err(|err| call_failed(format!("encoding estimator input: {err}")))?;

        let mut child = self
            .command()
            .spawn()
            .map_err(|err| unavailable(format!("spawning '{}': {err}", self.config.program)))?;

        // stdin is written on a helper thread while stdout drains.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || stdin.write_all(&payload))
        });

        let output = child
            .wait_with_output()
            .map_err(|err| call_failed(format!("waiting for estimator: {err}")))?;

        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => debug!("estimator closed stdin early: {err}"),
                Err(_) => return Err(call_failed("stdin writer panicked".to_string())),
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(call_failed(format!(
                "estimator exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(call_failed("estimator produced no output".to_string()));
        }

        let result: JsonValue = serde_json::from_slice(&output.stdout).map_err(|err| {
            ReconstructionError::MalformedEstimatorResult {
                reason: format!("estimator output is not JSON: {err}"),
            }
        })?;
        if result.is_null() {
            return Err(call_failed("estimator returned null".to_string()));
        }
        info!(
            "estimator '{}' finished ({} bytes of output)",
            self.config.program,
            output.stdout.len()
        );
        Ok(result)
    }
}

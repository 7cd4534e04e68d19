//! External typesetting and rasterizing programs
//!
//! Programs are spawned with an argument vector, never through a shell.
//! Both output streams are drained while the child runs so a chatty
//! process cannot block on a full pipe.

use crate::config::{OutputPolicy, RenderConfig};
use crate::error::{TracMathError, TracMathResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// One external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program path
    pub program: PathBuf,
    /// Arguments, passed verbatim
    pub args: Vec<String>,
    /// Working directory the program writes its artifacts into
    pub cwd: PathBuf,
}

impl Invocation {
    /// Create an invocation running in `cwd`
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.into(),
        }
    }

    /// Human-readable command line for diagnostics
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Whether the process exited with status 0
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Classify the output under the given policy
    pub fn failed(&self, policy: OutputPolicy) -> bool {
        if !self.success {
            return true;
        }
        match policy {
            OutputPolicy::Strict => !self.stdout.is_empty() || !self.stderr.is_empty(),
            OutputPolicy::ExitCode => false,
        }
    }
}

/// Runs toolchain programs for the render pipeline
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Run `invocation`, returning a diagnostic error on failure
    async fn run(&self, invocation: &Invocation) -> TracMathResult<()>;
}

/// Toolchain backed by real subprocesses
#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    policy: OutputPolicy,
    timeout: Option<Duration>,
}

impl ProcessToolchain {
    /// Create a process toolchain; `timeout` of `None` waits indefinitely
    pub fn new(policy: OutputPolicy, timeout: Option<Duration>) -> Self {
        Self { policy, timeout }
    }

    /// Create a process toolchain from render settings
    pub fn from_config(config: &RenderConfig) -> Self {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Self::new(config.output_policy, timeout)
    }

    /// Spawn the program and collect its output
    async fn capture(&self, invocation: &Invocation) -> TracMathResult<ToolOutput> {
        let command = invocation.command_line();
        debug!("Executing: {} (in {})", command, invocation.cwd.display());

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TracMathError::ToolchainSpawn {
                command: command.clone(),
                source: e,
            })?;

        let wait = child.wait_with_output();
        let output = match self.timeout {
            // Dropping the future drops the child, which kills it
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                TracMathError::ToolchainTimeout {
                    command: command.clone(),
                    timeout: limit,
                }
            })?,
            None => wait.await,
        }
        .map_err(|e| TracMathError::io(format!("waiting for {}", command), e))?;

        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Default for ProcessToolchain {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

#[async_trait]
impl Toolchain for ProcessToolchain {
    async fn run(&self, invocation: &Invocation) -> TracMathResult<()> {
        let output = self.capture(invocation).await?;

        if output.failed(self.policy) {
            return Err(TracMathError::toolchain(
                invocation.command_line(),
                output.stdout,
                output.stderr,
            ));
        }

        Ok(())
    }
}

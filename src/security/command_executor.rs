//! SafeCommandExecutor: allow-listed command execution without a shell
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: Only known build front-ends can execute
//! - **Injection prevention**: Arguments are passed as a vector, never through a shell
//! - **Working directory validation**: Validates existence before execution
//!
//! # Example
//!
//! ```rust,no_run
//! use dist_publisher::SafeCommandExecutor;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let executor = SafeCommandExecutor::new(std::env::temp_dir())?;
//! let output = executor.execute("python", &["--version"]).await?;
//! println!("{}", String::from_utf8_lossy(&output.stdout));
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use thiserror::Error;
use tokio::process::Command;

/// Allowed commands whitelist.
///
/// Only these programs can be executed via SafeCommandExecutor.
pub const ALLOWED_COMMANDS: &[&str] = &[
    "python", "python3", "poetry", "uv", "hatch", "pdm", "flit", "pyproject-build",
];

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command is not in the allowed whitelist
    #[error("Command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    /// Working directory does not exist or is not accessible
    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    /// Command execution failed (e.g., binary not found, permission denied)
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),
}

/// Safe command executor with security controls
#[derive(Debug)]
pub struct SafeCommandExecutor {
    working_dir: PathBuf,
}

impl SafeCommandExecutor {
    /// Create a new SafeCommandExecutor with working directory validation.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidWorkingDirectory` if the directory does not exist.
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Result<Self, CommandError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.is_dir() {
            return Err(CommandError::InvalidWorkingDirectory(working_dir));
        }

        Ok(Self { working_dir })
    }

    /// Check a program against the whitelist
    pub fn is_allowed(command: &str) -> bool {
        ALLOWED_COMMANDS.contains(&command)
    }

    /// Execute a command and capture its output.
    ///
    /// # Errors
    ///
    /// - `CommandError::CommandNotAllowed` - Command not in whitelist
    /// - `CommandError::ExecutionFailed` - Binary not found or execution error
    pub async fn execute(&self, command: &str, args: &[&str]) -> Result<Output, CommandError> {
        if !Self::is_allowed(command) {
            return Err(CommandError::CommandNotAllowed(command.to_string()));
        }

        tracing::debug!(command, ?args, cwd = %self.working_dir.display(), "executing command");

        Command::new(command)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CommandError::ExecutionFailed(format!("{}: {}", command, e)))
    }
}

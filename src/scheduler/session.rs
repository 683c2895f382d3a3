//! Terminal-multiplexer backends.
//!
//! The dispatcher speaks tmux argument vectors; a backend decides whether to
//! execute them or just record them.

use std::collections::HashSet;
use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::DispatchError;

use super::dispatch::shell_join;

/// Something that can host one window per worker.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Returns true if a session with exactly this name exists.
    async fn has_session(&self, session: &str) -> Result<bool, DispatchError>;

    /// Runs one multiplexer command, e.g. `["new-window", "-t", "webarena:"]`.
    async fn run(&self, args: &[String]) -> Result<(), DispatchError>;
}

/// Drives a real tmux server. Requires tmux 3.2+ for `-e` on `new-session`.
#[derive(Debug, Clone)]
pub struct TmuxBackend {
    program: String,
}

impl Default for TmuxBackend {
    fn default() -> Self {
        Self::new("tmux")
    }
}

impl TmuxBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl SessionBackend for TmuxBackend {
    async fn has_session(&self, session: &str) -> Result<bool, DispatchError> {
        let status = Command::new(&self.program)
            .arg("has-session")
            .arg("-t")
            .arg(format!("={}", session))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| DispatchError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        Ok(status.success())
    }

    async fn run(&self, args: &[String]) -> Result<(), DispatchError> {
        debug!(command = %shell_join(args), "tmux");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| DispatchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(DispatchError::CommandFailed {
                command: format!("{} {}", self.program, shell_join(args)),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Records commands instead of running them. Backs `--dry-run` and tests.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    existing: HashSet<String>,
    echo: bool,
    commands: Mutex<Vec<Vec<String>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints each command to stdout as it is recorded.
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Pretends `session` already exists.
    pub fn with_existing_session(mut self, session: impl Into<String>) -> Self {
        self.existing.insert(session.into());
        self
    }

    /// Snapshot of recorded commands.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionBackend for RecordingBackend {
    async fn has_session(&self, session: &str) -> Result<bool, DispatchError> {
        Ok(self.existing.contains(session))
    }

    async fn run(&self, args: &[String]) -> Result<(), DispatchError> {
        if self.echo {
            println!("tmux {}", shell_join(args));
        }
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(args.to_vec());
        }
        Ok(())
    }
}

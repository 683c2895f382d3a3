//! Launches one driver process per worker, each in its own tmux window.
//!
//! Nothing is collected back: once the windows are running, progress is
//! followed by attaching to the session or through the log reports.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::FleetConfig;
use crate::error::DispatchError;

use super::session::SessionBackend;
use super::split::{Assignment, Plan};

/// One worker that was handed to the multiplexer.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchedWorker {
    pub window: String,
    pub worker: String,
    pub start: u64,
    pub end: u64,
    /// Shell command typed into the window.
    pub command: String,
}

/// What a dispatch did.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub session: String,
    pub result_dir: PathBuf,
    pub launched: Vec<LaunchedWorker>,
    /// Workers left idle because their share of the range was empty.
    pub skipped: Vec<String>,
    pub replaced_session: bool,
}

/// Turns a [`Plan`] into multiplexer windows.
pub struct Dispatcher<B: SessionBackend> {
    config: FleetConfig,
    backend: B,
}

impl<B: SessionBackend> Dispatcher<B> {
    pub fn new(config: FleetConfig, backend: B) -> Self {
        Self { config, backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Window name for a worker, 1-based.
    pub fn window_name(assignment: &Assignment) -> String {
        format!("worker{}", assignment.index + 1)
    }

    /// Driver argument vector for one assignment.
    pub fn driver_args(&self, assignment: &Assignment, result_dir: &Path) -> Vec<String> {
        let driver = &self.config.driver;
        let mut args = vec![driver.program.clone()];
        if let Some(script) = &driver.script {
            args.push(script.clone());
        }
        args.extend([
            "--start".to_string(),
            assignment.start.to_string(),
            "--end".to_string(),
            assignment.end.to_string(),
            "--box_id".to_string(),
            assignment.worker.clone(),
            "--result_dir".to_string(),
            result_dir.display().to_string(),
            "--provider".to_string(),
            driver.provider.to_string(),
        ]);
        args
    }

    /// Options shared by `new-session` and `new-window`: working directory and
    /// benchmark endpoint variables.
    fn window_options(&self) -> Vec<String> {
        let mut opts = Vec::new();
        if let Some(dir) = &self.config.driver.working_dir {
            opts.push("-c".to_string());
            opts.push(dir.display().to_string());
        }
        for endpoint in self.config.endpoints.resolve() {
            opts.push("-e".to_string());
            opts.push(format!("{}={}", endpoint.name, endpoint.url));
        }
        opts
    }

    /// Opens the session and starts every non-empty assignment.
    ///
    /// Fails with [`DispatchError::SessionExists`] when the session is already
    /// there, unless `replace` is set, in which case it is killed first.
    pub async fn dispatch(
        &self,
        plan: &Plan,
        result_dir: &Path,
        replace: bool,
    ) -> Result<DispatchReport, DispatchError> {
        let session = self.config.session.as_str();

        let mut replaced_session = false;
        if self.backend.has_session(session).await? {
            if !replace {
                return Err(DispatchError::SessionExists(session.to_string()));
            }
            warn!(session, "Killing existing session before dispatch");
            self.backend
                .run(&["kill-session".to_string(), "-t".to_string(), format!("={}", session)])
                .await?;
            replaced_session = true;
        }

        let skipped: Vec<String> = plan
            .assignments
            .iter()
            .filter(|a| a.is_empty())
            .map(|a| a.worker.clone())
            .collect();
        for worker in &skipped {
            info!(worker = %worker, "No tasks left for worker, not launching");
        }

        let active: Vec<&Assignment> = plan.active().collect();
        let options = self.window_options();
        let mut launched = Vec::with_capacity(active.len());

        for (position, assignment) in active.iter().enumerate() {
            if position > 0 && self.config.launch_delay_secs > 0 {
                tokio::time::sleep(self.config.launch_delay()).await;
            }

            let window = Self::window_name(assignment);
            let mut open = if position == 0 {
                vec![
                    "new-session".to_string(),
                    "-d".to_string(),
                    "-s".to_string(),
                    session.to_string(),
                    "-n".to_string(),
                    window.clone(),
                ]
            } else {
                vec![
                    "new-window".to_string(),
                    "-d".to_string(),
                    "-t".to_string(),
                    format!("{}:", session),
                    "-n".to_string(),
                    window.clone(),
                ]
            };
            open.extend(options.iter().cloned());
            self.backend.run(&open).await?;

            let command = shell_join(&self.driver_args(assignment, result_dir));
            self.backend
                .run(&[
                    "send-keys".to_string(),
                    "-t".to_string(),
                    format!("{}:{}", session, window),
                    command.clone(),
                    "C-m".to_string(),
                ])
                .await?;

            info!(
                session,
                window = %window,
                worker = %assignment.worker,
                start = assignment.start,
                end = assignment.end,
                "Launched worker"
            );

            launched.push(LaunchedWorker {
                window,
                worker: assignment.worker.clone(),
                start: assignment.start,
                end: assignment.end,
                command,
            });
        }

        Ok(DispatchReport {
            session: session.to_string(),
            result_dir: result_dir.to_path_buf(),
            launched,
            skipped,
            replaced_session,
        })
    }
}

/// Quotes one word for a POSIX shell, leaving plain words untouched.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Joins words into a single shell command line.
pub fn shell_join<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|w| shell_quote(w.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

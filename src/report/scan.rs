//! Finds logs containing a failure marker and optionally purges them so the
//! affected tasks are picked up again on the next run.
//!
//! The driver skips any task with a `render_<id>.html` in the result
//! directory, so purging removes both the log and the render file.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::ReportError;

use super::logs::task_id_from_log_name;
use super::pending::render_file_name;

/// Default marker: the provider rejected requests for lack of credit.
pub const DEFAULT_SCAN_PATTERN: &str = "Credit balance is too low";

/// A log file that contains the pattern.
#[derive(Debug, Clone, Serialize)]
pub struct ScanHit {
    pub path: PathBuf,
    pub task_id: Option<u64>,
}

/// What a purge removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PurgeOutcome {
    pub removed_logs: Vec<PathBuf>,
    pub removed_renders: Vec<PathBuf>,
    pub failures: Vec<String>,
}

fn file_contains(path: &Path, needle: &str) -> std::io::Result<bool> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.split(b'\n') {
        if String::from_utf8_lossy(&line?).contains(needle) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Recursively finds `*.log` files under `root` with a line containing
/// `needle`. A missing root yields no hits; unreadable files are skipped.
pub fn scan_logs(root: &Path, needle: &str) -> Result<Vec<ScanHit>, ReportError> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut hits = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }

        match file_contains(path, needle) {
            Ok(true) => {
                let task_id = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(task_id_from_log_name);
                hits.push(ScanHit {
                    path: path.to_path_buf(),
                    task_id,
                });
            }
            Ok(false) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable log"),
        }
    }
    Ok(hits)
}

/// Deletes each hit's log and, when the task id is known, its render file
/// under `renders_dir`. Individual failures are collected, not fatal.
pub fn purge_hits(hits: &[ScanHit], renders_dir: &Path) -> PurgeOutcome {
    let mut outcome = PurgeOutcome::default();

    for hit in hits {
        match fs::remove_file(&hit.path) {
            Ok(()) => outcome.removed_logs.push(hit.path.clone()),
            Err(e) => outcome
                .failures
                .push(format!("failed to remove {}: {}", hit.path.display(), e)),
        }

        let Some(task_id) = hit.task_id else {
            continue;
        };
        let render = renders_dir.join(render_file_name(task_id));
        if render.exists() {
            match fs::remove_file(&render) {
                Ok(()) => outcome.removed_renders.push(render),
                Err(e) => outcome
                    .failures
                    .push(format!("failed to remove {}: {}", render.display(), e)),
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_finds_pattern_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("old");
        fs::create_dir(&nested).unwrap();

        fs::write(
            dir.path().join("task_3_20250101_000000.log"),
            "INFO\nERROR Credit balance is too low to access the API\n",
        )
        .unwrap();
        fs::write(dir.path().join("task_4_20250101_000000.log"), "[Result] (PASS)\n").unwrap();
        fs::write(nested.join("session.log"), "Credit balance is too low").unwrap();
        fs::write(nested.join("notes.txt"), "Credit balance is too low").unwrap();

        let hits = scan_logs(dir.path(), DEFAULT_SCAN_PATTERN).unwrap();
        let found: Vec<_> = hits.iter().map(|h| h.task_id).collect();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&Some(3)));
        assert!(found.contains(&None));
    }

    #[test]
    fn test_scan_missing_root() {
        let hits = scan_logs(Path::new("/nonexistent/log_files"), "x").unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_purge_removes_log_and_render() {
        let logs = tempfile::tempdir().unwrap();
        let renders = tempfile::tempdir().unwrap();
        let log = logs.path().join("task_12_20250101_000000.log");
        let orphan = logs.path().join("agent.log");
        fs::write(&log, "Credit balance is too low").unwrap();
        fs::write(&orphan, "Credit balance is too low").unwrap();
        fs::write(renders.path().join("render_12.html"), "<html/>").unwrap();
        fs::write(renders.path().join("render_13.html"), "<html/>").unwrap();

        let hits = scan_logs(logs.path(), DEFAULT_SCAN_PATTERN).unwrap();
        let outcome = purge_hits(&hits, renders.path());

        assert_eq!(outcome.removed_logs.len(), 2);
        assert_eq!(outcome.removed_renders, vec![renders.path().join("render_12.html")]);
        assert!(outcome.failures.is_empty());
        assert!(!log.exists());
        assert!(renders.path().join("render_13.html").exists());
    }
}

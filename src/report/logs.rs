//! Per-task driver logs.
//!
//! The driver writes one `task_<id>_<YYYYmmdd_HHMMSS>.log` per attempt and
//! finishes it with a `[Result] (PASS)` or `[Result] (FAIL)` line.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::error::ReportError;

pub const PASS_MARKER: &str = "[Result] (PASS)";
pub const FAIL_MARKER: &str = "[Result] (FAIL)";

/// Outcome of one task attempt as recorded in its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskOutcome {
    Pass,
    Fail,
    /// Still running, or died before the evaluator ran.
    Incomplete,
    /// The log could not be read.
    Error,
}

impl TaskOutcome {
    pub const ALL: [TaskOutcome; 4] = [
        TaskOutcome::Pass,
        TaskOutcome::Fail,
        TaskOutcome::Incomplete,
        TaskOutcome::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOutcome::Pass => "PASS",
            TaskOutcome::Fail => "FAIL",
            TaskOutcome::Incomplete => "INCOMPLETE",
            TaskOutcome::Error => "ERROR",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Pass | TaskOutcome::Fail)
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies log contents. A PASS marker wins over a FAIL marker.
pub fn classify_log(contents: &str) -> TaskOutcome {
    if contents.contains(PASS_MARKER) {
        TaskOutcome::Pass
    } else if contents.contains(FAIL_MARKER) {
        TaskOutcome::Fail
    } else {
        TaskOutcome::Incomplete
    }
}

fn task_log_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^task_(\d+)_").expect("static regex is valid"))
}

/// Extracts the task id from a log file name such as `task_42_20250101_120000.log`.
pub fn task_id_from_log_name(name: &str) -> Option<u64> {
    task_log_regex()
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// True for names the driver uses for per-task logs.
pub fn is_task_log_name(name: &str) -> bool {
    name.starts_with("task_") && name.ends_with(".log")
}

/// One classified log file.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub path: PathBuf,
    pub file_name: String,
    pub task_id: Option<u64>,
    pub outcome: TaskOutcome,
    pub modified: Option<DateTime<Local>>,
}

impl LogRecord {
    /// Reads and classifies a single log file. Read failures become
    /// [`TaskOutcome::Error`] rather than errors.
    pub fn from_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let outcome = match fs::read(path) {
            Ok(bytes) => classify_log(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read log file");
                TaskOutcome::Error
            }
        };

        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Local>::from);

        Self {
            task_id: task_id_from_log_name(&file_name),
            path: path.to_path_buf(),
            file_name,
            outcome,
            modified,
        }
    }
}

/// Classifies every `task_*.log` directly inside `dir`, sorted by file name.
pub fn collect_logs(dir: &Path) -> Result<Vec<LogRecord>, ReportError> {
    if !dir.is_dir() {
        return Err(ReportError::DirectoryNotFound(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().to_string();
        if is_task_log_name(&name) && entry.path().is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    Ok(paths.iter().map(|p| LogRecord::from_path(p)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_log() {
        assert_eq!(
            classify_log("...\n2025-01-01 - INFO - [Result] (PASS) config_files/3.json\n"),
            TaskOutcome::Pass
        );
        assert_eq!(
            classify_log("[Result] (FAIL) config_files/3.json"),
            TaskOutcome::Fail
        );
        assert_eq!(classify_log("Opening browser for task"), TaskOutcome::Incomplete);
        assert_eq!(classify_log(""), TaskOutcome::Incomplete);
    }

    #[test]
    fn test_pass_marker_wins() {
        assert_eq!(
            classify_log("[Result] (FAIL) first\n[Result] (PASS) retry"),
            TaskOutcome::Pass
        );
    }

    #[test]
    fn test_task_id_from_log_name() {
        assert_eq!(task_id_from_log_name("task_42_20250101_120000.log"), Some(42));
        assert_eq!(task_id_from_log_name("task_0_x.log"), Some(0));
        assert_eq!(task_id_from_log_name("task_abc_1.log"), None);
        assert_eq!(task_id_from_log_name("task_42.log"), None);
        assert_eq!(task_id_from_log_name("notes.log"), None);
    }

    #[test]
    fn test_outcome_serializes_uppercase() {
        let json = serde_json::to_string(&TaskOutcome::Incomplete).unwrap();
        assert_eq!(json, "\"INCOMPLETE\"");
        assert!(TaskOutcome::Pass.is_completed());
        assert!(!TaskOutcome::Error.is_completed());
    }

    #[test]
    fn test_collect_logs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("task_2_20250101_000000.log"), "[Result] (FAIL) x").unwrap();
        fs::write(dir.path().join("task_1_20250101_000000.log"), "[Result] (PASS) x").unwrap();
        fs::write(dir.path().join("task_3_20250101_000000.log"), "step 4").unwrap();
        fs::write(dir.path().join("other.log"), "[Result] (PASS)").unwrap();
        fs::write(dir.path().join("task_4.txt"), "[Result] (PASS)").unwrap();

        let records = collect_logs(dir.path()).unwrap();
        let summary: Vec<_> = records.iter().map(|r| (r.task_id, r.outcome)).collect();
        assert_eq!(
            summary,
            vec![
                (Some(1), TaskOutcome::Pass),
                (Some(2), TaskOutcome::Fail),
                (Some(3), TaskOutcome::Incomplete),
            ]
        );
        assert!(records[0].modified.is_some());
    }

    #[test]
    fn test_collect_logs_missing_dir() {
        let err = collect_logs(Path::new("/nonexistent/log_files")).unwrap_err();
        assert!(matches!(err, ReportError::DirectoryNotFound(_)));
    }
}

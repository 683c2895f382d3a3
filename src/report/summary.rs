//! Aggregated pass/fail statistics over a log directory.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use super::catalog::{TaskCatalog, UNKNOWN_SITE};
use super::logs::{LogRecord, TaskOutcome};

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub pass: usize,
    pub fail: usize,
    pub incomplete: usize,
    pub error: usize,
}

impl OutcomeCounts {
    pub fn add(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Pass => self.pass += 1,
            TaskOutcome::Fail => self.fail += 1,
            TaskOutcome::Incomplete => self.incomplete += 1,
            TaskOutcome::Error => self.error += 1,
        }
    }

    pub fn get(&self, outcome: TaskOutcome) -> usize {
        match outcome {
            TaskOutcome::Pass => self.pass,
            TaskOutcome::Fail => self.fail,
            TaskOutcome::Incomplete => self.incomplete,
            TaskOutcome::Error => self.error,
        }
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.incomplete + self.error
    }

    pub fn completed(&self) -> usize {
        self.pass + self.fail
    }

    /// Pass rate over completed tasks only; `None` when nothing completed.
    pub fn success_rate(&self) -> Option<f64> {
        let completed = self.completed();
        (completed > 0).then(|| self.pass as f64 / completed as f64)
    }

    /// Share of all tasks with `outcome`, in percent.
    pub fn percent(&self, outcome: TaskOutcome) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.get(outcome) as f64 / total as f64 * 100.0
        }
    }
}

/// Counts for one benchmark site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteBreakdown {
    pub site: String,
    pub counts: OutcomeCounts,
}

/// One log file with its resolved site.
#[derive(Debug, Clone, Serialize)]
pub struct TaskEntry {
    pub task_id: Option<u64>,
    pub site: String,
    pub file_name: String,
    pub outcome: TaskOutcome,
    pub modified: Option<DateTime<Local>>,
}

/// Overall and per-site statistics for a log directory.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub log_dir: PathBuf,
    pub counts: OutcomeCounts,
    pub success_rate: Option<f64>,
    /// Sorted by site name.
    pub sites: Vec<SiteBreakdown>,
    pub tasks: Vec<TaskEntry>,
}

impl RunSummary {
    pub fn from_records(log_dir: &Path, records: Vec<LogRecord>, catalog: &TaskCatalog) -> Self {
        let mut counts = OutcomeCounts::default();
        let mut by_site: BTreeMap<String, OutcomeCounts> = BTreeMap::new();
        let mut tasks = Vec::with_capacity(records.len());

        for record in records {
            let site = record
                .task_id
                .map(|id| catalog.site(id))
                .unwrap_or_else(|| UNKNOWN_SITE.to_string());

            counts.add(record.outcome);
            by_site.entry(site.clone()).or_default().add(record.outcome);

            tasks.push(TaskEntry {
                task_id: record.task_id,
                site,
                file_name: record.file_name,
                outcome: record.outcome,
                modified: record.modified,
            });
        }

        Self {
            log_dir: log_dir.to_path_buf(),
            counts,
            success_rate: counts.success_rate(),
            sites: by_site
                .into_iter()
                .map(|(site, counts)| SiteBreakdown { site, counts })
                .collect(),
            tasks,
        }
    }

    /// Tasks with `outcome`, ordered by task id.
    pub fn tasks_with(&self, outcome: TaskOutcome) -> Vec<&TaskEntry> {
        let mut tasks: Vec<&TaskEntry> = self.tasks.iter().filter(|t| t.outcome == outcome).collect();
        tasks.sort_by(|a, b| (a.task_id, &a.file_name).cmp(&(b.task_id, &b.file_name)));
        tasks
    }

    /// Completed tasks, most recently modified first.
    pub fn recent_completions(&self, limit: usize) -> Vec<&TaskEntry> {
        let mut done: Vec<&TaskEntry> = self.tasks.iter().filter(|t| t.outcome.is_completed()).collect();
        done.sort_by(|a, b| b.modified.cmp(&a.modified));
        done.truncate(limit);
        done
    }

    /// Text report: totals, success rate, per-site table, and optionally the
    /// task lists per outcome.
    pub fn render_text(&self, details: bool) -> String {
        let mut out = String::new();
        let rule = "=".repeat(70);
        let c = &self.counts;

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "SUMMARY");
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "✅ PASS:       {:4} ({:5.1}%)", c.pass, c.percent(TaskOutcome::Pass));
        let _ = writeln!(out, "❌ FAIL:       {:4} ({:5.1}%)", c.fail, c.percent(TaskOutcome::Fail));
        let _ = writeln!(
            out,
            "⏳ INCOMPLETE: {:4} ({:5.1}%)",
            c.incomplete,
            c.percent(TaskOutcome::Incomplete)
        );
        if c.error > 0 {
            let _ = writeln!(out, "⚠️  ERROR:      {:4} ({:5.1}%)", c.error, c.percent(TaskOutcome::Error));
        }
        let _ = writeln!(out, "{}", "─".repeat(30));
        let _ = writeln!(out, "📊 TOTAL:      {:4}", c.total());
        let _ = writeln!(out, "{}", rule);

        if let Some(rate) = self.success_rate {
            let _ = writeln!(
                out,
                "\n🎯 Success Rate (completed tasks only): {:.1}% ({}/{})",
                rate * 100.0,
                c.pass,
                c.completed()
            );
        }

        if !self.sites.is_empty() {
            let _ = writeln!(out, "\n{}", rule);
            let _ = writeln!(out, "BREAKDOWN BY TASK TYPE");
            let _ = writeln!(out, "{}", rule);
            for site in &self.sites {
                let s = &site.counts;
                let _ = writeln!(
                    out,
                    "{:15}  Total: {:3}  Pass: {:2}  Fail: {:2}  Incomplete: {:2}  Success: {:5.1}%",
                    site.site.to_uppercase(),
                    s.total(),
                    s.pass,
                    s.fail,
                    s.incomplete,
                    s.success_rate().unwrap_or(0.0) * 100.0
                );
            }
        }

        if details {
            for outcome in TaskOutcome::ALL {
                let tasks = self.tasks_with(outcome);
                if tasks.is_empty() {
                    continue;
                }
                let _ = writeln!(out, "\n{}", rule);
                let _ = writeln!(out, "{} TASKS ({})", outcome, tasks.len());
                let _ = writeln!(out, "{}", rule);
                for task in tasks {
                    let id = task
                        .task_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "?".to_string());
                    let _ = writeln!(out, "   Task {:>3} [{:15}] - {}", id, task.site, task.file_name);
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn record(task_id: Option<u64>, outcome: TaskOutcome) -> LogRecord {
        LogRecord {
            path: PathBuf::from(format!("log_files/task_{:?}.log", task_id)),
            file_name: format!("task_{}_20250101_000000.log", task_id.unwrap_or(0)),
            task_id,
            outcome,
            modified: None,
        }
    }

    #[test]
    fn test_outcome_counts() {
        let mut counts = OutcomeCounts::default();
        assert_eq!(counts.success_rate(), None);
        assert_eq!(counts.percent(TaskOutcome::Pass), 0.0);

        for outcome in [
            TaskOutcome::Pass,
            TaskOutcome::Pass,
            TaskOutcome::Pass,
            TaskOutcome::Fail,
            TaskOutcome::Incomplete,
        ] {
            counts.add(outcome);
        }
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.completed(), 4);
        assert_eq!(counts.success_rate(), Some(0.75));
        assert!((counts.percent(TaskOutcome::Pass) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_groups_by_site() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1.json"), r#"{"sites": ["shopping"]}"#).unwrap();
        fs::write(dir.path().join("2.json"), r#"{"sites": ["shopping"]}"#).unwrap();
        fs::write(dir.path().join("3.json"), r#"{"sites": ["gitlab"]}"#).unwrap();
        let catalog = TaskCatalog::new(dir.path());

        let summary = RunSummary::from_records(
            Path::new("log_files"),
            vec![
                record(Some(1), TaskOutcome::Pass),
                record(Some(2), TaskOutcome::Fail),
                record(Some(3), TaskOutcome::Incomplete),
                record(None, TaskOutcome::Error),
            ],
            &catalog,
        );

        assert_eq!(summary.counts.total(), 4);
        assert_eq!(summary.success_rate, Some(0.5));
        let sites: Vec<_> = summary.sites.iter().map(|s| s.site.as_str()).collect();
        assert_eq!(sites, vec!["gitlab", "shopping", "unknown"]);
        assert_eq!(summary.sites[1].counts.pass, 1);
        assert_eq!(summary.sites[1].counts.fail, 1);
        assert_eq!(summary.sites[2].counts.error, 1);
    }

    #[test]
    fn test_render_text() {
        let catalog = TaskCatalog::new("/nonexistent");
        let summary = RunSummary::from_records(
            Path::new("log_files"),
            vec![
                record(Some(5), TaskOutcome::Pass),
                record(Some(4), TaskOutcome::Fail),
            ],
            &catalog,
        );

        let brief = summary.render_text(false);
        assert!(brief.contains("✅ PASS:          1 ( 50.0%)"));
        assert!(brief.contains("📊 TOTAL:         2"));
        assert!(brief.contains("Success Rate (completed tasks only): 50.0% (1/2)"));
        assert!(brief.contains("UNKNOWN"));
        assert!(!brief.contains("ERROR:"));
        assert!(!brief.contains("PASS TASKS"));

        let detailed = summary.render_text(true);
        assert!(detailed.contains("PASS TASKS (1)"));
        assert!(detailed.contains("FAIL TASKS (1)"));
        assert!(detailed.contains("Task   5 [unknown        ]"));
    }

    #[test]
    fn test_recent_completions_ordering() {
        let catalog = TaskCatalog::new("/nonexistent");
        let older = Local::now() - chrono::Duration::minutes(5);
        let newer = Local::now();
        let mut a = record(Some(1), TaskOutcome::Pass);
        a.modified = Some(older);
        let mut b = record(Some(2), TaskOutcome::Fail);
        b.modified = Some(newer);
        let c = record(Some(3), TaskOutcome::Incomplete);

        let summary = RunSummary::from_records(Path::new("."), vec![a, b, c], &catalog);
        let recent: Vec<_> = summary.recent_completions(10).iter().map(|t| t.task_id).collect();
        assert_eq!(recent, vec![Some(2), Some(1)]);
        assert_eq!(summary.recent_completions(1).len(), 1);
    }
}

//! Live dashboard over a log directory, redrawn on a fixed interval.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::error::ReportError;

use super::catalog::TaskCatalog;
use super::logs::{collect_logs, TaskOutcome};
use super::summary::RunSummary;

const WIDTH: usize = 80;
const BAR_WIDTH: usize = 60;
const LIST_LIMIT: usize = 10;

/// Counters carried between refreshes to report deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorState {
    pub last_completed: usize,
    pub last_files: usize,
}

/// Human-readable age, e.g. `42s ago`, `5m ago`, `3h ago`.
pub fn format_time_ago(then: DateTime<Local>, now: DateTime<Local>) -> String {
    let secs = (now - then).num_seconds().max(0);
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

fn rating(success_pct: f64) -> &'static str {
    if success_pct >= 70.0 {
        "🌟"
    } else if success_pct >= 50.0 {
        "✅"
    } else if success_pct >= 30.0 {
        "⚠️"
    } else {
        "❌"
    }
}

fn centered(text: &str) -> String {
    format!("{:^width$}", text, width = WIDTH)
}

/// Renders one dashboard frame and advances `state`.
pub fn render_dashboard(summary: &RunSummary, state: &mut MonitorState, now: DateTime<Local>) -> String {
    let mut out = String::new();
    let rule = "=".repeat(WIDTH);
    let thin = "─".repeat(WIDTH);
    let c = &summary.counts;
    let total = c.total();

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{}", centered("WebArena Real-Time Monitor"));
    let _ = writeln!(out, "{}", centered(&format!("Updated: {}", now.format("%Y-%m-%d %H:%M:%S"))));
    let _ = writeln!(out, "{}", rule);

    let _ = writeln!(out, "\n{}", centered("OVERALL PROGRESS"));
    let _ = writeln!(out, "{}", thin);
    if total > 0 {
        let cells = |n: usize| n * BAR_WIDTH / total;
        let (pass_bar, fail_bar, running_bar) = (cells(c.pass), cells(c.fail), cells(c.incomplete));
        let blank = BAR_WIDTH.saturating_sub(pass_bar + fail_bar + running_bar);
        let _ = writeln!(
            out,
            "  [{}{}{}{}]",
            "█".repeat(pass_bar),
            "▓".repeat(fail_bar),
            "░".repeat(running_bar),
            " ".repeat(blank)
        );
        let _ = writeln!(out, "  {:15} {:15} {:15} {:15}", "✅ Pass", "❌ Fail", "⏳ Running", "📊 Total");
        let _ = writeln!(
            out,
            "  {:3} ({:5.1}%)    {:3} ({:5.1}%)    {:3} ({:5.1}%)    {:3}",
            c.pass,
            c.percent(TaskOutcome::Pass),
            c.fail,
            c.percent(TaskOutcome::Fail),
            c.incomplete,
            c.percent(TaskOutcome::Incomplete),
            total
        );
    }

    if let Some(rate) = summary.success_rate {
        let _ = writeln!(
            out,
            "\n  🎯 Success Rate (completed): {:.1}% ({}/{})",
            rate * 100.0,
            c.pass,
            c.completed()
        );
    }

    let completed = c.completed();
    if completed > state.last_completed {
        let _ = writeln!(
            out,
            "  🆕 {} new completion(s) since last refresh",
            completed - state.last_completed
        );
    }
    if total > state.last_files {
        let _ = writeln!(out, "  📝 {} new task(s) started", total - state.last_files);
    }
    state.last_completed = completed;
    state.last_files = total;

    let _ = writeln!(out, "\n{}", centered("BREAKDOWN BY TASK TYPE"));
    let _ = writeln!(out, "{}", thin);
    let _ = writeln!(
        out,
        "  {:<15} {:>6} {:>6} {:>6} {:>8} {:>8}",
        "Type", "Total", "Pass", "Fail", "Running", "Success"
    );
    let _ = writeln!(out, "  {}", "─".repeat(70));
    for site in &summary.sites {
        let s = &site.counts;
        let success = s.success_rate().unwrap_or(0.0) * 100.0;
        let _ = writeln!(
            out,
            "  {} {:<13} {:>6} {:>6} {:>6} {:>8} {:>7.1}%",
            rating(success),
            site.site,
            s.total(),
            s.pass,
            s.fail,
            s.incomplete,
            success
        );
    }

    let _ = writeln!(out, "\n{}", centered("RECENT COMPLETIONS (Last 10)"));
    let _ = writeln!(out, "{}", thin);
    let recent = summary.recent_completions(LIST_LIMIT);
    if recent.is_empty() {
        let _ = writeln!(out, "  No completed tasks yet...");
    }
    for task in recent {
        let icon = if task.outcome == TaskOutcome::Pass { "✅" } else { "❌" };
        let age = task
            .modified
            .map(|m| format_time_ago(m, now))
            .unwrap_or_else(|| "-".to_string());
        let id = task.task_id.map(|i| i.to_string()).unwrap_or_else(|| "?".to_string());
        let _ = writeln!(out, "  {} Task {:>3} [{:15}] - {:>8}", icon, id, task.site, age);
    }

    let running = summary.tasks_with(TaskOutcome::Incomplete);
    if !running.is_empty() {
        let _ = writeln!(out, "\n{}", centered(&format!("CURRENTLY RUNNING ({})", running.len())));
        let _ = writeln!(out, "{}", thin);
        for task in running.iter().take(LIST_LIMIT) {
            let id = task.task_id.map(|i| i.to_string()).unwrap_or_else(|| "?".to_string());
            let _ = writeln!(out, "  ⏳ Task {:>3} [{:15}]", id, task.site);
        }
        if running.len() > LIST_LIMIT {
            let _ = writeln!(out, "  ... and {} more", running.len() - LIST_LIMIT);
        }
    }

    out
}

/// Redraws the dashboard every `interval` until Ctrl-C, then returns the
/// last summary taken (if any log was ever seen).
pub async fn run_monitor(
    log_dir: &Path,
    catalog: &TaskCatalog,
    interval: Duration,
) -> Result<Option<RunSummary>, ReportError> {
    info!(log_dir = %log_dir.display(), ?interval, "Starting log monitor");

    let mut state = MonitorState::default();
    let mut last = None;
    let mut ticker = tokio::time::interval(interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("Monitor interrupted");
                break;
            }
            _ = ticker.tick() => {
                // Clear screen and home the cursor.
                print!("\x1B[2J\x1B[H");
                let records = match collect_logs(log_dir) {
                    Ok(records) => records,
                    Err(ReportError::DirectoryNotFound(_)) => Vec::new(),
                    Err(e) => return Err(e),
                };
                if records.is_empty() {
                    println!("⏳ Waiting for log files in {}/...", log_dir.display());
                    continue;
                }
                let summary = RunSummary::from_records(log_dir, records, catalog);
                print!("{}", render_dashboard(&summary, &mut state, Local::now()));
                println!("\n{}", "=".repeat(WIDTH));
                println!("  Refreshing in {:?}... (Press Ctrl+C to exit)", interval);
                println!("{}", "=".repeat(WIDTH));
                last = Some(summary);
            }
        }
    }

    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::logs::LogRecord;
    use std::path::PathBuf;

    fn record(task_id: u64, outcome: TaskOutcome, modified: DateTime<Local>) -> LogRecord {
        LogRecord {
            path: PathBuf::from(format!("task_{}_x.log", task_id)),
            file_name: format!("task_{}_x.log", task_id),
            task_id: Some(task_id),
            outcome,
            modified: Some(modified),
        }
    }

    #[test]
    fn test_format_time_ago() {
        let now = Local::now();
        assert_eq!(format_time_ago(now - chrono::Duration::seconds(42), now), "42s ago");
        assert_eq!(format_time_ago(now - chrono::Duration::seconds(300), now), "5m ago");
        assert_eq!(format_time_ago(now - chrono::Duration::hours(3), now), "3h ago");
        assert_eq!(format_time_ago(now + chrono::Duration::seconds(5), now), "0s ago");
    }

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(rating(85.0), "🌟");
        assert_eq!(rating(50.0), "✅");
        assert_eq!(rating(30.0), "⚠️");
        assert_eq!(rating(0.0), "❌");
    }

    #[test]
    fn test_dashboard_reports_deltas() {
        let now = Local::now();
        let catalog = TaskCatalog::new("/nonexistent");
        let mut state = MonitorState::default();

        let first = RunSummary::from_records(
            Path::new("log_files"),
            vec![
                record(1, TaskOutcome::Pass, now),
                record(2, TaskOutcome::Incomplete, now),
            ],
            &catalog,
        );
        let frame = render_dashboard(&first, &mut state, now);
        assert!(frame.contains("1 new completion(s) since last refresh"));
        assert!(frame.contains("2 new task(s) started"));
        assert!(frame.contains("CURRENTLY RUNNING (1)"));
        assert!(frame.contains("✅ Task   1"));

        let frame = render_dashboard(&first, &mut state, now);
        assert!(!frame.contains("new completion"));
        assert!(!frame.contains("new task(s) started"));
        assert_eq!(state.last_completed, 1);
        assert_eq!(state.last_files, 2);
    }

    #[test]
    fn test_dashboard_without_completions() {
        let now = Local::now();
        let summary = RunSummary::from_records(
            Path::new("log_files"),
            vec![record(9, TaskOutcome::Incomplete, now)],
            &TaskCatalog::new("/nonexistent"),
        );
        let frame = render_dashboard(&summary, &mut MonitorState::default(), now);
        assert!(frame.contains("No completed tasks yet..."));
        assert!(!frame.contains("Success Rate"));
    }
}

//! Post-hoc views over what the dispatched drivers produced.
//!
//! The dispatcher collects nothing back from its workers; these reports read
//! the artifacts the driver leaves behind instead:
//!
//! - `log_files/task_<id>_<timestamp>.log` per task attempt ([`logs`])
//! - `<result_dir>/render_<id>.html` per finished task ([`pending`])
//! - `config_files/<id>.json` for the task's benchmark site ([`catalog`])

pub mod catalog;
pub mod logs;
pub mod monitor;
pub mod pending;
pub mod scan;
pub mod summary;

pub use catalog::{TaskCatalog, DEFAULT_CATALOG_DIR, UNKNOWN_SITE};
pub use logs::{classify_log, collect_logs, task_id_from_log_name, LogRecord, TaskOutcome};
pub use monitor::{render_dashboard, run_monitor, MonitorState};
pub use pending::{finished_tasks, pending_for_plan, render_file_name, PendingReport, WorkerBacklog};
pub use scan::{purge_hits, scan_logs, PurgeOutcome, ScanHit, DEFAULT_SCAN_PATTERN};
pub use summary::{OutcomeCounts, RunSummary, SiteBreakdown, TaskEntry};

/// Default directory the driver writes per-task logs to.
pub const DEFAULT_LOG_DIR: &str = "log_files";

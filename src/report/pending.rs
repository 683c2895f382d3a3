//! Which tasks of a range still need a run.
//!
//! A task counts as finished once `render_<id>.html` exists in the result
//! directory; tasks without a catalog config are never run by the driver.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ReportError;
use crate::scheduler::{Plan, TaskRange};

use super::catalog::TaskCatalog;

/// File name of the driver's rendered trajectory for a task.
pub fn render_file_name(task_id: u64) -> String {
    format!("render_{}.html", task_id)
}

fn task_id_from_render_name(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(".html")?;
    stem.split('_').nth(1)?.parse().ok()
}

/// Task ids with a render file in `result_dir`. A missing directory means
/// nothing has finished yet.
pub fn finished_tasks(result_dir: &Path) -> Result<BTreeSet<u64>, ReportError> {
    if !result_dir.exists() {
        return Ok(BTreeSet::new());
    }

    let entries = fs::read_dir(result_dir).map_err(|source| ReportError::Io {
        path: result_dir.to_path_buf(),
        source,
    })?;

    let mut finished = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|source| ReportError::Io {
            path: result_dir.to_path_buf(),
            source,
        })?;
        if let Some(id) = task_id_from_render_name(&entry.file_name().to_string_lossy()) {
            finished.insert(id);
        }
    }
    Ok(finished)
}

/// Remaining work for one worker's share of the range.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerBacklog {
    pub index: usize,
    pub worker: String,
    pub start: u64,
    pub end: u64,
    pub finished: usize,
    /// Indices in the share with no catalog config.
    pub missing_config: usize,
    pub pending: Vec<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingReport {
    pub range: TaskRange,
    pub result_dir: PathBuf,
    pub workers: Vec<WorkerBacklog>,
    pub total_pending: usize,
    pub total_finished: usize,
}

impl PendingReport {
    /// Every pending task id across workers, ascending.
    pub fn pending_ids(&self) -> Vec<u64> {
        self.workers
            .iter()
            .flat_map(|w| w.pending.iter().copied())
            .collect()
    }
}

/// Computes the backlog of every assignment in `plan`.
pub fn pending_for_plan(
    plan: &Plan,
    result_dir: &Path,
    catalog: &TaskCatalog,
) -> Result<PendingReport, ReportError> {
    let done = finished_tasks(result_dir)?;

    let workers: Vec<WorkerBacklog> = plan
        .assignments
        .iter()
        .map(|assignment| {
            let mut backlog = WorkerBacklog {
                index: assignment.index,
                worker: assignment.worker.clone(),
                start: assignment.start,
                end: assignment.end,
                finished: 0,
                missing_config: 0,
                pending: Vec::new(),
            };
            for task_id in assignment.tasks() {
                if !catalog.contains(task_id) {
                    backlog.missing_config += 1;
                } else if done.contains(&task_id) {
                    backlog.finished += 1;
                } else {
                    backlog.pending.push(task_id);
                }
            }
            backlog
        })
        .collect();

    Ok(PendingReport {
        range: plan.range,
        result_dir: result_dir.to_path_buf(),
        total_pending: workers.iter().map(|w| w.pending.len()).sum(),
        total_finished: workers.iter().map(|w| w.finished).sum(),
        workers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::split_range;

    #[test]
    fn test_render_name_round_trip() {
        assert_eq!(render_file_name(17), "render_17.html");
        assert_eq!(task_id_from_render_name("render_17.html"), Some(17));
        assert_eq!(task_id_from_render_name("render_x.html"), None);
        assert_eq!(task_id_from_render_name("render_17.zip"), None);
        assert_eq!(task_id_from_render_name("index.html"), None);
    }

    #[test]
    fn test_finished_tasks_missing_dir() {
        assert!(finished_tasks(Path::new("/nonexistent/results")).unwrap().is_empty());
    }

    #[test]
    fn test_pending_per_worker() {
        let catalog_dir = tempfile::tempdir().unwrap();
        for id in 0..10 {
            if id != 4 {
                fs::write(catalog_dir.path().join(format!("{}.json", id)), "{}").unwrap();
            }
        }
        let results = tempfile::tempdir().unwrap();
        for id in [0, 1, 6] {
            fs::write(results.path().join(render_file_name(id)), "").unwrap();
        }
        fs::create_dir(results.path().join("traces")).unwrap();

        let workers = vec!["a", "b", "c", "d"];
        let plan = split_range(TaskRange::new(0, 10).unwrap(), &workers).unwrap();
        let report = pending_for_plan(&plan, results.path(), &TaskCatalog::new(catalog_dir.path()))
            .unwrap();

        assert_eq!(report.workers[0].pending, vec![2]);
        assert_eq!(report.workers[0].finished, 2);
        assert_eq!(report.workers[1].pending, vec![3, 5]);
        assert_eq!(report.workers[1].missing_config, 1);
        assert_eq!(report.workers[2].pending, vec![7]);
        assert_eq!(report.workers[3].pending, vec![8, 9]);
        assert_eq!(report.total_pending, 6);
        assert_eq!(report.total_finished, 3);
        assert_eq!(report.pending_ids(), vec![2, 3, 5, 7, 8, 9]);
    }
}

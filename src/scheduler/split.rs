//! Even partitioning of a task-index range across an ordered worker list.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::SplitError;

/// Half-open interval `[start, end)` of task indices into the task catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRange {
    pub start: u64,
    pub end: u64,
}

impl TaskRange {
    /// Creates a non-empty range, rejecting `end <= start`.
    pub fn new(start: u64, end: u64) -> Result<Self, SplitError> {
        if end <= start {
            return Err(SplitError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of task indices covered.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Always false for ranges built through [`TaskRange::new`].
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, task_id: u64) -> bool {
        task_id >= self.start && task_id < self.end
    }

    /// Iterates the task indices in order.
    pub fn tasks(&self) -> Range<u64> {
        self.start..self.end
    }
}

impl fmt::Display for TaskRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A worker's contiguous share of the range. May be empty when the range is
/// shorter than the worker list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Position of the worker in the configured list.
    pub index: usize,
    /// Opaque worker identifier (a GBOX box ID).
    pub worker: String,
    pub start: u64,
    pub end: u64,
}

impl Assignment {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn tasks(&self) -> Range<u64> {
        self.start..self.end
    }

    pub fn contains(&self, task_id: u64) -> bool {
        task_id >= self.start && task_id < self.end
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "worker {} ({}): [{}, {}) - {} task(s)",
            self.index + 1,
            self.worker,
            self.start,
            self.end,
            self.len()
        )
    }
}

/// The complete split of one range, assignments in worker-list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub range: TaskRange,
    pub assignments: Vec<Assignment>,
}

impl Plan {
    /// Assignments that carry at least one task.
    pub fn active(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(|a| !a.is_empty())
    }

    /// Finds the assignment responsible for `task_id`.
    pub fn owner_of(&self, task_id: u64) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.contains(task_id))
    }
}

/// Splits `range` across `workers`.
///
/// With `total = range.len()` and `k = workers.len()`, the first
/// `total % k` workers receive `total / k + 1` tasks and the rest receive
/// `total / k`. Sub-ranges are laid out in worker order, each starting where
/// the previous one ended, so they cover `range` exactly and never overlap.
pub fn split_range<S: AsRef<str>>(range: TaskRange, workers: &[S]) -> Result<Plan, SplitError> {
    if workers.is_empty() {
        return Err(SplitError::NoWorkers);
    }
    if range.is_empty() {
        return Err(SplitError::EmptyRange {
            start: range.start,
            end: range.end,
        });
    }

    let k = workers.len() as u64;
    let base = range.len() / k;
    let remainder = range.len() % k;

    let mut cursor = range.start;
    let assignments = workers
        .iter()
        .enumerate()
        .map(|(index, worker)| {
            let size = if (index as u64) < remainder { base + 1 } else { base };
            let assignment = Assignment {
                index,
                worker: worker.as_ref().to_string(),
                start: cursor,
                end: cursor + size,
            };
            cursor += size;
            assignment
        })
        .collect();

    Ok(Plan { range, assignments })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workers(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("box-{}", i)).collect()
    }

    fn bounds(plan: &Plan) -> Vec<(u64, u64)> {
        plan.assignments.iter().map(|a| (a.start, a.end)).collect()
    }

    #[test]
    fn test_remainder_goes_to_first_workers() {
        let plan = split_range(TaskRange::new(0, 10).unwrap(), &workers(4)).unwrap();
        assert_eq!(bounds(&plan), vec![(0, 3), (3, 6), (6, 8), (8, 10)]);
    }

    #[test]
    fn test_one_task_each() {
        let plan = split_range(TaskRange::new(0, 4).unwrap(), &workers(4)).unwrap();
        assert_eq!(bounds(&plan), vec![(0, 1), (1, 2), (2, 3), (3, 4)]);
    }

    #[test]
    fn test_offset_range() {
        let plan = split_range(TaskRange::new(100, 113).unwrap(), &workers(4)).unwrap();
        assert_eq!(
            bounds(&plan),
            vec![(100, 104), (104, 107), (107, 110), (110, 113)]
        );
    }

    #[test]
    fn test_fewer_tasks_than_workers() {
        let plan = split_range(TaskRange::new(7, 9).unwrap(), &workers(4)).unwrap();
        assert_eq!(bounds(&plan), vec![(7, 8), (8, 9), (9, 9), (9, 9)]);
        assert_eq!(plan.active().count(), 2);
    }

    #[test]
    fn test_single_worker_takes_everything() {
        let plan = split_range(TaskRange::new(3, 50).unwrap(), &workers(1)).unwrap();
        assert_eq!(bounds(&plan), vec![(3, 50)]);
    }

    #[test]
    fn test_assignment_keeps_worker_order() {
        let ids = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let plan = split_range(TaskRange::new(0, 6).unwrap(), &ids).unwrap();
        let order: Vec<_> = plan.assignments.iter().map(|a| a.worker.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert_eq!(plan.assignments[2].index, 2);
    }

    #[test]
    fn test_owner_of() {
        let plan = split_range(TaskRange::new(0, 10).unwrap(), &workers(4)).unwrap();
        assert_eq!(plan.owner_of(0).map(|a| a.index), Some(0));
        assert_eq!(plan.owner_of(5).map(|a| a.index), Some(1));
        assert_eq!(plan.owner_of(9).map(|a| a.index), Some(3));
        assert!(plan.owner_of(10).is_none());
    }

    #[test]
    fn test_rejects_empty_range() {
        assert_eq!(
            TaskRange::new(5, 5),
            Err(SplitError::EmptyRange { start: 5, end: 5 })
        );
        assert!(TaskRange::new(9, 3).is_err());
    }

    #[test]
    fn test_rejects_no_workers() {
        let none: Vec<String> = Vec::new();
        assert_eq!(
            split_range(TaskRange::new(0, 3).unwrap(), &none),
            Err(SplitError::NoWorkers)
        );
    }

    #[test]
    fn test_display() {
        let range = TaskRange::new(0, 10).unwrap();
        assert_eq!(range.to_string(), "[0, 10)");
        let plan = split_range(range, &["abc"]).unwrap();
        assert_eq!(
            plan.assignments[0].to_string(),
            "worker 1 (abc): [0, 10) - 10 task(s)"
        );
    }
}

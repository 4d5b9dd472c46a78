//! Typed messages from worker tasks back to the event loop.
//!
//! Long I/O (tag sweeps, usage scans, registry reload) runs on worker
//! threads that report through these messages over an mpsc channel; the
//! loop drains the channel each iteration and never awaits I/O inline.
//! Tasks keyed on the same aggregate (a tag name) complete in enqueue
//! order because each aggregate gets at most one worker at a time.

use crate::tags::TagUsage;

/// What a worker is doing, keyed by the aggregate it locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Deleting a tag from every file that carries it.
    TagSweep(String),
    /// Counting usage for every registry entry.
    UsageScan,
    /// Rebuilding the registry from the trees (cancellable).
    RegistryReload,
}

impl Task {
    /// The aggregate a task marks in-progress, when it has one.
    pub fn aggregate(&self) -> Option<&str> {
        match self {
            Task::TagSweep(tag) => Some(tag),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum WorkerMsg {
    Started {
        task: Task,
    },
    Progress {
        task: Task,
        current: String,
        done: usize,
        total: usize,
    },
    Completed {
        task: Task,
        result: TaskResult,
    },
}

#[derive(Debug)]
pub enum TaskResult {
    SweepDone {
        processed: usize,
        failed: Vec<(String, String)>,
    },
    UsageScanned(Vec<(String, TagUsage)>),
    ReloadDone {
        added: usize,
    },
    Cancelled,
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_aggregate() {
        assert_eq!(Task::TagSweep("x".to_string()).aggregate(), Some("x"));
        assert_eq!(Task::UsageScan.aggregate(), None);
        assert_eq!(Task::RegistryReload.aggregate(), None);
    }
}

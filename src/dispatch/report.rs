//! Per-device, per-task outcome records for one dispatch.

use std::fmt;

use indexmap::IndexMap;

use crate::task::TaskSpec;

/// Which layer a recorded failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connect/auth/send failure or deadline expiry.
    Transport,

    /// Structured parsing rejected the device output.
    Parse,

    /// The command template could not be rendered for this device.
    Template,

    /// The device worker itself died (panic or cancellation).
    Worker,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Transport => "transport",
            Self::Parse => "parse",
            Self::Template => "template",
            Self::Worker => "worker",
        };
        write!(f, "{label}")
    }
}

/// Status of one task on one device.
#[derive(Debug, Clone)]
pub enum TaskStatus {
    /// The task completed and its result is stored under the task's key.
    Done,

    /// The task failed; nothing was stored for this key.
    Failed {
        kind: FailureKind,
        /// Short human-readable description.
        message: String,
    },
}

/// One task's outcome on one device.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// The result key the task stores under (also identifies the task).
    pub key: String,

    /// Success or recorded failure.
    pub status: TaskStatus,
}

impl TaskOutcome {
    pub(crate) fn done(key: &str) -> Self {
        Self {
            key: key.to_string(),
            status: TaskStatus::Done,
        }
    }

    pub(crate) fn failed(key: &str, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            status: TaskStatus::Failed {
                kind,
                message: message.into(),
            },
        }
    }

    /// True if the task completed.
    pub fn is_done(&self) -> bool {
        matches!(self.status, TaskStatus::Done)
    }
}

/// All task outcomes for one device, in declared task order.
#[derive(Debug, Clone)]
pub struct DeviceReport {
    outcomes: Vec<TaskOutcome>,
}

impl DeviceReport {
    pub(crate) fn from_outcomes(outcomes: Vec<TaskOutcome>) -> Self {
        Self { outcomes }
    }

    /// Every task failed with the same cause (e.g. the connect failed before
    /// any task could run).
    pub(crate) fn all_failed(tasks: &[TaskSpec], kind: FailureKind, message: &str) -> Self {
        Self {
            outcomes: tasks
                .iter()
                .map(|t| TaskOutcome::failed(t.key(), kind, message))
                .collect(),
        }
    }

    /// Task outcomes in declared order.
    pub fn outcomes(&self) -> &[TaskOutcome] {
        &self.outcomes
    }

    /// Outcome for the task storing under `key`.
    pub fn task(&self, key: &str) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.key == key)
    }

    /// True if every task on this device completed.
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::is_done)
    }
}

/// Outcome of one dispatcher invocation: every targeted device, every task.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    devices: IndexMap<String, DeviceReport>,
}

impl RunReport {
    pub(crate) fn new(devices: IndexMap<String, DeviceReport>) -> Self {
        Self { devices }
    }

    /// Per-device reports, in device-set order.
    pub fn devices(&self) -> impl Iterator<Item = (&str, &DeviceReport)> {
        self.devices.iter().map(|(name, r)| (name.as_str(), r))
    }

    /// Report for one device.
    pub fn device(&self, name: &str) -> Option<&DeviceReport> {
        self.devices.get(name)
    }

    /// Every recorded failure as (device, key, message).
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.devices.iter().flat_map(|(name, report)| {
            report.outcomes.iter().filter_map(|o| match &o.status {
                TaskStatus::Failed { message, .. } => {
                    Some((name.as_str(), o.key.as_str(), message.as_str()))
                }
                TaskStatus::Done => None,
            })
        })
    }

    /// Number of completed (device, task) pairs.
    pub fn ok_count(&self) -> usize {
        self.devices
            .values()
            .flat_map(|r| &r.outcomes)
            .filter(|o| o.is_done())
            .count()
    }

    /// Number of failed (device, task) pairs.
    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// True when no device recorded any failure.
    pub fn is_clean(&self) -> bool {
        self.devices.values().all(DeviceReport::is_clean)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, report) in &self.devices {
            writeln!(f, "---- {name} ----")?;
            for outcome in &report.outcomes {
                match &outcome.status {
                    TaskStatus::Done => writeln!(f, "  {}: done", outcome.key)?,
                    TaskStatus::Failed { kind, message } => {
                        writeln!(f, "  {}: FAILED [{kind}] {message}", outcome.key)?
                    }
                }
            }
        }
        write!(
            f,
            "{} ok, {} failed across {} device(s)",
            self.ok_count(),
            self.failed_count(),
            self.devices.len()
        )
    }
}

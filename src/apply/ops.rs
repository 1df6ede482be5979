//! Storage Operations
//!
//! A strategy is turned into an ordered list of `StorageOp`s before anything
//! runs. Executing that list, for real or as a dry run, yields one
//! `OperationResult` per operation in the same order.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, warn};

// =============================================================================
// Operations
// =============================================================================

/// One step of an application plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StorageOp {
    /// Create a filesystem on a whole disk
    Format {
        device: String,
        filesystem: String,
        label: String,
    },
    /// Create a directory (mount point or data directory)
    CreateDir { path: String },
    /// Mount a formatted disk
    Mount {
        device: String,
        target: String,
        filesystem: String,
    },
    /// Register a mount in the mount table
    PersistMount {
        device: String,
        target: String,
        filesystem: String,
    },
    /// Union filesystem over already-mounted branches
    PoolMount {
        branches: Vec<String>,
        target: String,
        policy: String,
    },
    /// Two-disk mirror, mounted at `target`
    Mirror {
        devices: Vec<String>,
        target: String,
        filesystem: String,
        label: String,
    },
    /// Scheduled one-way sync from `source` to `destination`
    BackupJob {
        job: String,
        source: String,
        destination: String,
        schedule: String,
    },
    /// Set the standby timeout of a rotational disk
    SpinDown { device: String, minutes: u32 },
}

impl StorageOp {
    /// Short step name for result listings
    pub fn step_name(&self) -> String {
        match self {
            StorageOp::Format { device, .. } => format!("format {}", device),
            StorageOp::CreateDir { path } => format!("mkdir {}", path),
            StorageOp::Mount { target, .. } => format!("mount {}", target),
            StorageOp::PersistMount { target, .. } => format!("fstab {}", target),
            StorageOp::PoolMount { target, .. } => format!("pool {}", target),
            StorageOp::Mirror { target, .. } => format!("mirror {}", target),
            StorageOp::BackupJob { job, .. } => format!("schedule {}", job),
            StorageOp::SpinDown { device, .. } => format!("spindown {}", device),
        }
    }

    /// Whether the step destroys existing data
    pub fn is_destructive(&self) -> bool {
        matches!(self, StorageOp::Format { .. } | StorageOp::Mirror { .. })
    }
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageOp::Format {
                device,
                filesystem,
                label,
            } => write!(f, "Format {} as {} (label '{}')", device, filesystem, label),
            StorageOp::CreateDir { path } => write!(f, "Create directory {}", path),
            StorageOp::Mount {
                device,
                target,
                filesystem,
            } => write!(f, "Mount {} ({}) at {}", device, filesystem, target),
            StorageOp::PersistMount { device, target, .. } => {
                write!(f, "Add {} -> {} to the mount table", device, target)
            }
            StorageOp::PoolMount {
                branches,
                target,
                policy,
            } => write!(
                f,
                "Pool {} at {} with mergerfs (policy {})",
                branches.join(":"),
                target,
                policy
            ),
            StorageOp::Mirror {
                devices, target, ..
            } => write!(f, "Mirror {} and mount at {}", devices.join(" + "), target),
            StorageOp::BackupJob {
                source,
                destination,
                schedule,
                ..
            } => write!(f, "Schedule {} sync of {} to {}", schedule, source, destination),
            StorageOp::SpinDown { device, minutes } => {
                write!(f, "Spin down {} after {} minutes idle", device, minutes)
            }
        }
    }
}

/// Render a plan as numbered lines
pub fn summarize(ops: &[StorageOp]) -> String {
    let mut lines = vec![format!("Operations ({}):", ops.len())];
    for (i, op) in ops.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, op));
    }
    lines.join("\n")
}

// =============================================================================
// Log Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Progress narration returned to the caller instead of printed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
}

/// Collects the events of one step, mirroring each into tracing
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<LogEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, level: LogLevel, message: String) {
        self.events.push(LogEvent { level, message });
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        self.push(LogLevel::Debug, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.push(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.push(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.push(LogLevel::Error, message);
    }

    pub fn into_events(self) -> Vec<LogEvent> {
        self.events
    }
}

// =============================================================================
// Results
// =============================================================================

/// What a successful step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub message: String,
    /// False when the host was already in the desired state
    pub changed: bool,
}

impl StepOutcome {
    pub fn changed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            changed: true,
        }
    }

    pub fn unchanged(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            changed: false,
        }
    }
}

/// Outcome of one executed (or narrated) step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub step: String,
    pub success: bool,
    /// The host was modified
    pub changed: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub events: Vec<LogEvent>,
}

impl OperationResult {
    pub fn succeeded(step: impl Into<String>, outcome: StepOutcome, events: Vec<LogEvent>) -> Self {
        Self {
            step: step.into(),
            success: true,
            changed: outcome.changed,
            message: outcome.message,
            error: None,
            events,
        }
    }

    pub fn failed(step: impl Into<String>, err: &Error, events: Vec<LogEvent>) -> Self {
        let message = match err {
            Error::StepFailure { step, .. } => format!("{} failed", step),
            Error::ToolUnavailable { tool, .. } => format!("{} is not installed", tool),
            other => other.to_string(),
        };
        Self {
            step: step.into(),
            success: false,
            changed: false,
            message,
            error: Some(err.to_string()),
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names_and_narration() {
        let op = StorageOp::Format {
            device: "/dev/sdb".into(),
            filesystem: "ext4".into(),
            label: "storage".into(),
        };
        assert_eq!(op.step_name(), "format /dev/sdb");
        assert_eq!(op.to_string(), "Format /dev/sdb as ext4 (label 'storage')");
        assert!(op.is_destructive());

        let op = StorageOp::PoolMount {
            branches: vec!["/mnt/disk1".into(), "/mnt/disk2".into()],
            target: "/mnt/storage".into(),
            policy: "mfs".into(),
        };
        assert_eq!(
            op.to_string(),
            "Pool /mnt/disk1:/mnt/disk2 at /mnt/storage with mergerfs (policy mfs)"
        );
        assert!(!op.is_destructive());
    }

    #[test]
    fn test_summarize() {
        let ops = vec![
            StorageOp::CreateDir {
                path: "/mnt/storage".into(),
            },
            StorageOp::SpinDown {
                device: "/dev/sdb".into(),
                minutes: 20,
            },
        ];
        let summary = summarize(&ops);
        assert!(summary.starts_with("Operations (2):"));
        assert!(summary.contains("  2. Spin down /dev/sdb after 20 minutes idle"));
    }

    #[test]
    fn test_event_log_order() {
        let mut log = EventLog::new();
        log.info("creating array");
        log.warn("resync started");
        let events = log.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, LogLevel::Info);
        assert_eq!(events[1].message, "resync started");
    }

    #[test]
    fn test_failed_result_keeps_tool_output() {
        let err = Error::step_failure("mkfs.ext4 /dev/sdb", "/dev/sdb is apparently in use");
        let result = OperationResult::failed("format /dev/sdb", &err, Vec::new());
        assert!(!result.success);
        assert!(!result.changed);
        assert!(result.error.unwrap().contains("apparently in use"));
    }

    #[test]
    fn test_op_serializes_tagged() {
        let op = StorageOp::CreateDir {
            path: "/mnt/fast".into(),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "create_dir");
        assert_eq!(json["path"], "/mnt/fast");
    }
}

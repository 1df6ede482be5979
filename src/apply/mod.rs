//! Apply Module
//!
//! Executes a chosen strategy against the host: formatting, mounting, mount
//! table persistence, pooling, mirroring, backup scheduling and power
//! settings. Every step is reported as an `OperationResult`.

pub mod applier;
pub mod cron;
pub mod filesystem;
pub mod fstab;
pub mod host;
pub mod mirror;
pub mod ops;
pub mod pool;
pub mod power;

pub use applier::*;
pub use cron::{backup_handoff, BackupHandoff, BACKUP_JOB};
pub use host::SystemHost;
pub use ops::*;

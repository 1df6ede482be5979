//! Storage Planner - Storage Decision Engine
//!
//! Inspects the block devices of a single host, proposes scored storage
//! layouts for the disks that are free to use, and applies the chosen
//! layout with idempotent, auditable steps.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Disk Inventory                              │
//! │        (lsblk JSON + /proc/meminfo -> Disk arena, SystemInfo)        │
//! └──────────────────────────────────┬──────────────────────────────────┘
//!                                    │
//! ┌──────────────────────────────────┴──────────────────────────────────┐
//! │                          Disk Classifier                             │
//! │     (available / OS / removable / in-use, fast vs slow, HW RAID)     │
//! └──────────────────────────────────┬──────────────────────────────────┘
//!                                    │
//! ┌──────────────────────────────────┴──────────────────────────────────┐
//! │   Strategy Generator (rule list)  ──►  Strategy Scorer (one pick)    │
//! │                 Two-disk Ranks (Hybrid ... Kamikaze)                 │
//! └──────────────────────────────────┬──────────────────────────────────┘
//!                                    │
//! ┌──────────────────────────────────┴──────────────────────────────────┐
//! │                         Strategy Applier                             │
//! │   plan -> [dry run | mkfs, mount, fstab, mergerfs, zfs/mdadm, cron]  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domain`]: Core domain types and the host/probe traits
//! - [`hardware`]: Disk discovery and classification
//! - [`strategy`]: Strategy generation, scoring and configuration
//! - [`apply`]: Strategy application against a host
//! - [`error`]: Error types and handling

pub mod apply;
pub mod domain;
pub mod error;
pub mod hardware;
pub mod strategy;

// Re-export commonly used types
pub use apply::{
    plan, ApplierSettings, BackupHandoff, OperationResult, StorageOp, StrategyApplier,
    SystemHost,
};

pub use domain::ports::{
    Disk, DiskId, DiskType, HostInventory, HostOps, SizeBucket, SpeedClass, SystemInfo,
};

pub use error::{Error, ErrorAction, Result};

pub use hardware::{
    classify, DiskClassification, DiskInventory, ModelStringRaidDetector, RaidDetector,
    ScannerConfig,
};

pub use strategy::{
    generate, score, two_disk_recommendations, RecommendationRank, StorageRecommendation,
    Strategy, StrategyConfig, StrategyGenerator, StrategyId,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

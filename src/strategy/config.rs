//! Strategy Configuration
//!
//! `StrategyConfig` holds the parameters a user may edit between picking a
//! strategy and applying it. Token fields stay strings so any edited value
//! survives the string-map projection; they are parsed into typed values
//! only when a step needs them.

use super::types::DiskRole;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

// =============================================================================
// Map Keys
// =============================================================================

pub const KEY_MOUNTPOINT: &str = "mountpoint";
pub const KEY_BACKUP_MOUNT: &str = "backup_mount";
pub const KEY_SCRATCH_MOUNT: &str = "scratch_mount";
pub const KEY_FAST_MOUNT: &str = "fast_mount";
pub const KEY_FILESYSTEM: &str = "filesystem";
pub const KEY_LABEL: &str = "label";
pub const KEY_BACKUP_SCHEDULE: &str = "backup_schedule";
pub const KEY_MERGERFS_POLICY: &str = "mergerfs_policy";

// =============================================================================
// Strategy Config
// =============================================================================

/// Editable execution parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Primary data mount point
    pub mountpoint: String,
    pub backup_mount: String,
    pub scratch_mount: String,
    pub fast_mount: String,
    /// ext4, xfs or btrfs
    pub filesystem: String,
    pub label: String,
    /// daily, 6h, 12h or weekly
    pub backup_schedule: String,
    /// mfs, lfs or epmfs
    pub mergerfs_policy: String,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            mountpoint: "/mnt/storage".to_string(),
            backup_mount: "/mnt/backup".to_string(),
            scratch_mount: "/mnt/scratch".to_string(),
            fast_mount: "/mnt/fast".to_string(),
            filesystem: "ext4".to_string(),
            label: "storage".to_string(),
            backup_schedule: "daily".to_string(),
            mergerfs_policy: "mfs".to_string(),
        }
    }
}

impl StrategyConfig {
    /// Project onto a flat string map
    pub fn to_map(&self) -> BTreeMap<String, String> {
        [
            (KEY_MOUNTPOINT, &self.mountpoint),
            (KEY_BACKUP_MOUNT, &self.backup_mount),
            (KEY_SCRATCH_MOUNT, &self.scratch_mount),
            (KEY_FAST_MOUNT, &self.fast_mount),
            (KEY_FILESYSTEM, &self.filesystem),
            (KEY_LABEL, &self.label),
            (KEY_BACKUP_SCHEDULE, &self.backup_schedule),
            (KEY_MERGERFS_POLICY, &self.mergerfs_policy),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }

    /// Rehydrate from a string map; missing keys take the default
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let mut config = Self::default();
        let fields: [(&str, &mut String); 8] = [
            (KEY_MOUNTPOINT, &mut config.mountpoint),
            (KEY_BACKUP_MOUNT, &mut config.backup_mount),
            (KEY_SCRATCH_MOUNT, &mut config.scratch_mount),
            (KEY_FAST_MOUNT, &mut config.fast_mount),
            (KEY_FILESYSTEM, &mut config.filesystem),
            (KEY_LABEL, &mut config.label),
            (KEY_BACKUP_SCHEDULE, &mut config.backup_schedule),
            (KEY_MERGERFS_POLICY, &mut config.mergerfs_policy),
        ];
        for (key, field) in fields {
            if let Some(value) = map.get(key) {
                *field = value.clone();
            }
        }
        config
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }

    /// Mount points must be absolute and distinct
    pub fn validate(&self) -> Result<()> {
        let mounts = [
            (KEY_MOUNTPOINT, &self.mountpoint),
            (KEY_BACKUP_MOUNT, &self.backup_mount),
            (KEY_SCRATCH_MOUNT, &self.scratch_mount),
            (KEY_FAST_MOUNT, &self.fast_mount),
        ];

        for (key, value) in &mounts {
            if !value.starts_with('/') || value.trim() != value.as_str() {
                return Err(Error::Configuration(format!(
                    "{} must be an absolute path, got '{}'",
                    key, value
                )));
            }
            if value.as_str() == "/" {
                return Err(Error::Configuration(format!("{} cannot be /", key)));
            }
        }

        for (i, (key_a, a)) in mounts.iter().enumerate() {
            for (key_b, b) in &mounts[i + 1..] {
                if a == b {
                    return Err(Error::Configuration(format!(
                        "{} and {} are both '{}'",
                        key_a, key_b, a
                    )));
                }
            }
        }

        Ok(())
    }

    /// Directory numbered member mounts are created in (`/mnt` for `/mnt/storage`)
    pub fn member_base(&self) -> String {
        match Path::new(&self.mountpoint).parent() {
            Some(parent) if parent != Path::new("/") && !parent.as_os_str().is_empty() => {
                parent.to_string_lossy().to_string()
            }
            _ => self.mountpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Mount point of the `ordinal`-th (1-based) disk holding `role`
    pub fn mount_for(&self, role: DiskRole, ordinal: usize) -> String {
        match role {
            DiskRole::Data | DiskRole::MirrorMember | DiskRole::Primary | DiskRole::Vault => {
                self.mountpoint.clone()
            }
            DiskRole::Backup => self.backup_mount.clone(),
            DiskRole::Scratch => self.scratch_mount.clone(),
            DiskRole::Fast => format!("{}{}", self.fast_mount.trim_end_matches('/'), ordinal),
            DiskRole::PoolMember | DiskRole::Slow | DiskRole::Independent => {
                format!("{}/disk{}", self.member_base(), ordinal)
            }
        }
    }

    /// Filesystem label of the `ordinal`-th (1-based) disk holding `role`
    pub fn label_for(&self, role: DiskRole, ordinal: usize) -> String {
        match role {
            DiskRole::Data | DiskRole::MirrorMember | DiskRole::Primary | DiskRole::Vault => {
                self.label.clone()
            }
            DiskRole::Backup => "backup".to_string(),
            DiskRole::Scratch => "scratch".to_string(),
            DiskRole::Fast => format!("fast{}", ordinal),
            DiskRole::PoolMember | DiskRole::Slow | DiskRole::Independent => {
                format!("disk{}", ordinal)
            }
        }
    }
}

// =============================================================================
// Typed Tokens
// =============================================================================

/// Filesystems the applier can create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filesystem {
    Ext4,
    Xfs,
    Btrfs,
}

impl Filesystem {
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "ext4" => Ok(Filesystem::Ext4),
            "xfs" => Ok(Filesystem::Xfs),
            "btrfs" => Ok(Filesystem::Btrfs),
            other => Err(Error::UnsupportedConfiguration(format!(
                "filesystem '{}' is not supported (use ext4, xfs or btrfs)",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Filesystem::Ext4 => "ext4",
            Filesystem::Xfs => "xfs",
            Filesystem::Btrfs => "btrfs",
        }
    }

    /// Formatting tool
    pub fn mkfs_program(&self) -> &'static str {
        match self {
            Filesystem::Ext4 => "mkfs.ext4",
            Filesystem::Xfs => "mkfs.xfs",
            Filesystem::Btrfs => "mkfs.btrfs",
        }
    }

    /// Arguments that format `device` with `label`, overwriting any signature
    pub fn mkfs_args<'a>(&self, device: &'a str, label: &'a str) -> Vec<&'a str> {
        let force = match self {
            Filesystem::Ext4 => "-F",
            Filesystem::Xfs | Filesystem::Btrfs => "-f",
        };
        vec![force, "-L", label, device]
    }
}

impl fmt::Display for Filesystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cadence of the backup sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupSchedule {
    Daily,
    Every6Hours,
    Every12Hours,
    Weekly,
}

impl BackupSchedule {
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(BackupSchedule::Daily),
            "6h" => Ok(BackupSchedule::Every6Hours),
            "12h" => Ok(BackupSchedule::Every12Hours),
            "weekly" => Ok(BackupSchedule::Weekly),
            other => Err(Error::UnsupportedConfiguration(format!(
                "backup schedule '{}' is not supported (use daily, 6h, 12h or weekly)",
                other
            ))),
        }
    }

    /// Five-field cron expression
    pub fn cron_expression(&self) -> &'static str {
        match self {
            BackupSchedule::Daily => "0 3 * * *",
            BackupSchedule::Every6Hours => "0 */6 * * *",
            BackupSchedule::Every12Hours => "0 */12 * * *",
            BackupSchedule::Weekly => "0 3 * * 0",
        }
    }
}

/// mergerfs create policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Most free space
    Mfs,
    /// Least free space
    Lfs,
    /// Existing path, most free space
    Epmfs,
}

impl MergePolicy {
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "mfs" => Ok(MergePolicy::Mfs),
            "lfs" => Ok(MergePolicy::Lfs),
            "epmfs" => Ok(MergePolicy::Epmfs),
            other => Err(Error::UnsupportedConfiguration(format!(
                "mergerfs policy '{}' is not supported (use mfs, lfs or epmfs)",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MergePolicy::Mfs => "mfs",
            MergePolicy::Lfs => "lfs",
            MergePolicy::Epmfs => "epmfs",
        }
    }
}

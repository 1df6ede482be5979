//! Domain Ports - Core types and trait definitions for the storage planner
//!
//! The disk model is built once per run and never mutated afterwards.
//! Everything that touches the host (block device enumeration, memory
//! probing, command execution, file writes) goes through one of the traits
//! defined here so the decision engine stays pure and testable.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// Size Constants
// =============================================================================

pub const KIB: u64 = 1024;
pub const MIB: u64 = KIB * 1024;
pub const GIB: u64 = MIB * 1024;
pub const TIB: u64 = GIB * 1024;

// =============================================================================
// Disk Types
// =============================================================================

/// Drive type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    Hdd,
    Ssd,
    Nvme,
    Usb,
    #[serde(other)]
    Unknown,
}

impl DiskType {
    /// Classify a device from its raw attributes.
    ///
    /// First match wins: NVMe by name or transport, then USB by transport or
    /// removable flag, then HDD by rotational flag, else SSD. A removable
    /// NVMe enclosure therefore classifies as USB.
    pub fn classify(name: &str, transport: &str, removable: bool, rotational: bool) -> Self {
        let transport = transport.to_ascii_lowercase();

        if (name.starts_with("nvme") || transport == "nvme") && !removable {
            DiskType::Nvme
        } else if transport == "usb" || removable {
            DiskType::Usb
        } else if rotational {
            DiskType::Hdd
        } else {
            DiskType::Ssd
        }
    }
}

impl std::fmt::Display for DiskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiskType::Hdd => write!(f, "HDD"),
            DiskType::Ssd => write!(f, "SSD"),
            DiskType::Nvme => write!(f, "NVMe"),
            DiskType::Usb => write!(f, "USB"),
            DiskType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Capacity bucket used in narratives and the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeBucket {
    Small,
    Medium,
    Large,
}

impl SizeBucket {
    /// < 256 GiB is small, < 1 TiB is medium, anything else is large
    pub fn from_bytes(size_bytes: u64) -> Self {
        if size_bytes < 256 * GIB {
            SizeBucket::Small
        } else if size_bytes < TIB {
            SizeBucket::Medium
        } else {
            SizeBucket::Large
        }
    }
}

impl std::fmt::Display for SizeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeBucket::Small => write!(f, "small"),
            SizeBucket::Medium => write!(f, "medium"),
            SizeBucket::Large => write!(f, "large"),
        }
    }
}

/// Latency/throughput class used for tiering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedClass {
    Fast,
    Slow,
}

// =============================================================================
// Disk Model
// =============================================================================

/// Index of a disk inside the per-run disk arena (the inventory `Vec<Disk>`).
///
/// Strategies and assignments refer to disks through this id and resolve it
/// against the same slice they were generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiskId(pub usize);

impl DiskId {
    /// Resolve this id against the disk arena
    pub fn resolve(self, disks: &[Disk]) -> Option<&Disk> {
        disks.get(self.0)
    }
}

/// A partition (or nested volume) owned by a disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub name: String,
    pub size_bytes: u64,
    pub filesystem: String,
    pub mount_point: String,
    pub label: String,
    pub uuid: String,
}

/// Raw attributes a `Disk` is built from
#[derive(Debug, Clone, Default)]
pub struct DiskDescriptor {
    pub name: String,
    /// Device path; derived from the name when empty
    pub path: String,
    pub size_bytes: u64,
    pub rotational: bool,
    pub removable: bool,
    pub transport: String,
    pub model: String,
    pub serial: String,
    pub partitions: Vec<Partition>,
    /// Filesystem written straight onto the disk, without a partition table
    pub filesystem: String,
    /// Where that whole-disk filesystem is mounted
    pub mount_point: String,
}

/// A discovered whole-disk block device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    /// Kernel name (e.g., sdb, nvme0n1)
    pub name: String,
    /// Device path (e.g., /dev/sdb)
    pub path: String,
    /// Total capacity in bytes
    pub size_bytes: u64,
    pub size_bucket: SizeBucket,
    pub disk_type: DiskType,
    pub rotational: bool,
    pub removable: bool,
    /// Transport reported by the kernel (sata, nvme, usb, sas, ...)
    pub transport: String,
    pub model: String,
    pub serial: String,
    /// Partitions and nested volumes, flattened in enumeration order
    pub partitions: Vec<Partition>,
    /// Whole-disk filesystem, empty when the disk is partitioned or blank
    #[serde(default)]
    pub filesystem: String,
    #[serde(default)]
    pub mount_point: String,
    /// The disk, or a partition on it, is mounted at `/`
    pub is_os_disk: bool,
    /// Not the OS disk, not removable, no partitions and no whole-disk
    /// filesystem
    pub is_available: bool,
}

impl Disk {
    /// Build a disk, deriving type, size bucket and availability
    pub fn from_descriptor(desc: DiskDescriptor) -> Self {
        let path = if desc.path.is_empty() {
            format!("/dev/{}", desc.name)
        } else {
            desc.path
        };

        let disk_type =
            DiskType::classify(&desc.name, &desc.transport, desc.removable, desc.rotational);
        let is_os_disk =
            desc.mount_point == "/" || desc.partitions.iter().any(|p| p.mount_point == "/");
        let blank = desc.partitions.is_empty()
            && desc.filesystem.is_empty()
            && desc.mount_point.is_empty();
        let is_available = !is_os_disk && !desc.removable && blank;

        Self {
            name: desc.name,
            path,
            size_bytes: desc.size_bytes,
            size_bucket: SizeBucket::from_bytes(desc.size_bytes),
            disk_type,
            rotational: desc.rotational,
            removable: desc.removable,
            transport: desc.transport,
            model: desc.model,
            serial: desc.serial,
            partitions: desc.partitions,
            filesystem: desc.filesystem,
            mount_point: desc.mount_point,
            is_os_disk,
            is_available,
        }
    }
}

/// Host facts read once per run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Total RAM in bytes
    pub total_ram_bytes: u64,
    /// A hardware RAID controller was detected
    pub hardware_raid: bool,
}

/// Everything discovery learned about the host in one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInventory {
    pub disks: Vec<Disk>,
    pub system: SystemInfo,
    pub discovered_at: DateTime<Utc>,
}

impl HostInventory {
    /// Disks that can be claimed by a strategy
    pub fn available(&self) -> impl Iterator<Item = &Disk> {
        self.disks.iter().filter(|d| d.is_available)
    }
}

// =============================================================================
// Discovery Ports
// =============================================================================

/// Port for raw block device enumeration
pub trait BlockDeviceProbe {
    /// Return the raw enumeration document (lsblk JSON)
    fn enumerate(&self) -> Result<String>;
}

/// Port for reading total system memory
pub trait MemoryProbe {
    fn total_memory_bytes(&self) -> Result<u64>;
}

// =============================================================================
// Host Operations Port
// =============================================================================

/// Captured output of one external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Combined output for attaching to a failed step
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{}\n{}", stdout, stderr),
        }
    }
}

/// Port for every mutating or host-inspecting call the applier makes
pub trait HostOps {
    /// Run a program to completion and capture its output
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Whether a program is resolvable on PATH
    fn tool_available(&self, tool: &str) -> bool;

    /// Create a directory and all of its parents
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read a file; `Ok(None)` when it does not exist
    fn read_file(&self, path: &Path) -> Result<Option<String>>;

    /// Append to a file, creating it if needed
    fn append_file(&self, path: &Path, contents: &str) -> Result<()>;

    /// Replace a file's contents and set its permission bits
    fn write_file(&self, path: &Path, contents: &str, mode: u32) -> Result<()>;

    /// Whether something is currently mounted at `mount_point`
    fn is_mounted(&self, mount_point: &Path) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> DiskDescriptor {
        DiskDescriptor {
            name: name.to_string(),
            size_bytes: 4 * TIB,
            ..Default::default()
        }
    }

    #[test]
    fn test_disk_type_precedence() {
        assert_eq!(DiskType::classify("nvme0n1", "", false, false), DiskType::Nvme);
        assert_eq!(DiskType::classify("sda", "nvme", false, false), DiskType::Nvme);
        assert_eq!(DiskType::classify("sdb", "usb", false, true), DiskType::Usb);
        assert_eq!(DiskType::classify("sdc", "sata", true, false), DiskType::Usb);
        assert_eq!(DiskType::classify("sdd", "sata", false, true), DiskType::Hdd);
        assert_eq!(DiskType::classify("sde", "sata", false, false), DiskType::Ssd);
    }

    #[test]
    fn test_removable_nvme_is_usb() {
        assert_eq!(DiskType::classify("nvme1n1", "nvme", true, false), DiskType::Usb);
    }

    #[test]
    fn test_size_buckets() {
        assert_eq!(SizeBucket::from_bytes(128 * GIB), SizeBucket::Small);
        assert_eq!(SizeBucket::from_bytes(256 * GIB), SizeBucket::Medium);
        assert_eq!(SizeBucket::from_bytes(TIB - 1), SizeBucket::Medium);
        assert_eq!(SizeBucket::from_bytes(TIB), SizeBucket::Large);
    }

    #[test]
    fn test_disk_availability() {
        let blank = Disk::from_descriptor(descriptor("sdb"));
        assert!(blank.is_available);
        assert!(!blank.is_os_disk);
        assert_eq!(blank.path, "/dev/sdb");

        let mut os = descriptor("sda");
        os.partitions.push(Partition {
            name: "sda2".into(),
            mount_point: "/".into(),
            ..Default::default()
        });
        let os = Disk::from_descriptor(os);
        assert!(os.is_os_disk);
        assert!(!os.is_available);

        let mut usb = descriptor("sdc");
        usb.removable = true;
        assert!(!Disk::from_descriptor(usb).is_available);

        let mut used = descriptor("sdd");
        used.partitions.push(Partition {
            name: "sdd1".into(),
            ..Default::default()
        });
        let used = Disk::from_descriptor(used);
        assert!(!used.is_available);
        assert!(!used.is_os_disk);

        let mut bare = descriptor("sde");
        bare.filesystem = "xfs".into();
        let bare = Disk::from_descriptor(bare);
        assert!(!bare.is_available);
        assert!(bare.partitions.is_empty());

        let mut bare_root = descriptor("vda");
        bare_root.filesystem = "ext4".into();
        bare_root.mount_point = "/".into();
        assert!(Disk::from_descriptor(bare_root).is_os_disk);
    }

    #[test]
    fn test_unknown_disk_type_deserializes() {
        let parsed: DiskType = serde_json::from_str("\"optical\"").unwrap();
        assert_eq!(parsed, DiskType::Unknown);
    }

    #[test]
    fn test_command_output_combined() {
        let out = CommandOutput {
            success: false,
            stdout: "".into(),
            stderr: "device busy\n".into(),
        };
        assert_eq!(out.combined(), "device busy");
    }
}

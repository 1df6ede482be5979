//! Disk Inventory
//!
//! Drives the block device and memory probes and produces the immutable
//! disk arena every later stage works from.

use super::lsblk::{parse_lsblk, LsblkProbe};
use super::system::{FixedMemoryProbe, ProcMeminfoProbe};
use crate::domain::ports::{BlockDeviceProbe, Disk, HostInventory, MemoryProbe, SystemInfo};
use crate::error::Result;
use crate::hardware::classification::raid::{ModelStringRaidDetector, RaidDetector};
use chrono::Utc;
use tracing::{debug, info};

// =============================================================================
// Scanner Configuration
// =============================================================================

/// Configuration for the disk inventory
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// Include loopback devices
    pub include_loopback: bool,
    /// Include RAM and zram disks
    pub include_ram: bool,
    /// Minimum device size to include (bytes)
    pub min_size_bytes: u64,
}

// =============================================================================
// Disk Inventory
// =============================================================================

/// Enumerates the disks and system facts of one host
pub struct DiskInventory {
    config: ScannerConfig,
    devices: Box<dyn BlockDeviceProbe>,
    memory: Box<dyn MemoryProbe>,
    raid: Box<dyn RaidDetector>,
}

impl DiskInventory {
    /// Create an inventory over explicit probes
    pub fn new(
        config: ScannerConfig,
        devices: Box<dyn BlockDeviceProbe>,
        memory: Box<dyn MemoryProbe>,
    ) -> Self {
        Self {
            config,
            devices,
            memory,
            raid: Box::new(ModelStringRaidDetector::new()),
        }
    }

    /// Inventory of the local host via lsblk and /proc/meminfo
    pub fn local() -> Self {
        Self::new(
            ScannerConfig::default(),
            Box::new(LsblkProbe::new()),
            Box::new(ProcMeminfoProbe::new()),
        )
    }

    /// Replace the hardware RAID predicate
    pub fn with_raid_detector(mut self, raid: Box<dyn RaidDetector>) -> Self {
        self.raid = raid;
        self
    }

    /// Use a fixed RAM figure instead of probing
    pub fn with_memory_bytes(mut self, bytes: u64) -> Self {
        self.memory = Box::new(FixedMemoryProbe(bytes));
        self
    }

    /// The RAID predicate used for `SystemInfo::hardware_raid`
    pub fn raid_detector(&self) -> &dyn RaidDetector {
        self.raid.as_ref()
    }

    /// Enumerate whole disks. Read-only.
    pub fn discover(&self) -> Result<Vec<Disk>> {
        let document = self.devices.enumerate()?;
        let disks: Vec<Disk> = parse_lsblk(&document)?
            .into_iter()
            .filter(|d| self.should_include_device(&d.name))
            .filter(|d| d.size_bytes >= self.config.min_size_bytes)
            .collect();

        info!(
            "Discovered {} disks ({} available)",
            disks.len(),
            disks.iter().filter(|d| d.is_available).count()
        );
        for disk in &disks {
            debug!(
                "{} {} {} bytes os={} available={} model={:?}",
                disk.path, disk.disk_type, disk.size_bytes, disk.is_os_disk, disk.is_available, disk.model
            );
        }

        Ok(disks)
    }

    /// Read RAM and derive the hardware RAID flag from the disk set
    pub fn system_info(&self, disks: &[Disk]) -> Result<SystemInfo> {
        let total_ram_bytes = self.memory.total_memory_bytes()?;
        let hardware_raid = disks.iter().any(|d| self.raid.is_hardware_raid(d));

        Ok(SystemInfo {
            total_ram_bytes,
            hardware_raid,
        })
    }

    /// Discover disks and system facts in one pass
    pub fn snapshot(&self) -> Result<HostInventory> {
        let disks = self.discover()?;
        let system = self.system_info(&disks)?;

        Ok(HostInventory {
            disks,
            system,
            discovered_at: Utc::now(),
        })
    }

    /// lsblk already reports these with a non-disk type, but older
    /// releases omit TYPE for some of them
    fn should_include_device(&self, name: &str) -> bool {
        if !self.config.include_loopback && name.starts_with("loop") {
            return false;
        }

        if !self.config.include_ram && (name.starts_with("ram") || name.starts_with("zram")) {
            return false;
        }

        // md and device-mapper nodes are built from other disks
        !(name.starts_with("md") || name.starts_with("dm-"))
    }
}

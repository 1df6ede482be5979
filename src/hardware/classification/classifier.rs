//! Disk Classifier
//!
//! Splits an inventory into claimable and excluded disks, groups disks by
//! speed class, and provides the size-comparison predicates the strategy
//! rules are written against.

use super::raid::RaidDetector;
use crate::domain::ports::{Disk, DiskId, DiskType, SpeedClass};
use serde::{Deserialize, Serialize};
use tracing::debug;

// =============================================================================
// Classification Result
// =============================================================================

/// Inventory grouped by how the planner may use each disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskClassification {
    /// Claimable by a strategy
    pub available: Vec<DiskId>,
    /// Carries the root filesystem
    pub os_disks: Vec<DiskId>,
    /// Removable media, never claimed
    pub removable: Vec<DiskId>,
    /// Has partitions or a whole-disk filesystem but is neither the OS disk
    /// nor removable
    pub in_use: Vec<DiskId>,
    /// Available disks in the fast class
    pub fast: Vec<DiskId>,
    /// Available disks in the slow class
    pub slow: Vec<DiskId>,
    /// Available disks behind a hardware RAID controller
    pub hardware_raid: Vec<DiskId>,
}

impl DiskClassification {
    pub fn has_hardware_raid(&self) -> bool {
        !self.hardware_raid.is_empty()
    }

    /// Both speed classes are represented among available disks
    pub fn is_mixed_speed(&self) -> bool {
        !self.fast.is_empty() && !self.slow.is_empty()
    }
}

/// Classify every disk of the arena
pub fn classify(disks: &[Disk], raid: &dyn RaidDetector) -> DiskClassification {
    let mut result = DiskClassification::default();

    for (index, disk) in disks.iter().enumerate() {
        let id = DiskId(index);

        if disk.is_os_disk {
            result.os_disks.push(id);
        } else if disk.removable {
            result.removable.push(id);
        } else if !disk.is_available {
            result.in_use.push(id);
        }

        if !is_claimable(disk) {
            continue;
        }

        result.available.push(id);
        match speed_class(disk) {
            SpeedClass::Fast => result.fast.push(id),
            SpeedClass::Slow => result.slow.push(id),
        }
        if raid.is_hardware_raid(disk) {
            result.hardware_raid.push(id);
        }
    }

    debug!(
        "Classified {} disks: {} available ({} fast, {} slow), {} hardware RAID",
        disks.len(),
        result.available.len(),
        result.fast.len(),
        result.slow.len(),
        result.hardware_raid.len()
    );

    result
}

// =============================================================================
// Filters
// =============================================================================

fn is_claimable(disk: &Disk) -> bool {
    disk.is_available && !disk.is_os_disk && !disk.removable
}

/// Disks a strategy may claim
pub fn filter_available(disks: &[Disk]) -> Vec<&Disk> {
    disks.iter().filter(|d| is_claimable(d)).collect()
}

/// Disks of one type
pub fn filter_by_type(disks: &[Disk], disk_type: DiskType) -> Vec<&Disk> {
    disks.iter().filter(|d| d.disk_type == disk_type).collect()
}

/// NVMe and SSD are fast; everything else, including unknown, is slow
pub fn speed_class(disk: &Disk) -> SpeedClass {
    match disk.disk_type {
        DiskType::Nvme | DiskType::Ssd => SpeedClass::Fast,
        DiskType::Hdd | DiskType::Usb | DiskType::Unknown => SpeedClass::Slow,
    }
}

// =============================================================================
// Size Comparison
// =============================================================================

/// Relative size difference `(max - min) / max`; `None` if either size is zero
fn relative_difference(a: u64, b: u64) -> Option<f64> {
    if a == 0 || b == 0 {
        return None;
    }
    let (min, max) = if a < b { (a, b) } else { (b, a) };
    Some((max - min) as f64 / max as f64)
}

/// Sizes differ by at most `pct` of the larger one
pub fn similar(a: u64, b: u64, pct: f64) -> bool {
    relative_difference(a, b).is_some_and(|diff| diff <= pct)
}

/// Sizes differ by more than `pct` of the larger one
pub fn mismatch_large(a: u64, b: u64, pct: f64) -> bool {
    relative_difference(a, b).is_some_and(|diff| diff > pct)
}

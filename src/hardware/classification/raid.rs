//! Hardware RAID Detection
//!
//! Controllers present pre-combined "virtual disks" to the OS; layering a
//! software mirror or pool on top of them is redundant at best. Detection is
//! a heuristic over the model string, kept behind the `RaidDetector` trait so
//! a more precise signal (controller PCI ids, `storcli` output) can replace it.

use crate::domain::ports::Disk;

/// Model substrings that indicate a RAID controller volume
pub const RAID_MODEL_PATTERNS: &[&str] = &[
    "virtual disk",
    "perc",
    "megaraid",
    "smartarray",
    "raid",
    "logical volume",
];

/// Predicate deciding whether a disk sits behind a hardware RAID controller
pub trait RaidDetector {
    fn is_hardware_raid(&self, disk: &Disk) -> bool;
}

impl<F> RaidDetector for F
where
    F: Fn(&Disk) -> bool,
{
    fn is_hardware_raid(&self, disk: &Disk) -> bool {
        self(disk)
    }
}

/// Case-insensitive model substring match
#[derive(Debug, Clone)]
pub struct ModelStringRaidDetector {
    patterns: Vec<String>,
}

impl ModelStringRaidDetector {
    pub fn new() -> Self {
        Self::with_patterns(RAID_MODEL_PATTERNS.iter().copied())
    }

    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl Default for ModelStringRaidDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl RaidDetector for ModelStringRaidDetector {
    fn is_hardware_raid(&self, disk: &Disk) -> bool {
        let model = disk.model.to_lowercase();
        self.patterns.iter().any(|p| model.contains(p.as_str()))
    }
}

/// Check a disk against the default model patterns
pub fn is_hardware_raid(disk: &Disk) -> bool {
    ModelStringRaidDetector::new().is_hardware_raid(disk)
}

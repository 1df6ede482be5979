//! Strategy Model
//!
//! Value objects produced fresh on every run. Disks are referenced by
//! `DiskId` into the inventory slice the strategy was generated from.

use crate::domain::ports::{Disk, DiskId};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Strategy Identifier
// =============================================================================

/// Named storage layouts the planner can propose and apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyId {
    /// Data directory on the OS drive
    Partition,
    /// One dedicated data disk
    SingleDisk,
    /// Controller volumes formatted individually
    HardwareRaid,
    /// Fast and slow disks in separate pools
    SpeedTiered,
    /// Two disks kept identical
    Mirror,
    /// Primary disk with a scheduled sync to a second disk
    Backup,
    /// Permanent vault disk plus a throwaway scratch disk
    ScratchVault,
    /// Union filesystem over every disk
    Pool,
    /// Every disk mounted on its own, no protection
    Independent,
}

impl StrategyId {
    pub const ALL: [StrategyId; 9] = [
        StrategyId::Partition,
        StrategyId::SingleDisk,
        StrategyId::HardwareRaid,
        StrategyId::SpeedTiered,
        StrategyId::Mirror,
        StrategyId::Backup,
        StrategyId::ScratchVault,
        StrategyId::Pool,
        StrategyId::Independent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Partition => "partition",
            StrategyId::SingleDisk => "single-disk",
            StrategyId::HardwareRaid => "hardware-raid",
            StrategyId::SpeedTiered => "speed-tiered",
            StrategyId::Mirror => "mirror",
            StrategyId::Backup => "backup",
            StrategyId::ScratchVault => "scratch-vault",
            StrategyId::Pool => "pool",
            StrategyId::Independent => "independent",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        StrategyId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| Error::Configuration(format!("unknown strategy '{}'", s)))
    }
}

/// Which mirror flavour the narrative describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorVariant {
    /// Checksummed copy-on-write pool (ZFS), chosen with enough RAM
    Checksummed,
    /// Block-level mirror (mdadm RAID1)
    Block,
}

// =============================================================================
// Disk Roles
// =============================================================================

/// What a claimed disk is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiskRole {
    /// Sole data disk
    Data,
    /// Union pool branch
    PoolMember,
    /// Mirror leg
    MirrorMember,
    /// Fast tier disk
    Fast,
    /// Slow or archive tier disk
    Slow,
    /// Sync source
    Primary,
    /// Sync destination
    Backup,
    /// Permanent storage
    Vault,
    /// Temporary storage
    Scratch,
    /// Standalone disk
    Independent,
}

impl fmt::Display for DiskRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskRole::Data => write!(f, "data"),
            DiskRole::PoolMember => write!(f, "pool member"),
            DiskRole::MirrorMember => write!(f, "mirror member"),
            DiskRole::Fast => write!(f, "fast tier"),
            DiskRole::Slow => write!(f, "archive tier"),
            DiskRole::Primary => write!(f, "primary"),
            DiskRole::Backup => write!(f, "backup"),
            DiskRole::Vault => write!(f, "vault"),
            DiskRole::Scratch => write!(f, "scratch"),
            DiskRole::Independent => write!(f, "independent"),
        }
    }
}

/// A disk claimed by a strategy, with its role and default layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskAssignment {
    pub disk: DiskId,
    pub role: DiskRole,
    /// Filesystem label
    pub label: String,
    /// Mount point under the default configuration
    pub mount: String,
}

impl DiskAssignment {
    /// Read-only view of the assigned disk
    pub fn resolve<'a>(&self, disks: &'a [Disk]) -> Option<&'a Disk> {
        self.disk.resolve(disks)
    }
}

// =============================================================================
// Strategy
// =============================================================================

/// One candidate storage layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: StrategyId,
    pub name: String,
    pub description: String,
    /// Usable capacity narrative
    pub capacity: String,
    /// Fault tolerance narrative
    pub protection: String,
    pub best_for: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub score: u32,
    #[serde(default)]
    pub recommended: bool,
    /// Claimed disks in application order
    pub assignments: Vec<DiskAssignment>,
    /// Resulting mount points under the default configuration
    pub mount_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_variant: Option<MirrorVariant>,
}

impl Strategy {
    /// Start a strategy with empty narrative fields
    pub fn new(id: StrategyId, name: impl Into<String>, score: u32) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            capacity: String::new(),
            protection: String::new(),
            best_for: String::new(),
            pros: Vec::new(),
            cons: Vec::new(),
            warning: None,
            score,
            recommended: false,
            assignments: Vec::new(),
            mount_points: Vec::new(),
            mirror_variant: None,
        }
    }

    /// Claimed disks in assignment order
    pub fn disk_ids(&self) -> impl Iterator<Item = DiskId> + '_ {
        self.assignments.iter().map(|a| a.disk)
    }

    /// Assignments holding one role
    pub fn with_role(&self, role: DiskRole) -> impl Iterator<Item = &DiskAssignment> + '_ {
        self.assignments.iter().filter(move |a| a.role == role)
    }

    pub fn claims(&self, disk: DiskId) -> bool {
        self.disk_ids().any(|id| id == disk)
    }
}

// =============================================================================
// Two-Disk Recommendations
// =============================================================================

/// The fixed ranking of the two-disk view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationRank {
    Hybrid = 1,
    SpeedDemon = 2,
    Mirror = 3,
    DataHoarder = 4,
    Kamikaze = 5,
}

impl RecommendationRank {
    pub const ALL: [RecommendationRank; 5] = [
        RecommendationRank::Hybrid,
        RecommendationRank::SpeedDemon,
        RecommendationRank::Mirror,
        RecommendationRank::DataHoarder,
        RecommendationRank::Kamikaze,
    ];

    /// Position in the list, 1 through 5
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// The strategy that carries this recommendation out
    pub fn strategy_id(&self) -> StrategyId {
        match self {
            RecommendationRank::Hybrid => StrategyId::Backup,
            RecommendationRank::SpeedDemon => StrategyId::SpeedTiered,
            RecommendationRank::Mirror => StrategyId::Mirror,
            RecommendationRank::DataHoarder => StrategyId::Pool,
            RecommendationRank::Kamikaze => StrategyId::Independent,
        }
    }
}

impl fmt::Display for RecommendationRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationRank::Hybrid => write!(f, "The Hybrid"),
            RecommendationRank::SpeedDemon => write!(f, "The Speed Demon"),
            RecommendationRank::Mirror => write!(f, "The Mirror"),
            RecommendationRank::DataHoarder => write!(f, "The Data Hoarder"),
            RecommendationRank::Kamikaze => write!(f, "The Kamikaze"),
        }
    }
}

/// One entry of the two-disk view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRecommendation {
    pub rank: u8,
    pub kind: RecommendationRank,
    pub name: String,
    pub description: String,
    pub capacity: String,
    pub protection: String,
    pub best_for: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub assignments: Vec<DiskAssignment>,
    pub is_default: bool,
}

impl StorageRecommendation {
    /// Turn the recommendation into an applicable strategy
    pub fn to_strategy(&self) -> Strategy {
        let mut strategy = Strategy::new(self.kind.strategy_id(), self.name.clone(), 0);
        strategy.description = self.description.clone();
        strategy.capacity = self.capacity.clone();
        strategy.protection = self.protection.clone();
        strategy.best_for = self.best_for.clone();
        strategy.pros = self.pros.clone();
        strategy.cons = self.cons.clone();
        strategy.warning = self.warning.clone();
        strategy.recommended = self.is_default;
        strategy.assignments = self.assignments.clone();
        strategy
    }
}

//! Strategy Generator
//!
//! Maps the available disks and system RAM to candidate strategies. Each
//! rule is an independent guard that may contribute one candidate; every
//! rule is evaluated and the results are accumulated in rule order. New
//! layouts are added by appending a rule, without touching existing ones.

use super::config::StrategyConfig;
use super::scorer::score;
use super::types::{DiskAssignment, DiskRole, MirrorVariant, Strategy, StrategyId};
use crate::domain::ports::{Disk, DiskId, SystemInfo, GIB};
use crate::hardware::classification::classifier::{classify, mismatch_large, similar};
use crate::hardware::classification::raid::{ModelStringRaidDetector, RaidDetector};
use crate::hardware::discovery::units::format_bytes;
use tracing::debug;

// =============================================================================
// Thresholds
// =============================================================================

/// Two disks within this relative size difference are mirror candidates
pub const MIRROR_SIZE_TOLERANCE: f64 = 0.10;

/// Two disks further apart than this are scratch + vault candidates
pub const SCRATCH_VAULT_MISMATCH: f64 = 0.50;

/// RAM needed before a checksummed copy-on-write mirror is suggested
pub const CHECKSUMMED_MIRROR_MIN_RAM: u64 = 8 * GIB;

pub const SCORE_HARDWARE_RAID: u32 = 90;
pub const SCORE_SPEED_TIERED: u32 = 85;
pub const SCORE_MIRROR: u32 = 80;
pub const SCORE_BACKUP: u32 = 75;
pub const SCORE_SCRATCH_VAULT: u32 = 70;
pub const SCORE_POOL: u32 = 65;
pub const SCORE_SINGLE_DISK: u32 = 60;
pub const SCORE_PARTITION: u32 = 50;

const NO_REDUNDANCY: &str = "No redundancy: a disk failure loses the data stored on it. Keep off-site backups.";

// =============================================================================
// Rule Context
// =============================================================================

/// Facts every rule guard is evaluated against
pub struct RuleContext<'a> {
    pub disks: &'a [Disk],
    pub available: Vec<DiskId>,
    pub fast: Vec<DiskId>,
    pub slow: Vec<DiskId>,
    pub hardware_raid: bool,
    pub system: SystemInfo,
    /// Layout used for the default mount points in each narrative
    pub layout: &'a StrategyConfig,
}

impl<'a> RuleContext<'a> {
    fn size(&self, id: DiskId) -> u64 {
        id.resolve(self.disks).map(|d| d.size_bytes).unwrap_or(0)
    }

    /// Saturates; lsblk sizes are clamped to `u64::MAX` when out of range
    fn total_bytes(&self, ids: &[DiskId]) -> u64 {
        ids.iter()
            .map(|id| self.size(*id))
            .fold(0u64, u64::saturating_add)
    }

    /// The two available disks, larger first; the earlier disk wins a tie
    fn larger_first(&self) -> Option<(DiskId, DiskId)> {
        match self.available.as_slice() {
            [a, b] if self.size(*b) > self.size(*a) => Some((*b, *a)),
            [a, b] => Some((*a, *b)),
            _ => None,
        }
    }

    /// Assign `role` to `ids`, numbering them from 1
    fn assign(&self, role: DiskRole, ids: &[DiskId]) -> Vec<DiskAssignment> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| DiskAssignment {
                disk: *id,
                role,
                label: self.layout.label_for(role, i + 1),
                mount: self.layout.mount_for(role, i + 1),
            })
            .collect()
    }

    fn describe(&self, ids: &[DiskId]) -> String {
        ids.iter()
            .filter_map(|id| id.resolve(self.disks))
            .map(|d| format!("{} ({} {})", d.name, format_bytes(d.size_bytes), d.disk_type))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// =============================================================================
// Rules
// =============================================================================

/// A guard that may contribute one candidate strategy
pub type Rule = fn(&RuleContext<'_>) -> Option<Strategy>;

/// Built-in rules in evaluation order
pub const RULES: &[Rule] = &[
    partition_os_drive,
    single_disk,
    hardware_raid_volumes,
    speed_tiered,
    mirror,
    primary_with_backup,
    scratch_and_vault,
    combined_pool,
];

fn partition_os_drive(ctx: &RuleContext<'_>) -> Option<Strategy> {
    if !ctx.available.is_empty() {
        return None;
    }

    let mut s = Strategy::new(StrategyId::Partition, "Use the OS Drive", SCORE_PARTITION);
    s.description = format!(
        "No spare disks were found. Data is kept in {} on the system drive.",
        ctx.layout.mountpoint
    );
    s.capacity = "Free space on the OS drive".into();
    s.protection = "None".into();
    s.best_for = "Trying things out before adding a data disk".into();
    s.pros = vec!["Works without extra hardware".into(), "Nothing is formatted".into()];
    s.cons = vec![
        "Data competes with the OS for space".into(),
        "Reinstalling the OS puts the data at risk".into(),
    ];
    s.warning = Some(
        "No redundancy: a failure of the OS drive loses both the system and your data.".into(),
    );
    s.mount_points = vec![ctx.layout.mountpoint.clone()];
    Some(s)
}

fn single_disk(ctx: &RuleContext<'_>) -> Option<Strategy> {
    if ctx.available.len() != 1 {
        return None;
    }

    let mut s = Strategy::new(StrategyId::SingleDisk, "Single Data Disk", SCORE_SINGLE_DISK);
    s.description = format!(
        "Format {} and mount it at {}.",
        ctx.describe(&ctx.available),
        ctx.layout.mountpoint
    );
    s.capacity = format_bytes(ctx.total_bytes(&ctx.available));
    s.protection = "None".into();
    s.best_for = "Small setups with one spare disk".into();
    s.pros = vec!["Simple".into(), "Keeps data off the OS drive".into()];
    s.cons = vec!["A disk failure loses everything on it".into()];
    s.warning = Some(NO_REDUNDANCY.into());
    s.assignments = ctx.assign(DiskRole::Data, &ctx.available);
    s.mount_points = vec![ctx.layout.mountpoint.clone()];
    Some(s)
}

fn hardware_raid_volumes(ctx: &RuleContext<'_>) -> Option<Strategy> {
    if ctx.available.len() < 2 || !ctx.hardware_raid {
        return None;
    }

    let mut s = Strategy::new(
        StrategyId::HardwareRaid,
        "Hardware RAID Volumes",
        SCORE_HARDWARE_RAID,
    );
    s.description = format!(
        "A RAID controller already protects these volumes: {}. Each one is formatted and mounted on its own.",
        ctx.describe(&ctx.available)
    );
    s.capacity = format_bytes(ctx.total_bytes(&ctx.available));
    s.protection = "Provided by the RAID controller".into();
    s.best_for = "Servers with a hardware RAID controller".into();
    s.pros = vec![
        "Redundancy handled in hardware".into(),
        "No extra CPU or RAM cost".into(),
    ];
    s.cons = vec!["Controller failure needs a compatible replacement".into()];
    s.warning = Some(
        "Hardware RAID detected: do not layer software RAID or pooling (mdadm, ZFS, mergerfs) on top of controller volumes."
            .into(),
    );
    s.assignments = ctx.assign(DiskRole::Independent, &ctx.available);
    s.mount_points = s.assignments.iter().map(|a| a.mount.clone()).collect();
    Some(s)
}

fn speed_tiered(ctx: &RuleContext<'_>) -> Option<Strategy> {
    if ctx.available.len() < 2 || ctx.fast.is_empty() || ctx.slow.is_empty() {
        return None;
    }

    let mut s = Strategy::new(StrategyId::SpeedTiered, "Speed-Tiered Pools", SCORE_SPEED_TIERED);
    s.description = format!(
        "Fast disks ({}) hold hot data under {}; slow disks ({}) hold the archive under {}.",
        ctx.describe(&ctx.fast),
        ctx.layout.fast_mount,
        ctx.describe(&ctx.slow),
        ctx.layout.mountpoint
    );
    s.capacity = format!(
        "{} fast + {} archive",
        format_bytes(ctx.total_bytes(&ctx.fast)),
        format_bytes(ctx.total_bytes(&ctx.slow))
    );
    s.protection = "None within a tier".into();
    s.best_for = "Databases and app data on flash, media on spinning disks".into();
    s.pros = vec![
        "Latency-sensitive data gets flash speed".into(),
        "Bulk data gets cheap capacity".into(),
    ];
    s.cons = vec![
        "Placing data on the right tier is manual".into(),
        "No redundancy".into(),
    ];
    s.assignments = ctx.assign(DiskRole::Fast, &ctx.fast);
    s.assignments.extend(ctx.assign(DiskRole::Slow, &ctx.slow));
    s.mount_points = vec![ctx.layout.fast_mount.clone(), ctx.layout.mountpoint.clone()];
    Some(s)
}

fn mirror(ctx: &RuleContext<'_>) -> Option<Strategy> {
    let (a, b) = match ctx.available.as_slice() {
        [a, b] => (*a, *b),
        _ => return None,
    };
    if ctx.hardware_raid || !similar(ctx.size(a), ctx.size(b), MIRROR_SIZE_TOLERANCE) {
        return None;
    }

    let variant = if ctx.system.total_ram_bytes >= CHECKSUMMED_MIRROR_MIN_RAM {
        MirrorVariant::Checksummed
    } else {
        MirrorVariant::Block
    };

    let mut s = match variant {
        MirrorVariant::Checksummed => {
            let mut s = Strategy::new(StrategyId::Mirror, "ZFS Mirror", SCORE_MIRROR);
            s.description = format!(
                "A checksummed copy-on-write mirror (ZFS) across {}, mounted at {}.",
                ctx.describe(&ctx.available),
                ctx.layout.mountpoint
            );
            s.pros = vec![
                "Survives a disk failure".into(),
                "Checksums detect and repair silent corruption".into(),
                "Snapshots".into(),
            ];
            s.cons = vec![
                "Half the raw capacity".into(),
                "ZFS uses a sizeable share of RAM for caching".into(),
            ];
            s
        }
        MirrorVariant::Block => {
            let mut s = Strategy::new(StrategyId::Mirror, "RAID1 Mirror", SCORE_MIRROR);
            s.description = format!(
                "A block-level mirror (mdadm RAID1) across {}, mounted at {}.",
                ctx.describe(&ctx.available),
                ctx.layout.mountpoint
            );
            s.pros = vec![
                "Survives a disk failure".into(),
                "Light on RAM".into(),
            ];
            s.cons = vec![
                "Half the raw capacity".into(),
                "No checksums: silent corruption is mirrored too".into(),
                "Less than 8 GiB RAM, so ZFS is not suggested".into(),
            ];
            s
        }
    };

    s.capacity = format_bytes(ctx.size(a).min(ctx.size(b)));
    s.protection = "Survives the loss of either disk".into();
    s.best_for = "Irreplaceable data such as photos and documents".into();
    s.mirror_variant = Some(variant);
    s.assignments = ctx.assign(DiskRole::MirrorMember, &[a, b]);
    s.mount_points = vec![ctx.layout.mountpoint.clone()];
    Some(s)
}

fn primary_with_backup(ctx: &RuleContext<'_>) -> Option<Strategy> {
    let (primary, backup) = ctx.larger_first()?;

    let mut s = Strategy::new(StrategyId::Backup, "Primary + Nightly Backup", SCORE_BACKUP);
    s.description = format!(
        "{} holds live data at {}; {} receives a scheduled copy at {}.",
        ctx.describe(&[primary]),
        ctx.layout.mountpoint,
        ctx.describe(&[backup]),
        ctx.layout.backup_mount
    );
    s.capacity = format_bytes(ctx.size(primary).min(ctx.size(backup)));
    s.protection = "Recover up to the last sync after a disk failure or accidental deletion".into();
    s.best_for = "Home servers that value recoverability over uptime".into();
    s.pros = vec![
        "Protects against deletion until the next sync".into(),
        "Disks of different sizes work".into(),
    ];
    s.cons = vec![
        "Changes since the last sync can be lost".into(),
        "Deletions propagate at the next sync".into(),
    ];
    if ctx.size(backup) < ctx.size(primary) {
        s.cons.push("Usable space is limited to what fits on the backup disk".into());
    }
    s.assignments = ctx.assign(DiskRole::Primary, &[primary]);
    s.assignments.extend(ctx.assign(DiskRole::Backup, &[backup]));
    s.mount_points = vec![ctx.layout.mountpoint.clone(), ctx.layout.backup_mount.clone()];
    Some(s)
}

fn scratch_and_vault(ctx: &RuleContext<'_>) -> Option<Strategy> {
    let (vault, scratch) = ctx.larger_first()?;
    if !mismatch_large(ctx.size(vault), ctx.size(scratch), SCRATCH_VAULT_MISMATCH) {
        return None;
    }

    let mut s = Strategy::new(StrategyId::ScratchVault, "Vault + Scratch", SCORE_SCRATCH_VAULT);
    s.description = format!(
        "{} is the permanent vault at {}; {} is temporary scratch space at {}.",
        ctx.describe(&[vault]),
        ctx.layout.mountpoint,
        ctx.describe(&[scratch]),
        ctx.layout.scratch_mount
    );
    s.capacity = format!(
        "{} vault + {} scratch",
        format_bytes(ctx.size(vault)),
        format_bytes(ctx.size(scratch))
    );
    s.protection = "None".into();
    s.best_for = "Downloads and transcodes on the small disk, a library on the large one".into();
    s.pros = vec![
        "Uses both disks fully".into(),
        "Churn stays off the vault disk".into(),
    ];
    s.cons = vec!["No redundancy on either disk".into()];
    s.assignments = ctx.assign(DiskRole::Vault, &[vault]);
    s.assignments.extend(ctx.assign(DiskRole::Scratch, &[scratch]));
    s.mount_points = vec![ctx.layout.mountpoint.clone(), ctx.layout.scratch_mount.clone()];
    Some(s)
}

fn combined_pool(ctx: &RuleContext<'_>) -> Option<Strategy> {
    if ctx.available.len() < 2 || ctx.hardware_raid {
        return None;
    }

    let mut s = Strategy::new(StrategyId::Pool, "Combined Pool", SCORE_POOL);
    s.description = format!(
        "All disks ({}) are merged into one namespace at {} with mergerfs.",
        ctx.describe(&ctx.available),
        ctx.layout.mountpoint
    );
    s.capacity = format!("{} (full capacity)", format_bytes(ctx.total_bytes(&ctx.available)));
    s.protection = "A failed disk loses only the files stored on it".into();
    s.best_for = "Large media libraries that grow a disk at a time".into();
    s.pros = vec![
        "Every byte usable".into(),
        "Add disks of any size later".into(),
        "Each disk stays readable on its own".into(),
    ];
    s.cons = vec!["No redundancy, only partial fault isolation".into()];
    s.assignments = ctx.assign(DiskRole::PoolMember, &ctx.available);
    s.mount_points = vec![ctx.layout.mountpoint.clone()];
    Some(s)
}

// =============================================================================
// Generator
// =============================================================================

/// Evaluates the rule list against one inventory
pub struct StrategyGenerator {
    raid: Box<dyn RaidDetector>,
    layout: StrategyConfig,
    rules: Vec<Rule>,
}

impl StrategyGenerator {
    pub fn new() -> Self {
        Self {
            raid: Box::new(ModelStringRaidDetector::new()),
            layout: StrategyConfig::default(),
            rules: RULES.to_vec(),
        }
    }

    /// Replace the hardware RAID predicate
    pub fn with_raid_detector(mut self, raid: Box<dyn RaidDetector>) -> Self {
        self.raid = raid;
        self
    }

    /// Describe mount points with a non-default layout
    pub fn with_layout(mut self, layout: StrategyConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Append a rule after the built-in ones
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Candidate strategies in rule order. Pure; never fails.
    pub fn generate(&self, disks: &[Disk], system: SystemInfo) -> Vec<Strategy> {
        let classification = classify(disks, self.raid.as_ref());
        let ctx = RuleContext {
            disks,
            hardware_raid: system.hardware_raid || classification.has_hardware_raid(),
            available: classification.available,
            fast: classification.fast,
            slow: classification.slow,
            system,
            layout: &self.layout,
        };

        let strategies: Vec<Strategy> = self.rules.iter().filter_map(|rule| rule(&ctx)).collect();

        debug!(
            "Generated {} strategies for {} available disks: {:?}",
            strategies.len(),
            ctx.available.len(),
            strategies.iter().map(|s| s.id).collect::<Vec<_>>()
        );

        strategies
    }

    /// Generate, then score and sort
    pub fn recommend(&self, disks: &[Disk], system: SystemInfo) -> Vec<Strategy> {
        score(self.generate(disks, system))
    }
}

impl Default for StrategyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate with the default detector and layout
pub fn generate(disks: &[Disk], system: SystemInfo) -> Vec<Strategy> {
    StrategyGenerator::new().generate(disks, system)
}

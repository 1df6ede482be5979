//! Two-Disk Recommendations
//!
//! With exactly two spare disks the planner also offers a fixed five-entry
//! ranking, each entry spelling out which disk plays which role.

use super::config::StrategyConfig;
use super::generator::MIRROR_SIZE_TOLERANCE;
use super::types::{DiskAssignment, DiskRole, RecommendationRank, StorageRecommendation};
use crate::domain::ports::{Disk, DiskId, DiskType, SystemInfo};
use crate::hardware::classification::classifier::{classify, similar, speed_class};
use crate::hardware::classification::raid::RaidDetector;
use crate::hardware::discovery::units::format_bytes;

/// Build the five-rank view; empty unless exactly two disks are available
pub fn two_disk_recommendations(
    disks: &[Disk],
    system: SystemInfo,
    raid: &dyn RaidDetector,
    layout: &StrategyConfig,
) -> Vec<StorageRecommendation> {
    let classification = classify(disks, raid);
    let (first, second) = match classification.available.as_slice() {
        [a, b] => (*a, *b),
        _ => return Vec::new(),
    };
    let (Some(a), Some(b)) = (first.resolve(disks), second.resolve(disks)) else {
        return Vec::new();
    };

    let hardware_raid = system.hardware_raid || classification.has_hardware_raid();
    let sizes_match = similar(a.size_bytes, b.size_bytes, MIRROR_SIZE_TOLERANCE);
    let default_rank = if sizes_match && !hardware_raid {
        RecommendationRank::Mirror
    } else {
        RecommendationRank::Hybrid
    };

    let (larger, smaller) = if b.size_bytes > a.size_bytes {
        (second, first)
    } else {
        (first, second)
    };
    let (faster, slower) = if speed_rank(b) > speed_rank(a) {
        (second, first)
    } else {
        (first, second)
    };

    let view = PairView {
        disks,
        layout,
        hardware_raid,
    };
    let total = a.size_bytes.saturating_add(b.size_bytes);
    let min = a.size_bytes.min(b.size_bytes);

    let mut out = Vec::with_capacity(RecommendationRank::ALL.len());
    for kind in RecommendationRank::ALL {
        let mut rec = match kind {
            RecommendationRank::Hybrid => view.hybrid(larger, smaller, min),
            RecommendationRank::SpeedDemon => view.speed_demon(faster, slower),
            RecommendationRank::Mirror => view.mirror(first, second, min, sizes_match),
            RecommendationRank::DataHoarder => view.data_hoarder(first, second, total),
            RecommendationRank::Kamikaze => view.kamikaze(first, second, total),
        };
        rec.is_default = kind == default_rank;
        out.push(rec);
    }
    out
}

/// NVMe beats SATA flash beats everything else
fn speed_rank(disk: &Disk) -> u8 {
    match disk.disk_type {
        DiskType::Nvme => 2,
        DiskType::Ssd => 1,
        _ => 0,
    }
}

struct PairView<'a> {
    disks: &'a [Disk],
    layout: &'a StrategyConfig,
    hardware_raid: bool,
}

impl<'a> PairView<'a> {
    fn name(&self, id: DiskId) -> String {
        id.resolve(self.disks)
            .map(|d| format!("{} ({})", d.name, format_bytes(d.size_bytes)))
            .unwrap_or_else(|| format!("disk #{}", id.0))
    }

    fn assign(&self, role: DiskRole, ordinal: usize, disk: DiskId) -> DiskAssignment {
        DiskAssignment {
            disk,
            role,
            label: self.layout.label_for(role, ordinal),
            mount: self.layout.mount_for(role, ordinal),
        }
    }

    fn base(&self, kind: RecommendationRank, assignments: Vec<DiskAssignment>) -> StorageRecommendation {
        StorageRecommendation {
            rank: kind.rank(),
            kind,
            name: kind.to_string(),
            description: String::new(),
            capacity: String::new(),
            protection: String::new(),
            best_for: String::new(),
            pros: Vec::new(),
            cons: Vec::new(),
            warning: None,
            assignments,
            is_default: false,
        }
    }

    fn raid_warning(&self) -> Option<String> {
        self.hardware_raid.then(|| {
            "Hardware RAID detected: software mirroring or pooling on controller volumes is redundant.".to_string()
        })
    }

    fn hybrid(&self, primary: DiskId, backup: DiskId, min: u64) -> StorageRecommendation {
        let mut r = self.base(
            RecommendationRank::Hybrid,
            vec![
                self.assign(DiskRole::Primary, 1, primary),
                self.assign(DiskRole::Backup, 1, backup),
            ],
        );
        r.description = format!(
            "{} serves live data, {} keeps a nightly copy.",
            self.name(primary),
            self.name(backup)
        );
        r.capacity = format_bytes(min);
        r.protection = "Recover from disk failure or deletion up to the last sync".into();
        r.best_for = "Most home servers".into();
        r.pros = vec![
            "Undo accidental deletions".into(),
            "Works with mismatched disks".into(),
        ];
        r.cons = vec!["Up to a day of changes can be lost".into()];
        r
    }

    fn speed_demon(&self, fast: DiskId, bulk: DiskId) -> StorageRecommendation {
        let mut r = self.base(
            RecommendationRank::SpeedDemon,
            vec![
                self.assign(DiskRole::Fast, 1, fast),
                self.assign(DiskRole::Slow, 1, bulk),
            ],
        );
        r.description = format!(
            "{} runs apps and databases, {} stores bulk media.",
            self.name(fast),
            self.name(bulk)
        );
        let same_class = match (fast.resolve(self.disks), bulk.resolve(self.disks)) {
            (Some(f), Some(b)) => speed_class(f) == speed_class(b),
            _ => true,
        };
        r.capacity = "Both disks, split by workload".into();
        r.protection = "None".into();
        r.best_for = "Responsive apps next to a large library".into();
        r.pros = vec!["Hot data on the faster disk".into()];
        r.cons = vec!["No redundancy".into()];
        if same_class {
            r.warning = Some("Both disks are in the same speed class; tiering gains little.".into());
        }
        r
    }

    fn mirror(&self, a: DiskId, b: DiskId, min: u64, sizes_match: bool) -> StorageRecommendation {
        let mut r = self.base(
            RecommendationRank::Mirror,
            vec![
                self.assign(DiskRole::MirrorMember, 1, a),
                self.assign(DiskRole::MirrorMember, 2, b),
            ],
        );
        r.description = format!("{} and {} hold identical copies.", self.name(a), self.name(b));
        r.capacity = format_bytes(min);
        r.protection = "Survives the loss of either disk".into();
        r.best_for = "Irreplaceable data".into();
        r.pros = vec!["No downtime after a disk failure".into()];
        r.cons = vec![
            "Half the raw capacity".into(),
            "Deletions are mirrored instantly".into(),
        ];
        r.warning = self.raid_warning().or_else(|| {
            (!sizes_match).then(|| {
                format!(
                    "Disk sizes differ: usable capacity is limited to {}.",
                    format_bytes(min)
                )
            })
        });
        r
    }

    fn data_hoarder(&self, a: DiskId, b: DiskId, total: u64) -> StorageRecommendation {
        let mut r = self.base(
            RecommendationRank::DataHoarder,
            vec![
                self.assign(DiskRole::PoolMember, 1, a),
                self.assign(DiskRole::PoolMember, 2, b),
            ],
        );
        r.description = format!(
            "{} and {} appear as one large folder at {}.",
            self.name(a),
            self.name(b),
            self.layout.mountpoint
        );
        r.capacity = format_bytes(total);
        r.protection = "A failed disk loses only its own files".into();
        r.best_for = "Media collections".into();
        r.pros = vec!["All capacity usable".into(), "Grow one disk at a time".into()];
        r.cons = vec!["No redundancy".into()];
        r.warning = self.raid_warning();
        r
    }

    fn kamikaze(&self, a: DiskId, b: DiskId, total: u64) -> StorageRecommendation {
        let mut r = self.base(
            RecommendationRank::Kamikaze,
            vec![
                self.assign(DiskRole::Independent, 1, a),
                self.assign(DiskRole::Independent, 2, b),
            ],
        );
        r.description = format!(
            "{} and {} are mounted separately with no protection.",
            self.name(a),
            self.name(b)
        );
        r.capacity = format_bytes(total);
        r.protection = "None".into();
        r.best_for = "Replaceable data only".into();
        r.pros = vec!["Maximum capacity".into(), "Nothing to configure".into()];
        r.cons = vec!["Any disk failure loses its data".into()];
        r.warning = Some("No protection at all: keep copies of anything you care about.".into());
        r
    }
}

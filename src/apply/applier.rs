//! Strategy Applier
//!
//! Applying a strategy happens in two phases. `plan` turns the strategy,
//! the disk arena and the configuration into an ordered list of
//! `StorageOp`s without touching the host. The applier then walks that list
//! once, either narrating each operation (dry run) or executing it, and
//! returns one `OperationResult` per operation in execution order.
//!
//! Execution is best-effort: a failed step is recorded and the remaining
//! steps are still attempted, so a partial application is fully auditable.

use super::cron::install_backup_job;
use super::filesystem::{create_dir, format_device, mount_device};
use super::fstab::persist_mount;
use super::host::SystemHost;
use super::mirror::setup_mirror;
use super::ops::{EventLog, OperationResult, StepOutcome, StorageOp};
use super::pool::configure_pool;
use super::power::set_spindown;
use crate::domain::ports::{Disk, HostOps};
use crate::error::Result;
use crate::strategy::config::{BackupSchedule, Filesystem, MergePolicy, StrategyConfig};
use crate::strategy::types::{DiskRole, Strategy, StrategyId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

// =============================================================================
// Settings
// =============================================================================

/// Host paths and tunables that are not part of the editable strategy config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplierSettings {
    pub fstab_path: PathBuf,
    pub cron_dir: PathBuf,
    pub script_dir: PathBuf,
    pub log_dir: PathBuf,
    pub mdadm_conf: PathBuf,
    /// Array device created for block-level mirrors
    pub md_device: String,
    /// Name of the backup sync job
    pub backup_job: String,
    /// Standby timeout for claimed rotational disks; `None` leaves them alone
    pub hdd_spindown_minutes: Option<u32>,
}

impl Default for ApplierSettings {
    fn default() -> Self {
        Self {
            fstab_path: PathBuf::from("/etc/fstab"),
            cron_dir: PathBuf::from("/etc/cron.d"),
            script_dir: PathBuf::from("/usr/local/bin"),
            log_dir: PathBuf::from("/var/log"),
            mdadm_conf: PathBuf::from("/etc/mdadm/mdadm.conf"),
            md_device: "/dev/md0".to_string(),
            backup_job: super::cron::BACKUP_JOB.to_string(),
            hdd_spindown_minutes: None,
        }
    }
}

// =============================================================================
// Planning
// =============================================================================

/// A claimed disk with its resolved layout
struct Placement<'a> {
    disk: &'a Disk,
    role: DiskRole,
    mount: String,
    label: String,
}

fn place<'a>(strategy: &Strategy, disks: &'a [Disk], config: &StrategyConfig) -> Vec<Placement<'a>> {
    let mut ordinals: HashMap<DiskRole, usize> = HashMap::new();
    let mut placed = Vec::with_capacity(strategy.assignments.len());

    for assignment in &strategy.assignments {
        let Some(disk) = assignment.resolve(disks) else {
            warn!(
                "{} refers to disk #{} which is not in the inventory",
                strategy.id, assignment.disk.0
            );
            continue;
        };

        let ordinal = ordinals.entry(assignment.role).or_insert(0);
        *ordinal += 1;
        placed.push(Placement {
            disk,
            role: assignment.role,
            mount: config.mount_for(assignment.role, *ordinal),
            label: config.label_for(assignment.role, *ordinal),
        });
    }

    placed
}

fn prepare_disk(ops: &mut Vec<StorageOp>, placement: &Placement<'_>, filesystem: &str) {
    let device = placement.disk.path.clone();
    ops.push(StorageOp::Format {
        device: device.clone(),
        filesystem: filesystem.to_string(),
        label: placement.label.clone(),
    });
    ops.push(StorageOp::CreateDir {
        path: placement.mount.clone(),
    });
    ops.push(StorageOp::Mount {
        device: device.clone(),
        target: placement.mount.clone(),
        filesystem: filesystem.to_string(),
    });
    ops.push(StorageOp::PersistMount {
        device,
        target: placement.mount.clone(),
        filesystem: filesystem.to_string(),
    });
}

/// Ordered operations that apply `strategy`. Pure; a dry run and a real run
/// execute exactly this list.
pub fn plan(
    strategy: &Strategy,
    disks: &[Disk],
    config: &StrategyConfig,
    settings: &ApplierSettings,
) -> Vec<StorageOp> {
    let placed = place(strategy, disks, config);
    let fs = config.filesystem.as_str();
    let mut ops = Vec::new();

    match strategy.id {
        StrategyId::Partition => ops.push(StorageOp::CreateDir {
            path: config.mountpoint.clone(),
        }),

        StrategyId::Mirror => ops.push(StorageOp::Mirror {
            devices: placed.iter().map(|p| p.disk.path.clone()).collect(),
            target: config.mountpoint.clone(),
            filesystem: fs.to_string(),
            label: config.label.clone(),
        }),

        StrategyId::SingleDisk
        | StrategyId::HardwareRaid
        | StrategyId::Independent
        | StrategyId::ScratchVault => {
            for placement in &placed {
                prepare_disk(&mut ops, placement, fs);
            }
        }

        StrategyId::Pool => {
            for placement in &placed {
                prepare_disk(&mut ops, placement, fs);
            }
            if !placed.is_empty() {
                ops.push(StorageOp::PoolMount {
                    branches: placed.iter().map(|p| p.mount.clone()).collect(),
                    target: config.mountpoint.clone(),
                    policy: config.mergerfs_policy.clone(),
                });
            }
        }

        StrategyId::Backup => {
            for placement in &placed {
                prepare_disk(&mut ops, placement, fs);
            }
            let source = placed.iter().find(|p| p.role == DiskRole::Primary);
            let destination = placed.iter().find(|p| p.role == DiskRole::Backup);
            if let (Some(source), Some(destination)) = (source, destination) {
                ops.push(StorageOp::BackupJob {
                    job: settings.backup_job.clone(),
                    source: source.mount.clone(),
                    destination: destination.mount.clone(),
                    schedule: config.backup_schedule.clone(),
                });
            }
        }

        StrategyId::SpeedTiered => {
            for placement in &placed {
                prepare_disk(&mut ops, placement, fs);
            }
            if !placed.is_empty() {
                ops.push(StorageOp::CreateDir {
                    path: config.fast_mount.clone(),
                });
                ops.push(StorageOp::CreateDir {
                    path: config.mountpoint.clone(),
                });
            }
        }
    }

    if let Some(minutes) = settings.hdd_spindown_minutes {
        for placement in placed.iter().filter(|p| p.disk.rotational) {
            ops.push(StorageOp::SpinDown {
                device: placement.disk.path.clone(),
                minutes,
            });
        }
    }

    ops
}

// =============================================================================
// Execution
// =============================================================================

/// Executes strategies against a host
pub struct StrategyApplier<H: HostOps = SystemHost> {
    host: H,
    settings: ApplierSettings,
}

impl StrategyApplier<SystemHost> {
    /// Applier for the local machine
    pub fn system(settings: ApplierSettings) -> Self {
        Self::new(SystemHost::new(), settings)
    }
}

impl<H: HostOps> StrategyApplier<H> {
    pub fn new(host: H, settings: ApplierSettings) -> Self {
        Self { host, settings }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn settings(&self) -> &ApplierSettings {
        &self.settings
    }

    /// Plan with the default config when none is given
    pub fn plan(
        &self,
        strategy: &Strategy,
        disks: &[Disk],
        config: Option<&StrategyConfig>,
    ) -> Vec<StorageOp> {
        let default_config;
        let config = match config {
            Some(config) => config,
            None => {
                default_config = StrategyConfig::default();
                &default_config
            }
        };
        plan(strategy, disks, config, &self.settings)
    }

    /// Apply `strategy` and report every step in execution order
    pub fn apply(
        &self,
        strategy: &Strategy,
        disks: &[Disk],
        config: Option<&StrategyConfig>,
        dry_run: bool,
    ) -> Vec<OperationResult> {
        let ops = self.plan(strategy, disks, config);
        info!(
            "Applying {} ({} steps{})",
            strategy.id,
            ops.len(),
            if dry_run { ", dry run" } else { "" }
        );

        let results = self.execute(&ops, dry_run);

        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            warn!("{} of {} steps failed", failed, results.len());
        } else {
            info!("All {} steps succeeded", results.len());
        }
        results
    }

    /// Run (or narrate) a planned operation list
    pub fn execute(&self, ops: &[StorageOp], dry_run: bool) -> Vec<OperationResult> {
        ops.iter()
            .map(|op| {
                if dry_run {
                    self.narrate(op)
                } else {
                    self.run_step(op)
                }
            })
            .collect()
    }

    fn narrate(&self, op: &StorageOp) -> OperationResult {
        let mut log = EventLog::new();
        if let Some(problem) = preflight(op) {
            log.warn(format!("This step will fail: {}", problem));
        }
        OperationResult::succeeded(
            op.step_name(),
            StepOutcome::unchanged(format!("[dry run] {}", op)),
            log.into_events(),
        )
    }

    fn run_step(&self, op: &StorageOp) -> OperationResult {
        let mut log = EventLog::new();
        match self.perform(op, &mut log) {
            Ok(outcome) => OperationResult::succeeded(op.step_name(), outcome, log.into_events()),
            Err(e) => {
                log.error(e.to_string());
                OperationResult::failed(op.step_name(), &e, log.into_events())
            }
        }
    }

    fn perform(&self, op: &StorageOp, log: &mut EventLog) -> Result<StepOutcome> {
        let host: &dyn HostOps = &self.host;
        match op {
            StorageOp::Format {
                device,
                filesystem,
                label,
            } => format_device(host, device, filesystem, label, log),
            StorageOp::CreateDir { path } => create_dir(host, path, log),
            StorageOp::Mount {
                device,
                target,
                filesystem,
            } => mount_device(host, device, target, filesystem, log),
            StorageOp::PersistMount {
                device,
                target,
                filesystem,
            } => {
                let fs = Filesystem::parse(filesystem)?;
                persist_mount(host, &self.settings.fstab_path, device, target, fs.as_str(), log)
            }
            StorageOp::PoolMount {
                branches,
                target,
                policy,
            } => configure_pool(host, &self.settings.fstab_path, branches, target, policy, log),
            StorageOp::Mirror {
                devices,
                target,
                filesystem,
                label,
            } => setup_mirror(host, &self.settings, devices, target, filesystem, label, log),
            StorageOp::BackupJob {
                job,
                source,
                destination,
                schedule,
            } => install_backup_job(host, &self.settings, job, source, destination, schedule, log),
            StorageOp::SpinDown { device, minutes } => set_spindown(host, device, *minutes, log),
        }
    }
}

/// Problems a step will hit that are visible without touching the host
fn preflight(op: &StorageOp) -> Option<String> {
    let check = match op {
        StorageOp::Format { filesystem, .. }
        | StorageOp::Mount { filesystem, .. }
        | StorageOp::PersistMount { filesystem, .. } => Filesystem::parse(filesystem).map(|_| ()),
        StorageOp::PoolMount { policy, .. } => MergePolicy::parse(policy).map(|_| ()),
        StorageOp::BackupJob { schedule, .. } => BackupSchedule::parse(schedule).map(|_| ()),
        StorageOp::Mirror {
            devices,
            filesystem,
            ..
        } => {
            if devices.len() < 2 {
                return Some(format!("a mirror needs two disks, {} given", devices.len()));
            }
            Filesystem::parse(filesystem).map(|_| ())
        }
        StorageOp::CreateDir { .. } | StorageOp::SpinDown { .. } => Ok(()),
    };
    check.err().map(|e| e.to_string())
}

/// Apply against the local machine with default settings
pub fn apply(
    strategy: &Strategy,
    disks: &[Disk],
    config: Option<&StrategyConfig>,
    dry_run: bool,
) -> Vec<OperationResult> {
    StrategyApplier::system(ApplierSettings::default()).apply(strategy, disks, config, dry_run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::host::fake::FakeHost;
    use crate::apply::ops::LogLevel;
    use crate::domain::ports::{DiskDescriptor, SystemInfo, GIB, TIB};
    use crate::hardware::classification::raid::ModelStringRaidDetector;
    use crate::strategy::generator::generate;
    use crate::strategy::ranks::two_disk_recommendations;
    use crate::strategy::types::RecommendationRank;
    use std::path::Path;

    const ALL_TOOLS: &[&str] = &["mkfs.ext4", "mkfs.xfs", "mergerfs", "mdadm", "rsync", "hdparm"];

    fn make_disk(name: &str, size: u64, rotational: bool, transport: &str) -> Disk {
        Disk::from_descriptor(DiskDescriptor {
            name: name.into(),
            size_bytes: size,
            rotational,
            transport: transport.into(),
            model: "WDC WD40EFRX".into(),
            ..Default::default()
        })
    }

    fn pair() -> Vec<Disk> {
        vec![
            make_disk("sdb", 4 * TIB, true, "sata"),
            make_disk("sdc", 4 * TIB, true, "sata"),
        ]
    }

    fn strategy(disks: &[Disk], id: StrategyId) -> Strategy {
        let system = SystemInfo {
            total_ram_bytes: 16 * GIB,
            hardware_raid: false,
        };
        generate(disks, system)
            .into_iter()
            .find(|s| s.id == id)
            .unwrap()
    }

    /// One disk set and strategy for every `StrategyId`
    fn every_strategy() -> Vec<(Vec<Disk>, Strategy)> {
        let raid_pair = vec![
            Disk::from_descriptor(DiskDescriptor {
                name: "sdb".into(),
                size_bytes: 2 * TIB,
                rotational: true,
                transport: "sas".into(),
                model: "PERC H730P".into(),
                ..Default::default()
            }),
            Disk::from_descriptor(DiskDescriptor {
                name: "sdc".into(),
                size_bytes: 2 * TIB,
                rotational: true,
                transport: "sas".into(),
                model: "PERC H730P".into(),
                ..Default::default()
            }),
        ];
        let tiered = vec![
            make_disk("nvme0n1", TIB, false, "nvme"),
            make_disk("sdb", 8 * TIB, true, "sata"),
        ];
        let uneven = vec![
            make_disk("sdb", 8 * TIB, true, "sata"),
            make_disk("sdc", 2 * TIB, true, "sata"),
        ];
        let single = vec![make_disk("sdb", 4 * TIB, true, "sata")];

        let kamikaze = two_disk_recommendations(
            &pair(),
            SystemInfo {
                total_ram_bytes: 16 * GIB,
                hardware_raid: false,
            },
            &ModelStringRaidDetector::new(),
            &StrategyConfig::default(),
        )
        .into_iter()
        .find(|r| r.kind == RecommendationRank::Kamikaze)
        .unwrap()
        .to_strategy();

        let out = vec![
            (Vec::new(), strategy(&[], StrategyId::Partition)),
            (single.clone(), strategy(&single, StrategyId::SingleDisk)),
            (raid_pair.clone(), strategy(&raid_pair, StrategyId::HardwareRaid)),
            (tiered.clone(), strategy(&tiered, StrategyId::SpeedTiered)),
            (pair(), strategy(&pair(), StrategyId::Mirror)),
            (pair(), strategy(&pair(), StrategyId::Backup)),
            (uneven.clone(), strategy(&uneven, StrategyId::ScratchVault)),
            (pair(), strategy(&pair(), StrategyId::Pool)),
            (pair(), kamikaze),
        ];
        let covered: Vec<StrategyId> = out.iter().map(|(_, s)| s.id).collect();
        assert_eq!(covered, StrategyId::ALL.to_vec());
        out
    }

    fn applier(host: FakeHost) -> StrategyApplier<FakeHost> {
        StrategyApplier::new(host, ApplierSettings::default())
    }

    fn steps(results: &[OperationResult]) -> Vec<String> {
        results.iter().map(|r| r.step.clone()).collect()
    }

    #[test]
    fn test_plan_shapes() {
        let disks = pair();
        let settings = ApplierSettings::default();
        let config = StrategyConfig::default();

        let pool = plan(&strategy(&disks, StrategyId::Pool), &disks, &config, &settings);
        assert_eq!(pool.len(), 9);
        assert_eq!(
            pool[8],
            StorageOp::PoolMount {
                branches: vec!["/mnt/disk1".into(), "/mnt/disk2".into()],
                target: "/mnt/storage".into(),
                policy: "mfs".into(),
            }
        );

        let mirror = plan(&strategy(&disks, StrategyId::Mirror), &disks, &config, &settings);
        assert_eq!(mirror.len(), 1);

        let backup = plan(&strategy(&disks, StrategyId::Backup), &disks, &config, &settings);
        assert_eq!(backup.len(), 9);
        assert_eq!(
            backup[8],
            StorageOp::BackupJob {
                job: "storage-backup".into(),
                source: "/mnt/storage".into(),
                destination: "/mnt/backup".into(),
                schedule: "daily".into(),
            }
        );
    }

    #[test]
    fn test_plan_per_disk_strategies() {
        let config = StrategyConfig::default();
        let settings = ApplierSettings::default();
        let by_id: HashMap<StrategyId, (Vec<Disk>, Strategy)> = every_strategy()
            .into_iter()
            .map(|(disks, s)| (s.id, (disks, s)))
            .collect();
        let plan_for = |id: StrategyId| {
            let (disks, s) = &by_id[&id];
            plan(s, disks, &config, &settings)
        };
        let mounts = |ops: &[StorageOp]| -> Vec<String> {
            ops.iter()
                .filter_map(|op| match op {
                    StorageOp::Mount { device, target, .. } => Some(format!("{} -> {}", device, target)),
                    _ => None,
                })
                .collect()
        };
        let no_extras = |ops: &[StorageOp]| {
            !ops.iter().any(|op| {
                matches!(
                    op,
                    StorageOp::BackupJob { .. } | StorageOp::PoolMount { .. } | StorageOp::Mirror { .. }
                )
            })
        };

        let single = plan_for(StrategyId::SingleDisk);
        assert_eq!(single.len(), 4);
        assert_eq!(
            single[0],
            StorageOp::Format {
                device: "/dev/sdb".into(),
                filesystem: "ext4".into(),
                label: "storage".into(),
            }
        );
        assert_eq!(mounts(&single), vec!["/dev/sdb -> /mnt/storage"]);

        let scratch_vault = plan_for(StrategyId::ScratchVault);
        assert_eq!(scratch_vault.len(), 8);
        assert!(no_extras(&scratch_vault));
        assert_eq!(
            mounts(&scratch_vault),
            vec!["/dev/sdb -> /mnt/storage", "/dev/sdc -> /mnt/scratch"]
        );
        assert_eq!(
            scratch_vault[7],
            StorageOp::PersistMount {
                device: "/dev/sdc".into(),
                target: "/mnt/scratch".into(),
                filesystem: "ext4".into(),
            }
        );

        for id in [StrategyId::HardwareRaid, StrategyId::Independent] {
            let ops = plan_for(id);
            assert_eq!(ops.len(), 8, "{}", id);
            assert!(no_extras(&ops), "{}", id);
            assert_eq!(
                mounts(&ops),
                vec!["/dev/sdb -> /mnt/disk1", "/dev/sdc -> /mnt/disk2"],
                "{}",
                id
            );
            assert!(ops.iter().any(|op| *op
                == StorageOp::PersistMount {
                    device: "/dev/sdc".into(),
                    target: "/mnt/disk2".into(),
                    filesystem: "ext4".into(),
                }));
        }
    }

    #[test]
    fn test_plan_speed_tiered_layout() {
        let disks = vec![
            make_disk("nvme0n1", TIB, false, "nvme"),
            make_disk("sdb", 8 * TIB, true, "sata"),
        ];
        let ops = plan(
            &strategy(&disks, StrategyId::SpeedTiered),
            &disks,
            &StrategyConfig::default(),
            &ApplierSettings::default(),
        );

        assert_eq!(ops.len(), 10);
        assert_eq!(ops[1], StorageOp::CreateDir { path: "/mnt/fast1".into() });
        assert_eq!(ops[5], StorageOp::CreateDir { path: "/mnt/disk1".into() });
        assert_eq!(ops[8], StorageOp::CreateDir { path: "/mnt/fast".into() });
        assert_eq!(ops[9], StorageOp::CreateDir { path: "/mnt/storage".into() });
    }

    #[test]
    fn test_plan_partition_and_spindown() {
        let os_only: Vec<Disk> = Vec::new();
        let partition = strategy(&os_only, StrategyId::Partition);
        let ops = plan(&partition, &os_only, &StrategyConfig::default(), &ApplierSettings::default());
        assert_eq!(ops, vec![StorageOp::CreateDir { path: "/mnt/storage".into() }]);

        let disks = vec![
            make_disk("nvme0n1", TIB, false, "nvme"),
            make_disk("sdb", 8 * TIB, true, "sata"),
        ];
        let settings = ApplierSettings {
            hdd_spindown_minutes: Some(20),
            ..Default::default()
        };
        let ops = plan(&strategy(&disks, StrategyId::Backup), &disks, &StrategyConfig::default(), &settings);
        let spindowns: Vec<_> = ops
            .iter()
            .filter(|op| matches!(op, StorageOp::SpinDown { .. }))
            .collect();
        assert_eq!(
            spindowns,
            vec![&StorageOp::SpinDown { device: "/dev/sdb".into(), minutes: 20 }]
        );
    }

    #[test]
    fn test_dry_run_matches_real_run_without_mutation() {
        for (disks, s) in every_strategy() {
            let dry = applier(FakeHost::with_tools(ALL_TOOLS));
            let narrated = dry.apply(&s, &disks, None, true);
            assert_eq!(dry.host().mutations(), 0);
            assert!(narrated.iter().all(|r| r.success && !r.changed));
            assert!(narrated.iter().all(|r| r.message.starts_with("[dry run]")));

            let real = applier(FakeHost::with_tools(ALL_TOOLS));
            let executed = real.apply(&s, &disks, None, false);
            assert!(real.host().mutations() > 0);

            assert_eq!(steps(&narrated), steps(&executed));
        }
    }

    #[test]
    fn test_dry_run_warns_about_bad_config() {
        let disks = pair();
        let config = StrategyConfig {
            filesystem: "ntfs".into(),
            ..Default::default()
        };
        let results = applier(FakeHost::default()).apply(&strategy(&disks, StrategyId::Pool), &disks, Some(&config), true);
        assert!(results.iter().all(|r| r.success));
        assert!(results[0].events.iter().any(|e| e.level == LogLevel::Warn));
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let disks = pair();
        let s = strategy(&disks, StrategyId::Pool);
        let applier = applier(FakeHost::with_tools(ALL_TOOLS).respond("blkid", "uuid-1"));

        let first = applier.apply(&s, &disks, None, false);
        assert!(first.iter().all(|r| r.success));

        let second = applier.apply(&s, &disks, None, false);
        assert!(second.iter().all(|r| r.success));
        for result in second.iter().filter(|r| r.step.starts_with("fstab") || r.step.starts_with("mount") || r.step.starts_with("pool")) {
            assert!(!result.changed, "{} changed on rerun", result.step);
        }
        assert!(second
            .iter()
            .filter(|r| r.step.starts_with("fstab"))
            .all(|r| r.message.contains("already present")));

        let fstab = applier.host().file("/etc/fstab").unwrap();
        assert_eq!(fstab.lines().count(), 3);
    }

    #[test]
    fn test_backup_job_rerun() {
        let disks = pair();
        let s = strategy(&disks, StrategyId::Backup);
        let applier = applier(FakeHost::with_tools(ALL_TOOLS));

        applier.apply(&s, &disks, None, false);
        let second = applier.apply(&s, &disks, None, false);

        let job = second.last().unwrap();
        assert_eq!(job.step, "schedule storage-backup");
        assert!(job.success);
        assert!(!job.changed);
        assert!(applier.host().file("/etc/cron.d/storage-backup").is_some());
    }

    #[test]
    fn test_failed_format_does_not_stop_run() {
        let disks = pair();
        let s = strategy(&disks, StrategyId::Pool);
        let host = FakeHost::with_tools(ALL_TOOLS).fail("mkfs.ext4 -F -L disk1 /dev/sdb", "/dev/sdb is in use");
        let results = applier(host).apply(&s, &disks, None, false);

        assert_eq!(results.len(), 9);
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("/dev/sdb is in use"));
        assert!(results[1..].iter().all(|r| r.success));
        assert_eq!(results[2].step, "mount /mnt/disk1");
    }

    #[test]
    fn test_mirror_without_tools_fails_explicitly() {
        let disks = pair();
        let s = strategy(&disks, StrategyId::Mirror);
        let settings = ApplierSettings {
            hdd_spindown_minutes: Some(30),
            ..Default::default()
        };
        let applier = StrategyApplier::new(FakeHost::with_tools(&["hdparm"]), settings);
        let results = applier.apply(&s, &disks, None, false);

        assert_eq!(results.len(), 3);
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("mdadm"));
        assert!(results[1].success && results[2].success);
        assert!(applier.host().file("/etc/fstab").is_none());
    }

    #[test]
    fn test_degenerate_inputs() {
        let disks = pair();
        let s = strategy(&disks, StrategyId::Pool);
        let results = applier(FakeHost::default()).apply(&s, &[], None, false);
        assert!(results.is_empty());

        let custom = StrategyConfig {
            mountpoint: "/srv/pool".into(),
            ..Default::default()
        };
        let ops = applier(FakeHost::default()).plan(&s, &disks, Some(&custom));
        assert_eq!(ops[1], StorageOp::CreateDir { path: "/srv/disk1".into() });
    }

    #[test]
    fn test_system_applier_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ApplierSettings {
            fstab_path: dir.path().join("fstab"),
            cron_dir: dir.path().join("cron.d"),
            script_dir: dir.path().join("bin"),
            log_dir: dir.path().join("log"),
            mdadm_conf: dir.path().join("mdadm.conf"),
            ..Default::default()
        };
        let disks = pair();
        let config = StrategyConfig {
            mountpoint: dir.path().join("storage").to_string_lossy().to_string(),
            backup_mount: dir.path().join("backup").to_string_lossy().to_string(),
            ..Default::default()
        };

        let results = StrategyApplier::system(settings).apply(&strategy(&disks, StrategyId::Backup), &disks, Some(&config), true);
        assert_eq!(results.len(), 9);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
        assert!(!Path::new(&config.mountpoint).exists());
    }
}

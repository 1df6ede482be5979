//! Scheduled backup sync
//!
//! Installs a one-way `rsync --delete` from the primary mount to the backup
//! mount as a cron job. The job file is keyed by job name: any existing
//! file with that name is left alone, whoever wrote it.

use super::applier::ApplierSettings;
use super::ops::{EventLog, StepOutcome};
use crate::domain::ports::HostOps;
use crate::error::{Error, Result};
use crate::strategy::config::{BackupSchedule, StrategyConfig};
use crate::strategy::types::{Strategy, StrategyId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default job name
pub const BACKUP_JOB: &str = "storage-backup";

/// Backup facts handed to the maintenance script generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupHandoff {
    pub source: String,
    pub destination: String,
    /// Schedule token (daily, 6h, 12h, weekly)
    pub schedule: String,
}

/// Source, destination and cadence of the sync job, for backup strategies only
pub fn backup_handoff(strategy: &Strategy, config: &StrategyConfig) -> Option<BackupHandoff> {
    (strategy.id == StrategyId::Backup).then(|| BackupHandoff {
        source: config.mountpoint.clone(),
        destination: config.backup_mount.clone(),
        schedule: config.backup_schedule.clone(),
    })
}

pub fn script_path(settings: &ApplierSettings, job: &str) -> PathBuf {
    settings.script_dir.join(format!("{}.sh", job))
}

pub fn job_path(settings: &ApplierSettings, job: &str) -> PathBuf {
    settings.cron_dir.join(job)
}

/// Shell script performing one sync run
pub fn sync_script(job: &str, source: &str, destination: &str, log_file: &Path) -> String {
    format!(
        "#!/bin/sh\n\
         # {job}: one-way sync, files deleted from {source} are deleted from {destination}\n\
         set -eu\n\
         rsync -a --delete {source}/ {destination}/\n\
         echo \"$(date -Iseconds) {job} completed\" >> {log}\n",
        job = job,
        source = source.trim_end_matches('/'),
        destination = destination.trim_end_matches('/'),
        log = log_file.display(),
    )
}

/// cron.d file running `script` as root on `schedule`
pub fn cron_file(job: &str, schedule: BackupSchedule, script: &Path) -> String {
    format!(
        "# {}\nSHELL=/bin/sh\nPATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin\n{} root {}\n",
        job,
        schedule.cron_expression(),
        script.display()
    )
}

/// Write the sync script and register the cron job
pub fn install_backup_job(
    host: &dyn HostOps,
    settings: &ApplierSettings,
    job: &str,
    source: &str,
    destination: &str,
    schedule: &str,
    log: &mut EventLog,
) -> Result<StepOutcome> {
    let schedule = BackupSchedule::parse(schedule)?;
    if !host.tool_available("rsync") {
        return Err(Error::tool_unavailable("rsync", "install rsync (apt install rsync) and re-run"));
    }

    let script = script_path(settings, job);
    let log_file = settings.log_dir.join(format!("{}.log", job));
    let wanted_script = sync_script(job, source, destination, &log_file);
    let mut changed = false;

    if host.read_file(&script)?.as_deref() == Some(wanted_script.as_str()) {
        log.debug(format!("{} is up to date", script.display()));
    } else {
        host.create_dir_all(&settings.script_dir)?;
        host.create_dir_all(&settings.log_dir)?;
        host.write_file(&script, &wanted_script, 0o755)?;
        log.info(format!("Wrote {}", script.display()));
        changed = true;
    }

    let job_file = job_path(settings, job);
    let wanted_job = cron_file(job, schedule, &script);
    match host.read_file(&job_file)? {
        Some(existing) if existing == wanted_job => {
            log.info(format!("{} is already scheduled", job));
        }
        Some(_) => {
            log.warn(format!(
                "{} already exists with different contents; left untouched, remove it to reschedule",
                job_file.display()
            ));
        }
        None => {
            host.create_dir_all(&settings.cron_dir)?;
            host.write_file(&job_file, &wanted_job, 0o644)?;
            log.info(format!(
                "Scheduled {} ({}) in {}",
                job,
                schedule.cron_expression(),
                job_file.display()
            ));
            changed = true;
        }
    }

    let message = if changed {
        format!("Scheduled {} sync {} -> {}", schedule.cron_expression(), source, destination)
    } else {
        format!("{} already scheduled", job)
    };
    Ok(StepOutcome { message, changed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::host::fake::FakeHost;
    use assert_matches::assert_matches;

    #[test]
    fn test_script_contents() {
        let script = sync_script(BACKUP_JOB, "/mnt/storage/", "/mnt/backup", Path::new("/var/log/storage-backup.log"));
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("rsync -a --delete /mnt/storage/ /mnt/backup/\n"));
        assert!(script.contains(">> /var/log/storage-backup.log"));
    }

    #[test]
    fn test_install_then_rerun() {
        let host = FakeHost::with_tools(&["rsync"]);
        let settings = ApplierSettings::default();

        let first = install_backup_job(&host, &settings, BACKUP_JOB, "/mnt/storage", "/mnt/backup", "6h", &mut EventLog::new()).unwrap();
        assert!(first.changed);

        let job = host.file("/etc/cron.d/storage-backup").unwrap();
        assert!(job.contains("0 */6 * * * root /usr/local/bin/storage-backup.sh"));
        assert_eq!(
            host.modes.borrow().get(Path::new("/usr/local/bin/storage-backup.sh")),
            Some(&0o755)
        );

        let second = install_backup_job(&host, &settings, BACKUP_JOB, "/mnt/storage", "/mnt/backup", "6h", &mut EventLog::new()).unwrap();
        assert!(!second.changed);
        assert!(second.message.contains("already scheduled"));
    }

    #[test]
    fn test_existing_job_keeps_schedule() {
        let host = FakeHost::with_tools(&["rsync"]);
        let settings = ApplierSettings::default();
        install_backup_job(&host, &settings, BACKUP_JOB, "/mnt/storage", "/mnt/backup", "daily", &mut EventLog::new()).unwrap();

        let mut log = EventLog::new();
        let outcome = install_backup_job(&host, &settings, BACKUP_JOB, "/mnt/storage", "/mnt/backup", "weekly", &mut log).unwrap();
        assert!(!outcome.changed);
        assert!(host.file("/etc/cron.d/storage-backup").unwrap().contains("0 3 * * * root"));
        assert!(log.into_events().iter().any(|e| e.message.contains("different contents")));
    }

    #[test]
    fn test_foreign_job_with_same_name_is_kept() {
        let host = FakeHost::with_tools(&["rsync"]);
        let settings = ApplierSettings::default();
        let admin_job = "# admin-managed\n0 1 * * * root /opt/my-own-sync.sh\n";
        host.write_file(Path::new("/etc/cron.d/storage-backup"), admin_job, 0o644).unwrap();

        let mut log = EventLog::new();
        let outcome = install_backup_job(&host, &settings, BACKUP_JOB, "/mnt/storage", "/mnt/backup", "daily", &mut log).unwrap();

        assert_eq!(host.file("/etc/cron.d/storage-backup").unwrap(), admin_job);
        assert!(log.into_events().iter().any(|e| e.level == crate::apply::ops::LogLevel::Warn));
        // the script is still written; only the job file is keyed by name
        assert!(outcome.changed);
        assert!(host.file("/usr/local/bin/storage-backup.sh").is_some());
    }

    #[test]
    fn test_unknown_schedule() {
        let host = FakeHost::with_tools(&["rsync"]);
        let err = install_backup_job(&host, &ApplierSettings::default(), BACKUP_JOB, "/a", "/b", "hourly", &mut EventLog::new())
            .unwrap_err();
        assert_matches!(err, Error::UnsupportedConfiguration(_));
        assert_eq!(host.mutations(), 0);
    }

    #[test]
    fn test_handoff_only_for_backup() {
        let config = StrategyConfig::default();
        let backup = Strategy::new(StrategyId::Backup, "Primary + Nightly Backup", 75);
        let handoff = backup_handoff(&backup, &config).unwrap();
        assert_eq!(handoff.source, "/mnt/storage");
        assert_eq!(handoff.destination, "/mnt/backup");
        assert_eq!(handoff.schedule, "daily");

        let pool = Strategy::new(StrategyId::Pool, "Combined Pool", 65);
        assert!(backup_handoff(&pool, &config).is_none());
    }
}

//! Union pool (mergerfs)

use super::filesystem::run_checked;
use super::fstab::persist_line;
use super::ops::{EventLog, StepOutcome};
use crate::domain::ports::HostOps;
use crate::error::{Error, Result};
use crate::strategy::config::MergePolicy;
use std::path::Path;

/// mergerfs fstab line over `branches`
pub fn mergerfs_entry(branches: &[String], target: &str, policy: MergePolicy) -> String {
    format!(
        "{} {} fuse.mergerfs defaults,allow_other,use_ino,cache.files=off,moveonenospc=true,category.create={},minfreespace=10G,fsname=mergerfs 0 0",
        branches.join(":"),
        target,
        policy.as_str()
    )
}

/// Register and mount the pool at `target`
pub fn configure_pool(
    host: &dyn HostOps,
    fstab: &Path,
    branches: &[String],
    target: &str,
    policy: &str,
    log: &mut EventLog,
) -> Result<StepOutcome> {
    let policy = MergePolicy::parse(policy)?;
    if branches.is_empty() {
        return Err(Error::UnsupportedConfiguration(
            "a pool needs at least one member disk".into(),
        ));
    }
    if !host.tool_available("mergerfs") {
        return Err(Error::tool_unavailable(
            "mergerfs",
            "install mergerfs (apt install mergerfs) and re-run",
        ));
    }

    host.create_dir_all(Path::new(target))?;

    let line = mergerfs_entry(branches, target, policy);
    let persisted = persist_line(host, fstab, target, &line, log)?;

    let mounted = if host.is_mounted(Path::new(target))? {
        log.info(format!("{} is already mounted", target));
        false
    } else {
        log.info(format!("Mounting mergerfs pool at {}", target));
        run_checked(host, "mount pool", "mount", &[target])?;
        true
    };

    let changed = persisted.changed || mounted;
    let message = if changed {
        format!(
            "Pooled {} disks at {} (policy {})",
            branches.len(),
            target,
            policy.as_str()
        )
    } else {
        format!("Pool at {} already configured", target)
    };
    Ok(StepOutcome { message, changed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::host::fake::FakeHost;
    use assert_matches::assert_matches;

    fn branches() -> Vec<String> {
        vec!["/mnt/disk1".to_string(), "/mnt/disk2".to_string()]
    }

    #[test]
    fn test_mergerfs_entry() {
        assert_eq!(
            mergerfs_entry(&branches(), "/mnt/storage", MergePolicy::Epmfs),
            "/mnt/disk1:/mnt/disk2 /mnt/storage fuse.mergerfs defaults,allow_other,use_ino,cache.files=off,moveonenospc=true,category.create=epmfs,minfreespace=10G,fsname=mergerfs 0 0"
        );
    }

    #[test]
    fn test_configure_pool_twice() {
        let host = FakeHost::with_tools(&["mergerfs"]);
        let fstab = Path::new("/etc/fstab");

        let first = configure_pool(&host, fstab, &branches(), "/mnt/storage", "mfs", &mut EventLog::new()).unwrap();
        assert!(first.changed);
        assert_eq!(host.ran("mount /mnt/storage"), 1);

        let second = configure_pool(&host, fstab, &branches(), "/mnt/storage", "mfs", &mut EventLog::new()).unwrap();
        assert!(!second.changed);
        assert_eq!(host.ran("mount"), 1);
        assert_eq!(host.file("/etc/fstab").unwrap().lines().count(), 1);
    }

    #[test]
    fn test_missing_mergerfs() {
        let host = FakeHost::default();
        let err = configure_pool(&host, Path::new("/etc/fstab"), &branches(), "/mnt/storage", "mfs", &mut EventLog::new())
            .unwrap_err();
        assert_matches!(err, Error::ToolUnavailable { ref remediation, .. } if remediation.contains("apt install mergerfs"));
        assert_eq!(host.mutations(), 0);
    }

    #[test]
    fn test_bad_policy() {
        let host = FakeHost::with_tools(&["mergerfs"]);
        let err = configure_pool(&host, Path::new("/etc/fstab"), &branches(), "/mnt/storage", "rand", &mut EventLog::new())
            .unwrap_err();
        assert_matches!(err, Error::UnsupportedConfiguration(_));
    }
}

//! Mount table persistence
//!
//! Entries are keyed by mount point: a target that already appears in the
//! table is never appended twice.

use super::filesystem::run_checked;
use super::ops::{EventLog, StepOutcome};
use crate::domain::ports::HostOps;
use crate::error::Result;
use std::path::Path;

/// Mount options for data disks; `nofail` keeps boot going if a disk is gone
pub const DEFAULT_OPTIONS: &str = "defaults,nofail";

/// One fstab line
pub fn fstab_entry(spec: &str, target: &str, fs_type: &str, options: &str) -> String {
    format!("{} {} {} {} 0 2", spec, target, fs_type, options)
}

/// Whether `target` already has an entry, ignoring comments
pub fn has_entry(contents: &str, target: &str) -> bool {
    let target = target.trim_end_matches('/');
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|mount| mount.trim_end_matches('/') == target)
}

/// `UUID=...` for the device when blkid knows it, else the device path
pub fn device_spec(host: &dyn HostOps, device: &str, log: &mut EventLog) -> String {
    match run_checked(host, "blkid", "blkid", &["-s", "UUID", "-o", "value", device]) {
        Ok(uuid) if !uuid.trim().is_empty() => format!("UUID={}", uuid.trim()),
        _ => {
            log.warn(format!("No UUID found for {}, using the device path", device));
            device.to_string()
        }
    }
}

fn already_present(fstab: &Path, target: &str, log: &mut EventLog) -> StepOutcome {
    log.info(format!("{} already has an entry in {}", target, fstab.display()));
    StepOutcome::unchanged(format!("{} already present in {}", target, fstab.display()))
}

/// Append `line` for `target` unless the table already has an entry for it
pub fn persist_line(
    host: &dyn HostOps,
    fstab: &Path,
    target: &str,
    line: &str,
    log: &mut EventLog,
) -> Result<StepOutcome> {
    let existing = host.read_file(fstab)?.unwrap_or_default();
    if has_entry(&existing, target) {
        return Ok(already_present(fstab, target, log));
    }
    append_entry(host, fstab, &existing, target, line, log)
}

/// Persist a plain device mount
pub fn persist_mount(
    host: &dyn HostOps,
    fstab: &Path,
    device: &str,
    target: &str,
    fs_type: &str,
    log: &mut EventLog,
) -> Result<StepOutcome> {
    let existing = host.read_file(fstab)?.unwrap_or_default();
    if has_entry(&existing, target) {
        return Ok(already_present(fstab, target, log));
    }

    let spec = device_spec(host, device, log);
    let line = fstab_entry(&spec, target, fs_type, DEFAULT_OPTIONS);
    append_entry(host, fstab, &existing, target, &line, log)
}

fn append_entry(
    host: &dyn HostOps,
    fstab: &Path,
    existing: &str,
    target: &str,
    line: &str,
    log: &mut EventLog,
) -> Result<StepOutcome> {
    let mut addition = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        addition.push('\n');
    }
    addition.push_str(line);
    addition.push('\n');

    host.append_file(fstab, &addition)?;
    log.info(format!("Added {} to {}", target, fstab.display()));
    Ok(StepOutcome::changed(format!("Added {} to {}", target, fstab.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::host::fake::FakeHost;

    const FSTAB: &str = "/etc/fstab";

    #[test]
    fn test_has_entry() {
        let table = "# /mnt/storage was here\nUUID=abc / ext4 defaults 0 1\nUUID=def /mnt/storage/ ext4 defaults 0 2\n";
        assert!(has_entry(table, "/mnt/storage"));
        assert!(has_entry(table, "/"));
        assert!(!has_entry(table, "/mnt/backup"));
        assert!(!has_entry("# /mnt/backup ext4", "/mnt/backup"));
    }

    #[test]
    fn test_persist_prefers_uuid() {
        let host = FakeHost::default().respond("blkid", "1234-abcd\n");
        let outcome = persist_mount(&host, Path::new(FSTAB), "/dev/sdb", "/mnt/storage", "ext4", &mut EventLog::new()).unwrap();

        assert!(outcome.changed);
        assert_eq!(
            host.file(FSTAB).unwrap(),
            "UUID=1234-abcd /mnt/storage ext4 defaults,nofail 0 2\n"
        );
    }

    #[test]
    fn test_persist_falls_back_to_device_path() {
        let host = FakeHost::default().fail("blkid", "");
        let mut log = EventLog::new();
        persist_mount(&host, Path::new(FSTAB), "/dev/sdc", "/mnt/backup", "xfs", &mut log).unwrap();

        assert_eq!(
            host.file(FSTAB).unwrap(),
            "/dev/sdc /mnt/backup xfs defaults,nofail 0 2\n"
        );
        assert!(log.into_events().iter().any(|e| e.message.contains("No UUID")));
    }

    #[test]
    fn test_persist_skips_existing_target() {
        let host = FakeHost::default();
        host.append_file(Path::new(FSTAB), "/dev/sdb /mnt/storage ext4 defaults 0 2").unwrap();

        let outcome = persist_mount(&host, Path::new(FSTAB), "/dev/sdb", "/mnt/storage", "ext4", &mut EventLog::new()).unwrap();
        assert!(!outcome.changed);
        assert!(outcome.message.contains("already present"));
        assert_eq!(host.ran("blkid"), 0);
        assert_eq!(host.file(FSTAB).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_persist_adds_newline_before_entry() {
        let host = FakeHost::default().respond("blkid", "u1");
        host.append_file(Path::new(FSTAB), "UUID=root / ext4 defaults 0 1").unwrap();
        persist_mount(&host, Path::new(FSTAB), "/dev/sdb", "/mnt/storage", "ext4", &mut EventLog::new()).unwrap();
        assert_eq!(host.file(FSTAB).unwrap().lines().count(), 2);
    }
}

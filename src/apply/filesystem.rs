//! Formatting and mounting single devices

use super::ops::{EventLog, StepOutcome};
use crate::domain::ports::HostOps;
use crate::error::{Error, Result};
use crate::strategy::config::Filesystem;
use std::path::Path;

/// Run a tool and turn a non-zero exit into a `StepFailure` carrying its output
pub fn run_checked(host: &dyn HostOps, step: &str, program: &str, args: &[&str]) -> Result<String> {
    let output = host.run(program, args)?;
    if !output.success {
        return Err(Error::step_failure(
            format!("{} {}", program, args.join(" ")).trim().to_string(),
            if output.combined().is_empty() {
                format!("{} exited unsuccessfully", step)
            } else {
                output.combined()
            },
        ));
    }
    Ok(output.stdout)
}

/// Create a filesystem on `device`, overwriting whatever is there
pub fn format_device(
    host: &dyn HostOps,
    device: &str,
    filesystem: &str,
    label: &str,
    log: &mut EventLog,
) -> Result<StepOutcome> {
    let fs = Filesystem::parse(filesystem)?;
    let program = fs.mkfs_program();

    if !host.tool_available(program) {
        return Err(Error::tool_unavailable(
            program,
            format!("install the {} filesystem utilities", fs),
        ));
    }

    log.info(format!("Formatting {} as {} (label '{}')", device, fs, label));
    run_checked(host, "format", program, &fs.mkfs_args(device, label))?;

    Ok(StepOutcome::changed(format!("Formatted {} as {}", device, fs)))
}

pub fn create_dir(host: &dyn HostOps, path: &str, log: &mut EventLog) -> Result<StepOutcome> {
    log.debug(format!("Creating {}", path));
    host.create_dir_all(Path::new(path))?;
    Ok(StepOutcome::changed(format!("Created {}", path)))
}

/// Mount `device` at `target` unless something is already mounted there
pub fn mount_device(
    host: &dyn HostOps,
    device: &str,
    target: &str,
    filesystem: &str,
    log: &mut EventLog,
) -> Result<StepOutcome> {
    if host.is_mounted(Path::new(target))? {
        log.info(format!("{} is already mounted", target));
        return Ok(StepOutcome::unchanged(format!("{} already mounted", target)));
    }

    let fs = Filesystem::parse(filesystem)?;
    log.info(format!("Mounting {} at {}", device, target));
    run_checked(host, "mount", "mount", &["-t", fs.as_str(), device, target])?;

    Ok(StepOutcome::changed(format!("Mounted {} at {}", device, target)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::host::fake::FakeHost;
    use assert_matches::assert_matches;

    #[test]
    fn test_format_runs_mkfs_with_label() {
        let host = FakeHost::with_tools(&["mkfs.ext4"]);
        let mut log = EventLog::new();
        let outcome = format_device(&host, "/dev/sdb", "ext4", "storage", &mut log).unwrap();

        assert!(outcome.changed);
        assert_eq!(host.ran("mkfs.ext4 -F -L storage /dev/sdb"), 1);
        assert_eq!(log.into_events().len(), 1);
    }

    #[test]
    fn test_format_rejects_unknown_filesystem() {
        let host = FakeHost::with_tools(&["mkfs.ntfs"]);
        let result = format_device(&host, "/dev/sdb", "ntfs", "storage", &mut EventLog::new());
        assert_matches!(result, Err(Error::UnsupportedConfiguration(_)));
        assert_eq!(host.mutations(), 0);
    }

    #[test]
    fn test_format_failure_carries_output() {
        let host = FakeHost::with_tools(&["mkfs.xfs"]).fail("mkfs.xfs", "/dev/sdb: device busy");
        let err = format_device(&host, "/dev/sdb", "xfs", "data", &mut EventLog::new()).unwrap_err();
        assert_matches!(err, Error::StepFailure { ref output, .. } if output.contains("device busy"));
    }

    #[test]
    fn test_format_without_mkfs() {
        let host = FakeHost::default();
        let err = format_device(&host, "/dev/sdb", "btrfs", "data", &mut EventLog::new()).unwrap_err();
        assert_matches!(err, Error::ToolUnavailable { ref tool, .. } if tool == "mkfs.btrfs");
    }

    #[test]
    fn test_mount_is_idempotent() {
        let host = FakeHost::default();
        let first = mount_device(&host, "/dev/sdb", "/mnt/storage", "ext4", &mut EventLog::new()).unwrap();
        let second = mount_device(&host, "/dev/sdb", "/mnt/storage", "ext4", &mut EventLog::new()).unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert!(second.message.contains("already mounted"));
        assert_eq!(host.ran("mount"), 1);
    }
}

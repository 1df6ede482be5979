//! Mirror setup
//!
//! Prefers a ZFS mirror when `zpool` is installed and falls back to an mdadm
//! RAID1 array. With neither tool present the step fails; it never degrades
//! to an unprotected layout.

use super::applier::ApplierSettings;
use super::filesystem::{format_device, mount_device, run_checked};
use super::fstab::persist_mount;
use super::ops::{EventLog, StepOutcome};
use crate::domain::ports::HostOps;
use crate::error::{Error, Result};
use std::path::Path;

/// Build the mirror over `devices` and mount it at `target`
pub fn setup_mirror(
    host: &dyn HostOps,
    settings: &ApplierSettings,
    devices: &[String],
    target: &str,
    filesystem: &str,
    label: &str,
    log: &mut EventLog,
) -> Result<StepOutcome> {
    if devices.len() < 2 {
        return Err(Error::UnsupportedConfiguration(format!(
            "a mirror needs two disks, {} given",
            devices.len()
        )));
    }

    if host.tool_available("zpool") {
        log.info("zpool found, building a ZFS mirror");
        zfs_mirror(host, devices, target, pool_name(label), log)
    } else if host.tool_available("mdadm") {
        log.info("zpool not found, building an mdadm RAID1 mirror");
        md_mirror(host, settings, devices, target, filesystem, label, log)
    } else {
        Err(Error::tool_unavailable(
            "zpool or mdadm",
            "install zfsutils-linux (ZFS mirror) or mdadm (RAID1) and re-run",
        ))
    }
}

fn pool_name(label: &str) -> &str {
    match label.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => label,
        _ => "storage",
    }
}

fn zfs_mirror(
    host: &dyn HostOps,
    devices: &[String],
    target: &str,
    pool: &str,
    log: &mut EventLog,
) -> Result<StepOutcome> {
    if host.run("zpool", &["list", "-H", "-o", "name", pool])?.success {
        log.info(format!("ZFS pool '{}' already exists", pool));
        return Ok(StepOutcome::unchanged(format!("ZFS pool '{}' already exists", pool)));
    }

    let mut args = vec!["create", "-f", "-o", "ashift=12", "-m", target, pool, "mirror"];
    args.extend(devices.iter().map(String::as_str));

    log.info(format!("Creating ZFS pool '{}' mirrored over {}", pool, devices.join(", ")));
    run_checked(host, "zpool create", "zpool", &args)?;
    log.info(format!("ZFS mounts the pool at {} on import", target));

    Ok(StepOutcome::changed(format!(
        "Created ZFS mirror '{}' at {}",
        pool, target
    )))
}

fn md_mirror(
    host: &dyn HostOps,
    settings: &ApplierSettings,
    devices: &[String],
    target: &str,
    filesystem: &str,
    label: &str,
    log: &mut EventLog,
) -> Result<StepOutcome> {
    let md = settings.md_device.as_str();
    let mut changed = false;

    if host.run("mdadm", &["--detail", md])?.success {
        log.info(format!("{} already exists, keeping its data", md));
    } else {
        let raid_devices = format!("--raid-devices={}", devices.len());
        let mut args = vec!["--create", md, "--level=1", raid_devices.as_str(), "--run"];
        args.extend(devices.iter().map(String::as_str));

        log.info(format!("Creating RAID1 {} from {}", md, devices.join(", ")));
        run_checked(host, "mdadm create", "mdadm", &args)?;
        format_device(host, md, filesystem, label, log)?;
        changed = true;
    }

    host.create_dir_all(Path::new(target))?;
    changed |= mount_device(host, md, target, filesystem, log)?.changed;
    changed |= persist_mount(host, &settings.fstab_path, md, target, filesystem, log)?.changed;
    changed |= record_arrays(host, &settings.mdadm_conf, log)?;

    let message = if changed {
        format!("RAID1 {} mounted at {}", md, target)
    } else {
        format!("RAID1 {} at {} already configured", md, target)
    };
    Ok(StepOutcome { message, changed })
}

/// Append ARRAY lines from `mdadm --detail --scan` that the config lacks
fn record_arrays(host: &dyn HostOps, conf: &Path, log: &mut EventLog) -> Result<bool> {
    let scan = run_checked(host, "mdadm scan", "mdadm", &["--detail", "--scan"])?;
    let existing = host.read_file(conf)?.unwrap_or_default();
    let known: Vec<&str> = existing
        .lines()
        .filter(|l| l.starts_with("ARRAY"))
        .filter_map(|l| l.split_whitespace().nth(1))
        .collect();

    let missing: Vec<&str> = scan
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ARRAY"))
        .filter(|l| {
            l.split_whitespace()
                .nth(1)
                .map(|dev| !known.contains(&dev))
                .unwrap_or(false)
        })
        .collect();

    if missing.is_empty() {
        log.debug(format!("{} already lists the array", conf.display()));
        return Ok(false);
    }

    if let Some(parent) = conf.parent() {
        host.create_dir_all(parent)?;
    }
    let mut addition = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        addition.push('\n');
    }
    for line in &missing {
        addition.push_str(line);
        addition.push('\n');
    }
    host.append_file(conf, &addition)?;
    log.info(format!("Recorded {} array(s) in {}", missing.len(), conf.display()));
    Ok(true)
}

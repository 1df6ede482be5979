//! lsblk Enumeration
//!
//! Runs `lsblk --json` and normalizes its output into `Disk` records.
//! lsblk's JSON encoding differs between util-linux releases (sizes as
//! numbers or strings, booleans as `0`/`1`, `true`/`false` or `"1"`,
//! `mountpoint` vs `mountpoints`), so every field is coerced leniently and
//! falls back to its zero value. One malformed entry is skipped, never fatal.

use super::units::parse_human_size;
use crate::domain::ports::{BlockDeviceProbe, Disk, DiskDescriptor, Partition};
use crate::error::{Error, Result};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// Columns requested from lsblk
pub const LSBLK_COLUMNS: &str =
    "NAME,PATH,SIZE,TYPE,MODEL,SERIAL,ROTA,RM,TRAN,MOUNTPOINT,FSTYPE,LABEL,UUID";

// =============================================================================
// Probe
// =============================================================================

/// Enumerates block devices by running lsblk
#[derive(Debug, Clone)]
pub struct LsblkProbe {
    binary: String,
}

impl LsblkProbe {
    pub fn new() -> Self {
        Self {
            binary: "lsblk".to_string(),
        }
    }

    /// Use a different lsblk binary
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for LsblkProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDeviceProbe for LsblkProbe {
    fn enumerate(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .args(["--json", "--bytes", "--output", LSBLK_COLUMNS])
            .output()
            .map_err(|e| Error::Enumeration(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::Enumeration(format!(
                "{} exited with {}: {}",
                self.binary, output.status, stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Replays lsblk JSON saved to a file, for planning against another host
#[derive(Debug, Clone)]
pub struct SavedLsblkProbe {
    path: PathBuf,
}

impl SavedLsblkProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BlockDeviceProbe for SavedLsblkProbe {
    fn enumerate(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| {
            Error::Enumeration(format!("Failed to read {}: {}", self.path.display(), e))
        })
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse an lsblk JSON document into whole-disk records.
///
/// Fails only when the document itself is unusable (not JSON, or no
/// `blockdevices` array). Entries whose `type` is not `disk` are skipped.
pub fn parse_lsblk(document: &str) -> Result<Vec<Disk>> {
    let root: Value = serde_json::from_str(document)
        .map_err(|e| Error::Enumeration(format!("lsblk output is not valid JSON: {}", e)))?;

    let devices = root
        .get("blockdevices")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Enumeration("lsblk output has no blockdevices array".into()))?;

    let mut disks = Vec::with_capacity(devices.len());
    for (index, entry) in devices.iter().enumerate() {
        match disk_from_entry(entry) {
            Some(disk) => disks.push(disk),
            None => debug!("Skipping lsblk entry {}", index),
        }
    }

    Ok(disks)
}

fn disk_from_entry(entry: &Value) -> Option<Disk> {
    if !entry.is_object() {
        warn!("Ignoring malformed lsblk entry: {}", entry);
        return None;
    }

    let name = coerce_string(entry.get("name"));
    if name.is_empty() {
        warn!("Ignoring lsblk entry without a name");
        return None;
    }

    let kind = coerce_string(entry.get("type"));
    if !kind.is_empty() && kind != "disk" {
        debug!("{} is a {} device, not a disk", name, kind);
        return None;
    }

    let mut partitions = Vec::new();
    collect_partitions(entry.get("children"), &mut partitions);

    Some(Disk::from_descriptor(DiskDescriptor {
        path: coerce_string(entry.get("path")),
        size_bytes: coerce_u64(entry.get("size")),
        rotational: coerce_bool(entry.get("rota")),
        removable: coerce_bool(entry.get("rm")),
        transport: coerce_string(entry.get("tran")).to_ascii_lowercase(),
        model: coerce_string(entry.get("model")),
        serial: coerce_string(entry.get("serial")),
        partitions,
        filesystem: coerce_string(entry.get("fstype")),
        mount_point: mount_point_of(entry),
        name,
    }))
}

/// Flatten partitions and anything nested below them (LVM, LUKS) in order
fn collect_partitions(children: Option<&Value>, out: &mut Vec<Partition>) {
    let Some(children) = children.and_then(Value::as_array) else {
        return;
    };

    for child in children.iter().filter(|c| c.is_object()) {
        out.push(Partition {
            name: coerce_string(child.get("name")),
            size_bytes: coerce_u64(child.get("size")),
            filesystem: coerce_string(child.get("fstype")),
            mount_point: mount_point_of(child),
            label: coerce_string(child.get("label")),
            uuid: coerce_string(child.get("uuid")),
        });
        collect_partitions(child.get("children"), out);
    }
}

/// `mountpoint` (util-linux < 2.37) or the first entry of `mountpoints`
fn mount_point_of(entry: &Value) -> String {
    let single = coerce_string(entry.get("mountpoint"));
    if !single.is_empty() {
        return single;
    }

    entry
        .get("mountpoints")
        .and_then(Value::as_array)
        .and_then(|mounts| {
            mounts
                .iter()
                .map(|m| coerce_string(Some(m)))
                .find(|m| !m.is_empty())
        })
        .unwrap_or_default()
}

// =============================================================================
// Coercion
// =============================================================================

/// Number, numeric string or human size string; anything else is 0
pub fn coerce_u64(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => parse_human_size(s).unwrap_or(0),
        _ => 0,
    }
}

/// `true`/`false`, `0`/`1`, or their string forms; anything else is false
pub fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y"
        ),
        _ => false,
    }
}

/// Trimmed string, or the textual form of a number; anything else is empty
pub fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

//! Host Operations
//!
//! `SystemHost` is the real implementation of `HostOps`: it runs tools with
//! `std::process::Command`, resolves them on PATH with `which`, touches the
//! filesystem directly and reads the live mount table.

use crate::domain::ports::{CommandOutput, HostOps};
use crate::error::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const PROC_MOUNTS: &str = "/proc/mounts";

/// Runs everything against the local machine
#[derive(Debug, Clone)]
pub struct SystemHost {
    mounts_path: PathBuf,
}

impl SystemHost {
    pub fn new() -> Self {
        Self {
            mounts_path: PathBuf::from(PROC_MOUNTS),
        }
    }

    /// Read the mount table from another file (for testing)
    pub fn with_mounts_path(path: impl Into<PathBuf>) -> Self {
        Self {
            mounts_path: path.into(),
        }
    }
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostOps for SystemHost {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!("Running {} {}", program, args.join(" "));

        let output = Command::new(program).args(args).output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::tool_unavailable(program, format!("install the package providing {}", program))
            } else {
                Error::Io(e)
            }
        })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn tool_available(&self, tool: &str) -> bool {
        which::which(tool).is_ok()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn append_file(&self, path: &Path, contents: &str) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &str, mode: u32) -> Result<()> {
        fs::write(path, contents)?;
        set_mode(path, mode)
    }

    fn is_mounted(&self, mount_point: &Path) -> Result<bool> {
        let table = fs::read_to_string(&self.mounts_path)?;
        let mounted = mount_points(&table).any(|m| Path::new(&m) == mount_point);
        Ok(mounted)
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Mount points listed in a `/proc/mounts` style table, unescaped
pub fn mount_points(table: &str) -> impl Iterator<Item = String> + '_ {
    table
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(unescape_mount_field)
}

/// The kernel octal-escapes space, tab, newline and backslash
fn unescape_mount_field(field: &str) -> String {
    field
        .replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

// =============================================================================
// In-memory host for tests
// =============================================================================

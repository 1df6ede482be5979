//! System memory probes

use crate::domain::ports::MemoryProbe;
use crate::error::{Error, Result};
use std::fs;
use std::path::PathBuf;

const PROC_MEMINFO: &str = "/proc/meminfo";

/// Reads `MemTotal` from `/proc/meminfo`
#[derive(Debug, Clone)]
pub struct ProcMeminfoProbe {
    path: PathBuf,
}

impl ProcMeminfoProbe {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(PROC_MEMINFO),
        }
    }

    /// Read a meminfo-formatted file at another path (for testing)
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcMeminfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcMeminfoProbe {
    fn total_memory_bytes(&self) -> Result<u64> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            Error::Enumeration(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        parse_meminfo(&contents).ok_or_else(|| {
            Error::Enumeration(format!("No MemTotal line in {}", self.path.display()))
        })
    }
}

/// A fixed RAM figure supplied by the caller
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryProbe(pub u64);

impl MemoryProbe for FixedMemoryProbe {
    fn total_memory_bytes(&self) -> Result<u64> {
        Ok(self.0)
    }
}

/// Extract `MemTotal` (reported in kB) as bytes
pub fn parse_meminfo(contents: &str) -> Option<u64> {
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MEMINFO: &str = "MemTotal:       16318440 kB\nMemFree:         1234567 kB\n";

    #[test]
    fn test_parse_meminfo() {
        assert_eq!(parse_meminfo(MEMINFO), Some(16_318_440 * 1024));
        assert_eq!(parse_meminfo("MemFree: 12 kB\n"), None);
        assert_eq!(parse_meminfo("MemTotal: lots kB\n"), None);
    }

    #[test]
    fn test_proc_probe_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MEMINFO.as_bytes()).unwrap();

        let probe = ProcMeminfoProbe::at(file.path());
        assert_eq!(probe.total_memory_bytes().unwrap(), 16_318_440 * 1024);
    }

    #[test]
    fn test_proc_probe_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let probe = ProcMeminfoProbe::at(dir.path().join("meminfo"));
        assert!(matches!(
            probe.total_memory_bytes(),
            Err(Error::Enumeration(_))
        ));
    }
}

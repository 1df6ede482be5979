//! Byte formatting and human-readable size parsing

use crate::domain::ports::{GIB, KIB, MIB, TIB};

/// Format a byte count with binary (1024-based) units and two decimals.
///
/// Counts below 1 KiB are printed bare (`512 B`).
pub fn format_bytes(bytes: u64) -> String {
    let value = bytes as f64;
    if bytes >= TIB {
        format!("{:.2} TB", value / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.2} GB", value / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MB", value / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KB", value / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Parse sizes as lsblk prints them without `--bytes` (`931.5G`, `16M`, `512`).
pub fn parse_human_size(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(bytes) = raw.parse::<u64>() {
        return Some(bytes);
    }

    let split = raw
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(raw.len());
    let (number, suffix) = raw.split_at(split);
    let number: f64 = number.trim().parse().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }

    let multiplier = match suffix.trim().to_ascii_uppercase().trim_end_matches("IB").trim_end_matches('B') {
        "" => 1,
        "K" => KIB,
        "M" => MIB,
        "G" => GIB,
        "T" => TIB,
        "P" => TIB * 1024,
        _ => return None,
    };

    Some((number * multiplier as f64) as u64)
}

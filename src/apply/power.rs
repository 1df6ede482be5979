//! HDD power management
//!
//! Sets the standby (spin-down) timeout of rotational disks with hdparm.

use super::filesystem::run_checked;
use super::ops::{EventLog, StepOutcome};
use crate::domain::ports::HostOps;
use crate::error::{Error, Result};

/// Encode minutes as an `hdparm -S` value.
///
/// 1..=240 counts 5-second units (up to 20 minutes); 241..=251 counts
/// 30-minute units (30 minutes up to 5.5 hours). Timeouts between 20 and 30
/// minutes round up to 30; anything past 5.5 hours is clamped. 0 disables.
pub fn spindown_code(minutes: u32) -> u8 {
    match minutes {
        0 => 0,
        1..=20 => (minutes * 12) as u8,
        21..=30 => 241,
        _ => (240 + minutes.div_ceil(30)).min(251) as u8,
    }
}

pub fn set_spindown(
    host: &dyn HostOps,
    device: &str,
    minutes: u32,
    log: &mut EventLog,
) -> Result<StepOutcome> {
    if !host.tool_available("hdparm") {
        return Err(Error::tool_unavailable("hdparm", "install hdparm (apt install hdparm)"));
    }

    let code = spindown_code(minutes).to_string();
    log.info(format!("Setting {} to spin down after {} minutes (-S {})", device, minutes, code));
    run_checked(host, "hdparm", "hdparm", &["-S", code.as_str(), device])?;

    Ok(StepOutcome::changed(format!(
        "{} spins down after {} minutes idle",
        device, minutes
    )))
}

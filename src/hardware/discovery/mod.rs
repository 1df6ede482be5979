//! Disk Discovery Module
//!
//! Enumerates block devices and system memory on Linux hosts and
//! normalizes them into the planner's disk model.

pub mod lsblk;
pub mod scanner;
pub mod system;
pub mod units;

pub use lsblk::*;
pub use scanner::*;
pub use system::*;
pub use units::*;

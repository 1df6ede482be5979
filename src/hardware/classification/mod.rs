//! Disk Classification Module
//!
//! Separates claimable disks from excluded ones, buckets them by speed
//! class and flags disks that sit behind a hardware RAID controller.

pub mod classifier;
pub mod raid;

pub use classifier::*;
pub use raid::*;

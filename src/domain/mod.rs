//! Domain layer - Core data model and port definitions
//!
//! This module defines the disk model shared by every engine stage and the
//! traits (ports) behind which all host access is kept.

pub mod ports;

pub use ports::*;

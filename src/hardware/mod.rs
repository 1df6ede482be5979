//! Hardware Module
//!
//! Provides disk discovery and classification for the strategy engine.

pub mod discovery;
pub mod classification;

pub use discovery::*;
pub use classification::*;

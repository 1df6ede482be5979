//! Strategy Module
//!
//! Turns an inventory into scored, named storage layouts and carries the
//! editable configuration they are applied with.

pub mod config;
pub mod generator;
pub mod ranks;
pub mod scorer;
pub mod types;

pub use config::*;
pub use generator::*;
pub use ranks::*;
pub use scorer::*;
pub use types::*;

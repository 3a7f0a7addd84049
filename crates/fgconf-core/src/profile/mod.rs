//! Golden configuration profiles
//!
//! A profile bundles the ordered block writes for one battery pack with the
//! chip revision they were generated for and the version stamped after a
//! successful apply. Built-in profiles are static tables; with the `std`
//! feature further profiles can be loaded from RON files.

pub mod builtin;
#[cfg(feature = "std")]
mod database;

#[cfg(feature = "std")]
pub use database::{Profile, ProfileDatabase, ProfileDbError};

use crate::apply::ConfigVersion;
use crate::block::ExtendedCommand;
use crate::gate::ChipRevision;

/// Borrowed view of a golden configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoldenConfig<'a> {
    /// Short identifier used on the command line
    pub name: &'a str,
    /// Human readable description
    pub description: &'a str,
    /// Chip revision the blocks were generated for
    pub revision: ChipRevision,
    /// Version stamped into data flash after a successful apply
    pub version: ConfigVersion,
    /// Block writes, applied in order
    pub commands: &'a [ExtendedCommand],
}

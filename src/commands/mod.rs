//! CLI command implementations
//!
//! ## Engine commands
//!
//! `probe`, `status`, `pack` and the block commands open a bare protocol
//! engine and run the firmware gate themselves. Block access happens inside
//! a configuration window that is closed again before the command returns.
//!
//! ## Handle commands
//!
//! `apply` and `gpio-polarity` attach a [`fgconf_gauge::GaugeHandle`], which
//! runs the full init sequence.

pub mod apply;
pub mod block;
pub mod gpio;
mod list;
pub mod pack;
pub mod probe;

pub use list::{list_profiles, list_transports};

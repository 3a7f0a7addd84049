//! fgconf-core - Core library for BQ27441 fuel gauge configuration
//!
//! This crate implements the host side of the gauge's configuration
//! protocol: the control register sub-protocol, the seal/unseal and
//! CFGUPDATE mode state machine, checksum-verified data-flash block access
//! and the golden configuration applier. It is designed to be `no_std`
//! compatible; the lock-guarded [`device::DeviceHandle`], profile files and
//! platform attribute files need the `std` feature.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable heap allocation for owned profiles
//!
//! # Example
//!
//! ```ignore
//! use fgconf_core::{gate, profile::builtin, Gauge, NoProgress, RegisterTransport, StdClock};
//!
//! fn configure<T: RegisterTransport>(transport: T) -> fgconf_core::Result<()> {
//!     let mut gauge = Gauge::new(transport, StdClock::new());
//!     gauge.check_firmware_version(gate::BQ27441_G1)?;
//!     let profile = builtin::ZEROGRAVITAS;
//!     gauge.apply_golden_configuration(profile.commands, profile.version, &mut NoProgress)
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod apply;
pub mod block;
pub mod bus;
pub mod control;
#[cfg(feature = "std")]
pub mod device;
pub mod error;
pub mod gate;
pub mod mode;
pub mod pack;
pub mod profile;
pub mod registers;

pub use apply::{ApplyProgress, ConfigVersion, NoProgress, VersionPolicy};
pub use block::{BlockId, DataBlock, ExtendedCommand, BLOCK_SIZE};
#[cfg(feature = "std")]
pub use bus::StdClock;
pub use bus::{Clock, Gauge, RegisterAddress, RegisterTransport, RegisterWidth};
#[cfg(feature = "std")]
pub use device::{AttachOptions, AttachReport, DeviceHandle, Diagnostics};
pub use error::{Error, Result, TransportError};
pub use gate::ChipRevision;
pub use mode::ConfigMode;
pub use pack::PackParameters;
pub use profile::GoldenConfig;

//! fgconf-linux-i2c - Linux i2c-dev support
//!
//! This crate provides a register transport for fuel gauges attached to a
//! Linux I2C adapter via the `/dev/i2c-N` device interface.
//!
//! Register reads are a single combined transfer (register address, repeated
//! start, data) issued with `I2C_RDWR`. Writes go through `write(2)` on the
//! bound slave, so the byte count the kernel reports includes the register
//! address byte.
//!
//! # Example
//!
//! ```no_run
//! use fgconf_linux_i2c::{LinuxI2c, LinuxI2cConfig};
//! use fgconf_core::{gate, Gauge, StdClock};
//!
//! let config = LinuxI2cConfig::new("/dev/i2c-1").with_address(0x55);
//! let i2c = LinuxI2c::open(&config)?;
//!
//! let mut gauge = Gauge::new(i2c, StdClock::new());
//! let revision = gauge.check_firmware_version(gate::BQ27441_G1)?;
//! println!("{}", revision);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with fgconf CLI
//!
//! ```bash
//! # Probe the gauge on bus 1 at the default address
//! fgconf probe -t linux_i2c:dev=/dev/i2c-1
//!
//! # Gauge at a different address
//! fgconf status -t linux_i2c:dev=/dev/i2c-2,addr=0x55
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with i2c-dev support enabled (`CONFIG_I2C_CHARDEV`)
//! - Read/write access to `/dev/i2c-N`
//! - No kernel driver bound to the gauge (unbind `bq27xxx_battery` first)

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, LinuxI2c, LinuxI2cConfig, DEFAULT_ADDRESS};
pub use error::{LinuxI2cError, Result};

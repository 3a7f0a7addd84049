//! Device type and firmware version gate
//!
//! The golden configurations are only valid for one silicon/firmware
//! revision. Everything else is refused before the chip is touched.

use core::fmt;

use crate::bus::{Clock, Gauge, RegisterTransport};
use crate::error::{Error, Result};

/// Device type and firmware version pair reported by the control interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChipRevision {
    /// DEVICE_TYPE sub-command answer
    pub device_type: u16,
    /// FW_VERSION sub-command answer
    pub firmware_version: u16,
}

/// BQ27441-G1 running firmware 1.09
pub const BQ27441_G1: ChipRevision = ChipRevision {
    device_type: 0x0421,
    firmware_version: 0x0109,
};

impl fmt::Display for ChipRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device type 0x{:04X}, firmware 0x{:04X}",
            self.device_type, self.firmware_version
        )
    }
}

impl<T: RegisterTransport, C: Clock> Gauge<T, C> {
    /// Read the chip's device type and firmware version
    pub fn read_revision(&mut self) -> Result<ChipRevision> {
        let device_type = self.device_type()?;
        let firmware_version = self.firmware_version()?;
        Ok(ChipRevision {
            device_type,
            firmware_version,
        })
    }

    /// Refuse to continue unless the chip is exactly `expected`
    ///
    /// Both words are always read so the error reports the full revision.
    pub fn check_firmware_version(&mut self, expected: ChipRevision) -> Result<ChipRevision> {
        let found = self.read_revision()?;
        log::info!("Found {}", found);

        if found.device_type != expected.device_type {
            log::warn!("Unsupported device type 0x{:04X}", found.device_type);
        }
        if found.firmware_version != expected.firmware_version {
            log::warn!("Unsupported firmware version 0x{:04X}", found.firmware_version);
        }

        if found != expected {
            return Err(Error::HardwareMismatch {
                device_type: found.device_type,
                firmware_version: found.firmware_version,
            });
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::{ManualClock, MockBus, Op};

    #[test]
    fn test_mismatch_is_fatal() {
        // The flat mock echoes sub-commands: device type reads as 0x0001
        let mut gauge = Gauge::new(MockBus::new(), ManualClock::new());
        let err = gauge.check_firmware_version(BQ27441_G1).unwrap_err();

        assert_eq!(
            err,
            Error::HardwareMismatch {
                device_type: 0x0001,
                firmware_version: 0x0002
            }
        );
        assert!(err.is_fatal());

        // Two control round trips and nothing else
        let bus = gauge.transport();
        assert_eq!(bus.count, 4);
        assert_eq!(bus.ops[3], Some(Op::Read(0x00)));
    }

    #[test]
    fn test_matching_revision_passes() {
        let echo = ChipRevision {
            device_type: 0x0001,
            firmware_version: 0x0002,
        };
        let mut gauge = Gauge::new(MockBus::new(), ManualClock::new());
        assert_eq!(gauge.check_firmware_version(echo).unwrap(), echo);
    }
}

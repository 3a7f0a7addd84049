//! Control register sub-protocol
//!
//! The gauge multiplexes most of its housekeeping behind the CONTROL
//! register pair: the host writes a 16-bit sub-command and, for queries,
//! reads the 16-bit answer back from the same pair. The chip does not like
//! long transactions, so the write and the read are separate transfers with
//! a settle delay in between.

use crate::apply::ConfigVersion;
use crate::bus::{Clock, Gauge, RegisterTransport, BUS_SETTLE_US};
use crate::error::Result;
use crate::registers::{commands, subcommands, ControlStatus};

impl<T: RegisterTransport, C: Clock> Gauge<T, C> {
    /// Write a control sub-command (little-endian) into the control pair
    pub fn control_write(&mut self, cmd: u16) -> Result<()> {
        log::trace!("control write 0x{:04X}", cmd);
        self.write_reg_word(commands::CONTROL, cmd)
    }

    /// Issue a control sub-command and read its 16-bit answer
    ///
    /// Sub-commands are not validated; an unknown one simply returns
    /// whatever the chip leaves in the control pair.
    pub fn control_read(&mut self, subcommand: u16) -> Result<u16> {
        self.control_write(subcommand)?;
        self.delay_us(BUS_SETTLE_US);
        let value = self.read_reg_word(commands::CONTROL)?;
        log::trace!("control read 0x{:04X} -> 0x{:04X}", subcommand, value);
        Ok(value)
    }

    /// Read the CONTROL_STATUS word
    pub fn control_status(&mut self) -> Result<ControlStatus> {
        let raw = self.control_read(subcommands::CONTROL_STATUS)?;
        Ok(ControlStatus::from_bits_retain(raw))
    }

    /// Read the device type word
    pub fn device_type(&mut self) -> Result<u16> {
        self.control_read(subcommands::DEVICE_TYPE)
    }

    /// Read the firmware version word
    pub fn firmware_version(&mut self) -> Result<u16> {
        self.control_read(subcommands::FW_VERSION)
    }

    /// Read the configuration version stamp (DM code, low byte)
    pub fn dm_code(&mut self) -> Result<ConfigVersion> {
        let raw = self.control_read(subcommands::DM_CODE)?;
        Ok(ConfigVersion::new(raw as u8))
    }

    /// Read the chemistry profile id
    pub fn chem_id(&mut self) -> Result<u16> {
        self.control_read(subcommands::CHEM_ID)
    }

    /// Whether the chip currently reports itself sealed
    pub fn is_sealed(&mut self) -> Result<bool> {
        Ok(self.control_status()?.contains(ControlStatus::SS))
    }
}

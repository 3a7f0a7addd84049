//! Seal/unseal and CFGUPDATE mode state machine
//!
//! Data flash is only writable while the gauge is unsealed and in CFGUPDATE
//! mode. The chip's firmware decides asynchronously when to honour a mode
//! switch, so both transitions poll the flags register against a wall-clock
//! deadline measured on the injected [`Clock`].
//!
//! ```text
//!   Normal ──(sealed?)──► Unsealing ──► ConfigActive ──► Exiting ──► Sealed
//!     │                                     ▲
//!     └──────────(already unsealed)─────────┘
//! ```

use core::fmt;

use crate::bus::{Clock, Gauge, RegisterTransport};
use crate::error::{Error, Result};
use crate::registers::{commands, subcommands, ControlStatus, Flags};

/// Deadline for each mode transition, in microseconds
pub const MODE_TRANSITION_TIMEOUT_US: u64 = 1_000_000;

/// Interval between flag polls, in microseconds
pub const FLAG_POLL_INTERVAL_US: u32 = 1_000;

/// Pause between unsealing and requesting CFGUPDATE, in microseconds
const UNSEAL_SETTLE_US: u32 = 1_000;

/// Configuration mode the engine last drove the chip into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    /// Normal gauging; initial state
    Normal,
    /// Unseal key sequence in progress
    Unsealing,
    /// CFGUPDATE active, data flash writable
    ConfigActive,
    /// Soft reset issued, waiting for CFGUPDATE to clear
    Exiting,
    /// Sealed after a configuration window was closed
    Sealed,
}

impl fmt::Display for ConfigMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Unsealing => write!(f, "unsealing"),
            Self::ConfigActive => write!(f, "config-update"),
            Self::Exiting => write!(f, "exiting"),
            Self::Sealed => write!(f, "sealed"),
        }
    }
}

impl<T: RegisterTransport, C: Clock> Gauge<T, C> {
    /// Mode the engine last drove the chip into
    ///
    /// After a failed transition this is the step that failed, and the real
    /// chip state must be treated as unknown.
    pub fn mode(&self) -> ConfigMode {
        self.mode
    }

    /// Read the low byte of the flags register
    pub fn read_flags(&mut self) -> Result<Flags> {
        let raw = self.read_reg_byte(commands::FLAGS)?;
        Ok(Flags::from_bits_retain(raw))
    }

    /// Open a configuration window
    ///
    /// Idempotent: if the chip already reports CFGUPMODE nothing is written.
    pub fn enter_config_mode(&mut self) -> Result<()> {
        let flags = self.read_flags()?;
        log::debug!("Flags: 0x{:02X}", flags.bits());

        if flags.contains(Flags::CFGUPMODE) {
            log::info!("Device already in config mode");
            self.set_mode(ConfigMode::ConfigActive);
            return Ok(());
        }

        let status = self.control_status()?;
        log::debug!("Control status before unseal: 0x{:04X}", status.bits());

        if status.contains(ControlStatus::SS) {
            self.set_mode(ConfigMode::Unsealing);
            self.control_write(subcommands::UNSEAL_KEY)?;
            self.control_write(subcommands::UNSEAL_KEY)?;
        } else {
            log::info!("Device already unsealed");
        }

        self.delay_us(UNSEAL_SETTLE_US);

        let status = self.control_status()?;
        log::debug!("Control status after unseal: 0x{:04X}", status.bits());

        self.control_write(subcommands::SET_CFGUPDATE)?;
        self.wait_for_cfgupdate(true).inspect_err(|e| match e {
            Error::Timeout => log::warn!("Timeout waiting for cfg update"),
            e => log::warn!("Failed polling for cfg update: {}", e),
        })?;

        self.write_reg_byte(commands::BLOCK_DATA_CONTROL, 0x00)
            .inspect_err(|e| log::warn!("Unable to enable block mode: {}", e))?;

        self.set_mode(ConfigMode::ConfigActive);
        Ok(())
    }

    /// Close a configuration window and re-seal the chip
    ///
    /// Sealing runs even when the chip was never in CFGUPDATE mode; sealing
    /// a sealed chip is a no-op on the gauge.
    pub fn exit_config_mode(&mut self) -> Result<()> {
        let flags = self.read_flags()?;

        if flags.contains(Flags::CFGUPMODE) {
            log::info!("Exiting config mode by soft reset");
            self.set_mode(ConfigMode::Exiting);

            self.control_write(subcommands::SOFT_RESET)?;
            self.wait_for_cfgupdate(false).inspect_err(|e| match e {
                Error::Timeout => log::warn!("Timeout waiting for cfg update stop"),
                e => log::warn!("Failed polling for cfg update stop: {}", e),
            })?;
        }

        self.control_write(subcommands::SEALED)?;
        self.set_mode(ConfigMode::Sealed);
        Ok(())
    }

    /// Poll until CFGUPMODE equals `active` or the deadline passes
    fn wait_for_cfgupdate(&mut self, active: bool) -> Result<()> {
        let deadline = self.clock.now_us() + MODE_TRANSITION_TIMEOUT_US;

        loop {
            let flags = self.read_flags()?;
            log::trace!("Waiting for CFGUPMODE={}: flags 0x{:02X}", active, flags.bits());

            if flags.contains(Flags::CFGUPMODE) == active {
                return Ok(());
            }
            if self.clock.now_us() > deadline {
                return Err(Error::Timeout);
            }
            self.delay_us(FLAG_POLL_INTERVAL_US);
        }
    }

    fn set_mode(&mut self, mode: ConfigMode) {
        if self.mode != mode {
            log::debug!("Config mode: {} -> {}", self.mode, mode);
            self.mode = mode;
        }
    }
}

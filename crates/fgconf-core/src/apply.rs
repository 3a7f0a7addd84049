//! Golden configuration application
//!
//! A golden configuration is an ordered list of [`ExtendedCommand`]s plus a
//! version number. Applying it writes every block inside one configuration
//! window and, only if all of them verified, stamps the version into data
//! flash so the next boot can tell the chip is already configured.

use core::fmt;

use crate::block::{BlockId, ExtendedCommand};
use crate::bus::{Clock, Gauge, RegisterTransport};
use crate::error::Result;
use crate::pack::PackParameters;
use crate::registers::Flags;

/// Location of the configuration version stamp: DM code at class 0x40, block 0
pub const VERSION_STAMP_BLOCK: BlockId = BlockId::new(0x40, 0);

/// Byte offset of the version stamp within [`VERSION_STAMP_BLOCK`]
pub const VERSION_STAMP_OFFSET: u8 = 3;

/// Pause between writing the stamp and reading it back, in microseconds
const STAMP_SETTLE_US: u32 = 1_000;

/// Configuration version stamped into data flash
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ConfigVersion(u8);

impl ConfigVersion {
    /// Wrap a raw version byte
    pub const fn new(version: u8) -> Self {
        Self(version)
    }

    /// The raw version byte
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for ConfigVersion {
    fn from(v: u8) -> Self {
        Self(v)
    }
}

impl fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When a chip counts as unconfigured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionPolicy {
    /// Reconfigure when the stamp differs or the chip reports a power-on reset
    #[default]
    VersionOrPowerOnReset,
    /// Reconfigure only when the stamp differs
    VersionOnly,
}

/// Decide whether a golden configuration has to be (re-)applied
pub fn needs_configuration(
    current: ConfigVersion,
    expected: ConfigVersion,
    itpor: bool,
    policy: VersionPolicy,
) -> bool {
    match policy {
        VersionPolicy::VersionOrPowerOnReset => current != expected || itpor,
        VersionPolicy::VersionOnly => current != expected,
    }
}

/// Progress callbacks for [`Gauge::apply_golden_configuration`]
pub trait ApplyProgress {
    /// Called once before the first block with the number of blocks
    fn blocks_started(&mut self, total: usize);

    /// Called after each block has been written and verified
    fn block_written(&mut self, index: usize, block: BlockId);

    /// Called after the version stamp has been written
    fn stamped(&mut self, version: ConfigVersion);

    /// Called when the configuration window has been closed
    fn finished(&mut self);
}

/// No-op progress implementation
pub struct NoProgress;

impl ApplyProgress for NoProgress {
    fn blocks_started(&mut self, _total: usize) {}
    fn block_written(&mut self, _index: usize, _block: BlockId) {}
    fn stamped(&mut self, _version: ConfigVersion) {}
    fn finished(&mut self) {}
}

impl<T: RegisterTransport, C: Clock> Gauge<T, C> {
    /// Write a golden configuration and stamp its version
    ///
    /// Aborts on the first block that fails to verify. Blocks written before
    /// the failure are not rolled back and the stamp is not written, so the
    /// next attach sees a version mismatch and tries again. The chip is left
    /// in configuration mode on a block failure.
    ///
    /// The pack parameters are read back between the blocks and the stamp
    /// for the log only; a failure there is logged and does not stop the
    /// apply.
    pub fn apply_golden_configuration(
        &mut self,
        commands: &[ExtendedCommand],
        version: ConfigVersion,
        progress: &mut impl ApplyProgress,
    ) -> Result<()> {
        // Diagnostic only: soft reset at exit clears ITPOR
        let itpor = self.read_flags()?.contains(Flags::ITPOR);

        self.enter_config_mode()?;

        progress.blocks_started(commands.len());
        for (i, cmd) in commands.iter().enumerate() {
            self.write_command(cmd)?;
            progress.block_written(i, cmd.block);
        }

        match PackParameters::read(self) {
            Ok(pack) => log::info!("Pack parameters: {}, ITPOR {}", pack, itpor),
            Err(e) => log::warn!("Unable to read pack parameters: {}", e),
        }

        self.write_byte(VERSION_STAMP_BLOCK, VERSION_STAMP_OFFSET, version.get())?;
        progress.stamped(version);

        self.delay_us(STAMP_SETTLE_US);
        match self.dm_code() {
            Ok(stamp) => log::info!("Config version now {}", stamp),
            Err(e) => log::warn!("Unable to read back config version: {}", e),
        }

        let result = self.exit_config_mode();
        progress.finished();
        result
    }

    /// Whether this chip needs `expected` applied under `policy`
    pub fn needs_configuration(
        &mut self,
        expected: ConfigVersion,
        policy: VersionPolicy,
    ) -> Result<bool> {
        let current = self.dm_code()?;
        let itpor = self.read_flags()?.contains(Flags::ITPOR);
        log::debug!(
            "Config version {} (want {}), ITPOR {}",
            current,
            expected,
            itpor
        );
        Ok(needs_configuration(current, expected, itpor, policy))
    }
}

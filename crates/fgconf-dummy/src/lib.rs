//! fgconf-dummy - In-memory BQ27441 emulator for testing
//!
//! This crate provides a register transport that emulates the parts of a
//! BQ27441-G1 the configuration protocol talks to: the control sub-commands,
//! the seal/unseal key sequence, CFGUPDATE mode with a configurable latency,
//! and checksum-committed data-flash blocks. Faults can be injected to
//! exercise the error paths, and every transaction is logged.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::collections::BTreeMap;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use fgconf_core::block::{checksum, BlockId, BLOCK_SIZE};
use fgconf_core::bus::{Clock, RegisterAddress, RegisterTransport, RegisterWidth};
use fgconf_core::error::TransportError;
use fgconf_core::registers::{commands, subcommands, ControlStatus, Flags};

/// Configuration for the dummy gauge
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// DEVICE_TYPE answer
    pub device_type: u16,
    /// FW_VERSION answer
    pub firmware_version: u16,
    /// CHEM_ID answer
    pub chem_id: u16,
    /// Start sealed
    pub sealed: bool,
    /// Start with ITPOR set, as after a power-on reset
    pub itpor: bool,
    /// Report BAT_DET in the flags register
    pub battery_detected: bool,
    /// Flag reads before CFGUPMODE appears after SET_CFGUPDATE
    pub enter_latency_polls: u32,
    /// Flag reads before CFGUPMODE clears after SOFT_RESET
    pub exit_latency_polls: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            device_type: 0x0421,
            firmware_version: 0x0109,
            chem_id: 0x0128,
            sealed: true,
            itpor: true,
            battery_detected: true,
            enter_latency_polls: 2,
            exit_latency_polls: 2,
        }
    }
}

/// Faults the emulator can be told to inject
#[derive(Debug, Clone, Default)]
pub struct DummyFaults {
    /// Report a wrong checksum when this block's checksum is read
    pub corrupt_checksum: Option<BlockId>,
    /// Bytes missing from every write's reported length
    pub short_write_by: usize,
    /// Ignore SET_CFGUPDATE
    pub never_enter_cfgupdate: bool,
    /// Ignore the soft reset that ends CFGUPDATE
    pub never_exit_cfgupdate: bool,
    /// Fail every read with a missing acknowledge
    pub nack_reads: bool,
    /// Fail any attempt to select this block with a missing acknowledge
    pub nack_select: Option<BlockId>,
}

/// One logged bus transaction
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// Register read
    Read {
        /// Register address
        reg: u8,
        /// Read width
        width: RegisterWidth,
    },
    /// Register write
    Write {
        /// First register address
        reg: u8,
        /// Bytes written
        data: Vec<u8>,
    },
}

#[cfg(feature = "alloc")]
impl Transaction {
    /// The control sub-command, if this is a word write to CONTROL
    pub fn control_command(&self) -> Option<u16> {
        match self {
            Transaction::Write { reg, data } if *reg == commands::CONTROL && data.len() == 2 => {
                Some(u16::from_le_bytes([data[0], data[1]]))
            }
            _ => None,
        }
    }

    /// Whether this is a write to `register`
    pub fn is_write_to(&self, register: u8) -> bool {
        matches!(self, Transaction::Write { reg, .. } if *reg == register)
    }
}

/// Dummy fuel gauge
///
/// Emulates a BQ27441 in memory for testing purposes.
#[cfg(feature = "alloc")]
pub struct DummyGauge {
    config: DummyConfig,
    faults: DummyFaults,
    flash: BTreeMap<BlockId, [u8; BLOCK_SIZE]>,

    sealed: bool,
    unseal_armed: bool,
    cfgupdate: bool,
    itpor: bool,
    pending_enter: Option<u32>,
    pending_exit: Option<u32>,
    control_word: u16,

    selected: BlockId,
    window: [u8; BLOCK_SIZE],
    window_checksum: u8,
    block_mode: bool,

    log: Vec<Transaction>,
}

#[cfg(feature = "alloc")]
impl DummyGauge {
    /// Create a new dummy gauge with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            sealed: config.sealed,
            itpor: config.itpor,
            config,
            faults: DummyFaults::default(),
            flash: BTreeMap::new(),
            unseal_armed: false,
            cfgupdate: false,
            pending_enter: None,
            pending_exit: None,
            control_word: 0,
            selected: BlockId::new(0, 0),
            window: [0; BLOCK_SIZE],
            window_checksum: 0xFF,
            block_mode: false,
            log: Vec::new(),
        }
    }

    /// Create a new dummy gauge with default configuration (sealed G1, fresh from reset)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Get the fault injection settings
    pub fn faults_mut(&mut self) -> &mut DummyFaults {
        &mut self.faults
    }

    /// Contents of a data-flash block (unwritten blocks are zero)
    pub fn block(&self, id: BlockId) -> [u8; BLOCK_SIZE] {
        self.flash.get(&id).copied().unwrap_or([0; BLOCK_SIZE])
    }

    /// Overwrite a data-flash block directly
    pub fn set_block(&mut self, id: BlockId, data: [u8; BLOCK_SIZE]) {
        self.flash.insert(id, data);
    }

    /// Whether the gauge is sealed
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Whether the gauge is in CFGUPDATE mode
    pub fn in_cfgupdate(&self) -> bool {
        self.cfgupdate
    }

    /// Whether the ITPOR flag is set
    pub fn itpor(&self) -> bool {
        self.itpor
    }

    /// Simulate a power-on reset: flash survives, RAM state does not
    pub fn power_on_reset(&mut self) {
        self.sealed = true;
        self.unseal_armed = false;
        self.cfgupdate = false;
        self.itpor = true;
        self.pending_enter = None;
        self.pending_exit = None;
        self.block_mode = false;
    }

    /// All transactions since creation or the last [`Self::clear_log`]
    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }

    /// Number of logged transactions
    pub fn transaction_count(&self) -> usize {
        self.log.len()
    }

    /// Forget the transaction log
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Control sub-commands written so far, in order
    pub fn control_commands(&self) -> Vec<u16> {
        self.log
            .iter()
            .filter_map(Transaction::control_command)
            .collect()
    }

    fn flags(&self) -> Flags {
        let mut flags = Flags::empty();
        if self.config.battery_detected {
            flags |= Flags::BAT_DET;
        }
        if self.cfgupdate {
            flags |= Flags::CFGUPMODE;
        }
        if self.itpor {
            flags |= Flags::ITPOR;
        }
        flags
    }

    fn control_status(&self) -> ControlStatus {
        let mut status = ControlStatus::INITCOMP;
        if self.sealed {
            status |= ControlStatus::SS;
        }
        status
    }

    // Mode changes complete after a number of flag polls
    fn advance_pending(&mut self) {
        if let Some(n) = self.pending_enter {
            if n == 0 {
                self.pending_enter = None;
                self.cfgupdate = true;
                log::debug!("dummy: entered CFGUPDATE");
            } else {
                self.pending_enter = Some(n - 1);
            }
        }

        if let Some(n) = self.pending_exit {
            if n == 0 {
                self.pending_exit = None;
                self.cfgupdate = false;
                self.itpor = false;
                self.block_mode = false;
                log::debug!("dummy: left CFGUPDATE");
            } else {
                self.pending_exit = Some(n - 1);
            }
        }
    }

    fn handle_control(&mut self, sub: u16) {
        if sub != subcommands::UNSEAL_KEY {
            self.unseal_armed = false;
        }

        match sub {
            subcommands::CONTROL_STATUS => self.control_word = self.control_status().bits(),
            subcommands::DEVICE_TYPE => self.control_word = self.config.device_type,
            subcommands::FW_VERSION => self.control_word = self.config.firmware_version,
            subcommands::CHEM_ID => self.control_word = self.config.chem_id,
            subcommands::DM_CODE => {
                // DM code is byte 3 of the first Registers block
                self.control_word = self.block(BlockId::new(0x40, 0))[3] as u16;
            }
            subcommands::UNSEAL_KEY => {
                if self.unseal_armed {
                    self.sealed = false;
                    self.unseal_armed = false;
                    log::debug!("dummy: unsealed");
                } else {
                    self.unseal_armed = true;
                }
            }
            subcommands::SET_CFGUPDATE => {
                if !self.sealed && !self.faults.never_enter_cfgupdate && !self.cfgupdate {
                    self.pending_enter = Some(self.config.enter_latency_polls);
                }
            }
            subcommands::SOFT_RESET => {
                if self.cfgupdate && !self.faults.never_exit_cfgupdate {
                    self.pending_exit = Some(self.config.exit_latency_polls);
                }
            }
            subcommands::SEALED => {
                self.sealed = true;
                log::debug!("dummy: sealed");
            }
            subcommands::RESET => self.power_on_reset(),
            _ => {}
        }
    }

    fn select(&mut self, block: BlockId) {
        self.selected = block;
        self.window = self.block(block);
        self.window_checksum = checksum(&self.window);
    }

    fn commit_checksum(&mut self, value: u8) {
        self.window_checksum = value;

        if !self.cfgupdate || !self.block_mode {
            log::debug!("dummy: checksum write outside CFGUPDATE ignored");
            return;
        }
        if value != checksum(&self.window) {
            log::debug!("dummy: checksum 0x{:02X} rejected for {}", value, self.selected);
            return;
        }

        self.flash.insert(self.selected, self.window);
        log::debug!("dummy: committed {}", self.selected);
    }

    fn peek(&self, reg: u8) -> u8 {
        match reg {
            commands::CONTROL => self.control_word as u8,
            commands::CONTROL_HIGH => (self.control_word >> 8) as u8,
            commands::FLAGS => self.flags().bits(),
            commands::DATA_CLASS => self.selected.class,
            commands::DATA_BLOCK => self.selected.index,
            r if (commands::BLOCK_DATA..commands::BLOCK_DATA_CHECKSUM).contains(&r) => {
                self.window[(r - commands::BLOCK_DATA) as usize]
            }
            commands::BLOCK_DATA_CHECKSUM => {
                if self.faults.corrupt_checksum == Some(self.selected) {
                    self.window_checksum.wrapping_add(1)
                } else {
                    self.window_checksum
                }
            }
            commands::BLOCK_DATA_CONTROL => !self.block_mode as u8,
            _ => 0,
        }
    }

    fn poke(&mut self, reg: u8, value: u8) {
        match reg {
            r if (commands::BLOCK_DATA..commands::BLOCK_DATA_CHECKSUM).contains(&r) => {
                self.window[(r - commands::BLOCK_DATA) as usize] = value;
            }
            commands::BLOCK_DATA_CHECKSUM => self.commit_checksum(value),
            commands::BLOCK_DATA_CONTROL => self.block_mode = value == 0,
            _ => {}
        }
    }
}

#[cfg(feature = "alloc")]
impl RegisterTransport for DummyGauge {
    fn read(
        &mut self,
        reg: RegisterAddress,
        width: RegisterWidth,
    ) -> Result<u16, TransportError> {
        let reg = reg.get();
        self.log.push(Transaction::Read { reg, width });

        if self.faults.nack_reads {
            return Err(TransportError::NoAcknowledge);
        }

        if reg == commands::FLAGS {
            self.advance_pending();
        }

        let lo = self.peek(reg) as u16;
        match width {
            RegisterWidth::Byte => Ok(lo),
            RegisterWidth::Word => Ok(lo | (self.peek(reg.wrapping_add(1)) as u16) << 8),
        }
    }

    fn write(&mut self, reg: RegisterAddress, data: &[u8]) -> Result<usize, TransportError> {
        let start = reg.get();
        self.log.push(Transaction::Write {
            reg: start,
            data: data.to_vec(),
        });

        if let (commands::DATA_CLASS, [class, index, ..]) = (start, data) {
            if self.faults.nack_select == Some(BlockId::new(*class, *index)) {
                return Err(TransportError::NoAcknowledge);
            }
        }

        let reported = (data.len() + 1).saturating_sub(self.faults.short_write_by);
        if self.faults.short_write_by > 0 {
            // A truncated transfer changes nothing on the chip
            return Ok(reported);
        }

        match (start, data) {
            (commands::CONTROL, [lo, hi]) => self.handle_control(u16::from_le_bytes([*lo, *hi])),
            (commands::DATA_CLASS, [class, index, ..]) => {
                self.select(BlockId::new(*class, *index))
            }
            (commands::DATA_CLASS, [class]) => self.select(BlockId::new(*class, 0)),
            (commands::DATA_BLOCK, [index, ..]) => {
                self.select(BlockId::new(self.selected.class, *index))
            }
            _ => {
                for (i, &byte) in data.iter().enumerate() {
                    match start.checked_add(i as u8) {
                        Some(r) if r <= fgconf_core::registers::MAX_REGISTER => self.poke(r, byte),
                        _ => break,
                    }
                }
            }
        }

        Ok(reported)
    }
}

/// Virtual clock for the emulator
///
/// Time only moves when something sleeps on it, so mode timeouts can be
/// exercised instantly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyClock {
    now_us: u64,
}

impl DummyClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for DummyClock {
    fn now_us(&self) -> u64 {
        self.now_us
    }

    fn delay_us(&mut self, us: u32) {
        self.now_us += us as u64;
    }
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;
    use fgconf_core::Gauge;

    #[test]
    fn test_identity() {
        let mut gauge = Gauge::new(DummyGauge::new_default(), DummyClock::new());
        assert_eq!(gauge.device_type().unwrap(), 0x0421);
        assert_eq!(gauge.firmware_version().unwrap(), 0x0109);
        assert_eq!(gauge.chem_id().unwrap(), 0x0128);
        assert!(gauge.is_sealed().unwrap());
    }

    #[test]
    fn test_unseal_needs_two_consecutive_keys() {
        let mut dummy = DummyGauge::new_default();
        let key = subcommands::UNSEAL_KEY.to_le_bytes();
        let control = RegisterAddress::new(commands::CONTROL).unwrap();

        dummy.write(control, &key).unwrap();
        dummy
            .write(control, &subcommands::CONTROL_STATUS.to_le_bytes())
            .unwrap();
        dummy.write(control, &key).unwrap();
        assert!(dummy.is_sealed());

        dummy.write(control, &key).unwrap();
        assert!(!dummy.is_sealed());
    }

    #[test]
    fn test_bad_checksum_is_not_committed() {
        let mut gauge = Gauge::new(DummyGauge::new_default(), DummyClock::new());
        gauge.enter_config_mode().unwrap();

        let block = BlockId::new(0x51, 0);
        gauge.select_block(block).unwrap();
        gauge.write_reg_array(commands::BLOCK_DATA, &[1u8; 32]).unwrap();
        gauge.write_reg_byte(commands::BLOCK_DATA_CHECKSUM, 0x00).unwrap();

        assert_eq!(gauge.transport().block(block), [0u8; 32]);
        gauge.select_block(block).unwrap();
        assert_eq!(gauge.read_block_checksum().unwrap(), 0xFF);
    }

    #[test]
    fn test_writes_outside_cfgupdate_are_dropped() {
        let mut gauge = Gauge::new(DummyGauge::new_default(), DummyClock::new());
        let block = BlockId::new(0x51, 0);
        let mut payload = [0u8; 32];
        payload[0] = 0x10;

        gauge.select_block(block).unwrap();
        gauge.write_reg_array(commands::BLOCK_DATA, &payload).unwrap();
        gauge
            .write_reg_byte(commands::BLOCK_DATA_CHECKSUM, checksum(&payload))
            .unwrap();

        assert_eq!(gauge.transport().block(block), [0u8; 32]);
    }

    #[test]
    fn test_flags_follow_config() {
        let config = DummyConfig {
            itpor: false,
            battery_detected: false,
            ..Default::default()
        };
        let mut gauge = Gauge::new(DummyGauge::new(config), DummyClock::new());
        assert!(gauge.read_flags().unwrap().is_empty());

        let mut gauge = Gauge::new(DummyGauge::new_default(), DummyClock::new());
        assert!(gauge.read_flags().unwrap().contains(Flags::BAT_DET | Flags::ITPOR));
    }

    #[test]
    fn test_nack_select_only_hits_its_block() {
        let mut gauge = Gauge::new(DummyGauge::new_default(), DummyClock::new());
        gauge.transport_mut().faults_mut().nack_select = Some(BlockId::new(0x52, 0));

        assert_eq!(
            gauge.select_block(BlockId::new(0x52, 0)),
            Err(fgconf_core::Error::Transport(TransportError::NoAcknowledge))
        );
        gauge.select_block(BlockId::new(0x51, 0)).unwrap();
    }

    #[test]
    fn test_clock_only_moves_on_delay() {
        let mut clock = DummyClock::new();
        assert_eq!(clock.now_us(), 0);
        clock.delay_ms(2);
        assert_eq!(clock.now_us(), 2_000);
    }
}

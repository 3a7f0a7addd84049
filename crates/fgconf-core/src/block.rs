//! Extended data-flash block protocol
//!
//! Data flash is organised in 32-byte blocks addressed by a
//! (subclass, block index) pair. Selecting a block maps it into the window
//! at `0x40..=0x5F`; the byte at `0x60` holds the block checksum. A write is
//! only committed by the gauge once the host writes a checksum that matches
//! the new window contents, so every write here is verified by re-selecting
//! the block and reading the checksum back.
//!
//! The checksum is `255 - (sum of the 32 bytes mod 256)`.

use core::fmt;

use crate::bus::{Clock, Gauge, RegisterTransport};
use crate::error::{Error, Result};
use crate::registers::commands;

/// Size of one data-flash block
pub const BLOCK_SIZE: usize = 32;

/// Default settle time after committing a block, in milliseconds
pub const DEFAULT_SETTLE_MS: u16 = 10;

/// Wait after selecting a block before touching the window, in microseconds
const SELECT_SETTLE_US: u32 = 1_000;

/// Wait after a single-byte commit while the gauge persists it, in microseconds
const PERSIST_SETTLE_US: u32 = 10_000;

/// Data-flash block address: subclass id and block index within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    /// Subclass id
    pub class: u8,
    /// 32-byte block index within the subclass
    pub index: u8,
}

impl BlockId {
    /// Create a block id
    pub const fn new(class: u8, index: u8) -> Self {
        Self { class, index }
    }

    /// The two bytes written to DATA_CLASS to select this block
    pub const fn select_bytes(self) -> [u8; 2] {
        [self.class, self.index]
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}-{:02X}", self.class, self.index)
    }
}

/// Checksum of a block payload as the gauge computes it
pub const fn checksum(payload: &[u8]) -> u8 {
    let mut sum: u8 = 0;
    let mut i = 0;
    while i < payload.len() {
        sum = sum.wrapping_add(payload[i]);
        i += 1;
    }
    255 - sum
}

/// Checksum after replacing one byte, derived from the old checksum
///
/// `temp = 255 - old_checksum - old_byte`, `new = 255 - (temp + new_byte)`,
/// all modulo 256. This is what the gauge expects and avoids reading the
/// whole block back.
pub const fn updated_checksum(old_checksum: u8, old_byte: u8, new_byte: u8) -> u8 {
    let temp = 255u8.wrapping_sub(old_checksum).wrapping_sub(old_byte);
    255u8.wrapping_sub(temp.wrapping_add(new_byte))
}

/// One precomputed block write from a golden configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedCommand {
    /// Target block
    pub block: BlockId,
    /// Full block contents
    pub payload: [u8; BLOCK_SIZE],
    /// Checksum written after the payload and expected on read-back
    pub checksum: u8,
    /// Time the gauge needs after the checksum write, in milliseconds
    pub settle_ms: u16,
}

impl ExtendedCommand {
    /// Create a command with an explicit checksum
    pub const fn new(block: BlockId, payload: [u8; BLOCK_SIZE], checksum: u8, settle_ms: u16) -> Self {
        Self {
            block,
            payload,
            checksum,
            settle_ms,
        }
    }

    /// Create a command whose checksum is computed from the payload
    pub const fn from_payload(block: BlockId, payload: [u8; BLOCK_SIZE], settle_ms: u16) -> Self {
        Self::new(block, payload, checksum(&payload), settle_ms)
    }

    /// Whether the stored checksum matches the payload
    pub const fn checksum_valid(&self) -> bool {
        checksum(&self.payload) == self.checksum
    }
}

/// Snapshot of one block as read from the gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlock {
    /// Block the data came from
    pub block: BlockId,
    /// Window contents
    pub data: [u8; BLOCK_SIZE],
    /// Checksum register at the time of the read
    pub checksum: u8,
}

impl DataBlock {
    /// Whether the checksum register agrees with the data
    pub fn verify(&self) -> bool {
        checksum(&self.data) == self.checksum
    }
}

fn check_offset(offset: u8) -> Result<()> {
    if offset as usize >= BLOCK_SIZE {
        return Err(Error::InvalidAddress);
    }
    Ok(())
}

impl<T: RegisterTransport, C: Clock> Gauge<T, C> {
    /// Map a block into the data window
    pub fn select_block(&mut self, block: BlockId) -> Result<()> {
        self.write_reg_array(commands::DATA_CLASS, &block.select_bytes())
    }

    /// Read the checksum register of the selected block
    pub fn read_block_checksum(&mut self) -> Result<u8> {
        self.read_reg_byte(commands::BLOCK_DATA_CHECKSUM)
    }

    /// Read one byte of a data-flash block
    ///
    /// Offsets of 32 or more are rejected before any bus transaction.
    pub fn read_byte(&mut self, block: BlockId, offset: u8) -> Result<u8> {
        check_offset(offset)?;

        self.select_block(block)?;
        self.delay_us(SELECT_SETTLE_US);

        self.read_reg_byte(commands::BLOCK_DATA + offset)
    }

    /// Read a whole block and its checksum register
    pub fn read_block(&mut self, block: BlockId) -> Result<DataBlock> {
        self.select_block(block)?;
        self.delay_us(SELECT_SETTLE_US);

        let checksum = self.read_block_checksum()?;
        let mut data = [0u8; BLOCK_SIZE];
        for (offset, byte) in data.iter_mut().enumerate() {
            *byte = self.read_reg_byte(commands::BLOCK_DATA + offset as u8)?;
        }

        Ok(DataBlock {
            block,
            data,
            checksum,
        })
    }

    /// Change one byte of a data-flash block, keeping its checksum valid
    ///
    /// The gauge must be in CFGUPDATE mode. The new checksum is derived from
    /// the old checksum and old byte rather than by re-reading the block.
    /// A read-back mismatch is reported, never retried: the byte may already
    /// have been persisted.
    pub fn write_byte(&mut self, block: BlockId, offset: u8, value: u8) -> Result<()> {
        check_offset(offset)?;

        self.select_block(block)?;
        self.delay_us(SELECT_SETTLE_US);

        let old_checksum = self.read_block_checksum()?;
        let old_value = self.read_reg_byte(commands::BLOCK_DATA + offset)?;
        let new_checksum = updated_checksum(old_checksum, old_value, value);

        self.write_reg_byte(commands::BLOCK_DATA + offset, value)?;
        self.write_reg_byte(commands::BLOCK_DATA_CHECKSUM, new_checksum)?;
        self.delay_us(PERSIST_SETTLE_US);

        self.select_block(block)?;
        self.delay_us(SELECT_SETTLE_US);

        let found = self.read_block_checksum()?;
        if found != new_checksum {
            log::warn!(
                "Failed to write to {}, checksum {:02X} read back {:02X}",
                block,
                new_checksum,
                found
            );
            return Err(Error::ChecksumMismatch {
                block,
                expected: new_checksum,
                found,
            });
        }

        log::info!("Wrote {}[{}] = 0x{:02X}", block, offset, value);
        Ok(())
    }

    /// Write a whole precomputed block and verify it
    pub fn write_command(&mut self, cmd: &ExtendedCommand) -> Result<()> {
        let block = cmd.block;

        self.select_block(block)
            .inspect_err(|e| log::warn!("Failed to select {}: {}", block, e))?;
        self.write_reg_array(commands::BLOCK_DATA, &cmd.payload)
            .inspect_err(|e| log::warn!("Failed to write payload to {}: {}", block, e))?;
        self.write_reg_byte(commands::BLOCK_DATA_CHECKSUM, cmd.checksum)
            .inspect_err(|e| log::warn!("Failed to write checksum to {}: {}", block, e))?;

        self.delay_ms(cmd.settle_ms as u32);

        // The window has to be re-selected before the checksum reflects
        // what the gauge committed.
        self.select_block(block)
            .inspect_err(|e| log::warn!("Failed to re-select {}: {}", block, e))?;
        let found = self
            .read_block_checksum()
            .inspect_err(|e| log::warn!("Failed to read checksum for {}: {}", block, e))?;

        if found != cmd.checksum {
            log::warn!(
                "Failed to write to {}, checksum {:02X} read back {:02X}",
                block,
                cmd.checksum,
                found
            );
            return Err(Error::ChecksumMismatch {
                block,
                expected: cmd.checksum,
                found,
            });
        }

        log::info!("Wrote block {}", block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::{ManualClock, MockBus, Op};

    #[test]
    fn test_checksum_of_zero_block() {
        assert_eq!(checksum(&[0u8; BLOCK_SIZE]), 0xFF);
        assert_eq!(checksum(&[0x80, 0x00, 0x80]), 0xFF);
        assert_eq!(checksum(&[0x02, 0x26, 0x00, 0x00, 0x32]), 0xA5);
    }

    #[test]
    fn test_updated_checksum_matches_full_sum() {
        let mut block = [0u8; BLOCK_SIZE];
        for (i, b) in block.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37).wrapping_add(11);
        }

        for offset in [0usize, 7, 31] {
            for old in 0..=255u8 {
                block[offset] = old;
                let old_checksum = checksum(&block);

                for new in 0..=255u8 {
                    let mut modified = block;
                    modified[offset] = new;
                    assert_eq!(
                        updated_checksum(old_checksum, old, new),
                        checksum(&modified),
                        "offset {} old {:02X} new {:02X}",
                        offset,
                        old,
                        new
                    );
                }
            }
        }
    }

    #[test]
    fn test_from_payload_computes_checksum() {
        let mut payload = [0u8; BLOCK_SIZE];
        payload[0] = 0x80;
        payload[2] = 0x80;
        let cmd = ExtendedCommand::from_payload(BlockId::new(0x70, 0), payload, DEFAULT_SETTLE_MS);
        assert_eq!(cmd.checksum, 0xFF);
        assert!(cmd.checksum_valid());

        let bad = ExtendedCommand::new(BlockId::new(0x70, 0), payload, 0x00, DEFAULT_SETTLE_MS);
        assert!(!bad.checksum_valid());
    }

    #[test]
    fn test_offset_out_of_range_never_reaches_bus() {
        let mut gauge = Gauge::new(MockBus::new(), ManualClock::new());
        let block = BlockId::new(0x40, 0);

        assert_eq!(gauge.read_byte(block, 32), Err(Error::InvalidAddress));
        assert_eq!(gauge.write_byte(block, 32, 0), Err(Error::InvalidAddress));
        assert_eq!(gauge.transport().count, 0);
    }

    #[test]
    fn test_read_byte_selects_then_reads_window() {
        let mut bus = MockBus::new();
        bus.regs[0x43] = 0x05;
        let mut gauge = Gauge::new(bus, ManualClock::new());

        assert_eq!(gauge.read_byte(BlockId::new(0x40, 0), 3).unwrap(), 0x05);

        let bus = gauge.transport();
        assert_eq!(bus.ops[0], Some(Op::Write(commands::DATA_CLASS, 2)));
        assert_eq!(bus.ops[1], Some(Op::Read(0x43)));
        assert_eq!(bus.regs[0x3E], 0x40);
        assert_eq!(bus.regs[0x3F], 0x00);
    }

    #[test]
    fn test_write_command_sequence() {
        let mut payload = [0u8; BLOCK_SIZE];
        payload[1] = 0x10;
        let cmd = ExtendedCommand::from_payload(BlockId::new(0x51, 0), payload, 10);
        let mut gauge = Gauge::new(MockBus::new(), ManualClock::new());

        // The flat mock keeps the written checksum, so read-back matches
        gauge.write_command(&cmd).unwrap();

        let bus = gauge.transport();
        assert_eq!(bus.count, 5);
        assert_eq!(bus.ops[0], Some(Op::Write(commands::DATA_CLASS, 2)));
        assert_eq!(bus.ops[1], Some(Op::Write(commands::BLOCK_DATA, 32)));
        assert_eq!(bus.ops[2], Some(Op::Write(commands::BLOCK_DATA_CHECKSUM, 1)));
        assert_eq!(bus.ops[3], Some(Op::Write(commands::DATA_CLASS, 2)));
        assert_eq!(bus.ops[4], Some(Op::Read(commands::BLOCK_DATA_CHECKSUM)));
        assert!(gauge.clock().now_us() >= 10_000);
    }

    #[test]
    fn test_write_command_short_write_is_not_checksum_error() {
        let mut bus = MockBus::new();
        bus.short_by = 2;
        let cmd = ExtendedCommand::from_payload(BlockId::new(0x51, 0), [0u8; BLOCK_SIZE], 10);
        let mut gauge = Gauge::new(bus, ManualClock::new());

        assert_eq!(
            gauge.write_command(&cmd),
            Err(Error::ShortWrite {
                expected: 3,
                actual: 1
            })
        );
        assert_eq!(gauge.transport().count, 1);
    }

    #[test]
    fn test_data_block_verify() {
        let mut data = [0u8; BLOCK_SIZE];
        data[10] = 0x0B;
        data[11] = 0xB8;
        let mut block = DataBlock {
            block: BlockId::new(0x52, 0),
            data,
            checksum: checksum(&data),
        };
        assert!(block.verify());

        block.checksum = block.checksum.wrapping_add(1);
        assert!(!block.verify());
    }
}

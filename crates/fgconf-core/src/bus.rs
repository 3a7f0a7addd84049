//! Register transport abstraction and bus primitives
//!
//! The gauge sits on a slow byte-oriented bus. Everything above this module
//! talks to it through the five primitives on [`Gauge`]: byte/word reads and
//! byte/word/array writes at a validated [`RegisterAddress`]. Each write is
//! followed by a fixed settle delay and its reported transfer length is
//! checked.
//!
//! Time is injected through the [`Clock`] trait so the bounded polling loops
//! in [`crate::mode`] can be driven by a virtual clock in tests.

use core::fmt;

use crate::error::{Error, Result, TransportError};
use crate::mode::ConfigMode;
use crate::registers::MAX_REGISTER;

/// Settle delay after every bus write, in microseconds
pub const BUS_SETTLE_US: u32 = 100;

/// A register address in the gauge's decoded range `0x00..=0x7F`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegisterAddress(u8);

impl RegisterAddress {
    /// Validate a raw register address
    pub const fn new(reg: u8) -> Result<Self> {
        if reg > MAX_REGISTER {
            return Err(Error::InvalidAddress);
        }
        Ok(Self(reg))
    }

    /// The raw address
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for RegisterAddress {
    type Error = Error;

    fn try_from(reg: u8) -> Result<Self> {
        Self::new(reg)
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Width of a register read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterWidth {
    /// One byte
    Byte,
    /// Two bytes, little-endian
    Word,
}

/// Register transport (external collaborator)
///
/// One call is one bus transaction. Implementations are expected to perform
/// their own locking if the bus is shared with other devices; the gauge
/// protocol itself is serialised by [`crate::device::DeviceHandle`].
pub trait RegisterTransport {
    /// Read one byte or one little-endian word starting at `reg`
    fn read(
        &mut self,
        reg: RegisterAddress,
        width: RegisterWidth,
    ) -> core::result::Result<u16, TransportError>;

    /// Write `data` starting at `reg`
    ///
    /// Returns the number of bytes moved on the wire including the register
    /// address byte, so a complete write reports `data.len() + 1`.
    fn write(
        &mut self,
        reg: RegisterAddress,
        data: &[u8],
    ) -> core::result::Result<usize, TransportError>;
}

// Blanket impl for boxed transports to allow trait objects
#[cfg(feature = "alloc")]
impl RegisterTransport for alloc::boxed::Box<dyn RegisterTransport + Send> {
    fn read(
        &mut self,
        reg: RegisterAddress,
        width: RegisterWidth,
    ) -> core::result::Result<u16, TransportError> {
        (**self).read(reg, width)
    }

    fn write(
        &mut self,
        reg: RegisterAddress,
        data: &[u8],
    ) -> core::result::Result<usize, TransportError> {
        (**self).write(reg, data)
    }
}

/// Monotonic time source and sleep
pub trait Clock {
    /// Microseconds since an arbitrary fixed point
    fn now_us(&self) -> u64;

    /// Block for at least `us` microseconds
    fn delay_us(&mut self, us: u32);

    /// Block for at least `ms` milliseconds
    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

/// Wall-clock [`Clock`] backed by `std::time`
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Create a clock whose zero is now
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

/// Protocol engine for one gauge
///
/// Owns the transport and clock and remembers which configuration mode it
/// last drove the chip into. The control, mode, block, apply and gate
/// modules each add their operations to this type.
pub struct Gauge<T, C> {
    pub(crate) transport: T,
    pub(crate) clock: C,
    pub(crate) mode: ConfigMode,
}

impl<T: RegisterTransport, C: Clock> Gauge<T, C> {
    /// Create an engine; the chip is assumed to be in normal mode
    pub fn new(transport: T, clock: C) -> Self {
        Self {
            transport,
            clock,
            mode: ConfigMode::Normal,
        }
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Borrow the clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Release the transport and clock
    pub fn into_parts(self) -> (T, C) {
        (self.transport, self.clock)
    }

    /// Read one register byte
    pub fn read_reg_byte(&mut self, reg: u8) -> Result<u8> {
        let addr = RegisterAddress::new(reg)?;
        let value = self.read_raw(addr, RegisterWidth::Byte)?;
        Ok(value as u8)
    }

    /// Read one little-endian register word
    pub fn read_reg_word(&mut self, reg: u8) -> Result<u16> {
        let addr = RegisterAddress::new(reg)?;
        self.read_raw(addr, RegisterWidth::Word)
    }

    /// Write one register byte
    pub fn write_reg_byte(&mut self, reg: u8, value: u8) -> Result<()> {
        self.write_reg_array(reg, &[value])
    }

    /// Write one little-endian register word
    pub fn write_reg_word(&mut self, reg: u8, value: u16) -> Result<()> {
        self.write_reg_array(reg, &value.to_le_bytes())
    }

    /// Write a byte array starting at `reg`
    ///
    /// Fails with [`Error::ShortWrite`] unless the transport reports exactly
    /// `data.len() + 1` bytes transferred.
    pub fn write_reg_array(&mut self, reg: u8, data: &[u8]) -> Result<()> {
        let addr = RegisterAddress::new(reg)?;
        let written = self.transport.write(addr, data).map_err(|e| {
            log::warn!("Write of {} byte(s) to {} failed: {}", data.len(), addr, e);
            Error::Transport(e)
        })?;
        self.clock.delay_us(BUS_SETTLE_US);

        let expected = data.len() + 1;
        if written != expected {
            log::warn!(
                "Short write to {}: {} of {} bytes transferred",
                addr,
                written,
                expected
            );
            return Err(Error::ShortWrite {
                expected,
                actual: written,
            });
        }
        Ok(())
    }

    /// Wait for `us` microseconds on the injected clock
    pub fn delay_us(&mut self, us: u32) {
        self.clock.delay_us(us);
    }

    /// Wait for `ms` milliseconds on the injected clock
    pub fn delay_ms(&mut self, ms: u32) {
        self.clock.delay_ms(ms);
    }

    fn read_raw(&mut self, addr: RegisterAddress, width: RegisterWidth) -> Result<u16> {
        self.transport.read(addr, width).map_err(|e| {
            log::warn!("Read of {} failed: {}", addr, e);
            Error::Transport(e)
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-crate mock transport and manual clock for unit tests

    use super::*;
    use core::cell::Cell;

    /// One recorded bus transaction
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Op {
        Read(u8),
        Write(u8, usize),
    }

    /// Flat 128-byte register file that records every transaction
    pub struct MockBus {
        pub regs: [u8; 128],
        pub ops: [Option<Op>; 64],
        pub count: usize,
        /// Subtracted from the reported write length
        pub short_by: usize,
        pub fail_reads: bool,
        /// Fail reads from this transaction number on
        pub fail_reads_from: Option<usize>,
    }

    impl MockBus {
        pub fn new() -> Self {
            Self {
                regs: [0; 128],
                ops: [None; 64],
                count: 0,
                short_by: 0,
                fail_reads: false,
                fail_reads_from: None,
            }
        }

        fn record(&mut self, op: Op) {
            if self.count < self.ops.len() {
                self.ops[self.count] = Some(op);
            }
            self.count += 1;
        }
    }

    impl RegisterTransport for MockBus {
        fn read(
            &mut self,
            reg: RegisterAddress,
            width: RegisterWidth,
        ) -> core::result::Result<u16, TransportError> {
            self.record(Op::Read(reg.get()));
            let late = self.fail_reads_from.is_some_and(|n| self.count >= n);
            if self.fail_reads || late {
                return Err(TransportError::NoAcknowledge);
            }
            let lo = self.regs[reg.get() as usize] as u16;
            match width {
                RegisterWidth::Byte => Ok(lo),
                RegisterWidth::Word => {
                    let hi = self.regs[(reg.get() as usize + 1) & 0x7F] as u16;
                    Ok(lo | (hi << 8))
                }
            }
        }

        fn write(
            &mut self,
            reg: RegisterAddress,
            data: &[u8],
        ) -> core::result::Result<usize, TransportError> {
            self.record(Op::Write(reg.get(), data.len()));
            for (i, b) in data.iter().enumerate() {
                self.regs[(reg.get() as usize + i) & 0x7F] = *b;
            }
            Ok((data.len() + 1).saturating_sub(self.short_by))
        }
    }

    /// Clock that only advances when somebody sleeps on it
    pub struct ManualClock {
        pub now: Cell<u64>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self { now: Cell::new(0) }
        }
    }

    impl Clock for ManualClock {
        fn now_us(&self) -> u64 {
            self.now.get()
        }

        fn delay_us(&mut self, us: u32) {
            self.now.set(self.now.get() + us as u64);
        }
    }
}

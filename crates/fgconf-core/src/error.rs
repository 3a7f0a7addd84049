//! Error types for fgconf-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

use crate::block::BlockId;

/// Failure reported by a register transport
///
/// Back ends map their own error types onto this set so that the core can
/// carry the failure to the caller unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The chip did not acknowledge its address or a data byte
    NoAcknowledge,
    /// Another bus master won arbitration
    ArbitrationLoss,
    /// Generic bus error (glitch, timeout on the wire)
    Bus,
    /// Operating system error number from the host adapter
    Os(i32),
    /// Any other back-end specific failure
    Other,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    /// Register address above 0x7F, or a block offset of 32 or more
    InvalidAddress,
    /// An argument other than an address was rejected
    InvalidArgument,

    // Bus errors
    /// The register transport failed
    Transport(TransportError),
    /// A bus write moved fewer bytes than requested
    ShortWrite {
        /// Bytes that should have been transferred (data plus address byte)
        expected: usize,
        /// Bytes the transport reported
        actual: usize,
    },

    // Protocol errors
    /// A mode transition did not complete within its deadline
    Timeout,
    /// The checksum read back after a block write does not match
    ChecksumMismatch {
        /// Block that was written
        block: BlockId,
        /// Checksum the host wrote
        expected: u8,
        /// Checksum the chip reported after re-selecting the block
        found: u8,
    },

    // Chip errors
    /// Device type or firmware version is not the supported revision
    HardwareMismatch {
        /// Device type reported by the chip
        device_type: u16,
        /// Firmware version reported by the chip
        firmware_version: u16,
    },
}

impl Error {
    /// Returns true for errors that make further configuration pointless
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::HardwareMismatch { .. })
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAcknowledge => write!(f, "no acknowledge from device"),
            Self::ArbitrationLoss => write!(f, "bus arbitration lost"),
            Self::Bus => write!(f, "bus error"),
            Self::Os(errno) => write!(f, "host adapter error (errno {})", errno),
            Self::Other => write!(f, "transport error"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress => write!(f, "invalid register address or block offset"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::Transport(e) => write!(f, "transport failure: {}", e),
            Self::ShortWrite { expected, actual } => write!(
                f,
                "short write: expected {} bytes, transferred {}",
                expected, actual
            ),
            Self::Timeout => write!(f, "timed out waiting for mode transition"),
            Self::ChecksumMismatch {
                block,
                expected,
                found,
            } => write!(
                f,
                "checksum mismatch on block {}: wrote 0x{:02X}, read back 0x{:02X}",
                block, expected, found
            ),
            Self::HardwareMismatch {
                device_type,
                firmware_version,
            } => write!(
                f,
                "unsupported chip: device type 0x{:04X}, firmware 0x{:04X}",
                device_type, firmware_version
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

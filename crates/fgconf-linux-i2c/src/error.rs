//! Error types for Linux I2C operations

use thiserror::Error;

/// Linux I2C specific errors
#[derive(Debug, Error)]
pub enum LinuxI2cError {
    /// Failed to open device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to bind the slave address
    #[error("Failed to set slave address 0x{address:02X}: {source}")]
    SetAddressFailed {
        address: u16,
        #[source]
        source: std::io::Error,
    },

    /// Register read failed
    #[error("Read of register 0x{reg:02X} failed: {source}")]
    ReadFailed {
        reg: u8,
        #[source]
        source: std::io::Error,
    },

    /// Register write failed
    #[error("Write to register 0x{reg:02X} failed: {source}")]
    WriteFailed {
        reg: u8,
        #[source]
        source: std::io::Error,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Device not specified
    #[error("No device specified. Use dev=/dev/i2c-N")]
    NoDevice,
}

impl LinuxI2cError {
    /// Underlying OS error, if any
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            LinuxI2cError::OpenFailed { source, .. }
            | LinuxI2cError::SetAddressFailed { source, .. }
            | LinuxI2cError::ReadFailed { source, .. }
            | LinuxI2cError::WriteFailed { source, .. } => Some(source),
            LinuxI2cError::InvalidParameter(_) | LinuxI2cError::NoDevice => None,
        }
    }
}

/// Result type for Linux I2C operations
pub type Result<T> = std::result::Result<T, LinuxI2cError>;

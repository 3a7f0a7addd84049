//! Linux I2C device implementation
//!
//! This module provides the `LinuxI2c` struct that implements the
//! `RegisterTransport` trait using Linux's i2c-dev interface.

use crate::error::{LinuxI2cError, Result};

use fgconf_core::bus::{RegisterAddress, RegisterTransport, RegisterWidth};
use fgconf_core::error::TransportError;

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::io::AsRawFd;

/// Default 7-bit address of the BQ27441
pub const DEFAULT_ADDRESS: u16 = 0x55;

/// Linux i2c-dev ioctl constants
mod ioctl {
    use nix::{ioctl_write_int_bad, ioctl_write_ptr_bad};

    /// Bind the file descriptor to a slave address
    const I2C_SLAVE: u16 = 0x0703;
    /// Combined transfer with repeated start
    const I2C_RDWR: u16 = 0x0707;

    /// Message is a read
    pub const I2C_M_RD: u16 = 0x0001;

    /// Mirrors the kernel's struct i2c_msg
    #[repr(C)]
    pub struct I2cMsg {
        pub addr: u16,
        pub flags: u16,
        pub len: u16,
        pub buf: *mut u8,
    }

    /// Mirrors the kernel's struct i2c_rdwr_ioctl_data
    #[repr(C)]
    pub struct I2cRdwrData {
        pub msgs: *mut I2cMsg,
        pub nmsgs: u32,
    }

    ioctl_write_int_bad!(i2c_set_slave, I2C_SLAVE);
    ioctl_write_ptr_bad!(i2c_rdwr, I2C_RDWR, I2cRdwrData);
}

/// Configuration for opening a Linux I2C device
#[derive(Debug, Clone)]
pub struct LinuxI2cConfig {
    /// Device path (e.g., "/dev/i2c-1")
    pub device: String,
    /// 7-bit slave address (default: 0x55)
    pub address: u16,
}

impl Default for LinuxI2cConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            address: DEFAULT_ADDRESS,
        }
    }
}

impl LinuxI2cConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the slave address
    pub fn with_address(mut self, address: u16) -> Self {
        self.address = address;
        self
    }
}

/// Register transport using the i2c-dev interface
pub struct LinuxI2c {
    /// File handle for the i2c-dev device
    file: File,
    /// Slave address the handle is bound to
    address: u16,
}

impl LinuxI2c {
    /// Open a Linux I2C device with the given configuration
    pub fn open(config: &LinuxI2cConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxI2cError::NoDevice);
        }
        if config.address > 0x7F {
            return Err(LinuxI2cError::InvalidParameter(format!(
                "address 0x{:X} is not a 7-bit address",
                config.address
            )));
        }

        log::debug!("linux_i2c: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxI2cError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let address = config.address;
        unsafe {
            ioctl::i2c_set_slave(file.as_raw_fd(), address as libc::c_int).map_err(|e| {
                LinuxI2cError::SetAddressFailed {
                    address,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        log::info!(
            "linux_i2c: Opened {} (address 0x{:02X})",
            config.device,
            address
        );

        Ok(Self { file, address })
    }

    /// Write the register address, then read `buf` after a repeated start
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<()> {
        let mut reg_buf = [reg];
        let mut msgs = [
            ioctl::I2cMsg {
                addr: self.address,
                flags: 0,
                len: 1,
                buf: reg_buf.as_mut_ptr(),
            },
            ioctl::I2cMsg {
                addr: self.address,
                flags: ioctl::I2C_M_RD,
                len: buf.len() as u16,
                buf: buf.as_mut_ptr(),
            },
        ];
        let data = ioctl::I2cRdwrData {
            msgs: msgs.as_mut_ptr(),
            nmsgs: msgs.len() as u32,
        };

        unsafe {
            ioctl::i2c_rdwr(self.file.as_raw_fd(), &data).map_err(|e| {
                LinuxI2cError::ReadFailed {
                    reg,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        log::trace!("linux_i2c: read 0x{:02X} -> {:02X?}", reg, buf);
        Ok(())
    }

    /// Write the register address followed by `data` in one transfer
    ///
    /// Returns the byte count the kernel reports, register byte included.
    fn write_registers(&mut self, reg: u8, data: &[u8]) -> Result<usize> {
        let mut frame = Vec::with_capacity(data.len() + 1);
        frame.push(reg);
        frame.extend_from_slice(data);

        let written = self
            .file
            .write(&frame)
            .map_err(|e| LinuxI2cError::WriteFailed { reg, source: e })?;

        log::trace!("linux_i2c: write 0x{:02X} <- {:02X?} ({})", reg, data, written);
        Ok(written)
    }
}

/// Map an i2c-dev failure onto the transport error set
fn transport_error(e: &LinuxI2cError) -> TransportError {
    match e.io_error().and_then(std::io::Error::raw_os_error) {
        Some(libc::ENXIO) | Some(libc::EREMOTEIO) => TransportError::NoAcknowledge,
        Some(libc::EAGAIN) => TransportError::ArbitrationLoss,
        Some(libc::ETIMEDOUT) | Some(libc::EIO) => TransportError::Bus,
        Some(errno) => TransportError::Os(errno),
        None => TransportError::Other,
    }
}

impl RegisterTransport for LinuxI2c {
    fn read(
        &mut self,
        reg: RegisterAddress,
        width: RegisterWidth,
    ) -> core::result::Result<u16, TransportError> {
        let mut buf = [0u8; 2];
        let len = match width {
            RegisterWidth::Byte => 1,
            RegisterWidth::Word => 2,
        };

        self.read_registers(reg.get(), &mut buf[..len]).map_err(|e| {
            log::warn!("linux_i2c: {}", e);
            transport_error(&e)
        })?;

        Ok(u16::from_le_bytes(buf))
    }

    fn write(
        &mut self,
        reg: RegisterAddress,
        data: &[u8],
    ) -> core::result::Result<usize, TransportError> {
        self.write_registers(reg.get(), data).map_err(|e| {
            log::warn!("linux_i2c: {}", e);
            transport_error(&e)
        })
    }
}

/// Parse transport options from a list of key-value pairs
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxI2cConfig, String> {
    let mut config = LinuxI2cConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "addr" => {
                let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
                    Some(hex) => u16::from_str_radix(hex, 16),
                    None => value.parse(),
                };
                let address = parsed.map_err(|_| format!("Invalid addr value: {}", value))?;
                if address > 0x7F {
                    return Err(format!("Invalid I2C address: 0x{:X} (must be 7-bit)", address));
                }
                config.address = address;
            }
            _ => {
                log::warn!("linux_i2c: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        return Err("No device specified. Use dev=/dev/i2c-N".to_string());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_defaults() {
        let config = parse_options(&[("dev", "/dev/i2c-1")]).unwrap();
        assert_eq!(config.device, "/dev/i2c-1");
        assert_eq!(config.address, DEFAULT_ADDRESS);
    }

    #[test]
    fn test_parse_options_address() {
        let config = parse_options(&[("dev", "/dev/i2c-2"), ("addr", "0x0B")]).unwrap();
        assert_eq!(config.address, 0x0B);

        let config = parse_options(&[("dev", "/dev/i2c-2"), ("addr", "85")]).unwrap();
        assert_eq!(config.address, 0x55);

        assert!(parse_options(&[("dev", "/dev/i2c-2"), ("addr", "0x80")]).is_err());
        assert!(parse_options(&[("dev", "/dev/i2c-2"), ("addr", "zz")]).is_err());
    }

    #[test]
    fn test_parse_options_requires_device() {
        assert!(parse_options(&[("addr", "0x55")]).is_err());
    }

    #[test]
    fn test_errno_mapping() {
        let nack = LinuxI2cError::ReadFailed {
            reg: 0x06,
            source: std::io::Error::from_raw_os_error(libc::EREMOTEIO),
        };
        assert_eq!(transport_error(&nack), TransportError::NoAcknowledge);

        let other = LinuxI2cError::WriteFailed {
            reg: 0x00,
            source: std::io::Error::from_raw_os_error(libc::EBADF),
        };
        assert_eq!(transport_error(&other), TransportError::Os(libc::EBADF));

        assert_eq!(transport_error(&LinuxI2cError::NoDevice), TransportError::Other);
    }
}

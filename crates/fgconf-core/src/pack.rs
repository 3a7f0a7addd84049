//! Battery pack parameters in the State subclass
//!
//! Design capacity, design energy, terminate voltage and taper rate live in
//! data flash as big-endian words. They are read back after a configuration
//! has been written and can be checked against the platform's description
//! of the pack.

use core::fmt;

use crate::block::BlockId;
use crate::bus::{Clock, Gauge, RegisterTransport};
use crate::error::Result;
use crate::registers::commands;

/// State subclass, block 0
pub const STATE_BLOCK: BlockId = BlockId::new(0x52, 0);

/// Block offsets of the big-endian pack words
pub mod offsets {
    /// Design capacity (mAh)
    pub const DESIGN_CAPACITY: u8 = 10;
    /// Design energy (mWh)
    pub const DESIGN_ENERGY: u8 = 12;
    /// Terminate voltage (mV)
    pub const TERMINATE_VOLTAGE: u8 = 16;
    /// Taper rate (0.1 h)
    pub const TAPER_RATE: u8 = 27;
}

const SELECT_SETTLE_US: u32 = 1_000;

/// Pack parameters as stored on the gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackParameters {
    /// Design capacity in mAh
    pub design_capacity_mah: u16,
    /// Design energy in mWh
    pub design_energy_mwh: u16,
    /// Terminate voltage in mV
    pub terminate_voltage_mv: u16,
    /// Taper rate in units of 0.1 h
    pub taper_rate: u16,
}

impl PackParameters {
    /// Read the pack words from the State block
    ///
    /// Selects the block and reads the four words directly out of the data
    /// window; the chip stores them big-endian while the bus delivers words
    /// little-endian.
    pub fn read<T: RegisterTransport, C: Clock>(gauge: &mut Gauge<T, C>) -> Result<Self> {
        gauge.select_block(STATE_BLOCK)?;
        gauge.delay_us(SELECT_SETTLE_US);

        let checksum = gauge.read_block_checksum()?;
        log::debug!("State block checksum 0x{:02X}", checksum);

        let mut word = |offset: u8| -> Result<u16> {
            let raw = gauge.read_reg_word(commands::BLOCK_DATA + offset)?;
            Ok(raw.swap_bytes())
        };

        Ok(Self {
            design_capacity_mah: word(offsets::DESIGN_CAPACITY)?,
            design_energy_mwh: word(offsets::DESIGN_ENERGY)?,
            terminate_voltage_mv: word(offsets::TERMINATE_VOLTAGE)?,
            taper_rate: word(offsets::TAPER_RATE)?,
        })
    }
}

impl fmt::Display for PackParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capacity {} mAh, energy {} mWh, terminate {} mV, taper rate {}",
            self.design_capacity_mah,
            self.design_energy_mwh,
            self.terminate_voltage_mv,
            self.taper_rate
        )
    }
}

#[cfg(feature = "std")]
mod attributes {
    use std::fs;
    use std::path::Path;
    use std::vec::Vec;

    use super::PackParameters;

    /// Error loading a platform attribute file
    #[derive(Debug)]
    pub enum AttributesError {
        /// I/O error reading the file
        Io(std::io::Error),
        /// TOML parsing error
        Parse(toml::de::Error),
    }

    impl From<std::io::Error> for AttributesError {
        fn from(e: std::io::Error) -> Self {
            AttributesError::Io(e)
        }
    }

    impl From<toml::de::Error> for AttributesError {
        fn from(e: toml::de::Error) -> Self {
            AttributesError::Parse(e)
        }
    }

    impl std::fmt::Display for AttributesError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                AttributesError::Io(e) => write!(f, "I/O error: {}", e),
                AttributesError::Parse(e) => write!(f, "Parse error: {}", e),
            }
        }
    }

    impl std::error::Error for AttributesError {}

    #[derive(Debug, serde::Deserialize)]
    struct AttributesFile {
        pack: PackAttributes,
    }

    /// Platform description of the battery pack
    ///
    /// Parsed from the `[pack]` table of a TOML file:
    ///
    /// ```toml
    /// [pack]
    /// design_capacity_mah = 3000
    /// design_energy_mwh = 11100
    /// terminate_voltage_mv = 3200
    /// taper_rate = 300
    /// ```
    ///
    /// Absent fields are not checked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct PackAttributes {
        /// Expected design capacity in mAh
        pub design_capacity_mah: Option<u16>,
        /// Expected design energy in mWh
        pub design_energy_mwh: Option<u16>,
        /// Expected terminate voltage in mV
        pub terminate_voltage_mv: Option<u16>,
        /// Expected taper rate
        pub taper_rate: Option<u16>,
    }

    /// One attribute that disagrees with the gauge
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mismatch {
        /// Attribute name as spelled in the TOML file
        pub field: &'static str,
        /// Value from the platform description
        pub expected: u16,
        /// Value read from the gauge
        pub actual: u16,
    }

    impl std::fmt::Display for Mismatch {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(
                f,
                "{}: platform says {}, gauge has {}",
                self.field, self.expected, self.actual
            )
        }
    }

    impl PackAttributes {
        /// Parse attributes from TOML text
        pub fn from_toml_str(content: &str) -> Result<Self, AttributesError> {
            let file: AttributesFile = toml::from_str(content)?;
            Ok(file.pack)
        }

        /// Load attributes from a TOML file
        pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, AttributesError> {
            let content = fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        }

        /// List every attribute that differs from what the gauge holds
        pub fn compare(&self, actual: &PackParameters) -> Vec<Mismatch> {
            let checks = [
                (
                    "design_capacity_mah",
                    self.design_capacity_mah,
                    actual.design_capacity_mah,
                ),
                (
                    "design_energy_mwh",
                    self.design_energy_mwh,
                    actual.design_energy_mwh,
                ),
                (
                    "terminate_voltage_mv",
                    self.terminate_voltage_mv,
                    actual.terminate_voltage_mv,
                ),
                ("taper_rate", self.taper_rate, actual.taper_rate),
            ];

            checks
                .into_iter()
                .filter_map(|(field, expected, actual)| match expected {
                    Some(expected) if expected != actual => Some(Mismatch {
                        field,
                        expected,
                        actual,
                    }),
                    _ => None,
                })
                .collect()
        }
    }
}

#[cfg(feature = "std")]
pub use attributes::{AttributesError, Mismatch, PackAttributes};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::{ManualClock, MockBus};

    #[test]
    fn test_read_swaps_to_big_endian() {
        let mut bus = MockBus::new();
        // 3000 mAh, 11100 mWh, 3200 mV, taper 300
        bus.regs[0x4A] = 0x0B;
        bus.regs[0x4B] = 0xB8;
        bus.regs[0x4C] = 0x2B;
        bus.regs[0x4D] = 0x5C;
        bus.regs[0x50] = 0x0C;
        bus.regs[0x51] = 0x80;
        bus.regs[0x5B] = 0x01;
        bus.regs[0x5C] = 0x2C;
        let mut gauge = Gauge::new(bus, ManualClock::new());

        let pack = PackParameters::read(&mut gauge).unwrap();
        assert_eq!(
            pack,
            PackParameters {
                design_capacity_mah: 3000,
                design_energy_mwh: 11100,
                terminate_voltage_mv: 3200,
                taper_rate: 300,
            }
        );
        assert_eq!(gauge.transport().regs[0x3E], 0x52);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_attributes_compare() {
        let attrs = PackAttributes::from_toml_str(
            r#"
[pack]
design_capacity_mah = 3000
terminate_voltage_mv = 3400
"#,
        )
        .unwrap();

        let actual = PackParameters {
            design_capacity_mah: 3000,
            design_energy_mwh: 11100,
            terminate_voltage_mv: 3200,
            taper_rate: 300,
        };
        let mismatches = attrs.compare(&actual);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "terminate_voltage_mv");
        assert_eq!(mismatches[0].expected, 3400);
        assert_eq!(mismatches[0].actual, 3200);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_attributes_reject_unknown_field() {
        let err = PackAttributes::from_toml_str("[pack]\ncapacity = 1\n");
        assert!(matches!(err, Err(AttributesError::Parse(_))));
    }
}

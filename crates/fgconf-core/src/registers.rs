//! BQ27441-G1 register map and control sub-commands
//!
//! Standard commands are addressed directly; everything else goes through
//! the control register pair (see [`crate::control`]) or the data-flash
//! block window (see [`crate::block`]).

use bitflags::bitflags;

/// Highest register address the gauge decodes
pub const MAX_REGISTER: u8 = 0x7F;

/// Standard command addresses
pub mod commands {
    /// Control register pair (low byte)
    pub const CONTROL: u8 = 0x00;
    /// Control register pair (high byte)
    pub const CONTROL_HIGH: u8 = 0x01;
    /// Temperature (0.1 K)
    pub const TEMPERATURE: u8 = 0x02;
    /// Cell voltage (mV)
    pub const VOLTAGE: u8 = 0x04;
    /// Flags register
    pub const FLAGS: u8 = 0x06;
    /// Remaining capacity (mAh)
    pub const REMAINING_CAPACITY: u8 = 0x0C;
    /// Full charge capacity (mAh)
    pub const FULL_CHARGE_CAPACITY: u8 = 0x0E;
    /// State of charge (%)
    pub const STATE_OF_CHARGE: u8 = 0x1C;
    /// Data-flash class select; written as `[class, index]`
    pub const DATA_CLASS: u8 = 0x3E;
    /// Data-flash block index select
    pub const DATA_BLOCK: u8 = 0x3F;
    /// First byte of the 32-byte block window
    pub const BLOCK_DATA: u8 = 0x40;
    /// Block checksum
    pub const BLOCK_DATA_CHECKSUM: u8 = 0x60;
    /// Block data control; 0x00 enables block mode
    pub const BLOCK_DATA_CONTROL: u8 = 0x61;
}

/// Control sub-commands written to the control register pair
pub mod subcommands {
    #![allow(missing_docs)]
    pub const CONTROL_STATUS: u16 = 0x0000;
    pub const DEVICE_TYPE: u16 = 0x0001;
    pub const FW_VERSION: u16 = 0x0002;
    pub const DM_CODE: u16 = 0x0004;
    pub const PREV_MACWRITE: u16 = 0x0007;
    pub const CHEM_ID: u16 = 0x0008;
    pub const BAT_INSERT: u16 = 0x000C;
    pub const BAT_REMOVE: u16 = 0x000D;
    pub const SET_HIBERNATE: u16 = 0x0011;
    pub const CLEAR_HIBERNATE: u16 = 0x0012;
    pub const SET_CFGUPDATE: u16 = 0x0013;
    pub const SHUTDOWN_ENABLE: u16 = 0x001B;
    pub const SHUTDOWN: u16 = 0x001C;
    pub const SEALED: u16 = 0x0020;
    pub const PULSE_SOC_INT: u16 = 0x0023;
    pub const RESET: u16 = 0x0041;
    pub const SOFT_RESET: u16 = 0x0042;

    /// Unseal key; must be written twice in immediate succession
    pub const UNSEAL_KEY: u16 = 0x8000;
}

bitflags! {
    /// Flags register, low byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u8 {
        /// Discharging detected
        const DSG       = 1 << 0;
        /// State-of-charge final threshold reached
        const SOCF      = 1 << 1;
        /// State-of-charge initial threshold reached
        const SOC1      = 1 << 2;
        /// Battery insertion detected
        const BAT_DET   = 1 << 3;
        /// Gauge is in CFGUPDATE mode
        const CFGUPMODE = 1 << 4;
        /// Power-on reset occurred; RAM copy of the data flash was reloaded
        const ITPOR     = 1 << 5;
        /// OCV measurement taken in relax mode
        const OCVTAKEN  = 1 << 7;
    }
}

bitflags! {
    /// CONTROL_STATUS word
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlStatus: u16 {
        /// Voltages are OK for Qmax updates
        const VOK        = 1 << 1;
        /// Resistance updates disabled
        const RUP_DIS    = 1 << 2;
        /// Impedance Track load-mode is constant power
        const LDMD       = 1 << 3;
        /// Gauge is in SLEEP mode
        const SLEEP      = 1 << 4;
        /// Hibernate requested
        const HIBERNATE  = 1 << 6;
        /// Gauge initialisation complete
        const INITCOMP   = 1 << 7;
        /// Resistance was updated
        const RES_UP     = 1 << 8;
        /// Qmax was updated
        const QMAX_UP    = 1 << 9;
        /// Board calibration routine active
        const BCA        = 1 << 10;
        /// Coulomb counter calibration active
        const CCA        = 1 << 11;
        /// Calibration mode enabled
        const CALMODE    = 1 << 12;
        /// Sealed
        const SS         = 1 << 13;
        /// Watchdog reset occurred
        const WDRESET    = 1 << 14;
        /// Shutdown enabled
        const SHUTDOWNEN = 1 << 15;
    }
}

bitflags! {
    /// OpConfig high byte, stored at class 0x40 block 0 offset 0
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpConfig: u8 {
        /// GPOUT polarity (active high when set)
        const GPIOPOL  = 1 << 3;
        /// Internal pull-up on the BIN pin
        const BI_PU_EN = 1 << 4;
        /// Battery insertion detected through the BIN pin
        const BIE      = 1 << 5;
    }
}

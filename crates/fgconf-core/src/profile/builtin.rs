//! Built-in golden profiles
//!
//! Tables are `static` data; the applier borrows them and never mutates them.

use crate::apply::ConfigVersion;
use crate::block::{BlockId, ExtendedCommand};
use crate::gate::BQ27441_G1;

use super::GoldenConfig;

/// Zero Gravitas battery pack, configuration version 5
pub const ZEROGRAVITAS: GoldenConfig<'static> = GoldenConfig {
    name: "zerogravitas",
    description: "Zero Gravitas 3000 mAh single-cell pack",
    revision: BQ27441_G1,
    version: ConfigVersion::new(5),
    commands: &ZEROGRAVITAS_COMMANDS,
};

const ZEROGRAVITAS_COMMANDS: [ExtendedCommand; 14] = [
    ExtendedCommand::new(
        BlockId::new(0x02, 0),
        [
            0x02, 0x26, 0x00, 0x00, 0x32, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        0xA5,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x24, 0),
        [
            0x00, 0x19, 0x28, 0x63, 0x5F, 0xFF, 0x62, 0x00,
            0x32, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        0x69,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x30, 0),
        [
            0x0E, 0x74, 0xFD, 0xFF, 0x38, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        0x49,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x31, 0),
        [
            0x0A, 0x0F, 0x02, 0x05, 0x32, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        0xAD,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x40, 0),
        [
            0x25, 0xFC, 0x0F, 0x48, 0x00, 0x14, 0x04, 0x00,
            0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        0x66,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x44, 0),
        [
            0x05, 0x00, 0x32, 0x01, 0xC2, 0x14, 0x14, 0x00,
            0x03, 0x08, 0x98, 0x01, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        0x39,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x50, 0),
        [
            0x02, 0xBC, 0x01, 0x2C, 0x00, 0x1E, 0x00, 0xC8,
            0xC8, 0x14, 0x08, 0x00, 0x3C, 0x0E, 0x10, 0x00,
            0x0A, 0x46, 0x05, 0x14, 0x05, 0x0F, 0x03, 0x20,
            0x00, 0x64, 0x46, 0x50, 0x0A, 0x01, 0x90, 0x00,
        ],
        0xBB,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x50, 1),
        [
            0x64, 0x19, 0xDC, 0x5C, 0x60, 0x00, 0x7D, 0x00,
            0x04, 0x03, 0x19, 0x25, 0x0F, 0x14, 0x0A, 0x78,
            0x60, 0x28, 0x01, 0xF4, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x43, 0x80, 0x04, 0x01, 0x14, 0x00,
        ],
        0x2A,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x50, 2),
        [
            0x0B, 0x0B, 0xB8, 0x01, 0x2C, 0x0A, 0x01, 0x0A,
            0x00, 0x00, 0x00, 0xC8, 0x00, 0x64, 0x02, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        0xC1,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x51, 0),
        [
            0x00, 0xA7, 0x00, 0x64, 0x00, 0xFA, 0x00, 0x3C,
            0x3C, 0x01, 0xB3, 0xB3, 0x01, 0x90, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        0x8A,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x52, 0),
        [
            0x41, 0x8F, 0x00, 0x00, 0x00, 0x81, 0x0E, 0xDB,
            0x0E, 0xA8, 0x0B, 0xB8, 0x2B, 0x5C, 0x05, 0x3C,
            0x0C, 0x80, 0x00, 0xC8, 0x00, 0x32, 0x00, 0x14,
            0x03, 0xE8, 0x01, 0x01, 0x2C, 0x10, 0x04, 0x00,
        ],
        0xBD,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x52, 1),
        [
            0x0A, 0x10, 0x5E, 0xFF, 0xCE, 0xFF, 0xCE, 0x00,
            0x02, 0x02, 0x21, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        0xC8,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x59, 0),
        [
            0x00, 0x8A, 0x00, 0x8A, 0x00, 0x8A, 0x00, 0x98,
            0x00, 0x6B, 0x00, 0x58, 0x00, 0x5D, 0x00, 0x5E,
            0x00, 0x4F, 0x00, 0x46, 0x00, 0x59, 0x00, 0x69,
            0x00, 0xD1, 0x02, 0x26, 0x03, 0x6E, 0x00, 0x00,
        ],
        0x8A,
        10,
    ),
    ExtendedCommand::new(
        BlockId::new(0x70, 0),
        [
            0x80, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        0xFF,
        10,
    ),
];

static BUILTIN: [GoldenConfig<'static>; 1] = [ZEROGRAVITAS];

/// All built-in profiles
pub fn all() -> &'static [GoldenConfig<'static>] {
    &BUILTIN
}

/// Look up a built-in profile by name (case-insensitive)
pub fn find(name: &str) -> Option<&'static GoldenConfig<'static>> {
    BUILTIN.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

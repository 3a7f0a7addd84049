//! Single byte and block access commands
//!
//! Each command opens a configuration window, does its work and closes the
//! window again. A failure inside the window leaves the chip unsealed; the
//! next successful command reseals it.

use fgconf_core::profile::Profile;
use fgconf_core::BlockId;
use fgconf_gauge::GaugeEngine;

/// Open the engine, pass the profile's gate and enter configuration mode
fn open_window(
    transport: &str,
    profile: &Profile,
) -> Result<GaugeEngine, Box<dyn std::error::Error>> {
    let mut engine = fgconf_gauge::open_engine(transport)?;
    engine.check_firmware_version(profile.revision)?;
    engine.enter_config_mode()?;
    Ok(engine)
}

/// Read one data-flash byte
pub fn run_read_byte(
    transport: &str,
    profile: &Profile,
    block: BlockId,
    offset: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_window(transport, profile)?;
    let value = engine.read_byte(block, offset)?;
    engine.exit_config_mode()?;

    println!("{} +{:02}: 0x{:02X} ({})", block, offset, value, value);
    Ok(())
}

/// Write one data-flash byte, checksum verified by the chip
pub fn run_write_byte(
    transport: &str,
    profile: &Profile,
    block: BlockId,
    offset: u8,
    value: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_window(transport, profile)?;
    let old = engine.read_byte(block, offset)?;
    engine.write_byte(block, offset, value)?;
    engine.exit_config_mode()?;

    println!(
        "{} +{:02}: 0x{:02X} -> 0x{:02X}",
        block, offset, old, value
    );
    Ok(())
}

/// Hex dump one data-flash block
pub fn run_dump_block(
    transport: &str,
    profile: &Profile,
    block: BlockId,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_window(transport, profile)?;
    let data = engine.read_block(block)?;
    engine.exit_config_mode()?;

    println!("Block {}:", block);
    for (row, chunk) in data.data.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        println!("  {:02X}: {}", row * 16, hex.join(" "));
    }
    println!(
        "Checksum: 0x{:02X} ({})",
        data.checksum,
        if data.verify() { "ok" } else { "MISMATCH" }
    );

    Ok(())
}

//! Probe and status command implementations

use fgconf_core::profile::Profile;
use fgconf_core::registers::ControlStatus;

/// Check the chip revision against the profile's revision
pub fn run_probe(transport: &str, profile: &Profile) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = fgconf_gauge::open_engine(transport)?;

    match engine.check_firmware_version(profile.revision) {
        Ok(revision) => {
            println!("Found fuel gauge:");
            println!("  Device type: 0x{:04X}", revision.device_type);
            println!("  Firmware:    0x{:04X}", revision.firmware_version);
            println!("  Profile:     {} (supported)", profile.name);
            Ok(())
        }
        Err(e) => {
            eprintln!("Probe failed: {}", e);
            Err(Box::new(e))
        }
    }
}

/// Print the gauge's housekeeping registers
pub fn run_status(transport: &str, profile: &Profile) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = fgconf_gauge::open_engine(transport)?;
    let revision = engine.read_revision()?;

    let status = engine.control_status()?;
    let flags = engine.read_flags()?;
    let version = engine.dm_code()?;
    let chem_id = engine.chem_id()?;

    println!("Fuel Gauge Status");
    println!("=================");
    println!();
    println!("Revision:        {}", revision);
    println!("Chemistry ID:    0x{:04X}", chem_id);
    println!(
        "Sealed:          {}",
        if status.contains(ControlStatus::SS) { "yes" } else { "no" }
    );
    println!("Control status:  {:?}", status);
    println!("Flags:           {:?}", flags);
    println!("Engine mode:     {}", engine.mode());
    println!();
    println!("Config version:  {} (profile {} wants {})", version, profile.name, profile.version);

    if revision != profile.revision {
        println!("Profile status:  not applicable to this revision");
    } else {
        let needed = engine.needs_configuration(profile.version, Default::default())?;
        println!(
            "Profile status:  {}",
            if needed { "needs configuration" } else { "up to date" }
        );
    }

    Ok(())
}

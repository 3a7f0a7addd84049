//! Pack parameter command implementation

use fgconf_core::pack::PackAttributes;
use fgconf_core::profile::Profile;
use fgconf_core::PackParameters;
use std::path::Path;

/// Read pack parameters and optionally compare them with platform attributes
pub fn run_pack(
    transport: &str,
    profile: &Profile,
    attributes: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let expected = attributes
        .map(|path| {
            let attrs = PackAttributes::from_toml_file(path)?;
            log::info!("Loaded platform attributes from {:?}", path);
            Ok::<_, Box<dyn std::error::Error>>(attrs)
        })
        .transpose()?;

    let mut engine = fgconf_gauge::open_engine(transport)?;
    engine.check_firmware_version(profile.revision)?;

    engine.enter_config_mode()?;
    let pack = PackParameters::read(&mut engine)?;
    engine.exit_config_mode()?;

    println!("Pack Parameters");
    println!("===============");
    println!();
    println!("Design capacity:    {} mAh", pack.design_capacity_mah);
    println!("Design energy:      {} mWh", pack.design_energy_mwh);
    println!("Terminate voltage:  {} mV", pack.terminate_voltage_mv);
    println!("Taper rate:         {}", pack.taper_rate);

    let Some(expected) = expected else {
        return Ok(());
    };

    let mismatches = expected.compare(&pack);
    println!();
    if mismatches.is_empty() {
        println!("Platform attributes match.");
        return Ok(());
    }

    println!("Platform attribute mismatches:");
    for mismatch in &mismatches {
        println!("  {}", mismatch);
    }
    Err(format!("{} pack attribute(s) differ from the gauge", mismatches.len()).into())
}

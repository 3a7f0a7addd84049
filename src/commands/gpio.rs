//! GPOUT polarity diagnostic command

use fgconf_core::profile::Profile;
use fgconf_core::{AttachOptions, NoProgress};

/// Show or flip the GPOUT polarity through the handle's diagnostic node
pub fn run_gpio_polarity(
    transport: &str,
    profile: &Profile,
    toggle: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = AttachOptions::new(profile.as_config());
    options.skip_configuration = true;

    let handle = fgconf_gauge::open_gauge(transport, &options, &mut NoProgress)?;
    let diag = handle
        .diagnostics()
        .ok_or("Diagnostic node could not be created")?;

    let active_high = if toggle {
        diag.toggle_gpio_polarity()?
    } else {
        diag.gpio_polarity()?
    };

    println!(
        "GPOUT polarity: active {} ({})",
        if active_high { "high" } else { "low" },
        diag.node_name()
    );
    Ok(())
}

//! List commands implementation

use fgconf_core::profile::ProfileDatabase;

/// List all transports compiled into this binary
pub fn list_transports() {
    println!("Supported transports:");
    println!();

    for info in fgconf_gauge::available_transports() {
        let aliases = if info.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", info.aliases.join(", "))
        };
        println!("  {:<10} - {}{}", info.name, info.description, aliases);
    }
}

/// List all known golden profiles
pub fn list_profiles(db: &ProfileDatabase) {
    println!("Golden profiles:");
    println!();
    println!(
        "{:<16} {:>8} {:>7} {:>8}  {}",
        "Name", "Revision", "Version", "Blocks", "Description"
    );
    println!("{}", "-".repeat(72));

    for profile in db.iter() {
        let revision = format!(
            "{:04X}/{:04X}",
            profile.revision.device_type, profile.revision.firmware_version
        );
        println!(
            "{:<16} {:>8} {:>7} {:>8}  {}",
            profile.name,
            revision,
            profile.version,
            profile.commands.len(),
            profile.description
        );
    }
}

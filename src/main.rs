//! fgconf - BQ27441 fuel gauge configuration tool
//!
//! Checks the gauge revision, applies golden data-flash profiles and gives
//! access to single data-flash bytes and blocks.
//!
//! # Architecture
//!
//! Every command names a transport string (`dummy`,
//! `linux_i2c:dev=/dev/i2c-1`). Commands that only inspect the chip open a
//! bare protocol engine; `apply` and `gpio-polarity` attach a lock-guarded
//! device handle, which runs the firmware gate first.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use fgconf_core::profile::{Profile, ProfileDatabase};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let db = match load_profile_database(cli.profile_file.as_deref(), cli.profile_dir.as_deref())
    {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load profiles: {}", e);
            std::process::exit(1);
        }
    };

    log::debug!("{} golden profiles available", db.len());

    match cli.command {
        Commands::Probe { transport } => {
            let profile = select_profile(&db, &cli.profile)?;
            commands::probe::run_probe(&transport.transport, profile)
        }
        Commands::Status { transport } => {
            let profile = select_profile(&db, &cli.profile)?;
            commands::probe::run_status(&transport.transport, profile)
        }
        Commands::Apply {
            transport,
            force,
            policy,
            dry_run,
        } => {
            let profile = select_profile(&db, &cli.profile)?;
            let options = commands::apply::ApplyOptions {
                force,
                policy: policy.into(),
                dry_run,
            };
            commands::apply::run_apply(&transport.transport, profile, &options)
        }
        Commands::ReadByte {
            transport,
            block,
            offset,
        } => {
            let profile = select_profile(&db, &cli.profile)?;
            commands::block::run_read_byte(&transport.transport, profile, block.block_id(), offset)
        }
        Commands::WriteByte {
            transport,
            block,
            offset,
            value,
        } => {
            let profile = select_profile(&db, &cli.profile)?;
            commands::block::run_write_byte(
                &transport.transport,
                profile,
                block.block_id(),
                offset,
                value,
            )
        }
        Commands::DumpBlock { transport, block } => {
            let profile = select_profile(&db, &cli.profile)?;
            commands::block::run_dump_block(&transport.transport, profile, block.block_id())
        }
        Commands::GpioPolarity { transport, toggle } => {
            let profile = select_profile(&db, &cli.profile)?;
            commands::gpio::run_gpio_polarity(&transport.transport, profile, toggle)
        }
        Commands::Pack {
            transport,
            attributes,
        } => {
            let profile = select_profile(&db, &cli.profile)?;
            commands::pack::run_pack(&transport.transport, profile, attributes.as_deref())
        }
        Commands::ListProfiles => {
            commands::list_profiles(&db);
            Ok(())
        }
        Commands::ListTransports => {
            commands::list_transports();
            Ok(())
        }
    }
}

/// Build the profile database: built-in profiles, then any extra files
fn load_profile_database(
    file: Option<&Path>,
    dir: Option<&Path>,
) -> Result<ProfileDatabase, Box<dyn std::error::Error>> {
    let mut db = ProfileDatabase::with_builtin();

    if let Some(dir) = dir {
        if !dir.is_dir() {
            return Err(format!("Profile directory not found: {}", dir.display()).into());
        }
        let count = db.load_dir(dir)?;
        log::info!("Loaded {} profiles from {}", count, dir.display());
    }

    if let Some(file) = file {
        let count = db.load_file(file)?;
        log::info!("Loaded {} profiles from {}", count, file.display());
    }

    Ok(db)
}

/// Look up the profile named on the command line
fn select_profile<'a>(
    db: &'a ProfileDatabase,
    name: &str,
) -> Result<&'a Profile, Box<dyn std::error::Error>> {
    db.find(name).ok_or_else(|| {
        let known: Vec<&str> = db.iter().map(|p| p.name.as_str()).collect();
        format!(
            "Unknown profile: {} (available: {})",
            name,
            known.join(", ")
        )
        .into()
    })
}

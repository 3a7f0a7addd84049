//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use fgconf_core::{BlockId, VersionPolicy};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the transport argument
fn transport_help() -> String {
    format!(
        "Transport to use [available: {}]",
        fgconf_gauge::transport_names_short()
    )
}

#[derive(Parser)]
#[command(name = "fgconf")]
#[command(author, version, about = "BQ27441 fuel gauge configuration tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Golden profile to use
    #[arg(long, global = true, default_value = "zerogravitas")]
    pub profile: String,

    /// Extra profile file (RON format), loaded on top of the built-in profiles
    #[arg(long, global = true)]
    pub profile_file: Option<PathBuf>,

    /// Directory of extra profile files (contains .ron files)
    #[arg(long, global = true)]
    pub profile_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Transport selection shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct TransportArgs {
    #[arg(short, long, default_value = "dummy", help = transport_help())]
    pub transport: String,
}

/// Data-flash location shared by the block commands
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct BlockArgs {
    /// Subclass id (hex, e.g. 0x40)
    #[arg(long, value_parser = parse_hex_u8)]
    pub class: u8,

    /// Block index within the subclass
    #[arg(long, value_parser = parse_hex_u8, default_value = "0")]
    pub index: u8,
}

impl BlockArgs {
    pub fn block_id(self) -> BlockId {
        BlockId::new(self.class, self.index)
    }
}

/// When a chip counts as unconfigured
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum PolicyArg {
    /// Version stamp differs or a power-on reset was seen
    #[default]
    VersionOrPor,
    /// Only the version stamp matters
    VersionOnly,
}

impl From<PolicyArg> for VersionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::VersionOrPor => VersionPolicy::VersionOrPowerOnReset,
            PolicyArg::VersionOnly => VersionPolicy::VersionOnly,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the chip revision against the selected profile
    Probe {
        #[command(flatten)]
        transport: TransportArgs,
    },

    /// Show flags, control status and configuration version
    Status {
        #[command(flatten)]
        transport: TransportArgs,
    },

    /// Apply the selected golden profile if the chip needs it
    Apply {
        #[command(flatten)]
        transport: TransportArgs,

        /// Apply even if the chip reports an up-to-date version
        #[arg(long)]
        force: bool,

        /// When the chip counts as unconfigured
        #[arg(long, value_enum, default_value_t = PolicyArg::default())]
        policy: PolicyArg,

        /// Only report whether configuration is needed
        #[arg(long, conflicts_with = "force")]
        dry_run: bool,
    },

    /// Read one data-flash byte
    ReadByte {
        #[command(flatten)]
        transport: TransportArgs,

        #[command(flatten)]
        block: BlockArgs,

        /// Offset within the block (0-31)
        #[arg(long, value_parser = parse_hex_u8)]
        offset: u8,
    },

    /// Write one data-flash byte and verify the block checksum
    WriteByte {
        #[command(flatten)]
        transport: TransportArgs,

        #[command(flatten)]
        block: BlockArgs,

        /// Offset within the block (0-31)
        #[arg(long, value_parser = parse_hex_u8)]
        offset: u8,

        /// Value to write (hex or decimal)
        #[arg(long, value_parser = parse_hex_u8)]
        value: u8,
    },

    /// Hex dump a whole data-flash block
    DumpBlock {
        #[command(flatten)]
        transport: TransportArgs,

        #[command(flatten)]
        block: BlockArgs,
    },

    /// Show or toggle the GPOUT polarity
    GpioPolarity {
        #[command(flatten)]
        transport: TransportArgs,

        /// Flip the polarity bit
        #[arg(long)]
        toggle: bool,
    },

    /// Read pack parameters back from the gauge
    Pack {
        #[command(flatten)]
        transport: TransportArgs,

        /// Platform attributes to compare against (TOML format)
        #[arg(long)]
        attributes: Option<PathBuf>,
    },

    /// List available golden profiles
    ListProfiles,

    /// List supported transports
    ListTransports,
}

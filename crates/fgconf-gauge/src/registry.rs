//! Transport registry and initialization
//!
//! This module handles opening register transports by name and wrapping them
//! in a gauge engine or an attached device handle.

use fgconf_core::bus::{Gauge, RegisterTransport, StdClock};
use fgconf_core::device::{AttachOptions, DeviceHandle};
use fgconf_core::ApplyProgress;
use std::collections::HashMap;

/// Type alias for a boxed register transport
pub type BoxedTransport = Box<dyn RegisterTransport + Send>;

/// Protocol engine over any registered transport
pub type GaugeEngine = Gauge<BoxedTransport, StdClock>;

/// Attached handle over any registered transport
pub type GaugeHandle = DeviceHandle<BoxedTransport, StdClock>;

/// Parsed transport parameters
pub struct TransportParams {
    /// Transport name (canonical)
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl TransportParams {
    /// Parameters as borrowed pairs, the form back ends parse
    pub fn as_pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a transport string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```ignore
/// let params = parse_transport_params("linux_i2c:dev=/dev/i2c-1")?;
/// assert_eq!(params.name, "linux_i2c");
/// assert_eq!(params.params.get("dev"), Some(&"/dev/i2c-1".to_string()));
/// ```
pub fn parse_transport_params(s: &str) -> Result<TransportParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(TransportParams {
        name: name.to_string(),
        params,
    })
}

/// Open a register transport by name
///
/// # Arguments
/// * `transport` - Transport specification (e.g., "dummy" or "linux_i2c:dev=/dev/i2c-1")
pub fn open_transport(transport: &str) -> Result<BoxedTransport, Box<dyn std::error::Error>> {
    let params = parse_transport_params(transport)?;

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params),

        #[cfg(feature = "linux-i2c")]
        "linux_i2c" | "linux-i2c" | "i2cdev" => open_linux_i2c(&params),

        _ => Err(format!("Unknown transport: {}", params.name).into()),
    }
}

/// Open a transport and wrap it in a protocol engine, without any init sequence
pub fn open_engine(transport: &str) -> Result<GaugeEngine, Box<dyn std::error::Error>> {
    let transport = open_transport(transport)?;
    Ok(Gauge::new(transport, StdClock::new()))
}

/// Open a transport and attach to the gauge behind it
///
/// This is the main entry point for the CLI. It handles:
/// 1. Parsing the transport string
/// 2. Opening the appropriate transport
/// 3. Running the attach sequence (firmware gate, version check, configuration)
pub fn open_gauge(
    transport: &str,
    options: &AttachOptions<'_>,
    progress: &mut impl ApplyProgress,
) -> Result<GaugeHandle, Box<dyn std::error::Error>> {
    let boxed = open_transport(transport)?;
    let handle = DeviceHandle::attach_with_progress(boxed, StdClock::new(), options, progress)?;

    let report = handle.report();
    log::info!(
        "Attached: {}, config version {}{}",
        report.revision,
        report.version_before,
        if report.configured { " (reconfigured)" } else { "" }
    );

    Ok(handle)
}

#[cfg(feature = "dummy")]
fn open_dummy(params: &TransportParams) -> Result<BoxedTransport, Box<dyn std::error::Error>> {
    use fgconf_dummy::{DummyConfig, DummyGauge};

    let mut config = DummyConfig::default();
    for (key, value) in &params.params {
        match key.as_str() {
            "device_type" => config.device_type = parse_u16(value)?,
            "firmware" => config.firmware_version = parse_u16(value)?,
            "sealed" => config.sealed = parse_bool(value)?,
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    log::info!("Opening dummy gauge emulator...");
    Ok(Box::new(DummyGauge::new(config)))
}

#[cfg(feature = "linux-i2c")]
fn open_linux_i2c(params: &TransportParams) -> Result<BoxedTransport, Box<dyn std::error::Error>> {
    use fgconf_linux_i2c::{parse_options, LinuxI2c};

    log::info!("Opening Linux I2C transport...");

    let options = params.as_pairs();
    let config =
        parse_options(&options).map_err(|e| format!("Invalid linux_i2c parameters: {}", e))?;

    let i2c = LinuxI2c::open(&config).map_err(|e| {
        format!(
            "Failed to open Linux I2C device: {}\n\
             Make sure the device exists and you have read/write permissions.\n\
             You may need to: sudo usermod -aG i2c $USER",
            e
        )
    })?;

    Ok(Box::new(i2c))
}

#[cfg(feature = "dummy")]
fn parse_u16(value: &str) -> Result<u16, Box<dyn std::error::Error>> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| format!("Invalid number: {}", value).into())
}

#[cfg(feature = "dummy")]
fn parse_bool(value: &str) -> Result<bool, Box<dyn std::error::Error>> {
    match value {
        "1" | "yes" | "true" => Ok(true),
        "0" | "no" | "false" => Ok(false),
        _ => Err(format!("Invalid boolean: {}", value).into()),
    }
}

// Transport information and listing
/// Information about a transport
pub struct TransportInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available transports (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_transports() -> Vec<TransportInfo> {
    let mut transports = Vec::new();

    #[cfg(feature = "dummy")]
    transports.push(TransportInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory BQ27441 emulator (device_type=, firmware=, sealed=)",
    });

    #[cfg(feature = "linux-i2c")]
    transports.push(TransportInfo {
        name: "linux_i2c",
        aliases: &["linux-i2c", "i2cdev"],
        description: "Linux i2c-dev adapter (dev=/dev/i2c-N, addr=0x55)",
    });

    transports
}

/// Get a short comma-separated list of transport names
pub fn transport_names_short() -> String {
    let transports = available_transports();
    if transports.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = transports.iter().map(|t| t.name).collect();
    names.join(", ")
}

//! Lock-guarded per-chip handle
//!
//! A [`DeviceHandle`] owns one [`Gauge`] behind a mutex. Every public
//! operation holds the lock for its whole duration, so a configuration
//! window opened by one caller can never interleave with another caller's
//! block writes.
//!
//! Attaching a handle runs the init sequence: firmware gate, diagnostic
//! node, version check and, if needed, the golden configuration.

use std::string::{String, ToString};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::apply::{
    needs_configuration, ApplyProgress, ConfigVersion, NoProgress, VersionPolicy,
    VERSION_STAMP_BLOCK,
};
use crate::block::BlockId;
use crate::bus::{Clock, Gauge, RegisterTransport};
use crate::error::{Error, Result};
use crate::gate::ChipRevision;
use crate::profile::GoldenConfig;
use crate::registers::{Flags, OpConfig};

/// Default name of the polarity control node
pub const DEFAULT_DIAGNOSTIC_NODE: &str = "bq27441_toggle_polarity";

/// OpConfig lives in the same block as the version stamp
const OPCONFIG_BLOCK: BlockId = VERSION_STAMP_BLOCK;

/// Offset of the OpConfig high byte
const OPCONFIG_OFFSET: u8 = 0;

/// Options for [`DeviceHandle::attach`]
#[derive(Debug, Clone)]
pub struct AttachOptions<'a> {
    /// Revision the chip must report
    pub revision: ChipRevision,
    /// Golden configuration to apply when the chip is unconfigured
    pub profile: GoldenConfig<'a>,
    /// When the chip counts as unconfigured
    pub policy: VersionPolicy,
    /// Create a diagnostic node with this name
    pub diagnostics: Option<String>,
    /// Only report whether configuration is needed, never apply it
    pub skip_configuration: bool,
}

impl<'a> AttachOptions<'a> {
    /// Options for `profile` with its own revision and the default policy
    pub fn new(profile: GoldenConfig<'a>) -> Self {
        Self {
            revision: profile.revision,
            profile,
            policy: VersionPolicy::default(),
            diagnostics: Some(DEFAULT_DIAGNOSTIC_NODE.to_string()),
            skip_configuration: false,
        }
    }
}

/// What happened during attach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachReport {
    /// Revision the chip reported
    pub revision: ChipRevision,
    /// Version stamp found before any configuration
    pub version_before: ConfigVersion,
    /// ITPOR flag observed at attach
    pub itpor: bool,
    /// Whether the profile had to be applied
    pub needed_configuration: bool,
    /// Whether the profile was applied
    pub configured: bool,
}

/// Lifecycle token for one handle's diagnostic surface
///
/// Holds only the node name. It is created at attach and dropped with the
/// handle, and its presence is what makes [`DeviceHandle::diagnostics`]
/// available. Nothing is registered outside the process.
#[derive(Debug)]
pub struct DiagnosticNode {
    name: String,
}

impl DiagnosticNode {
    /// Create the token; the name must be a single non-empty path component
    pub fn create(name: &str) -> Result<Self> {
        if name.is_empty() || name.contains('/') {
            return Err(Error::InvalidArgument);
        }
        log::debug!("Created diagnostic node {}", name);
        Ok(Self {
            name: name.to_string(),
        })
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for DiagnosticNode {
    fn drop(&mut self) {
        log::debug!("Removed diagnostic node {}", self.name);
    }
}

/// One attached gauge
pub struct DeviceHandle<T, C> {
    gauge: Mutex<Gauge<T, C>>,
    diagnostics: Option<DiagnosticNode>,
    report: AttachReport,
}

fn lock<G>(mutex: &Mutex<G>) -> MutexGuard<'_, G> {
    // Chip state is re-read from registers by every operation
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: RegisterTransport, C: Clock> DeviceHandle<T, C> {
    /// Attach to a gauge, configuring it if needed
    pub fn attach(transport: T, clock: C, options: &AttachOptions<'_>) -> Result<Self> {
        Self::attach_with_progress(transport, clock, options, &mut NoProgress)
    }

    /// Attach to a gauge, reporting configuration progress
    pub fn attach_with_progress(
        transport: T,
        clock: C,
        options: &AttachOptions<'_>,
        progress: &mut impl ApplyProgress,
    ) -> Result<Self> {
        let gauge = Mutex::new(Gauge::new(transport, clock));

        let (report, diagnostics) = {
            let mut gauge = lock(&gauge);

            let revision = gauge.check_firmware_version(options.revision)?;

            let diagnostics = match options.diagnostics.as_deref() {
                Some(name) => DiagnosticNode::create(name)
                    .inspect_err(|e| log::warn!("Failed to create diagnostic node: {}", e))
                    .ok(),
                None => None,
            };

            let version_before = gauge
                .dm_code()
                .inspect_err(|e| log::warn!("Unable to read config version: {}", e))?;
            log::info!("Configuration version {}", version_before);

            let itpor = gauge.read_flags()?.contains(Flags::ITPOR);
            let needed = needs_configuration(
                version_before,
                options.profile.version,
                itpor,
                options.policy,
            );

            let configured = if !needed {
                false
            } else if options.skip_configuration {
                log::info!(
                    "Configuration {} needed but skipped",
                    options.profile.version
                );
                false
            } else {
                log::info!(
                    "Applying profile {} (version {})",
                    options.profile.name,
                    options.profile.version
                );
                gauge
                    .apply_golden_configuration(
                        options.profile.commands,
                        options.profile.version,
                        progress,
                    )
                    .inspect_err(|e| log::warn!("Failed to initialize: {}", e))?;
                true
            };

            let report = AttachReport {
                revision,
                version_before,
                itpor,
                needed_configuration: needed,
                configured,
            };
            (report, diagnostics)
        };

        Ok(Self {
            gauge,
            diagnostics,
            report,
        })
    }

    /// Result of the attach sequence
    pub fn report(&self) -> &AttachReport {
        &self.report
    }

    /// Run protocol operations under the handle's lock
    pub fn with_gauge<R>(&self, f: impl FnOnce(&mut Gauge<T, C>) -> R) -> R {
        let mut gauge = lock(&self.gauge);
        f(&mut gauge)
    }

    /// Diagnostic surface, if the node was created at attach
    pub fn diagnostics(&self) -> Option<Diagnostics<'_, T, C>> {
        self.diagnostics.as_ref().map(|node| Diagnostics {
            handle: self,
            node,
        })
    }

    /// Tear down diagnostics and release the transport and clock
    pub fn detach(mut self) -> (T, C) {
        self.diagnostics.take();
        let gauge = self
            .gauge
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        gauge.into_parts()
    }
}

/// Diagnostic operations bound to one handle
pub struct Diagnostics<'a, T, C> {
    handle: &'a DeviceHandle<T, C>,
    node: &'a DiagnosticNode,
}

impl<T: RegisterTransport, C: Clock> Diagnostics<'_, T, C> {
    /// Name of the backing node
    pub fn node_name(&self) -> &str {
        self.node.name()
    }

    /// Flip the GPOUT polarity bit in OpConfig
    ///
    /// Returns the new polarity (true is active high).
    pub fn toggle_gpio_polarity(&self) -> Result<bool> {
        log::info!("GPIO polarity toggle triggered");

        self.handle.with_gauge(|gauge| {
            gauge
                .enter_config_mode()
                .inspect_err(|e| log::warn!("Unable to start config mode: {}", e))?;

            let old = gauge.read_byte(OPCONFIG_BLOCK, OPCONFIG_OFFSET)?;
            let new = old ^ OpConfig::GPIOPOL.bits();
            gauge.write_byte(OPCONFIG_BLOCK, OPCONFIG_OFFSET, new)?;

            gauge.exit_config_mode()?;
            Ok(OpConfig::from_bits_retain(new).contains(OpConfig::GPIOPOL))
        })
    }

    /// Current GPOUT polarity (true is active high)
    pub fn gpio_polarity(&self) -> Result<bool> {
        self.handle.with_gauge(|gauge| {
            gauge.enter_config_mode()?;
            let raw = gauge.read_byte(OPCONFIG_BLOCK, OPCONFIG_OFFSET)?;
            gauge.exit_config_mode()?;
            Ok(OpConfig::from_bits_retain(raw).contains(OpConfig::GPIOPOL))
        })
    }

    /// Handle a write to the control node
    ///
    /// Only input starting with `1` triggers a toggle. Returns the number
    /// of bytes consumed.
    pub fn write_control_file(&self, input: &[u8]) -> Result<usize> {
        if input.first() != Some(&b'1') {
            return Err(Error::InvalidArgument);
        }
        self.toggle_gpio_polarity()?;
        Ok(input.len())
    }
}

//! Apply command implementation

use fgconf_core::profile::Profile;
use fgconf_core::{ApplyProgress, AttachOptions, BlockId, ConfigVersion, VersionPolicy};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Options for [`run_apply`]
#[derive(Debug, Clone, Copy)]
pub struct ApplyOptions {
    /// Skip the version check
    pub force: bool,
    /// When the chip counts as unconfigured
    pub policy: VersionPolicy,
    /// Report only
    pub dry_run: bool,
}

/// Progress bar over the blocks of one profile
struct BlockProgress {
    bar: Option<ProgressBar>,
}

impl BlockProgress {
    fn new() -> Self {
        Self { bar: None }
    }
}

/// Create the block progress bar style
fn create_progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

impl ApplyProgress for BlockProgress {
    fn blocks_started(&mut self, total: usize) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(create_progress_bar_style());
        pb.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(pb);
    }

    fn block_written(&mut self, _index: usize, block: BlockId) {
        if let Some(pb) = &self.bar {
            pb.set_message(format!("block {}", block));
            pb.inc(1);
        }
    }

    fn stamped(&mut self, version: ConfigVersion) {
        if let Some(pb) = &self.bar {
            pb.set_message(format!("stamped version {}", version));
        }
    }

    fn finished(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_with_message("sealed");
        }
    }
}

impl Drop for BlockProgress {
    fn drop(&mut self) {
        // A failed apply never reaches finished()
        if let Some(pb) = self.bar.take() {
            pb.abandon_with_message("aborted");
        }
    }
}

/// Apply a golden profile
pub fn run_apply(
    transport: &str,
    profile: &Profile,
    options: &ApplyOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "Profile {}: {} blocks, version {}",
        profile.name,
        profile.commands.len(),
        profile.version
    );

    if options.force {
        return run_forced_apply(transport, profile);
    }

    let mut attach = AttachOptions::new(profile.as_config());
    attach.policy = options.policy;
    attach.diagnostics = None;
    attach.skip_configuration = options.dry_run;

    let mut progress = BlockProgress::new();
    let handle = fgconf_gauge::open_gauge(transport, &attach, &mut progress)?;
    let report = handle.report();

    println!("Chip:            {}", report.revision);
    println!("Version before:  {}", report.version_before);
    println!("ITPOR:           {}", if report.itpor { "set" } else { "clear" });

    if report.configured {
        println!("Configuration applied.");
    } else if report.needed_configuration {
        println!("Configuration needed (dry run, nothing written).");
    } else {
        println!("Already up to date, nothing to do.");
    }

    Ok(())
}

/// Apply without asking the chip whether it needs it
fn run_forced_apply(transport: &str, profile: &Profile) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = fgconf_gauge::open_engine(transport)?;
    engine.check_firmware_version(profile.revision)?;

    let before = engine.dm_code()?;
    log::info!("Forcing apply over config version {}", before);

    let mut progress = BlockProgress::new();
    engine.apply_golden_configuration(&profile.commands, profile.version, &mut progress)?;

    println!("Configuration applied (was version {}).", before);
    Ok(())
}

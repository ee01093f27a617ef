//! Main CLI parser and top-level argument handling.
//!
//! Every option may also come from a `CPUPROBE_*` environment variable,
//! which `main` seeds from `.env` before parsing.

use clap::Parser;
use cpuprobe_core::{FeatureFlags, ProbeSettings, SettingsUpdate};

/// Command-line interface definition for the SPARC CPU probe.
#[derive(Debug, Parser)]
#[command(name = "cpuprobe")]
#[command(about = "Report SPARC instruction-set features and cache line sizes")]
#[command(version)]
pub struct Cli {
    /// Feature bits assumed before probing (hex with 0x, or decimal)
    #[arg(long, env = "CPUPROBE_BASELINE", value_parser = parse_baseline, default_value = "0")]
    pub baseline: FeatureFlags,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Hardware-inventory library to open for the cache walk
    #[arg(long, env = "CPUPROBE_INVENTORY_LIBRARY")]
    pub inventory_library: Option<String>,

    /// Library providing the kstat interface
    #[arg(long, env = "CPUPROBE_KSTAT_LIBRARY")]
    pub kstat_library: Option<String>,

    /// Upper bound on processor nodes visited during the cache walk
    #[arg(long, env = "CPUPROBE_MAX_WALK_NODES")]
    pub max_walk_nodes: Option<usize>,
}

impl Cli {
    /// Settings for this invocation: defaults overlaid with given options.
    pub fn settings(&self) -> ProbeSettings {
        let mut settings = ProbeSettings::with_defaults();
        settings.merge(&SettingsUpdate {
            inventory_library: self.inventory_library.clone().map(Some),
            kstat_library: self.kstat_library.clone().map(Some),
            max_walk_nodes: self.max_walk_nodes.map(Some),
        });
        settings
    }
}

/// Parse a baseline bitmask. Bits without a named feature are kept.
pub fn parse_baseline(raw: &str) -> Result<FeatureFlags, String> {
    let raw = raw.trim();
    let bits = match raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse::<u32>(),
    }
    .map_err(|e| format!("invalid baseline '{raw}': {e}"))?;
    Ok(FeatureFlags::from_baseline(bits))
}

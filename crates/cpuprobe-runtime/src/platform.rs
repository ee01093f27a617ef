//! Process-wide CPU description.
//!
//! The probe runs at most once per process. Its outcome is kept in a
//! [`OnceLock`] so later callers see the same features and L2 line size.

use std::sync::OnceLock;

use cpuprobe_core::{CpuDescription, CpuProbe, FeatureFlags, ProbeReport, ProbeSettings};

use crate::picl::PiclLoader;
use crate::system::DefaultHostProbe;

static CPU_DESCRIPTION: OnceLock<CpuDescription> = OnceLock::new();

/// Run one probe with the default adapters, bypassing the process-wide record.
pub fn run_probe(baseline: FeatureFlags, settings: &ProbeSettings) -> ProbeReport {
    let host = DefaultHostProbe::from_settings(settings);
    let loader = PiclLoader::new();
    CpuProbe::new(&host, &loader, settings.clone()).run(baseline)
}

/// Features of this host, probed on first use with default settings.
pub fn platform_features(baseline: FeatureFlags) -> FeatureFlags {
    platform_features_with(baseline, &ProbeSettings::with_defaults())
}

/// As [`platform_features`], with explicit settings for the first probe.
///
/// Once a description is recorded, `baseline` and `settings` are ignored.
pub fn platform_features_with(baseline: FeatureFlags, settings: &ProbeSettings) -> FeatureFlags {
    CPU_DESCRIPTION
        .get_or_init(|| CpuDescription::from(&run_probe(baseline, settings)))
        .features
}

/// The recorded description, if a probe has completed.
pub fn cpu_description() -> Option<&'static CpuDescription> {
    CPU_DESCRIPTION.get()
}

//! Top-level probe sequencing.
//!
//! Feature assembly runs first because the family bits it finds decide how
//! the device tree is walked (`core` nodes on SPARC64, a single node on
//! other sun4v machines).

use tracing::info;

use crate::domain::{FeatureFlags, ProbeReport};
use crate::ports::{HostInfoPort, InventoryLoader};
use crate::settings::ProbeSettings;

use super::cache_probe::{CacheGeometryProbe, WalkBudget};
use super::feature_assembler::FeatureAssembler;

/// One complete CPU probe over injected host ports.
pub struct CpuProbe<'a> {
    host: &'a dyn HostInfoPort,
    loader: &'a dyn InventoryLoader,
    settings: ProbeSettings,
}

impl<'a> CpuProbe<'a> {
    pub fn new(
        host: &'a dyn HostInfoPort,
        loader: &'a dyn InventoryLoader,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            host,
            loader,
            settings,
        }
    }

    /// Assemble features, then measure cache geometry for that family.
    pub fn run(&self, baseline: FeatureFlags) -> ProbeReport {
        let assembled = FeatureAssembler::new(self.host).assemble(baseline);

        let budget = WalkBudget::for_host(
            assembled.features,
            self.host.processor_count(),
            self.settings.max_walk_nodes,
        );
        let cache_line_sizes =
            CacheGeometryProbe::new(self.loader, self.settings.effective_inventory_library())
                .probe(assembled.features, budget);

        let report = ProbeReport {
            features: assembled.features,
            cache_line_sizes,
            implementation: assembled.implementation,
        };
        info!(
            features = format_args!("{:#010x}", report.features.bits()),
            implementation = %report.implementation.label,
            l1_data_cache_line_size = report.cache_line_sizes.l1_data,
            l2_data_cache_line_size = report.cache_line_sizes.l2_data,
            "CPU probe complete"
        );
        report
    }
}

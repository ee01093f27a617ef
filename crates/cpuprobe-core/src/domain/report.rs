//! Results handed back to the calling runtime.

use serde::{Deserialize, Serialize};

use super::cache::CacheLineSizes;
use super::features::FeatureFlags;
use super::implementation::Implementation;

/// Everything one probe run discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Baseline OR every discovered bit.
    pub features: FeatureFlags,
    /// Line sizes from the device-tree walk; zero where unknown.
    pub cache_line_sizes: CacheLineSizes,
    /// Processor implementation as reported by kstat.
    pub implementation: Implementation,
}

/// Process-wide CPU description, written once after the probe.
///
/// Only the L2 line size is published here. The L1 value stays in the
/// [`ProbeReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuDescription {
    pub features: FeatureFlags,
    pub l2_data_cache_line_size: u32,
}

impl From<&ProbeReport> for CpuDescription {
    fn from(report: &ProbeReport) -> Self {
        Self {
            features: report.features,
            l2_data_cache_line_size: report.cache_line_sizes.l2_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_drops_l1() {
        let report = ProbeReport {
            features: FeatureFlags::T_FAMILY,
            cache_line_sizes: CacheLineSizes {
                l1_data: 32,
                l2_data: 64,
            },
            implementation: Implementation::from_raw("SPARC-T4"),
        };
        let description = CpuDescription::from(&report);
        assert_eq!(description.features, FeatureFlags::T_FAMILY);
        assert_eq!(description.l2_data_cache_line_size, 64);
    }
}

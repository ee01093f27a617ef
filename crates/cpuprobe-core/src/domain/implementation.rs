//! Processor implementation-family classification.
//!
//! The kstat `cpu_info` record names the processor implementation, e.g.
//! `"SPARC-T4 (chipid 0, clock 2848 MHz)"` or `"SPARC64-VII+"`. Families are
//! matched by substring, so the order of the checks below is significant:
//! `SPARC64` must win over the generic `SPARC` prefix, and `SPARC-M` implies
//! the T-series family it is built on.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::features::FeatureFlags;

/// Label used when no implementation string could be read at all.
pub const UNKNOWN_IMPLEMENTATION: &str = "UNKNOWN";

/// Placeholder substituted for implementation strings that do not name SPARC.
pub const GENERIC_IMPLEMENTATION: &str = "SPARC";

/// Processor family derived from the implementation string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationFamily {
    /// Fujitsu SPARC64.
    Sparc64,
    /// SPARC M-series, a T-series derivative.
    MSeries,
    /// SPARC T-series; `first_generation` is set for the T1.
    TSeries { first_generation: bool },
    /// Some other SPARC implementation.
    Generic,
    /// Not recognisably SPARC, e.g. `"(unsupported)"` inside branded zones.
    Unrecognized,
}

impl ImplementationFamily {
    /// Classify an implementation string. Matching is case-insensitive.
    pub fn classify(implementation: &str) -> Self {
        let upper = implementation.to_uppercase();
        if upper.contains("SPARC64") {
            Self::Sparc64
        } else if upper.contains("SPARC-M") {
            Self::MSeries
        } else if upper.contains("SPARC-T") {
            Self::TSeries {
                first_generation: upper.contains("SPARC-T1"),
            }
        } else if upper.contains("SPARC") {
            Self::Generic
        } else {
            Self::Unrecognized
        }
    }

    /// Feature bits implied by this family.
    pub const fn flags(self) -> FeatureFlags {
        match self {
            Self::Sparc64 => FeatureFlags::SPARC64_FAMILY,
            Self::MSeries => FeatureFlags::M_FAMILY.union(FeatureFlags::T_FAMILY),
            Self::TSeries {
                first_generation: true,
            } => FeatureFlags::T_FAMILY.union(FeatureFlags::T1_MODEL),
            Self::TSeries {
                first_generation: false,
            } => FeatureFlags::T_FAMILY,
            Self::Generic | Self::Unrecognized => FeatureFlags::empty(),
        }
    }
}

/// Result of looking up the processor implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Label for diagnostics. Never empty.
    pub label: String,
    /// `None` when the kstat record could not be read.
    pub family: Option<ImplementationFamily>,
}

impl Implementation {
    /// The implementation record was not available.
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_IMPLEMENTATION.to_string(),
            family: None,
        }
    }

    /// Classify a raw implementation string read from the host.
    ///
    /// Strings that do not mention SPARC are replaced by a generic label so
    /// the lookup always completes.
    pub fn from_raw(raw: &str) -> Self {
        let family = ImplementationFamily::classify(raw);
        let label = if family == ImplementationFamily::Unrecognized {
            warn!(
                implementation = %raw.to_uppercase(),
                "kstat cpu_info implementation should contain SPARC"
            );
            GENERIC_IMPLEMENTATION.to_string()
        } else {
            raw.to_string()
        };
        Self {
            label,
            family: Some(family),
        }
    }

    /// Feature bits implied by the implementation, empty when unknown.
    pub fn flags(&self) -> FeatureFlags {
        self.family
            .map_or_else(FeatureFlags::empty, ImplementationFamily::flags)
    }
}

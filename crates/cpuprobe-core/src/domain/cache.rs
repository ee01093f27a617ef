//! Cache-line geometry observed across processor nodes.
//!
//! Cache-line size is architecturally uniform across the cores of a machine,
//! so every node should report the same value. [`CacheObservation`] tracks
//! that expectation for one cache level and fails closed: a single
//! disagreement makes the level unknown for the rest of the walk.

use serde::{Deserialize, Serialize};

/// Property holding the L1 data cache line size.
pub const L1_DCACHE_LINE_SIZE: &str = "l1-dcache-line-size";

/// L2 line size property on most platform generations.
pub const L2_CACHE_LINE_SIZE: &str = "l2-cache-line-size";

/// L2 line size property on platforms that split the L2 into I/D caches.
pub const L2_DCACHE_LINE_SIZE: &str = "l2-dcache-line-size";

/// Device class walked on most machines.
pub const CPU_CLASS: &str = "cpu";

/// Device class walked on SPARC64 machines, which expose one node per core.
pub const CORE_CLASS: &str = "core";

/// Consistency state of one scalar property across the nodes visited so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheObservation {
    /// Nothing read yet.
    #[default]
    Initial,
    /// Every successful read so far returned this value.
    Assigned(i32),
    /// Two nodes disagreed. Terminal.
    Inconsistent,
}

impl CacheObservation {
    /// Feed one successful reading into the state machine.
    #[must_use]
    pub const fn observe(self, value: i32) -> Self {
        match self {
            Self::Initial => Self::Assigned(value),
            Self::Assigned(current) if current == value => self,
            Self::Assigned(_) | Self::Inconsistent => Self::Inconsistent,
        }
    }

    pub const fn is_initial(self) -> bool {
        matches!(self, Self::Initial)
    }

    pub const fn is_inconsistent(self) -> bool {
        matches!(self, Self::Inconsistent)
    }

    /// The agreed value, if there is one.
    pub const fn value(self) -> Option<i32> {
        match self {
            Self::Assigned(value) => Some(value),
            Self::Initial | Self::Inconsistent => None,
        }
    }

    /// Final line size in bytes; 0 means unknown.
    ///
    /// Negative readings cannot be a line size and are reported as unknown.
    pub fn line_size(self) -> u32 {
        self.value()
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(0)
    }
}

/// Which L2 property name the current walk settled on.
///
/// Decided on the first node visited and reused for every later node of the
/// same walk. Lives inside the walk's visitor, never across walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum L2PropertyName {
    #[default]
    Undecided,
    Primary,
    Fallback,
}

impl L2PropertyName {
    /// Property name to read, or `None` before the first node.
    pub const fn property(self) -> Option<&'static str> {
        match self {
            Self::Undecided => None,
            Self::Primary => Some(L2_CACHE_LINE_SIZE),
            Self::Fallback => Some(L2_DCACHE_LINE_SIZE),
        }
    }
}

/// Data cache line sizes in bytes. Zero means "not consistently determined".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheLineSizes {
    pub l1_data: u32,
    pub l2_data: u32,
}

impl CacheLineSizes {
    /// Both levels unknown.
    pub const fn unknown() -> Self {
        Self {
            l1_data: 0,
            l2_data: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(readings: &[i32]) -> CacheObservation {
        readings
            .iter()
            .fold(CacheObservation::Initial, |state, &value| state.observe(value))
    }

    #[test]
    fn test_first_reading_assigns() {
        assert_eq!(feed(&[64]), CacheObservation::Assigned(64));
    }

    #[test]
    fn test_equal_readings_stay_assigned() {
        let state = feed(&[64, 64, 64]);
        assert_eq!(state.value(), Some(64));
        assert_eq!(state.line_size(), 64);
    }

    #[test]
    fn test_differing_reading_is_inconsistent() {
        let state = feed(&[64, 64, 64, 32]);
        assert!(state.is_inconsistent());
        assert_eq!(state.line_size(), 0);
    }

    #[test]
    fn test_inconsistent_is_sticky() {
        let state = feed(&[64, 32, 64, 64]);
        assert!(state.is_inconsistent());
        assert!(feed(&[32, 64, 32]).is_inconsistent());
    }

    #[test]
    fn test_initial_reports_unknown() {
        let state = CacheObservation::default();
        assert!(state.is_initial());
        assert_eq!(state.value(), None);
        assert_eq!(state.line_size(), 0);
    }

    #[test]
    fn test_all_equal_sequences_end_assigned() {
        for value in [16, 32, 64, 128] {
            for len in 1..6 {
                let readings = vec![value; len];
                assert_eq!(feed(&readings), CacheObservation::Assigned(value));
            }
        }
    }

    #[test]
    fn test_l2_property_names() {
        assert_eq!(L2PropertyName::Undecided.property(), None);
        assert_eq!(L2PropertyName::Primary.property(), Some("l2-cache-line-size"));
        assert_eq!(
            L2PropertyName::Fallback.property(),
            Some("l2-dcache-line-size")
        );
    }
}

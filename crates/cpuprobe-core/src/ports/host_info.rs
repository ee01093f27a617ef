//! Host information port for feature-bitmask assembly.
//!
//! Wraps the OS facilities that describe the processor: `sysinfo(2)` string
//! queries, the `getisax(2)` instruction-set extension words and the kstat
//! `cpu_info` record. Every query may be unsupported on a given OS release.

use thiserror::Error;

/// `sysinfo(2)` string queries used by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysInfoQuery {
    /// Machine type, e.g. `sun4v`.
    Machine,
    /// Space-separated list of supported instruction sets.
    IsaList,
    /// Basic 32-bit architecture, e.g. `sparc`.
    Architecture32,
    /// Basic 64-bit architecture, e.g. `sparcv9`.
    Architecture64,
}

impl SysInfoQuery {
    /// Command number from `<sys/systeminfo.h>`.
    pub const fn command(self) -> i32 {
        match self {
            Self::Machine => 5,
            Self::IsaList => 514,
            Self::Architecture32 => 516,
            Self::Architecture64 => 517,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Machine => "SI_MACHINE",
            Self::IsaList => "SI_ISALIST",
            Self::Architecture32 => "SI_ARCHITECTURE_32",
            Self::Architecture64 => "SI_ARCHITECTURE_64",
        }
    }
}

/// Instruction-set extension words returned by `getisax(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IsaWords {
    pub primary: u32,
    /// Present on OS releases that define a second word.
    pub secondary: Option<u32>,
}

/// Errors that can occur while querying the host.
#[derive(Debug, Error)]
pub enum HostQueryError {
    /// The facility does not exist on this OS release.
    #[error("{0} is not supported on this host")]
    Unsupported(&'static str),

    /// The facility exists but the query failed.
    #[error("{query} failed: {reason}")]
    Failed { query: &'static str, reason: String },
}

/// Result type for host queries.
pub type HostQueryResult<T> = Result<T, HostQueryError>;

/// Port for reading processor metadata from the host OS.
#[cfg_attr(test, mockall::automock)]
pub trait HostInfoPort: Send + Sync {
    /// Structured extension query.
    ///
    /// [`HostQueryError::Unsupported`] selects the legacy ISA-list path.
    fn isa_extensions(&self) -> HostQueryResult<IsaWords>;

    /// One `sysinfo(2)` string.
    fn sysinfo(&self, query: SysInfoQuery) -> HostQueryResult<String>;

    /// The `implementation` field of the kstat `cpu_info` record.
    fn cpu_implementation(&self) -> HostQueryResult<String>;

    /// Number of online logical processors.
    fn processor_count(&self) -> usize;
}

//! Host probe implementation for cpuprobe-runtime.
//!
//! This module provides the `DefaultHostProbe` which implements
//! `HostInfoPort` from cpuprobe-core on top of `getisax`, `sysinfo` and the
//! kstat `cpu_info` record.

mod isa;
mod kstat;

use cpuprobe_core::{
    DEFAULT_KSTAT_LIBRARY, HostInfoPort, HostQueryResult, IsaWords, ProbeSettings, SysInfoQuery,
};

/// Default implementation of `HostInfoPort`.
///
/// Construct it in the composition root and hand it to `CpuProbe`.
///
/// # Example
///
/// ```ignore
/// use cpuprobe_runtime::system::DefaultHostProbe;
/// use cpuprobe_core::HostInfoPort;
///
/// let host = DefaultHostProbe::new();
/// let machine = host.sysinfo(SysInfoQuery::Machine);
/// ```
#[derive(Debug, Clone)]
pub struct DefaultHostProbe {
    kstat_library: String,
}

impl DefaultHostProbe {
    /// Create a host probe reading kstat from the default library.
    pub fn new() -> Self {
        Self {
            kstat_library: DEFAULT_KSTAT_LIBRARY.to_string(),
        }
    }

    /// Create a host probe honouring the configured kstat library.
    pub fn from_settings(settings: &ProbeSettings) -> Self {
        Self {
            kstat_library: settings.effective_kstat_library().to_string(),
        }
    }

    pub fn kstat_library(&self) -> &str {
        &self.kstat_library
    }
}

impl Default for DefaultHostProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostInfoPort for DefaultHostProbe {
    fn isa_extensions(&self) -> HostQueryResult<IsaWords> {
        isa::isa_words()
    }

    fn sysinfo(&self, query: SysInfoQuery) -> HostQueryResult<String> {
        isa::sysinfo_string(query)
    }

    fn cpu_implementation(&self) -> HostQueryResult<String> {
        kstat::cpu_implementation(&self.kstat_library)
    }

    fn processor_count(&self) -> usize {
        num_cpus::get()
    }
}

//! Core domain types, ports and services for probing SPARC hosts.
//!
//! The crate determines which instruction-set extensions a host offers and
//! which data cache line sizes its processors agree on. All OS access goes
//! through the traits in [`ports`]; `cpuprobe-runtime` provides the real
//! implementations.
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;
pub mod services;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    CacheLineSizes, CacheObservation, CpuDescription, FeatureFlags, Implementation,
    ImplementationFamily, L2PropertyName, ProbeReport,
};
pub use ports::{
    DeviceInventory, HostInfoPort, HostQueryError, HostQueryResult, InventoryError,
    InventoryLoader, InventoryResult, IsaWords, NodeHandle, SysInfoQuery, WalkControl,
};
pub use services::{CacheGeometryProbe, CpuProbe, FeatureAssembler, WalkBudget};
pub use settings::{
    DEFAULT_INVENTORY_LIBRARY, DEFAULT_KSTAT_LIBRARY, ProbeSettings, SettingsError,
    SettingsUpdate, validate_settings,
};

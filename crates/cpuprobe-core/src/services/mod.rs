//! Probe services.
//!
//! Pure sequencing and merge logic over the ports. No service touches the
//! OS directly.

pub mod cache_probe;
pub mod feature_assembler;
pub mod orchestrator;

pub use cache_probe::{CacheGeometryProbe, CpuVisitor, UniqueValueTracker, WalkBudget, device_class};
pub use feature_assembler::{
    AssembledFeatures, FeatureAssembler, flags_from_isa_list, flags_from_isa_words,
};
pub use orchestrator::CpuProbe;

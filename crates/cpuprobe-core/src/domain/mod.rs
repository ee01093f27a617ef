//! Domain types for the CPU probe.
//!
//! Pure data and state machines with no OS access. Everything that touches
//! the host goes through the traits in [`crate::ports`].

pub mod cache;
pub mod features;
pub mod implementation;
pub mod report;

pub use cache::{CacheLineSizes, CacheObservation, L2PropertyName};
pub use features::FeatureFlags;
pub use implementation::{Implementation, ImplementationFamily};
pub use report::{CpuDescription, ProbeReport};

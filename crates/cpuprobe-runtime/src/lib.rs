//! OS-facing adapters for cpuprobe.
//!
//! Implements the `cpuprobe-core` ports on Solaris: PICL for cache geometry,
//! kstat, `sysinfo` and `getisax` for features. On other hosts every adapter
//! reports itself unavailable and the probe degrades to the baseline.
#![deny(unsafe_code)]

pub mod ffi;
pub mod picl;
pub mod platform;
pub mod system;

// Re-export the adapters for the composition root
pub use picl::{PiclLibrary, PiclLoader};
pub use system::DefaultHostProbe;

// Re-export the process-wide entry points
pub use platform::{cpu_description, platform_features, platform_features_with, run_probe};

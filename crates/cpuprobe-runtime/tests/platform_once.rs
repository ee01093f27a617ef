//! The process-wide description is recorded once.
//!
//! Kept in its own test binary so no other test touches the `OnceLock`.

use cpuprobe_core::FeatureFlags;
use cpuprobe_runtime::{cpu_description, platform_features};

#[test]
fn test_platform_features_runs_once() {
    assert!(cpu_description().is_none());

    let baseline = FeatureFlags::GENERIC_V8;
    let first = platform_features(baseline);
    assert!(first.contains(baseline));

    // A different baseline does not trigger a second probe.
    let second = platform_features(FeatureFlags::empty());
    assert_eq!(first, second);

    let description = cpu_description().expect("description recorded");
    assert_eq!(description.features, first);

    #[cfg(not(any(target_os = "solaris", target_os = "illumos")))]
    assert_eq!(description.l2_data_cache_line_size, 0);
}

//! Report rendering for the terminal.

use std::fmt::Write as _;

use cpuprobe_core::ProbeReport;

use crate::error::CliError;

fn line_size(bytes: u32) -> String {
    if bytes == 0 {
        "unknown".to_string()
    } else {
        format!("{bytes} bytes")
    }
}

/// Human-readable report, one field per line.
pub fn render_text(report: &ProbeReport) -> String {
    let mut out = String::new();
    let names = report.features.names();
    let _ = writeln!(out, "Implementation:  {}", report.implementation.label);
    let _ = writeln!(out, "Features:        {:#010x}", report.features.bits());
    if !names.is_empty() {
        let _ = writeln!(out, "                 {}", names.join(" "));
    }
    let _ = writeln!(
        out,
        "L1 data cache:   {}",
        line_size(report.cache_line_sizes.l1_data)
    );
    let _ = writeln!(
        out,
        "L2 data cache:   {}",
        line_size(report.cache_line_sizes.l2_data)
    );
    out
}

/// The report as pretty-printed JSON.
pub fn render_json(report: &ProbeReport) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpuprobe_core::{CacheLineSizes, FeatureFlags, Implementation};

    fn sample() -> ProbeReport {
        ProbeReport {
            features: FeatureFlags::V8_INSTRUCTIONS | FeatureFlags::T_FAMILY,
            cache_line_sizes: CacheLineSizes {
                l1_data: 16,
                l2_data: 0,
            },
            implementation: Implementation::from_raw("SPARC-T4"),
        }
    }

    #[test]
    fn test_text_report() {
        let text = render_text(&sample());
        assert!(text.contains("Implementation:  SPARC-T4"));
        assert!(text.contains("0x00010001"));
        assert!(text.contains("V8_INSTRUCTIONS T_FAMILY"));
        assert!(text.contains("L1 data cache:   16 bytes"));
        assert!(text.contains("L2 data cache:   unknown"));
    }

    #[test]
    fn test_json_report() {
        let json = render_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["features"], 0x0001_0001);
        assert_eq!(value["cache_line_sizes"]["l1_data"], 16);
        assert_eq!(value["implementation"]["label"], "SPARC-T4");
    }
}

//! Feature-bitmask assembly.
//!
//! Merges every independent data source the host offers into one
//! [`FeatureFlags`] value:
//!
//! 1. instruction-set extensions, from `getisax(2)` when the OS has it and
//!    from the textual `SI_ISALIST` otherwise;
//! 2. the machine type (`sun4v`);
//! 3. the processor implementation family from kstat `cpu_info`.
//!
//! Sources only ever add bits. A source that is missing or fails contributes
//! nothing and assembly carries on with the next one.

use tracing::{debug, warn};

use crate::domain::{FeatureFlags, Implementation};
use crate::ports::{HostInfoPort, HostQueryError, IsaWords, SysInfoQuery};

/// `getisax(2)` bits of the first word, from `<sys/auxv_SPARC.h>`.
pub mod av {
    pub const SPARC_MUL32: u32 = 0x0000_0001;
    pub const SPARC_DIV32: u32 = 0x0000_0002;
    pub const SPARC_FSMULD: u32 = 0x0000_0004;
    pub const SPARC_V8PLUS: u32 = 0x0000_0008;
    pub const SPARC_POPC: u32 = 0x0000_0010;
    pub const SPARC_VIS: u32 = 0x0000_0020;
    pub const SPARC_VIS2: u32 = 0x0000_0040;
    pub const SPARC_ASI_BLK_INIT: u32 = 0x0000_0080;
    pub const SPARC_FMAF: u32 = 0x0000_0100;
    pub const SPARC_FMAU: u32 = 0x0000_0200;
    pub const SPARC_VIS3: u32 = 0x0000_0400;
    pub const SPARC_AES: u32 = 0x0002_0000;
    pub const SPARC_SHA1: u32 = 0x0040_0000;
    pub const SPARC_SHA256: u32 = 0x0080_0000;
    pub const SPARC_SHA512: u32 = 0x0100_0000;
    pub const SPARC_CBCOND: u32 = 0x1000_0000;

    /// Second word: the 29 new floating-point and subtract instructions.
    pub const SPARC2_SPARC5: u32 = 0x0000_0008;
}

const PRIMARY_WORD: [(u32, FeatureFlags); 16] = [
    (av::SPARC_MUL32, FeatureFlags::HARDWARE_MUL32),
    (av::SPARC_DIV32, FeatureFlags::HARDWARE_DIV32),
    (av::SPARC_FSMULD, FeatureFlags::HARDWARE_FSMULD),
    (av::SPARC_V8PLUS, FeatureFlags::V9_INSTRUCTIONS),
    (av::SPARC_POPC, FeatureFlags::HARDWARE_POPC),
    (av::SPARC_VIS, FeatureFlags::VIS1_INSTRUCTIONS),
    (av::SPARC_VIS2, FeatureFlags::VIS2_INSTRUCTIONS),
    (av::SPARC_ASI_BLK_INIT, FeatureFlags::BLK_INIT_INSTRUCTIONS),
    (av::SPARC_FMAF, FeatureFlags::FMAF_INSTRUCTIONS),
    (av::SPARC_FMAU, FeatureFlags::FMAU_INSTRUCTIONS),
    (av::SPARC_VIS3, FeatureFlags::VIS3_INSTRUCTIONS),
    (av::SPARC_CBCOND, FeatureFlags::CBCOND_INSTRUCTIONS),
    (av::SPARC_AES, FeatureFlags::AES_INSTRUCTIONS),
    (av::SPARC_SHA1, FeatureFlags::SHA1_INSTRUCTION),
    (av::SPARC_SHA256, FeatureFlags::SHA256_INSTRUCTION),
    (av::SPARC_SHA512, FeatureFlags::SHA512_INSTRUCTION),
];

const SECONDARY_WORD: [(u32, FeatureFlags); 1] =
    [(av::SPARC2_SPARC5, FeatureFlags::SPARC5_INSTRUCTIONS)];

fn map_word(word: u32, table: &[(u32, FeatureFlags)]) -> FeatureFlags {
    table
        .iter()
        .filter(|(bit, _)| word & bit != 0)
        .fold(FeatureFlags::empty(), |acc, (_, flag)| acc | *flag)
}

/// Translate `getisax(2)` words into feature flags. Unknown bits are ignored.
pub fn flags_from_isa_words(words: IsaWords) -> FeatureFlags {
    let mut flags = map_word(words.primary, &PRIMARY_WORD);
    if let Some(secondary) = words.secondary {
        flags |= map_word(secondary, &SECONDARY_WORD);
    }
    flags
}

/// Derive flags from a legacy `SI_ISALIST` string.
///
/// Only the first `sparc` and the first `vis` token matter. The list is
/// ordered best-first, e.g. `"sparcv9+vis2 sparcv9+vis sparcv9 ... sparc"`.
pub fn flags_from_isa_list(list: &str) -> FeatureFlags {
    let mut flags = FeatureFlags::empty();
    let bytes = list.as_bytes();

    if let Some(pos) = list.find("sparc") {
        flags |= FeatureFlags::V8_INSTRUCTIONS;
        let variant = |offset: usize| bytes.get(pos + offset).copied();
        match (variant(5), variant(6), variant(7)) {
            (Some(b'v'), Some(b'8'), Some(b'-')) => {
                flags |= FeatureFlags::HARDWARE_MUL32 | FeatureFlags::HARDWARE_DIV32;
            }
            (Some(b'v'), Some(b'8'), Some(b'p')) | (Some(b'v'), Some(b'9'), _) => {
                flags |= FeatureFlags::GENERIC_V9;
            }
            (Some(b'v'), Some(b'8'), _) => flags |= FeatureFlags::GENERIC_V8,
            _ => {}
        }
    }

    if let Some(pos) = list.find("vis") {
        flags |= FeatureFlags::VIS1_INSTRUCTIONS;
        if bytes.get(pos + 3) == Some(&b'2') {
            flags |= FeatureFlags::VIS2_INSTRUCTIONS;
        }
    }

    flags
}

/// Outcome of [`FeatureAssembler::assemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledFeatures {
    pub features: FeatureFlags,
    pub implementation: Implementation,
}

/// Builds the feature bitmask from a [`HostInfoPort`].
pub struct FeatureAssembler<'a> {
    host: &'a dyn HostInfoPort,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(host: &'a dyn HostInfoPort) -> Self {
        Self { host }
    }

    /// OR every discovered bit into `baseline`.
    pub fn assemble(&self, baseline: FeatureFlags) -> AssembledFeatures {
        let mut features = baseline;
        features |= self.instruction_set_flags();

        if self.sysinfo_is(SysInfoQuery::Machine, "sun4v") {
            features |= FeatureFlags::SUN4V_INSTRUCTIONS;
        }

        let implementation = self.implementation();
        features |= implementation.flags();

        AssembledFeatures {
            features,
            implementation,
        }
    }

    fn instruction_set_flags(&self) -> FeatureFlags {
        let words = match self.host.isa_extensions() {
            Err(HostQueryError::Unsupported(_)) => {
                debug!("getisax(2) is not supported, using SI_ISALIST");
                return self.legacy_isa_flags();
            }
            Ok(words) => Some(words),
            Err(e) => {
                debug!(error = %e, "getisax(2) failed");
                None
            }
        };

        let mut flags = FeatureFlags::empty();
        if self.sysinfo_is(SysInfoQuery::Architecture32, "sparc") {
            flags |= FeatureFlags::V8_INSTRUCTIONS;
        }
        if self.sysinfo_is(SysInfoQuery::Architecture64, "sparcv9") {
            flags |= FeatureFlags::GENERIC_V9;
        }

        if let Some(words) = words {
            match words.secondary {
                Some(secondary) => debug!(
                    "getisax(2) returned: {:#010x}, {:#010x}",
                    words.primary, secondary
                ),
                None => debug!("getisax(2) returned: {:#010x}", words.primary),
            }
            flags |= flags_from_isa_words(words);
        }
        flags
    }

    fn legacy_isa_flags(&self) -> FeatureFlags {
        match self.host.sysinfo(SysInfoQuery::IsaList) {
            Ok(list) => flags_from_isa_list(&list),
            Err(e) => {
                debug!(error = %e, "SI_ISALIST not available");
                FeatureFlags::empty()
            }
        }
    }

    fn sysinfo_is(&self, query: SysInfoQuery, expected: &str) -> bool {
        match self.host.sysinfo(query) {
            Ok(value) => value == expected,
            Err(e) => {
                debug!(query = query.name(), error = %e, "sysinfo query failed");
                false
            }
        }
    }

    fn implementation(&self) -> Implementation {
        match self.host.cpu_implementation() {
            Ok(raw) => {
                debug!("cpu_info.implementation: {raw}");
                Implementation::from_raw(&raw)
            }
            Err(e) => {
                warn!(error = %e, "Unknown cpu info (changed kstat interface?)");
                Implementation::unknown()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImplementationFamily;
    use crate::ports::MockHostInfoPort;

    /// A host where every query is unsupported.
    fn bare_host() -> MockHostInfoPort {
        let mut host = MockHostInfoPort::new();
        host.expect_isa_extensions()
            .returning(|| Err(HostQueryError::Unsupported("getisax")));
        host.expect_sysinfo()
            .returning(|_| Err(HostQueryError::Unsupported("sysinfo")));
        host.expect_cpu_implementation()
            .returning(|| Err(HostQueryError::Unsupported("kstat")));
        host.expect_processor_count().return_const(1_usize);
        host
    }

    #[test]
    fn test_isa_words_primary() {
        let words = IsaWords {
            primary: av::SPARC_MUL32 | av::SPARC_DIV32 | av::SPARC_VIS | av::SPARC_VIS2,
            secondary: None,
        };
        assert_eq!(
            flags_from_isa_words(words),
            FeatureFlags::HARDWARE_MUL32
                | FeatureFlags::HARDWARE_DIV32
                | FeatureFlags::VIS1_INSTRUCTIONS
                | FeatureFlags::VIS2_INSTRUCTIONS
        );
    }

    #[test]
    fn test_isa_words_crypto_and_secondary() {
        let words = IsaWords {
            primary: av::SPARC_AES
                | av::SPARC_SHA1
                | av::SPARC_SHA256
                | av::SPARC_SHA512
                | av::SPARC_CBCOND
                | av::SPARC_V8PLUS,
            secondary: Some(av::SPARC2_SPARC5),
        };
        assert_eq!(
            flags_from_isa_words(words),
            FeatureFlags::AES_INSTRUCTIONS
                | FeatureFlags::SHA1_INSTRUCTION
                | FeatureFlags::SHA256_INSTRUCTION
                | FeatureFlags::SHA512_INSTRUCTION
                | FeatureFlags::CBCOND_INSTRUCTIONS
                | FeatureFlags::V9_INSTRUCTIONS
                | FeatureFlags::SPARC5_INSTRUCTIONS
        );
    }

    #[test]
    fn test_secondary_ignored_when_absent() {
        let words = IsaWords {
            primary: 0,
            secondary: None,
        };
        assert!(flags_from_isa_words(words).is_empty());
    }

    #[test]
    fn test_isa_list_plain_sparc8() {
        assert_eq!(flags_from_isa_list("sparc8"), FeatureFlags::V8_INSTRUCTIONS);
    }

    #[test]
    fn test_isa_list_v8_variants() {
        assert_eq!(
            flags_from_isa_list("sparcv8-fsmuld sparcv7 sparc"),
            FeatureFlags::V8_INSTRUCTIONS
                | FeatureFlags::HARDWARE_MUL32
                | FeatureFlags::HARDWARE_DIV32
        );
        assert_eq!(
            flags_from_isa_list("sparcv8plus sparcv8 sparc"),
            FeatureFlags::GENERIC_V9
        );
        assert_eq!(flags_from_isa_list("sparcv8"), FeatureFlags::GENERIC_V8);
        assert_eq!(flags_from_isa_list("sparcv9"), FeatureFlags::GENERIC_V9);
    }

    #[test]
    fn test_isa_list_vis_generations() {
        let list = "sparcv9+vis2 sparcv9+vis sparcv9 sparcv8plus+vis2 sparcv8plus+vis \
                    sparcv8plus sparcv8 sparcv8-fsmuld sparcv7 sparc";
        assert_eq!(
            flags_from_isa_list(list),
            FeatureFlags::GENERIC_V9
                | FeatureFlags::VIS1_INSTRUCTIONS
                | FeatureFlags::VIS2_INSTRUCTIONS
        );
        assert_eq!(
            flags_from_isa_list("sparcv9+vis sparcv9"),
            FeatureFlags::GENERIC_V9 | FeatureFlags::VIS1_INSTRUCTIONS
        );
    }

    #[test]
    fn test_isa_list_without_sparc() {
        assert!(flags_from_isa_list("amd64 i386").is_empty());
        assert!(flags_from_isa_list("").is_empty());
    }

    #[test]
    fn test_bare_host_keeps_baseline() {
        let host = bare_host();
        let baseline = FeatureFlags::from_baseline(0x8000_0001);
        let assembled = FeatureAssembler::new(&host).assemble(baseline);
        assert_eq!(assembled.features, baseline);
        assert_eq!(assembled.implementation, Implementation::unknown());
    }

    #[test]
    fn test_primary_path_adds_exactly_mapped_bits() {
        let mut host = MockHostInfoPort::new();
        host.expect_isa_extensions().returning(|| {
            Ok(IsaWords {
                primary: av::SPARC_MUL32 | av::SPARC_DIV32 | av::SPARC_VIS | av::SPARC_VIS2,
                secondary: None,
            })
        });
        host.expect_sysinfo()
            .returning(|_| Err(HostQueryError::Unsupported("sysinfo")));
        host.expect_cpu_implementation().returning(|| {
            Err(HostQueryError::Failed {
                query: "kstat cpu_info",
                reason: "no such record".to_string(),
            })
        });

        let baseline = FeatureFlags::HARDWARE_POPC;
        let assembled = FeatureAssembler::new(&host).assemble(baseline);
        assert_eq!(
            assembled.features,
            baseline
                | FeatureFlags::HARDWARE_MUL32
                | FeatureFlags::HARDWARE_DIV32
                | FeatureFlags::VIS1_INSTRUCTIONS
                | FeatureFlags::VIS2_INSTRUCTIONS
        );
    }

    #[test]
    fn test_primary_path_checks_architecture() {
        let mut host = MockHostInfoPort::new();
        host.expect_isa_extensions()
            .returning(|| Ok(IsaWords::default()));
        host.expect_sysinfo().returning(|query| match query {
            SysInfoQuery::Architecture32 => Ok("sparc".to_string()),
            SysInfoQuery::Architecture64 => Ok("sparcv9".to_string()),
            SysInfoQuery::Machine => Ok("sun4u".to_string()),
            SysInfoQuery::IsaList => panic!("legacy list read on primary path"),
        });
        host.expect_cpu_implementation()
            .returning(|| Ok("UltraSPARC-IIIi".to_string()));

        let assembled = FeatureAssembler::new(&host).assemble(FeatureFlags::empty());
        assert_eq!(assembled.features, FeatureFlags::GENERIC_V9);
        assert_eq!(
            assembled.implementation.family,
            Some(ImplementationFamily::Generic)
        );
    }

    #[test]
    fn test_legacy_path_used_when_unsupported() {
        let mut host = MockHostInfoPort::new();
        host.expect_isa_extensions()
            .returning(|| Err(HostQueryError::Unsupported("getisax")));
        host.expect_sysinfo().returning(|query| match query {
            SysInfoQuery::IsaList => Ok("sparcv8plus+vis sparcv8plus sparc".to_string()),
            SysInfoQuery::Machine => Ok("sun4u".to_string()),
            SysInfoQuery::Architecture32 | SysInfoQuery::Architecture64 => {
                panic!("architecture queried on legacy path")
            }
        });
        host.expect_cpu_implementation()
            .returning(|| Ok("UltraSPARC-II".to_string()));

        let assembled = FeatureAssembler::new(&host).assemble(FeatureFlags::empty());
        assert_eq!(
            assembled.features,
            FeatureFlags::GENERIC_V9 | FeatureFlags::VIS1_INSTRUCTIONS
        );
    }

    #[test]
    fn test_machine_type_and_family_bits() {
        let mut host = MockHostInfoPort::new();
        host.expect_isa_extensions()
            .returning(|| Ok(IsaWords::default()));
        host.expect_sysinfo().returning(|query| match query {
            SysInfoQuery::Machine => Ok("sun4v".to_string()),
            _ => Ok(String::new()),
        });
        host.expect_cpu_implementation()
            .returning(|| Ok("SPARC-M7".to_string()));

        let assembled = FeatureAssembler::new(&host).assemble(FeatureFlags::empty());
        assert_eq!(
            assembled.features,
            FeatureFlags::SUN4V_INSTRUCTIONS | FeatureFlags::M_FAMILY | FeatureFlags::T_FAMILY
        );
        assert_eq!(assembled.implementation.label, "SPARC-M7");
    }

    #[test]
    fn test_assembly_is_monotonic() {
        for baseline in [0_u32, 1, 0x00ff_ffff, 0xffff_ffff, 0x8000_0000] {
            let mut host = MockHostInfoPort::new();
            host.expect_isa_extensions().returning(|| {
                Ok(IsaWords {
                    primary: u32::MAX,
                    secondary: Some(u32::MAX),
                })
            });
            host.expect_sysinfo()
                .returning(|_| Ok("sun4v".to_string()));
            host.expect_cpu_implementation()
                .returning(|| Ok("SPARC-T1".to_string()));

            let baseline = FeatureFlags::from_baseline(baseline);
            let assembled = FeatureAssembler::new(&host).assemble(baseline);
            assert!(assembled.features.contains(baseline));
        }
    }
}

//! Hardware capability flags.
//!
//! Each bit names one instruction-set extension or architecture family that
//! the code generator may rely on. The assembler only ever sets bits; a bit
//! set by one data source is never cleared by another.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Instruction-set extensions and family markers detected on the host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct FeatureFlags: u32 {
        const V8_INSTRUCTIONS       = 1 << 0;
        const HARDWARE_MUL32        = 1 << 1;
        const HARDWARE_DIV32        = 1 << 2;
        const HARDWARE_FSMULD       = 1 << 3;
        const HARDWARE_POPC         = 1 << 4;
        const V9_INSTRUCTIONS       = 1 << 5;
        const VIS1_INSTRUCTIONS     = 1 << 6;
        const VIS2_INSTRUCTIONS     = 1 << 7;
        /// Machine type is `sun4v` (hypervisor-based).
        const SUN4V_INSTRUCTIONS    = 1 << 8;
        /// Block-init ASI stores.
        const BLK_INIT_INSTRUCTIONS = 1 << 9;
        /// Fused multiply-add.
        const FMAF_INSTRUCTIONS     = 1 << 10;
        /// Unfused multiply-add.
        const FMAU_INSTRUCTIONS     = 1 << 11;
        const VIS3_INSTRUCTIONS     = 1 << 12;
        /// Compare-and-branch.
        const CBCOND_INSTRUCTIONS   = 1 << 13;
        /// Fujitsu SPARC64 processors.
        const SPARC64_FAMILY        = 1 << 14;
        /// SPARC M-series. Always accompanied by `T_FAMILY`.
        const M_FAMILY              = 1 << 15;
        /// SPARC T-series (Niagara and successors).
        const T_FAMILY              = 1 << 16;
        /// First-generation T1 (Niagara 1).
        const T1_MODEL              = 1 << 17;
        const SPARC5_INSTRUCTIONS   = 1 << 18;
        const AES_INSTRUCTIONS      = 1 << 19;
        const SHA1_INSTRUCTION      = 1 << 20;
        const SHA256_INSTRUCTION    = 1 << 21;
        const SHA512_INSTRUCTION    = 1 << 22;

        /// Baseline SPARC V8 with hardware multiply, divide and `fsmuld`.
        const GENERIC_V8 = Self::V8_INSTRUCTIONS.bits()
            | Self::HARDWARE_MUL32.bits()
            | Self::HARDWARE_DIV32.bits()
            | Self::HARDWARE_FSMULD.bits();
        /// Everything in `GENERIC_V8` plus the V9 instruction set.
        const GENERIC_V9 = Self::GENERIC_V8.bits() | Self::V9_INSTRUCTIONS.bits();
    }
}

impl Default for FeatureFlags {
    /// No capabilities known.
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for FeatureFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FeatureFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Bits owned by the caller survive a round trip even if unnamed here.
        let bits = u32::deserialize(deserializer)?;
        Ok(Self::from_bits_retain(bits))
    }
}

impl FeatureFlags {
    /// Build flags from a caller-supplied baseline, keeping unnamed bits.
    pub const fn from_baseline(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }

    /// Fujitsu SPARC64 host.
    pub const fn is_sparc64_family(self) -> bool {
        self.contains(Self::SPARC64_FAMILY)
    }

    /// Hypervisor-based `sun4v` machine.
    pub const fn is_sun4v(self) -> bool {
        self.contains(Self::SUN4V_INSTRUCTIONS)
    }

    /// Names of every set flag, composite flags excluded.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names()
            .filter(|(_, flag)| flag.bits().count_ones() == 1)
            .map(|(name, _)| name)
            .collect()
    }
}

//! # Dump Configuration
//!
//! Knobs that change what the memory scanner emits. Defaults match what a
//! crash reporter wants on a device; the environment can turn the extended
//! per-register dump off for builds where report size matters.

use std::env;

/// Environment variable controlling [`DumpConfig::dump_memory_for_all_registers`]
///
/// `0`, `false`, `no` and `off` (any case) disable the per-register dump;
/// anything else enables it.
pub const DUMP_ALL_REGISTERS_ENV: &str = "TOMBSTONE_DUMP_ALL_REGISTERS";

/// Configuration for [`crate::scan::dump_memory_and_code_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpConfig
{
    /// Dump memory around every general-purpose register that looks like a
    /// pointer (faulting thread only). The code around `pc` and `sp` is
    /// dumped regardless.
    pub dump_memory_for_all_registers: bool,
}

impl Default for DumpConfig
{
    fn default() -> Self
    {
        Self {
            dump_memory_for_all_registers: true,
        }
    }
}

impl DumpConfig
{
    /// Defaults, overridden by `TOMBSTONE_DUMP_ALL_REGISTERS` when set.
    pub fn from_env() -> Self
    {
        let mut config = Self::default();
        if let Ok(value) = env::var(DUMP_ALL_REGISTERS_ENV) {
            config.dump_memory_for_all_registers = parse_switch(&value);
        }
        config
    }

    /// Builder-style override of the per-register dump.
    #[must_use]
    pub const fn with_all_registers(mut self, enabled: bool) -> Self
    {
        self.dump_memory_for_all_registers = enabled;
        self
    }
}

fn parse_switch(value: &str) -> bool
{
    !matches!(value.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off")
}

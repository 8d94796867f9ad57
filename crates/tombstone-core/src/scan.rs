//! # Heuristic Memory Scanner
//!
//! Shows the memory the faulting thread was looking at. Register values carry
//! no type information, so every general-purpose register is run through the
//! architecture's [`PointerFilter`](crate::machine::PointerFilter) and only
//! values that look like user-space pointers get a dump.
//!
//! The work is split in two:
//!
//! - [`plan_memory_dumps`]: pure, decides which sections to emit
//! - [`dump_memory_and_code_with`]: fetches the registers, runs the plan
//!   through a [`MemoryDumper`]
//!
//! Sections, in order:
//!
//! 1. `memory near x<n>:` for each plausible register (faulting thread and
//!    extended dumps enabled only; marked sensitive)
//! 2. `code around pc:`, always
//! 3. `code around sp:`, when `sp != pc`

use crate::config::DumpConfig;
use crate::log::LogSink;
use crate::machine::Machine;
use crate::memory::MemoryDumper;
use crate::regset::RegisterSource;
use crate::scope::ScopeFlags;
use crate::types::{Address, ThreadId};

/// One memory section to emit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDumpRequest
{
    /// Section header, without the leading blank line
    pub header: String,
    /// Address to dump around
    pub address: Address,
    /// Scope for the header and the dump
    pub scope: ScopeFlags,
}

/// Does `value` look like a pointer worth dumping around on machine `M`?
pub fn is_plausible_pointer<M: Machine>(value: u64) -> bool
{
    M::POINTER_FILTER.accepts(value)
}

/// Decide which memory sections to emit for a register snapshot.
///
/// ```rust
/// use tombstone_core::config::DumpConfig;
/// use tombstone_core::machine::arm64::UserPtRegs;
/// use tombstone_core::machine::Arm64;
/// use tombstone_core::scan::plan_memory_dumps;
/// use tombstone_core::ScopeFlags;
///
/// let mut regs = UserPtRegs::default();
/// regs.regs[0] = 0x7f00_1000;
/// regs.pc = 0x5566_0000;
/// regs.sp = 0x5566_0000;
///
/// let plan = plan_memory_dumps::<Arm64>(&regs, ScopeFlags::AT_FAULT, &DumpConfig::default());
/// let headers: Vec<_> = plan.iter().map(|r| r.header.as_str()).collect();
/// assert_eq!(headers, ["memory near x0:", "code around pc:"]);
/// ```
pub fn plan_memory_dumps<M: Machine>(regs: &M::General, scope: ScopeFlags, config: &DumpConfig) -> Vec<MemoryDumpRequest>
{
    let mut plan = Vec::new();

    if scope.is_at_fault() && config.dump_memory_for_all_registers {
        for (index, &value) in M::general_registers(regs).iter().enumerate() {
            if !is_plausible_pointer::<M>(value) {
                continue;
            }
            plan.push(MemoryDumpRequest {
                header: format!("memory near {}:", M::general_label(index)),
                address: Address::new(value),
                scope: scope.sensitive(),
            });
        }
    }

    let pc = M::program_counter(regs);
    let sp = M::stack_pointer(regs);

    plan.push(MemoryDumpRequest {
        header: "code around pc:".to_string(),
        address: Address::new(pc),
        scope,
    });

    if sp != pc {
        plan.push(MemoryDumpRequest {
            header: "code around sp:".to_string(),
            address: Address::new(sp),
            scope,
        });
    }

    plan
}

/// Dump memory around the interesting registers of `tid` to `log`
///
/// A failed register fetch ends the scan with one diagnostic line; it is
/// never returned to the caller. Failures to read the memory itself are the
/// dumper's business.
pub fn dump_memory_and_code_with<S, D>(
    source: &S,
    dumper: &mut D,
    log: &mut dyn LogSink,
    tid: ThreadId,
    scope: ScopeFlags,
    config: &DumpConfig,
) where
    S: RegisterSource + ?Sized,
    D: MemoryDumper + ?Sized,
{
    let regs = match source.fetch_general(tid) {
        Ok(regs) => regs,
        Err(err) => {
            log.log_line(scope, &format!("dump_memory_and_code: ptrace failed to get registers: {err}"));
            return;
        }
    };

    for request in plan_memory_dumps::<S::Machine>(&regs, scope, config) {
        log.log_line(request.scope, "");
        log.log_line(request.scope, &request.header);
        dumper.dump_memory(log, tid, request.address, request.scope);
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::machine::{Arm64, X86_64};

    #[test]
    fn filter_boundaries()
    {
        assert!(!is_plausible_pointer::<Arm64>(0));
        assert!(!is_plausible_pointer::<Arm64>(4095));
        assert!(is_plausible_pointer::<Arm64>(4096));
        assert!(is_plausible_pointer::<Arm64>((1 << 63) - 1));
        assert!(!is_plausible_pointer::<Arm64>(1 << 63));
        assert!(!is_plausible_pointer::<X86_64>(u64::MAX));
    }

    #[test]
    fn bystander_gets_only_code_sections()
    {
        let mut regs = crate::machine::arm64::UserPtRegs::default();
        regs.regs[3] = 0x7f00_0000;
        regs.pc = 0x1000;
        regs.sp = 0x2000;
        let plan = plan_memory_dumps::<Arm64>(&regs, ScopeFlags::BYSTANDER, &DumpConfig::default());
        let headers: Vec<_> = plan.iter().map(|r| r.header.as_str()).collect();
        assert_eq!(headers, ["code around pc:", "code around sp:"]);
        assert!(plan.iter().all(|r| !r.scope.is_sensitive()));
    }

    #[test]
    fn disabled_config_skips_registers()
    {
        let mut regs = crate::machine::arm64::UserPtRegs::default();
        regs.regs[3] = 0x7f00_0000;
        let config = DumpConfig::default().with_all_registers(false);
        let plan = plan_memory_dumps::<Arm64>(&regs, ScopeFlags::AT_FAULT, &config);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].header, "code around pc:");
    }

    #[test]
    fn x86_headers_use_register_names()
    {
        let regs = crate::machine::x86_64::UserRegsStruct {
            rdi: 0x5555_0000_1000,
            rip: 0x5555_0000_2000,
            rsp: 0x7ffe_0000_0000,
            ..Default::default()
        };
        let plan = plan_memory_dumps::<X86_64>(&regs, ScopeFlags::AT_FAULT, &DumpConfig::default());
        let headers: Vec<_> = plan.iter().map(|r| r.header.as_str()).collect();
        assert_eq!(headers, ["memory near rdi:", "code around pc:", "code around sp:"]);
    }
}

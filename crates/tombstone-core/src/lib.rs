//! # tombstone-core
//!
//! Register and memory introspection of a stopped thread, for crash reports
//! ("tombstones").
//!
//! This crate provides the two register sections of a tombstone:
//! - All registers of a thread, as fixed-width hex rows ([`dump_registers`])
//! - Memory around the registers of the faulting thread that look like
//!   pointers, plus the code around `pc` and `sp` ([`dump_memory_and_code`])
//!
//! ## Collaborators
//!
//! Attaching to and stopping the thread, assembling the rest of the report
//! and deciding where it goes all happen elsewhere. The dump code only talks
//! to its surroundings through traits:
//!
//! - [`regset::RegisterSource`]: register set fetches (`PTRACE_GETREGSET`)
//! - [`memory::MemoryDumper`]: bounded memory windows (`PTRACE_PEEKDATA`)
//! - [`log::LogSink`]: the report, routed by [`ScopeFlags`]
//!
//! ## Platform Support
//!
//! - **Linux and Android / ARM64**: `x0`-`x30`, `sp`, `pc`, `v0`-`v31`
//! - **Linux and Android / x86-64**: `rax`-`r15`, `rsp`, `rip`, `xmm0`-`xmm15`
//!
//! Both layouts compile everywhere (so reports can be rendered and tested off
//! target); the ptrace backend uses the build target's one.
//!
//! ## Why unsafe code is needed
//!
//! `ptrace(2)` is a raw system call writing into buffers we hand it. The
//! calls are wrapped in safe functions in [`regset`] and [`memory`].

#![allow(unsafe_code)] // Required for ptrace

pub mod config;
pub mod error;
pub mod log;
pub mod machine;
pub mod memory;
pub mod registers;
pub mod regset;
pub mod scan;
pub mod scope;
pub mod types;

pub use config::DumpConfig;
pub use error::{TombstoneError, TombstoneResult};
pub use log::{CapturedLog, LogSink, ReportLog};
pub use machine::Machine;
pub use registers::dump_registers_with;
pub use scan::dump_memory_and_code_with;
pub use scope::ScopeFlags;
pub use types::{Address, ThreadId};

#[cfg(any(target_arch = "aarch64", target_arch = "x86_64"))]
pub use machine::NativeMachine;

/// Dump every register of the stopped thread `tid` to `log`.
///
/// The calling thread must be the ptrace tracer of `tid`. Errors are written
/// to `log`, never returned.
#[cfg(any(target_arch = "aarch64", target_arch = "x86_64"))]
pub fn dump_registers(log: &mut dyn LogSink, tid: ThreadId, scope: ScopeFlags)
{
    let source = regset::PtraceRegisterSource::native();
    dump_registers_with(&source, log, tid, scope);
}

/// Dump memory around `pc`, `sp` and (when `scope` is at fault) every
/// register of `tid` that looks like a pointer.
///
/// Reads [`DumpConfig::from_env`]. The calling thread must be the ptrace
/// tracer of `tid`.
#[cfg(any(target_arch = "aarch64", target_arch = "x86_64"))]
pub fn dump_memory_and_code(log: &mut dyn LogSink, tid: ThreadId, scope: ScopeFlags)
{
    let source = regset::PtraceRegisterSource::native();
    let mut dumper = memory::WindowDumper::ptrace();
    dump_memory_and_code_with(&source, &mut dumper, log, tid, scope, &DumpConfig::from_env());
}

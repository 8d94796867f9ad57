//! # Register Set Fetching
//!
//! The register reader and the memory scanner get register snapshots through
//! [`RegisterSource`]. Each fetch is one independent OS request that may fail
//! on its own: a thread can hand out its general registers and then refuse the
//! FP/SIMD set (or exit in between).
//!
//! [`PtraceRegisterSource`] is the Linux (and Android) implementation. It issues
//! `PTRACE_GETREGSET` with an `iovec` sized to the architecture struct:
//!
//! - `NT_PRSTATUS` (1): general-purpose registers, `sp`, `pc`
//! - `NT_PRFPREG` (2): FP/SIMD registers
//!
//! The caller must already be the tracer of the thread and the thread must be
//! in a ptrace stop.
//!
//! ## References
//!
//! - [ptrace(2)](https://man7.org/linux/man-pages/man2/ptrace.2.html)

use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::error::{TombstoneError, TombstoneResult};
use crate::machine::Machine;
use crate::types::ThreadId;

/// Which register group to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterSetKind
{
    /// General-purpose registers plus `sp` and `pc` (`NT_PRSTATUS`)
    General,
    /// Floating-point / SIMD registers (`NT_PRFPREG`)
    Vector,
}

impl RegisterSetKind
{
    /// ELF note type the kernel uses for this group.
    pub const fn note_type(self) -> u32
    {
        match self {
            RegisterSetKind::General => 1,
            RegisterSetKind::Vector => 2,
        }
    }
}

impl fmt::Display for RegisterSetKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            RegisterSetKind::General => f.write_str("general-purpose"),
            RegisterSetKind::Vector => f.write_str("floating-point"),
        }
    }
}

/// Source of register snapshots for one architecture
///
/// Implementations must not modify the thread.
pub trait RegisterSource
{
    /// Layout of the snapshots this source produces.
    type Machine: Machine;

    /// Fetch the general-purpose register set.
    fn fetch_general(&self, tid: ThreadId) -> TombstoneResult<<Self::Machine as Machine>::General>;

    /// Fetch the FP/SIMD register set.
    fn fetch_vector(&self, tid: ThreadId) -> TombstoneResult<<Self::Machine as Machine>::Vector>;
}

impl<S: RegisterSource + ?Sized> RegisterSource for &S
{
    type Machine = S::Machine;

    fn fetch_general(&self, tid: ThreadId) -> TombstoneResult<<Self::Machine as Machine>::General>
    {
        (**self).fetch_general(tid)
    }

    fn fetch_vector(&self, tid: ThreadId) -> TombstoneResult<<Self::Machine as Machine>::Vector>
    {
        (**self).fetch_vector(tid)
    }
}

/// `PTRACE_GETREGSET` backed source for machine `M`
///
/// Only meaningful for the build target's own architecture; use
/// [`PtraceRegisterSource::native`].
#[derive(Debug)]
pub struct PtraceRegisterSource<M>
{
    machine: PhantomData<M>,
}

#[cfg(any(target_arch = "aarch64", target_arch = "x86_64"))]
impl PtraceRegisterSource<crate::machine::NativeMachine>
{
    /// Source for the build target's architecture.
    pub const fn native() -> Self
    {
        Self { machine: PhantomData }
    }
}

#[cfg(any(target_arch = "aarch64", target_arch = "x86_64"))]
impl Default for PtraceRegisterSource<crate::machine::NativeMachine>
{
    fn default() -> Self
    {
        Self::native()
    }
}

#[cfg(any(target_arch = "aarch64", target_arch = "x86_64"))]
impl RegisterSource for PtraceRegisterSource<crate::machine::NativeMachine>
{
    type Machine = crate::machine::NativeMachine;

    fn fetch_general(&self, tid: ThreadId) -> TombstoneResult<<Self::Machine as Machine>::General>
    {
        fetch_register_set(tid, RegisterSetKind::General)
    }

    fn fetch_vector(&self, tid: ThreadId) -> TombstoneResult<<Self::Machine as Machine>::Vector>
    {
        fetch_register_set(tid, RegisterSetKind::Vector)
    }
}

/// Read one register set of `tid` into a `T`.
///
/// The kernel reports how much of the buffer it filled; anything short of a
/// whole `T` is rejected rather than shown half-zeroed.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn fetch_register_set<T: crate::machine::PlainRegisterSet>(tid: ThreadId, kind: RegisterSetKind) -> TombstoneResult<T>
{
    use std::mem::{size_of, MaybeUninit};

    let expected = size_of::<T>();
    let mut regs = MaybeUninit::<T>::zeroed();
    let mut io = libc::iovec {
        iov_base: regs.as_mut_ptr().cast::<libc::c_void>(),
        iov_len: expected,
    };

    debug!(tid = tid.raw(), %kind, bytes = expected, "PTRACE_GETREGSET");

    // SAFETY: `io` describes `expected` writable bytes owned by `regs`, and
    // the kernel writes at most `iov_len` bytes.
    let result = unsafe {
        libc::ptrace(
            libc::PTRACE_GETREGSET,
            tid.raw(),
            libc::c_ulong::from(kind.note_type()) as *mut libc::c_void,
            std::ptr::addr_of_mut!(io).cast::<libc::c_void>(),
        )
    };
    if result == -1 {
        return Err(TombstoneError::register_read_from_errno(kind, tid));
    }
    if io.iov_len < expected {
        return Err(TombstoneError::ShortRegisterSet {
            kind,
            expected,
            actual: io.iov_len,
        });
    }

    // SAFETY: zero-initialised and `PlainRegisterSet` guarantees every bit
    // pattern is valid; the kernel filled the whole struct.
    Ok(unsafe { regs.assume_init() })
}

/// Read one register set of `tid` into a `T`.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn fetch_register_set<T: crate::machine::PlainRegisterSet>(tid: ThreadId, kind: RegisterSetKind) -> TombstoneResult<T>
{
    debug!(tid = tid.raw(), %kind, "no register set backend");
    Err(TombstoneError::Unsupported(format!(
        "reading {kind} registers needs PTRACE_GETREGSET (Linux or Android)"
    )))
}

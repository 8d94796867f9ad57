//! # Machine Register Layouts
//!
//! Each supported architecture describes the two register groups the kernel
//! hands out for a stopped thread:
//!
//! - **General**: the `NT_PRSTATUS` regset (general-purpose registers, `sp`,
//!   `pc`, flags)
//! - **Vector**: the `NT_PRFPREG` regset (floating-point / SIMD registers)
//!
//! The raw structs mirror the kernel's `struct user_*` layouts byte for byte
//! so they can be filled by `PTRACE_GETREGSET` directly. Everything the dump
//! code needs (register lists, labels, pointer bounds) is reached through the
//! [`Machine`] trait, so the register reader and the scanner never look at an
//! architecture-specific field.
//!
//! Both layouts are always compiled; [`NativeMachine`] picks the one matching
//! the build target.
//!
//! ## References
//!
//! - [arch/arm64/include/uapi/asm/ptrace.h](https://github.com/torvalds/linux/blob/master/arch/arm64/include/uapi/asm/ptrace.h)
//! - [arch/x86/include/asm/user_64.h](https://github.com/torvalds/linux/blob/master/arch/x86/include/asm/user_64.h)

use std::borrow::Cow;

use smallvec::SmallVec;

pub mod arm64;
pub mod x86_64;

pub use arm64::Arm64;
pub use x86_64::X86_64;

/// Register values of one group, in display order.
///
/// 32 slots cover every group of every supported architecture, so the list
/// never spills to the heap.
pub type RegisterValues = SmallVec<[u64; 32]>;

/// Architecture of the build target
#[cfg(target_arch = "aarch64")]
pub type NativeMachine = Arm64;

/// Architecture of the build target
#[cfg(target_arch = "x86_64")]
pub type NativeMachine = X86_64;

/// Bounds a register value must fall in before it is treated as a pointer
///
/// Values below `min_address` are small integers or near-null; values at or
/// above `kernel_start` are kernel addresses or not canonical at all. Both
/// kinds are skipped. Some real pointers are skipped too (tagged pointers with
/// the top bit set, for instance); that is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerFilter
{
    /// Lowest value accepted (inclusive).
    pub min_address: u64,
    /// First value rejected as kernel space (exclusive upper bound).
    pub kernel_start: u64,
}

impl PointerFilter
{
    /// One page: anything below is a small integer or a near-null pointer.
    pub const PAGE_FLOOR: u64 = 4096;

    /// Top bit of the 64-bit range: the user/kernel split of a 64-bit
    /// address space.
    pub const KERNEL_SPLIT_64: u64 = 1 << 63;

    /// Filter for 64-bit address spaces split at the top bit.
    pub const LP64: Self = Self {
        min_address: Self::PAGE_FLOOR,
        kernel_start: Self::KERNEL_SPLIT_64,
    };

    /// Does `value` look like a user-space pointer worth dumping around?
    ///
    /// ```rust
    /// use tombstone_core::machine::PointerFilter;
    ///
    /// let filter = PointerFilter::LP64;
    /// assert!(!filter.accepts(0xfff));
    /// assert!(filter.accepts(0x1000));
    /// assert!(filter.accepts(0x7fff_ffff_ffff_ffff));
    /// assert!(!filter.accepts(0x8000_0000_0000_0000));
    /// ```
    pub const fn accepts(&self, value: u64) -> bool
    {
        value >= self.min_address && value < self.kernel_start
    }
}

/// Marker for raw register structs that `PTRACE_GETREGSET` may fill in
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` structs made only of integers and
/// integer arrays, so that every bit pattern (all zeroes in particular) is a
/// valid value.
pub unsafe trait PlainRegisterSet: Copy {}

/// Register layout of one architecture
///
/// ## Rendering contract
///
/// - `general_registers` lists the registers shown in the general rows and
///   scanned for pointers, in index order; `sp` and `pc` are not part of it.
/// - `vector_registers` lists the FP/SIMD registers as 64-bit display values.
/// - labels are at most three characters when the architecture names its
///   registers by index (`x0`, `v31`).
pub trait Machine
{
    /// Short architecture name, used in diagnostics.
    const NAME: &'static str;

    /// Pointer bounds used by the memory scanner.
    const POINTER_FILTER: PointerFilter = PointerFilter::LP64;

    /// Raw `NT_PRSTATUS` register set.
    type General: PlainRegisterSet;

    /// Raw `NT_PRFPREG` register set.
    type Vector: PlainRegisterSet;

    /// General-purpose registers, in index order.
    fn general_registers(regs: &Self::General) -> RegisterValues;

    /// Stack pointer.
    fn stack_pointer(regs: &Self::General) -> u64;

    /// Program counter.
    fn program_counter(regs: &Self::General) -> u64;

    /// FP/SIMD registers as shown in the report, in index order.
    fn vector_registers(regs: &Self::Vector) -> RegisterValues;

    /// Label of general-purpose register `index`.
    ///
    /// `index` is below the length of [`Machine::general_registers`];
    /// implementations may panic otherwise.
    fn general_label(index: usize) -> Cow<'static, str>;

    /// Label of vector register `index`, below the length of
    /// [`Machine::vector_registers`].
    fn vector_label(index: usize) -> Cow<'static, str>;
}

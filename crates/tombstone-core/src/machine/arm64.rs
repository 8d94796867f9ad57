//! # ARM64 Register Layout
//!
//! ARM64 has 31 general-purpose registers (X0-X30) plus special registers:
//!
//! - **X0-X28**: General-purpose registers (29 registers)
//! - **X29 (FP)**: Frame pointer
//! - **X30 (LR)**: Link register (return address)
//! - **SP**: Stack pointer
//! - **PC**: Program counter
//! - **PSTATE**: Processor state (flags)
//!
//! The FP/SIMD set holds 32 128-bit registers (V0-V31) plus FPSR and FPCR.
//! Reports show the low 64 bits of each vector register, which is what the
//! existing tombstone parsers expect.
//!
//! ## References
//!
//! - [ARM64 Register Layout](https://developer.arm.com/documentation/102374/0101/Registers-in-AArch64---general-purpose-registers)

use std::borrow::Cow;

use super::{Machine, PlainRegisterSet, RegisterValues};

/// Number of general-purpose registers (X0-X30)
pub const GENERAL_REGISTER_COUNT: usize = 31;

/// Number of SIMD registers (V0-V31)
pub const VECTOR_REGISTER_COUNT: usize = 32;

/// Kernel `struct user_pt_regs`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserPtRegs
{
    /// X0-X30
    pub regs: [u64; GENERAL_REGISTER_COUNT],
    /// Stack pointer
    pub sp: u64,
    /// Program counter
    pub pc: u64,
    /// Processor state
    pub pstate: u64,
}

/// Kernel `struct user_fpsimd_state`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserFpsimdState
{
    /// V0-V31
    pub vregs: [u128; VECTOR_REGISTER_COUNT],
    /// Floating-Point Status Register
    pub fpsr: u32,
    /// Floating-Point Control Register
    pub fpcr: u32,
    reserved: [u32; 2],
}

impl UserFpsimdState
{
    /// Build a state from vector register values, with FPSR/FPCR cleared.
    pub fn from_vregs(vregs: [u128; VECTOR_REGISTER_COUNT]) -> Self
    {
        Self {
            vregs,
            ..Self::default()
        }
    }
}

// SAFETY: both are repr(C) structs of integers only.
unsafe impl PlainRegisterSet for UserPtRegs {}
unsafe impl PlainRegisterSet for UserFpsimdState {}

/// ARM64 (AArch64) layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Arm64;

impl Machine for Arm64
{
    const NAME: &'static str = "arm64";

    type General = UserPtRegs;
    type Vector = UserFpsimdState;

    fn general_registers(regs: &UserPtRegs) -> RegisterValues
    {
        RegisterValues::from_slice(&regs.regs)
    }

    fn stack_pointer(regs: &UserPtRegs) -> u64
    {
        regs.sp
    }

    fn program_counter(regs: &UserPtRegs) -> u64
    {
        regs.pc
    }

    fn vector_registers(regs: &UserFpsimdState) -> RegisterValues
    {
        // Low half only.
        regs.vregs.iter().map(|&v| v as u64).collect()
    }

    fn general_label(index: usize) -> Cow<'static, str>
    {
        Cow::Owned(format!("x{index}"))
    }

    fn vector_label(index: usize) -> Cow<'static, str>
    {
        Cow::Owned(format!("v{index}"))
    }
}

//! # x86-64 Register Layout
//!
//! The general rows list the 15 integer registers other than RSP, in the
//! conventional order (RAX, RBX, RCX, RDX, RSI, RDI, RBP, R8-R15). RSP and RIP
//! are the stack pointer and program counter.
//!
//! The vector rows show XMM0-XMM15 from the FXSAVE area (low 64 bits each).

use std::borrow::Cow;

use super::{Machine, PlainRegisterSet, RegisterValues};

/// Number of integer registers in the general rows (RSP excluded)
pub const GENERAL_REGISTER_COUNT: usize = 15;

/// Number of XMM registers in the FXSAVE area
pub const VECTOR_REGISTER_COUNT: usize = 16;

static GENERAL_LABELS: [&str; GENERAL_REGISTER_COUNT] = [
    "rax", "rbx", "rcx", "rdx", "rsi", "rdi", "rbp", "r8", "r9", "r10", "r11", "r12", "r13", "r14", "r15",
];

/// Kernel `struct user_regs_struct`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct UserRegsStruct
{
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub rbp: u64,
    pub rbx: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rax: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub orig_rax: u64,
    pub rip: u64,
    pub cs: u64,
    pub eflags: u64,
    pub rsp: u64,
    pub ss: u64,
    pub fs_base: u64,
    pub gs_base: u64,
    pub ds: u64,
    pub es: u64,
    pub fs: u64,
    pub gs: u64,
}

/// Kernel `struct user_i387_struct` (the FXSAVE image)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct UserFpregsStruct
{
    pub cwd: u16,
    pub swd: u16,
    pub ftw: u16,
    pub fop: u16,
    pub rip: u64,
    pub rdp: u64,
    pub mxcsr: u32,
    pub mxcr_mask: u32,
    /// 8 x87 registers, 16 bytes each
    pub st_space: [u32; 32],
    /// 16 XMM registers, 16 bytes each
    pub xmm_space: [u32; 64],
    padding: [u32; 24],
}

impl Default for UserFpregsStruct
{
    fn default() -> Self
    {
        Self {
            cwd: 0,
            swd: 0,
            ftw: 0,
            fop: 0,
            rip: 0,
            rdp: 0,
            mxcsr: 0,
            mxcr_mask: 0,
            st_space: [0; 32],
            xmm_space: [0; 64],
            padding: [0; 24],
        }
    }
}

impl UserFpregsStruct
{
    /// Low 64 bits of XMM register `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= VECTOR_REGISTER_COUNT`.
    pub fn xmm_low(&self, index: usize) -> u64
    {
        let base = index * 4;
        u64::from(self.xmm_space[base]) | (u64::from(self.xmm_space[base + 1]) << 32)
    }

    /// Store the low 64 bits of XMM register `index` (high half cleared).
    ///
    /// # Panics
    ///
    /// Panics if `index >= VECTOR_REGISTER_COUNT`.
    pub fn set_xmm_low(&mut self, index: usize, value: u64)
    {
        let base = index * 4;
        self.xmm_space[base] = (value & 0xffff_ffff) as u32;
        self.xmm_space[base + 1] = (value >> 32) as u32;
        self.xmm_space[base + 2] = 0;
        self.xmm_space[base + 3] = 0;
    }
}

// SAFETY: both are repr(C) structs of integers only.
unsafe impl PlainRegisterSet for UserRegsStruct {}
unsafe impl PlainRegisterSet for UserFpregsStruct {}

/// x86-64 layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct X86_64;

impl Machine for X86_64
{
    const NAME: &'static str = "x86_64";

    type General = UserRegsStruct;
    type Vector = UserFpregsStruct;

    fn general_registers(regs: &UserRegsStruct) -> RegisterValues
    {
        let values: [u64; GENERAL_REGISTER_COUNT] = [
            regs.rax, regs.rbx, regs.rcx, regs.rdx, regs.rsi, regs.rdi, regs.rbp, regs.r8, regs.r9, regs.r10,
            regs.r11, regs.r12, regs.r13, regs.r14, regs.r15,
        ];
        RegisterValues::from_slice(&values)
    }

    fn stack_pointer(regs: &UserRegsStruct) -> u64
    {
        regs.rsp
    }

    fn program_counter(regs: &UserRegsStruct) -> u64
    {
        regs.rip
    }

    fn vector_registers(regs: &UserFpregsStruct) -> RegisterValues
    {
        (0..VECTOR_REGISTER_COUNT).map(|i| regs.xmm_low(i)).collect()
    }

    fn general_label(index: usize) -> Cow<'static, str>
    {
        Cow::Borrowed(GENERAL_LABELS[index])
    }

    fn vector_label(index: usize) -> Cow<'static, str>
    {
        Cow::Owned(format!("xmm{index}"))
    }
}

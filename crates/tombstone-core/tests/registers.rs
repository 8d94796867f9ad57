//! Tests for the register section

use std::borrow::Cow;
use std::cell::Cell;
use std::io;

use tombstone_core::machine::arm64::{UserFpsimdState, UserPtRegs};
use tombstone_core::machine::x86_64::{UserFpregsStruct, UserRegsStruct};
use tombstone_core::machine::{Arm64, Machine, X86_64};
use tombstone_core::registers::format_register_rows;
use tombstone_core::regset::{RegisterSetKind, RegisterSource};
use tombstone_core::{dump_registers_with, CapturedLog, ScopeFlags, ThreadId, TombstoneError, TombstoneResult};

const ESRCH: i32 = 3;

/// Register source returning canned snapshots and counting fetches
struct FakeSource<M: Machine>
{
    general: Option<M::General>,
    vector: Option<M::Vector>,
    general_calls: Cell<usize>,
    vector_calls: Cell<usize>,
}

impl<M: Machine> FakeSource<M>
{
    fn new(general: Option<M::General>, vector: Option<M::Vector>) -> Self
    {
        Self {
            general,
            vector,
            general_calls: Cell::new(0),
            vector_calls: Cell::new(0),
        }
    }
}

fn gone(kind: RegisterSetKind, tid: ThreadId) -> TombstoneError
{
    TombstoneError::RegisterRead {
        kind,
        thread: tid,
        source: io::Error::from_raw_os_error(ESRCH),
    }
}

impl<M: Machine> RegisterSource for FakeSource<M>
{
    type Machine = M;

    fn fetch_general(&self, tid: ThreadId) -> TombstoneResult<M::General>
    {
        self.general_calls.set(self.general_calls.get() + 1);
        self.general.ok_or_else(|| gone(RegisterSetKind::General, tid))
    }

    fn fetch_vector(&self, tid: ThreadId) -> TombstoneResult<M::Vector>
    {
        self.vector_calls.set(self.vector_calls.get() + 1);
        self.vector.ok_or_else(|| gone(RegisterSetKind::Vector, tid))
    }
}

fn crash_regs() -> UserPtRegs
{
    let mut regs = UserPtRegs::default();
    regs.regs[0] = 0;
    regs.regs[1] = 1;
    regs.regs[2] = 0x1000;
    regs.regs[3] = 0x7fff_aabb_ccdd_0000;
    for (i, reg) in regs.regs.iter_mut().enumerate().skip(4) {
        *reg = i as u64;
    }
    regs.sp = 0x7fff_aabb_ccdd_0000;
    regs.pc = 0x0000_5566_0000_1000;
    regs
}

fn crash_vregs() -> UserFpsimdState
{
    let mut vregs = [0u128; 32];
    vregs[1] = 0x3ff0_0000_0000_0000;
    vregs[31] = 0xffff_0000_0000_0000_0000_0000_0000_0031;
    UserFpsimdState::from_vregs(vregs)
}

const TID: ThreadId = ThreadId(1234);

fn assert_hex_fields(row: &str)
{
    let body = row.strip_prefix("    ").expect("rows are indented by four spaces");
    for field in body.split("  ").filter(|f| !f.trim().is_empty()) {
        let field = field.trim();
        if field.len() == 16 {
            assert!(field.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()), "{field:?}");
        }
    }
}

#[test]
fn test_arm64_full_dump()
{
    let source = FakeSource::<Arm64>::new(Some(crash_regs()), Some(crash_vregs()));
    let mut log = CapturedLog::new();

    dump_registers_with(&source, &mut log, TID, ScopeFlags::AT_FAULT);

    let lines: Vec<&str> = log.lines().collect();
    // 31 GP registers -> 8 rows, one sp/pc row, 32 vector registers -> 8 rows
    assert_eq!(lines.len(), 8 + 1 + 8);
    assert_eq!(
        lines[0],
        "    x0   0000000000000000  x1   0000000000000001  x2   0000000000001000  x3   7fffaabbccdd0000"
    );
    assert_eq!(
        lines[7],
        "    x28  000000000000001c  x29  000000000000001d  x30  000000000000001e"
    );
    assert_eq!(lines[8], "    sp   7fffaabbccdd0000  pc   0000556600001000");
    assert_eq!(
        lines[9],
        "    v0   0000000000000000  v1   3ff0000000000000  v2   0000000000000000  v3   0000000000000000"
    );
    assert!(lines[16].ends_with("v31  0000000000000031"));

    for line in &lines {
        assert_hex_fields(line);
    }
    assert!(log.entries().iter().all(|(scope, _)| *scope == ScopeFlags::AT_FAULT));
}

#[test]
fn test_general_failure_stops_everything()
{
    let source = FakeSource::<Arm64>::new(None, Some(crash_vregs()));
    let mut log = CapturedLog::new();

    dump_registers_with(&source, &mut log, TID, ScopeFlags::AT_FAULT);

    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0], "ptrace error: No such process");
    assert_eq!(source.general_calls.get(), 1);
    assert_eq!(source.vector_calls.get(), 0);
}

#[test]
fn test_vector_failure_keeps_general_rows()
{
    let source = FakeSource::<Arm64>::new(Some(crash_regs()), None);
    let mut log = CapturedLog::new();

    dump_registers_with(&source, &mut log, TID, ScopeFlags::BYSTANDER);

    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 8 + 1 + 1);
    assert!(lines[0].starts_with("    x0   "));
    assert!(lines[8].starts_with("    sp   "));
    assert_eq!(lines[9], "ptrace error: No such process");
    assert_eq!(source.vector_calls.get(), 1);
}

#[test]
fn test_repeated_dump_is_identical()
{
    let source = FakeSource::<Arm64>::new(Some(crash_regs()), Some(crash_vregs()));
    let mut first = CapturedLog::new();
    let mut second = CapturedLog::new();

    dump_registers_with(&source, &mut first, TID, ScopeFlags::AT_FAULT);
    dump_registers_with(&source, &mut second, TID, ScopeFlags::AT_FAULT);

    assert_eq!(first.text(), second.text());
}

#[test]
fn test_x86_64_layout()
{
    let regs = UserRegsStruct {
        rax: 0xa,
        r13: 0xd13,
        r14: 0xd14,
        r15: 0xd15,
        rsp: 0x7ffd_1000,
        rip: 0x5555_5555_4000,
        ..UserRegsStruct::default()
    };
    let mut fp = UserFpregsStruct::default();
    fp.set_xmm_low(15, 0x1234);
    let source = FakeSource::<X86_64>::new(Some(regs), Some(fp));
    let mut log = CapturedLog::new();

    dump_registers_with(&source, &mut log, TID, ScopeFlags::AT_FAULT);

    let lines: Vec<&str> = log.lines().collect();
    // 15 GP registers -> 4 rows, one sp/pc row, 16 XMM registers -> 4 rows
    assert_eq!(lines.len(), 4 + 1 + 4);
    assert!(lines[0].starts_with("    rax  000000000000000a  rbx  "));
    assert_eq!(
        lines[3],
        "    r13  0000000000000d13  r14  0000000000000d14  r15  0000000000000d15"
    );
    assert_eq!(lines[4], "    sp   000000007ffd1000  pc   0000555555554000");
    assert!(lines[8].ends_with("xmm15  0000000000001234"));
}

#[test]
fn test_row_count_is_ceiling_of_quarter()
{
    for count in 0..=40usize {
        let values: Vec<u64> = (0..count as u64).collect();
        let rows = format_register_rows(&values, |i| Cow::Owned(format!("x{i}")));

        assert_eq!(rows.len(), count.div_ceil(4), "count {count}");
        if let Some(last) = rows.last() {
            let expected = if count % 4 == 0 { 4 } else { count % 4 };
            let fields = last.matches(|c: char| c == 'x').count();
            assert_eq!(fields, expected, "count {count}: {last:?}");
        }
    }
}

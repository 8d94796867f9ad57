//! Tests for the memory scanner

use std::io;

use tombstone_core::machine::arm64::UserPtRegs;
use tombstone_core::machine::Arm64;
use tombstone_core::memory::MemoryDumper;
use tombstone_core::regset::{RegisterSetKind, RegisterSource};
use tombstone_core::{
    dump_memory_and_code_with, Address, CapturedLog, DumpConfig, LogSink, ScopeFlags, ThreadId, TombstoneError,
    TombstoneResult,
};

const TID: ThreadId = ThreadId(77);

/// Source with a fixed general register set; the vector set is never needed
struct FixedSource(Option<UserPtRegs>);

impl RegisterSource for FixedSource
{
    type Machine = Arm64;

    fn fetch_general(&self, tid: ThreadId) -> TombstoneResult<UserPtRegs>
    {
        self.0.ok_or_else(|| TombstoneError::RegisterRead {
            kind: RegisterSetKind::General,
            thread: tid,
            source: io::Error::from_raw_os_error(1),
        })
    }

    fn fetch_vector(&self, _tid: ThreadId) -> TombstoneResult<<Arm64 as tombstone_core::Machine>::Vector>
    {
        panic!("the scanner must not fetch the vector registers");
    }
}

/// Dumper that records each call and writes one marker line
#[derive(Default)]
struct RecordingDumper
{
    calls: Vec<(Address, ScopeFlags)>,
}

impl MemoryDumper for RecordingDumper
{
    fn dump_memory(&mut self, log: &mut dyn LogSink, tid: ThreadId, address: Address, scope: ScopeFlags)
    {
        assert_eq!(tid, TID);
        self.calls.push((address, scope));
        log.log_line(scope, &format!("<dump {address}>"));
    }
}

fn scan(regs: Option<UserPtRegs>, scope: ScopeFlags, config: &DumpConfig) -> (CapturedLog, RecordingDumper)
{
    let mut log = CapturedLog::new();
    let mut dumper = RecordingDumper::default();
    dump_memory_and_code_with(&FixedSource(regs), &mut dumper, &mut log, TID, scope, config);
    (log, dumper)
}

fn regs_with(values: &[u64], sp: u64, pc: u64) -> UserPtRegs
{
    let mut regs = UserPtRegs::default();
    regs.regs[..values.len()].copy_from_slice(values);
    regs.sp = sp;
    regs.pc = pc;
    regs
}

#[test]
fn test_crash_scenario()
{
    // x4..x30 hold small integers, all below the one-page floor
    let mut values = vec![0, 1, 0x1000, 0x7fff_aabb_ccdd_0000];
    values.extend((4..31u64).map(|i| i * 100 + 7));
    assert!(values[4..].iter().all(|&v| v < 4096));
    let regs = regs_with(&values, 0x7fff_aabb_ccdd_0000, 0x0000_5566_0000_1000);
    let (log, dumper) = scan(Some(regs), ScopeFlags::AT_FAULT, &DumpConfig::default());

    let addresses: Vec<u64> = dumper.calls.iter().map(|(a, _)| a.value()).collect();
    assert_eq!(
        addresses,
        [0x1000, 0x7fff_aabb_ccdd_0000, 0x0000_5566_0000_1000, 0x7fff_aabb_ccdd_0000]
    );

    let text = log.text();
    assert!(text.starts_with("\nmemory near x2:\n<dump 0x0000000000001000>\n"));
    assert!(text.contains("\nmemory near x3:\n"));
    assert!(text.contains("\ncode around pc:\n<dump 0x0000556600001000>\n"));
    assert!(text.ends_with("\ncode around sp:\n<dump 0x7fffaabbccdd0000>\n"));
    for index in [0, 1].into_iter().chain(4..31) {
        assert!(!text.contains(&format!("memory near x{index}:")), "x{index} was dumped");
    }
    assert_eq!(text.matches("memory near").count(), 2);
}

#[test]
fn test_register_sections_are_sensitive()
{
    let regs = regs_with(&[0x7f00_0000], 0x2000, 0x1000);
    let (log, dumper) = scan(Some(regs), ScopeFlags::AT_FAULT, &DumpConfig::default());

    assert_eq!(dumper.calls[0].1, ScopeFlags::AT_FAULT | ScopeFlags::SENSITIVE);
    assert_eq!(dumper.calls[1].1, ScopeFlags::AT_FAULT);
    assert_eq!(dumper.calls[2].1, ScopeFlags::AT_FAULT);

    for (scope, line) in log.entries() {
        if line == "memory near x0:" {
            assert!(scope.is_sensitive());
        }
        if line.starts_with("code around") {
            assert!(!scope.is_sensitive());
        }
    }
}

#[test]
fn test_register_read_failure_logs_and_stops()
{
    let (log, dumper) = scan(None, ScopeFlags::AT_FAULT, &DumpConfig::default());

    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0], "dump_memory_and_code: ptrace failed to get registers: Operation not permitted");
    assert!(dumper.calls.is_empty());
}

#[test]
fn test_pc_always_dumped()
{
    // pc = 0 would never pass the pointer filter
    let regs = regs_with(&[], 0, 0);
    let (log, dumper) = scan(Some(regs), ScopeFlags::BYSTANDER, &DumpConfig::default());

    assert_eq!(dumper.calls, [(Address::ZERO, ScopeFlags::BYSTANDER)]);
    assert_eq!(log.text(), "\ncode around pc:\n<dump 0x0000000000000000>\n");
}

#[test]
fn test_sp_dumped_iff_distinct()
{
    let same = regs_with(&[], 0x5000, 0x5000);
    let (_, dumper) = scan(Some(same), ScopeFlags::AT_FAULT, &DumpConfig::default());
    assert_eq!(dumper.calls.len(), 1);

    let distinct = regs_with(&[], 0x5008, 0x5000);
    let (_, dumper) = scan(Some(distinct), ScopeFlags::AT_FAULT, &DumpConfig::default());
    assert_eq!(dumper.calls.len(), 2);
    assert_eq!(dumper.calls[1].0, Address::new(0x5008));
}

#[test]
fn test_filter_decides_register_dumps()
{
    let cases: [(u64, bool); 10] = [
        (0, false),
        (1, false),
        (0xfff, false),
        (0x1000, true),
        (0x1001, true),
        (0x7fff_ffff_ffff_ffff, true),
        (0x8000_0000_0000_0000, false),
        (0xffff_ff80_0000_0000, false),
        (u64::MAX, false),
        (0x0000_7f12_3456_7000, true),
    ];

    for (value, expected) in cases {
        // pc == sp, both implausible, so only the pc section is unconditional
        let regs = regs_with(&[value], 0, 0);
        let (_, dumper) = scan(Some(regs), ScopeFlags::AT_FAULT, &DumpConfig::default());
        let register_dumps = dumper.calls.len() - 1;
        assert_eq!(register_dumps, usize::from(expected), "value {value:#x}");
    }
}

#[test]
fn test_bystander_and_disabled_skip_register_dumps()
{
    let regs = regs_with(&[0x7f00_0000, 0x7f00_1000], 0x2000, 0x1000);

    let (_, bystander) = scan(Some(regs), ScopeFlags::BYSTANDER, &DumpConfig::default());
    assert_eq!(bystander.calls.len(), 2);

    let disabled = DumpConfig::default().with_all_registers(false);
    let (_, at_fault) = scan(Some(regs), ScopeFlags::AT_FAULT, &disabled);
    assert_eq!(at_fault.calls.len(), 2);
}

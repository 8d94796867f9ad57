//! # Register Reader
//!
//! Renders the register section of a tombstone:
//!
//! ```text
//!     x0   0000000000000000  x1   0000000000000001  x2   0000000000001000  x3   00007fffaabbccdd
//!     ...
//!     x28  0000000000000000  x29  0000007fc8a1b0f0  x30  0000005566001234
//!     sp   0000007fc8a1b0e0  pc   0000005566001000
//!     v0   0000000000000000  v1   3ff0000000000000  v2   0000000000000000  v3   0000000000000000
//!     ...
//! ```
//!
//! The general and FP/SIMD sets are fetched separately. If the general fetch
//! fails nothing else is attempted; if the FP/SIMD fetch fails the general
//! rows already written stay in the report, followed by the error line.

use std::borrow::Cow;

use crate::log::LogSink;
use crate::machine::Machine;
use crate::regset::RegisterSource;
use crate::scope::ScopeFlags;
use crate::types::ThreadId;

/// Registers per output row
pub const REGISTERS_PER_ROW: usize = 4;

/// Render one `label  value` field.
///
/// The label is padded to three characters so index-named registers line up
/// (`x0 `, `x10`), and the value is always 16 lowercase hex digits.
pub fn format_field(label: &str, value: u64) -> String
{
    format!("{label:<3}  {value:016x}")
}

/// Render a row of fields.
pub fn format_row<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (Cow<'a, str>, u64)>,
{
    let fields: Vec<String> = fields
        .into_iter()
        .map(|(label, value)| format_field(&label, value))
        .collect();
    format!("    {}", fields.join("  "))
}

/// Render `values` four per row, labelling register `i` with `label(i)`.
///
/// The last row holds the remainder when the count is not a multiple of four.
pub fn format_register_rows<F>(values: &[u64], label: F) -> Vec<String>
where
    F: Fn(usize) -> Cow<'static, str>,
{
    values
        .chunks(REGISTERS_PER_ROW)
        .enumerate()
        .map(|(row, chunk)| {
            let first = row * REGISTERS_PER_ROW;
            format_row(chunk.iter().enumerate().map(|(i, &value)| (label(first + i), value)))
        })
        .collect()
}

/// General rows followed by the `sp`/`pc` row.
pub fn render_general<M: Machine>(regs: &M::General) -> Vec<String>
{
    let mut rows = format_register_rows(&M::general_registers(regs), M::general_label);
    rows.push(format_row([
        (Cow::Borrowed("sp"), M::stack_pointer(regs)),
        (Cow::Borrowed("pc"), M::program_counter(regs)),
    ]));
    rows
}

/// FP/SIMD rows.
pub fn render_vector<M: Machine>(regs: &M::Vector) -> Vec<String>
{
    format_register_rows(&M::vector_registers(regs), M::vector_label)
}

/// Dump every register of `tid` to `log`
///
/// Fetch failures end the dump with one `ptrace error: <reason>` line; they
/// are never returned to the caller.
pub fn dump_registers_with<S>(source: &S, log: &mut dyn LogSink, tid: ThreadId, scope: ScopeFlags)
where
    S: RegisterSource + ?Sized,
{
    let general = match source.fetch_general(tid) {
        Ok(regs) => regs,
        Err(err) => {
            log.log_line(scope, &format!("ptrace error: {err}"));
            return;
        }
    };
    for row in render_general::<S::Machine>(&general) {
        log.log_line(scope, &row);
    }

    let vector = match source.fetch_vector(tid) {
        Ok(regs) => regs,
        Err(err) => {
            log.log_line(scope, &format!("ptrace error: {err}"));
            return;
        }
    };
    for row in render_vector::<S::Machine>(&vector) {
        log.log_line(scope, &row);
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn field_padding()
    {
        assert_eq!(format_field("x0", 1), "x0   0000000000000001");
        assert_eq!(format_field("x10", u64::MAX), "x10  ffffffffffffffff");
        assert_eq!(format_field("sp", 0x10), "sp   0000000000000010");
    }

    #[test]
    fn rows_of_four_with_remainder()
    {
        let values: Vec<u64> = (0..7).collect();
        let rows = format_register_rows(&values, |i| Cow::Owned(format!("r{i}")));
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            "    r4   0000000000000004  r5   0000000000000005  r6   0000000000000006"
        );
    }

    #[test]
    fn empty_register_list_has_no_rows()
    {
        assert!(format_register_rows(&[], |i| Cow::Owned(format!("r{i}"))).is_empty());
    }
}

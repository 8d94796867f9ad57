//! # Memory Window Dumps
//!
//! The scanner never touches target memory itself; it asks a [`MemoryDumper`]
//! to show a bounded window around an address. [`WindowDumper`] is the
//! standard dumper. It prints 256 bytes starting 32 bytes before the
//! word-aligned address, 16 bytes per row:
//!
//! ```text
//!     addr             contents                           ascii
//!     0000005566000fe0 0000000000000000 4847464544434241  ........ABCDEFGH
//! ```
//!
//! Words are fetched one at a time through a [`MemoryReader`]. A word that
//! cannot be read (unmapped page, thread gone) is shown as all ones, which is
//! what a failed `PTRACE_PEEKDATA` returns, and the dump simply carries on.

use tracing::trace;

use crate::error::TombstoneResult;
use crate::log::LogSink;
use crate::scope::ScopeFlags;
use crate::types::{Address, ThreadId};

/// Bytes shown per dump
pub const WINDOW_BYTES: u64 = 256;

/// Bytes shown before the requested address
pub const BYTES_BEFORE: u64 = 32;

/// Bytes per output row
pub const BYTES_PER_ROW: u64 = 16;

/// Size of one fetched word
pub const WORD_BYTES: u64 = 8;

/// What an unreadable word renders as
pub const UNREADABLE_WORD: u64 = u64::MAX;

/// Bounded, fault-tolerant dump of the memory around an address
///
/// Implementations must never fail the caller, whatever `address` is.
pub trait MemoryDumper
{
    /// Write the memory around `address` to `log`.
    fn dump_memory(&mut self, log: &mut dyn LogSink, tid: ThreadId, address: Address, scope: ScopeFlags);
}

/// Reads one machine word of target memory
pub trait MemoryReader
{
    /// Read the 8 bytes at `address` as a native-endian word.
    fn read_word(&self, tid: ThreadId, address: Address) -> TombstoneResult<u64>;
}

/// `PTRACE_PEEKDATA` backed reader
///
/// Requires the same tracer relationship as
/// [`crate::regset::PtraceRegisterSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PtraceMemoryReader;

impl MemoryReader for PtraceMemoryReader
{
    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn read_word(&self, tid: ThreadId, address: Address) -> TombstoneResult<u64>
    {
        // PEEKDATA returns the word itself, so -1 is ambiguous without errno.
        // SAFETY: errno is thread-local; PEEKDATA does not write to our memory.
        let word = unsafe {
            *errno_location() = 0;
            libc::ptrace(
                libc::PTRACE_PEEKDATA,
                tid.raw(),
                address.value() as *mut libc::c_void,
                std::ptr::null_mut::<libc::c_void>(),
            )
        };
        if word == -1 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error().unwrap_or(0) != 0 {
                return Err(err.into());
            }
        }
        Ok(word as u64)
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn read_word(&self, _tid: ThreadId, _address: Address) -> TombstoneResult<u64>
    {
        Err(crate::error::TombstoneError::Unsupported("PTRACE_PEEKDATA needs Linux or Android".to_string()))
    }
}

#[cfg(target_os = "linux")]
unsafe fn errno_location() -> *mut libc::c_int
{
    libc::__errno_location()
}

// Bionic names it differently.
#[cfg(target_os = "android")]
unsafe fn errno_location() -> *mut libc::c_int
{
    libc::__errno()
}

/// Range `[start, end)` shown for a dump around `address`
///
/// The start is the word-aligned address minus [`BYTES_BEFORE`], clamped to 0.
/// The end is [`WINDOW_BYTES`] later, pulled back a row at a time if that
/// would wrap past the top of the address space.
///
/// ```rust
/// use tombstone_core::memory::window_bounds;
/// use tombstone_core::types::Address;
///
/// let (start, end) = window_bounds(Address::new(0x1007));
/// assert_eq!(start, Address::new(0xfe0));
/// assert_eq!(end.value() - start.value(), 256);
/// ```
pub fn window_bounds(address: Address) -> (Address, Address)
{
    let aligned = address.align_down(WORD_BYTES);
    let start = aligned.checked_sub(BYTES_BEFORE).unwrap_or(Address::ZERO);

    let mut length = WINDOW_BYTES;
    while start.checked_add(length).is_none() {
        length -= BYTES_PER_ROW;
    }
    // `start` is at most `u64::MAX - 39`, so at least one row always fits.
    let end = start.checked_add(length).unwrap_or(start);
    (start, end)
}

/// Render one row: address, the words, then their printable bytes.
pub fn format_row(row_address: Address, words: &[u64]) -> String
{
    let mut out = format!("    {row_address:016x} ");
    let mut ascii = String::with_capacity(words.len() * WORD_BYTES as usize);
    for word in words {
        out.push_str(&format!("{word:016x} "));
        for byte in word.to_le_bytes() {
            ascii.push(if (0x20..0x7f).contains(&byte) { char::from(byte) } else { '.' });
        }
    }
    out.push(' ');
    out.push_str(&ascii);
    out
}

/// Rows of the window around `address`, reading words through `read`.
pub fn format_window<F>(address: Address, mut read: F) -> Vec<String>
where
    F: FnMut(Address) -> u64,
{
    let (start, end) = window_bounds(address);
    let words_per_row = (BYTES_PER_ROW / WORD_BYTES) as usize;
    let mut rows = Vec::with_capacity(((end.value() - start.value()) / BYTES_PER_ROW) as usize);

    let mut row = start;
    while row < end {
        let words: Vec<u64> = (0..words_per_row as u64)
            .map(|i| read(Address::new(row.value() + i * WORD_BYTES)))
            .collect();
        rows.push(format_row(row, &words));
        row = Address::new(row.value() + BYTES_PER_ROW);
    }
    rows
}

/// Standard [`MemoryDumper`]: a 256-byte hex and ASCII window
#[derive(Debug, Clone, Default)]
pub struct WindowDumper<R>
{
    reader: R,
}

impl<R: MemoryReader> WindowDumper<R>
{
    /// Dumper reading target memory through `reader`.
    pub fn new(reader: R) -> Self
    {
        Self { reader }
    }
}

impl WindowDumper<PtraceMemoryReader>
{
    /// Dumper reading through `PTRACE_PEEKDATA`.
    pub fn ptrace() -> Self
    {
        Self::new(PtraceMemoryReader)
    }
}

impl<R: MemoryReader> MemoryDumper for WindowDumper<R>
{
    fn dump_memory(&mut self, log: &mut dyn LogSink, tid: ThreadId, address: Address, scope: ScopeFlags)
    {
        let mut unreadable = 0usize;
        let rows = format_window(address, |word_address| match self.reader.read_word(tid, word_address) {
            Ok(word) => word,
            Err(_) => {
                unreadable += 1;
                UNREADABLE_WORD
            }
        });
        trace!(tid = tid.raw(), %address, unreadable, "dumped memory window");

        for row in &rows {
            log.log_line(scope, row);
        }
    }
}

//! # Error Types
//!
//! Errors raised while inspecting a stopped thread.
//!
//! We use `thiserror` to generate the `Error` implementations. None of these
//! errors ever escape the two dump entry points: they are rendered into the
//! report as a single diagnostic line and the operation stops there.

use std::io;

use thiserror::Error;

use crate::regset::RegisterSetKind;
use crate::types::ThreadId;

/// Main error type for register and memory inspection
///
/// ## Error Categories
///
/// 1. **Register errors**: RegisterRead, ShortRegisterSet
/// 2. **Platform errors**: Unsupported
/// 3. **Tracing errors**: Attach, Detach (used by the attach collaborator)
/// 4. **I/O errors**: Io (report files, sockets)
#[derive(Error, Debug)]
pub enum TombstoneError
{
    /// The OS refused to hand out a register set
    ///
    /// This happens when:
    /// - The thread exited while we were looking at it
    /// - We are not the tracer of the thread (`ESRCH`)
    /// - The kernel does not know the requested set (`EINVAL`)
    ///
    /// The message is the OS reason only (`strerror` text, see
    /// [`os_reason`]), so it can be spliced into the `ptrace error: ...` line
    /// of the report.
    #[error("{}", os_reason(.source))]
    RegisterRead
    {
        /// Which register group was requested
        kind: RegisterSetKind,
        /// Thread the request was made against
        thread: ThreadId,
        /// Error reported by the OS
        #[source]
        source: io::Error,
    },

    /// The kernel returned fewer bytes than the architecture's register struct
    #[error("short {kind} register set: expected {expected} bytes, got {actual}")]
    ShortRegisterSet
    {
        /// Which register group was requested
        kind: RegisterSetKind,
        /// Size of the architecture struct
        expected: usize,
        /// Size the kernel filled in
        actual: usize,
    },

    /// No native backend exists for this target
    #[error("Unsupported platform: {0}")]
    Unsupported(String),

    /// `PTRACE_ATTACH` (or the wait for the stop that follows it) failed
    #[error("Failed to attach to thread {thread}: {source}")]
    Attach
    {
        /// Thread we tried to attach to
        thread: ThreadId,
        /// Error reported by the OS
        #[source]
        source: io::Error,
    },

    /// `PTRACE_DETACH` failed
    #[error("Failed to detach from thread {thread}: {source}")]
    Detach
    {
        /// Thread we tried to detach from
        thread: ThreadId,
        /// Error reported by the OS
        #[source]
        source: io::Error,
    },

    /// I/O error (report files, sockets)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TombstoneError
{
    /// Wrap the current `errno` as a register read failure.
    #[cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code))]
    pub(crate) fn register_read_from_errno(kind: RegisterSetKind, thread: ThreadId) -> Self
    {
        Self::RegisterRead {
            kind,
            thread,
            source: io::Error::last_os_error(),
        }
    }
}

/// OS reason of `err`, without the ` (os error N)` suffix `std` appends.
///
/// ```rust
/// use std::io;
/// use tombstone_core::error::os_reason;
///
/// assert_eq!(os_reason(&io::Error::from_raw_os_error(3)), "No such process");
/// assert_eq!(os_reason(&io::Error::other("gone")), "gone");
/// ```
pub fn os_reason(err: &io::Error) -> String
{
    let message = err.to_string();
    match err.raw_os_error() {
        Some(code) => match message.strip_suffix(&format!(" (os error {code})")) {
            Some(reason) => reason.to_owned(),
            None => message,
        },
        None => message,
    }
}

/// Convenience type alias for `Result<T, TombstoneError>`
///
/// ```rust
/// use tombstone_core::error::TombstoneResult;
/// fn foo() -> TombstoneResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type TombstoneResult<T> = std::result::Result<T, TombstoneError>;

//! Thread identifier type.

use std::fmt;

/// Kernel thread identifier (TID) of the thread being inspected
///
/// The thread is borrowed for the duration of a dump: something else attached
/// to it and stopped it, and something else will resume it afterwards. This
/// type only names it.
///
/// ## Example
///
/// ```rust
/// use tombstone_core::types::ThreadId;
///
/// let tid = ThreadId::from(4242);
/// assert_eq!(tid.raw(), 4242);
/// assert_eq!(tid.to_string(), "4242");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(pub libc::pid_t);

impl ThreadId
{
    /// Get the raw `pid_t` to hand to `ptrace(2)`.
    pub const fn raw(self) -> libc::pid_t
    {
        self.0
    }
}

impl From<libc::pid_t> for ThreadId
{
    fn from(tid: libc::pid_t) -> Self
    {
        Self(tid)
    }
}

impl From<ThreadId> for libc::pid_t
{
    fn from(tid: ThreadId) -> Self
    {
        tid.0
    }
}

impl fmt::Display for ThreadId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

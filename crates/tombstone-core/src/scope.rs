//! # Scope Flags
//!
//! Every line written to a report carries a scope. The scope says whether the
//! thread being described is the one that faulted, and whether the line may
//! contain process memory that must stay out of unrestricted log streams.
//!
//! Sinks decide routing from these bits (see [`crate::log::ReportLog`]); the
//! dump code only ever adds [`ScopeFlags::SENSITIVE`] on top of what the
//! caller passed in.

use bitflags::bitflags;

bitflags! {
    /// Routing bits passed through every dump call.
    ///
    /// ```rust
    /// use tombstone_core::ScopeFlags;
    ///
    /// let scope = ScopeFlags::AT_FAULT;
    /// assert!(scope.is_at_fault());
    /// assert!(!scope.is_sensitive());
    /// assert!(scope.sensitive().is_sensitive());
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScopeFlags: u32
    {
        /// The thread being dumped is the thread that crashed.
        const AT_FAULT = 1 << 0;
        /// The line may contain raw process memory.
        const SENSITIVE = 1 << 1;
    }
}

impl ScopeFlags
{
    /// Scope for a thread that did not fault (a bystander thread).
    pub const BYSTANDER: Self = Self::empty();

    /// Is the thread being dumped the one that crashed?
    pub const fn is_at_fault(self) -> bool
    {
        self.contains(Self::AT_FAULT)
    }

    /// May the line contain raw process memory?
    pub const fn is_sensitive(self) -> bool
    {
        self.contains(Self::SENSITIVE)
    }

    /// The same scope, marked as carrying raw process memory.
    #[must_use]
    pub const fn sensitive(self) -> Self
    {
        self.union(Self::SENSITIVE)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn sensitive_keeps_fault_bit()
    {
        let scope = ScopeFlags::AT_FAULT.sensitive();
        assert!(scope.is_at_fault());
        assert!(scope.is_sensitive());
    }

    #[test]
    fn bystander_is_neither()
    {
        assert!(!ScopeFlags::BYSTANDER.is_at_fault());
        assert!(!ScopeFlags::BYSTANDER.is_sensitive());
        assert_eq!(ScopeFlags::BYSTANDER.sensitive(), ScopeFlags::SENSITIVE);
    }
}

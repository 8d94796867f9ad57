//! Memory address type.

use std::fmt;

/// Address in the target thread's address space
///
/// Register values become addresses only once the scanner decides they look
/// like pointers; this wrapper marks that transition so a raw register value
/// is never handed to the memory dumper by accident.
///
/// ## Example
///
/// ```rust
/// use tombstone_core::types::Address;
///
/// let addr = Address::from(0x1007);
/// assert_eq!(addr.align_down(8), Address::new(0x1000));
/// assert_eq!(addr.to_string(), "0x0000000000001007");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Round down to a multiple of `align`, which must be a power of two.
    #[must_use]
    pub const fn align_down(self, align: u64) -> Self
    {
        Address(self.0 & !(align - 1))
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use tombstone_core::types::Address;
    ///
    /// assert_eq!(Address::new(0x1000).checked_add(0x100), Some(Address::new(0x1100)));
    /// assert_eq!(Address::new(u64::MAX).checked_add(1), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

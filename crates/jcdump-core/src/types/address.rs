//! Memory address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed address recorded in a dump
///
/// This wrapper around `u64` keeps pointers read out of a javacore (thread
/// structures, monitors, objects, class loaders) apart from counts and sizes.
/// Addresses are the identity of most runtime entities, so the type is `Ord`
/// and `Hash` and is used directly as a map key.
///
/// ## Sentinel
///
/// Zero is a legitimate value in a dump (an address field that really held
/// null), so "never recorded" is expressed with [`Address::NOT_AVAILABLE`]
/// instead.
///
/// ## Example
///
/// ```rust
/// use jcdump_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let next_addr = addr + 0x100; // Add offset
/// assert_eq!(next_addr.value(), 0x1100);
/// assert_eq!(next_addr.to_string(), "0x1100");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Sentinel for a pointer that was never recorded.
    pub const NOT_AVAILABLE: Self = Address(u64::MAX);

    /// Create a new address from a `u64` value
    ///
    /// ## Example
    ///
    /// ```rust
    /// use jcdump_core::types::Address;
    ///
    /// const HEAP_BASE: Address = Address::new(0x7fff00000000);
    /// ```
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Returns `true` unless this is the [`Address::NOT_AVAILABLE`] sentinel.
    pub const fn is_available(self) -> bool
    {
        self.0 != u64::MAX
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ## Example
    ///
    /// ```rust
    /// use jcdump_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None); // Overflow
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Parse a pointer as written in a javacore (`0x00007F1A2B3C4D00`).
    ///
    /// The `0x` prefix is optional; any other input yields `None`.
    pub fn parse_hex(text: &str) -> Option<Self>
    {
        let text = text.trim();
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        if digits.is_empty() {
            return None;
        }
        u64::from_str_radix(digits, 16).ok().map(Address)
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
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}

//! # Address Space
//!
//! The seam between the runtime model and whatever describes the memory of the
//! dumped process.
//!
//! A javacore only records pointers as text, so the model cannot check them
//! against real mappings. It can still reject values that are never a
//! plausible pointer: the "not available" sentinel and anything wider than the
//! process's pointer size. Lookups by address consult this check first so a
//! garbage value never produces a false-positive cross reference.

use crate::types::Address;

/// Operations the model needs from the dumped process's address space.
///
/// Implementations must be cheap: the registry calls
/// [`AddressSpace::is_valid_address`] on every lookup by address.
pub trait AddressSpace: std::fmt::Debug + Send + Sync
{
    /// Width of a pointer in the dumped process (32 or 64).
    fn pointer_bits(&self) -> u32;

    /// Whether `raw` could be a pointer in this address space.
    fn is_valid_address(&self, raw: u64) -> bool;

    /// Convert a raw id into an [`Address`] handle.
    ///
    /// The default keeps the value unchanged.
    fn pointer(&self, raw: u64) -> Address
    {
        Address::new(raw)
    }
}

/// Address space of a process described only by a javacore.
///
/// ## Example
///
/// ```rust
/// use jcdump_core::address_space::{AddressSpace, JavaCoreAddressSpace};
///
/// let space = JavaCoreAddressSpace::new(32);
/// assert!(space.is_valid_address(0xffff_fff0));
/// assert!(!space.is_valid_address(0x1_0000_0000));
/// assert!(!space.is_valid_address(u64::MAX));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JavaCoreAddressSpace
{
    pointer_bits: u32,
}

impl JavaCoreAddressSpace
{
    /// Create an address space with the given pointer width.
    ///
    /// Widths other than 32 are treated as 64.
    #[must_use]
    pub fn new(pointer_bits: u32) -> Self
    {
        let pointer_bits = if pointer_bits == 32 { 32 } else { 64 };
        Self { pointer_bits }
    }
}

impl Default for JavaCoreAddressSpace
{
    fn default() -> Self
    {
        Self::new(64)
    }
}

impl AddressSpace for JavaCoreAddressSpace
{
    fn pointer_bits(&self) -> u32
    {
        self.pointer_bits
    }

    fn is_valid_address(&self, raw: u64) -> bool
    {
        if raw == Address::NOT_AVAILABLE.value() {
            return false;
        }
        self.pointer_bits == 64 || raw <= u64::from(u32::MAX)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_sentinel_is_never_valid()
    {
        assert!(!JavaCoreAddressSpace::new(64).is_valid_address(u64::MAX));
        assert!(!JavaCoreAddressSpace::new(32).is_valid_address(u64::MAX));
    }

    #[test]
    fn test_zero_is_a_valid_value()
    {
        assert!(JavaCoreAddressSpace::default().is_valid_address(0));
    }

    #[test]
    fn test_unknown_width_defaults_to_64()
    {
        assert_eq!(JavaCoreAddressSpace::new(48).pointer_bits(), 64);
    }
}

//! Java object references.

use std::fmt;

use super::Datum;
use crate::error::DumpResult;
use crate::types::Address;

/// A Java object mentioned by the dump.
///
/// Javacores never enumerate the heap; objects only appear as the lock word
/// of a monitor, the `java/lang/Thread` of a thread, or the instance behind a
/// class loader. They are therefore values owned by whatever mentions them
/// rather than registry entries. The reference graph is left unpopulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaObject
{
    address: Address,
    class_name: Datum<String>,
}

impl JavaObject
{
    /// Create an object reference at `address`.
    #[must_use]
    pub fn new(address: Address) -> Self
    {
        Self {
            address,
            class_name: Datum::Unavailable,
        }
    }

    /// Create an object reference with a known class.
    #[must_use]
    pub fn with_class(address: Address, class_name: impl Into<String>) -> Self
    {
        Self {
            address,
            class_name: Datum::Available(class_name.into()),
        }
    }

    /// Address of the object.
    pub fn address(&self) -> Address
    {
        self.address
    }

    /// Name of the object's class.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` if the dump did not say.
    pub fn class_name(&self) -> DumpResult<&str>
    {
        self.class_name.get("object class name").map(String::as_str)
    }

    /// Record the object's class name.
    pub fn set_class_name(&mut self, class_name: impl Into<String>)
    {
        self.class_name.set(class_name.into());
    }

    /// Objects referenced from this one. Always empty for javacore data.
    pub fn references(&self) -> std::iter::Empty<&JavaObject>
    {
        std::iter::empty()
    }
}

impl fmt::Display for JavaObject
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.class_name.as_option() {
            Some(name) => write!(f, "{name}@{}", self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

//! Tri-state optional fields.

use crate::error::{CorruptData, DumpError, DumpResult};

/// An optional field of a partially-constructed entity.
///
/// Zero and empty strings are real values in a dump, so "not set" cannot be
/// encoded in the value itself. Every descriptive field of a model entity is a
/// `Datum`, and [`Datum::get`] turns its state into the crate's error tiers.
///
/// ## Example
///
/// ```rust
/// use jcdump_core::model::Datum;
///
/// let mut priority: Datum<i32> = Datum::Unavailable;
/// assert!(priority.get("priority").unwrap_err().is_unavailable());
///
/// priority.set(0);
/// assert_eq!(*priority.get("priority").unwrap(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Datum<T>
{
    /// Never recorded.
    #[default]
    Unavailable,
    /// Recorded and usable.
    Available(T),
    /// Recorded but unusable.
    Corrupt(CorruptData),
}

impl<T> Datum<T>
{
    /// Store a value, replacing whatever was there.
    pub fn set(&mut self, value: T)
    {
        *self = Self::Available(value);
    }

    /// Mark the field as present but unusable.
    pub fn set_corrupt(&mut self, corrupt: CorruptData)
    {
        *self = Self::Corrupt(corrupt);
    }

    /// Read the value, naming the field as `what` in the error.
    ///
    /// ## Errors
    ///
    /// - `DataUnavailable` if the field was never set
    /// - `CorruptData` if it was marked corrupt
    pub fn get(&self, what: &str) -> DumpResult<&T>
    {
        match self {
            Self::Available(value) => Ok(value),
            Self::Unavailable => Err(DumpError::unavailable(what)),
            Self::Corrupt(corrupt) => Err(DumpError::CorruptData(corrupt.clone())),
        }
    }

    /// The value if available.
    pub fn as_option(&self) -> Option<&T>
    {
        match self {
            Self::Available(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if a usable value is present.
    pub fn is_available(&self) -> bool
    {
        matches!(self, Self::Available(_))
    }
}

impl<T: Copy> Datum<T>
{
    /// Copy the value out, see [`Datum::get`].
    ///
    /// ## Errors
    ///
    /// Same as [`Datum::get`].
    pub fn value(&self, what: &str) -> DumpResult<T>
    {
        self.get(what).copied()
    }
}

impl<T> From<Option<T>> for Datum<T>
{
    fn from(value: Option<T>) -> Self
    {
        value.map_or(Self::Unavailable, Self::Available)
    }
}

//! # Error Types
//!
//! General error handling for the javacore runtime model.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! ## Tiers
//!
//! Reading a dump can fail in three very different ways, and callers need to
//! tell them apart:
//!
//! 1. **Invalid argument**: the builder passed a value that can never be an
//!    identity (an empty class name, a sentinel address). This is a bug in the
//!    caller and is never recovered.
//! 2. **Data unavailable**: the javacore section describing a field was absent
//!    or has not been reached yet. Render a placeholder and carry on.
//! 3. **Corrupt data**: something *was* recorded but it does not resolve (an
//!    owner pointer that names no thread). Recoverable like (2), but reported
//!    with a payload describing what broke.

use std::fmt;

use thiserror::Error;

use crate::types::Address;

/// Diagnostic payload describing a value that was present but unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptData
{
    description: String,
    address: Option<Address>,
}

impl CorruptData
{
    /// Create a payload with a description only.
    pub fn new(description: impl Into<String>) -> Self
    {
        Self {
            description: description.into(),
            address: None,
        }
    }

    /// Create a payload naming the pointer that failed to resolve.
    pub fn at(description: impl Into<String>, address: Address) -> Self
    {
        Self {
            description: description.into(),
            address: Some(address),
        }
    }

    /// What was found to be corrupt.
    pub fn description(&self) -> &str
    {
        &self.description
    }

    /// The offending pointer, if the corruption is tied to one.
    pub fn address(&self) -> Option<Address>
    {
        self.address
    }
}

impl fmt::Display for CorruptData
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.address {
            Some(address) => write!(f, "{} at {address}", self.description),
            None => f.write_str(&self.description),
        }
    }
}

impl std::error::Error for CorruptData {}

/// Coarse classification of a [`DumpError`].
///
/// Lets callers branch on the tier without matching payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind
{
    /// A required identity value was missing or malformed.
    InvalidArgument,
    /// The value was never recorded.
    DataUnavailable,
    /// The value was recorded but cannot be resolved.
    CorruptData,
    /// The input could not be read or is not in a supported format.
    Io,
}

/// Main error type for model and image-source operations
///
/// ## Error Categories
///
/// 1. **Builder errors**: InvalidArgument
/// 2. **Absence errors**: DataUnavailable, CorruptData
/// 3. **Input errors**: UnsupportedFormat, Io, Archive
#[derive(Error, Debug)]
pub enum DumpError
{
    /// Invalid argument passed to a constructor or registration call
    ///
    /// Examples:
    /// - An empty class or method name
    /// - A thread address equal to the "not available" sentinel
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested field was never populated
    ///
    /// The string names the field that was asked for.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// The requested field was present but could not be resolved
    #[error("Corrupt data: {0}")]
    CorruptData(CorruptData),

    /// The input is not something this crate can read
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// I/O error while reading an image source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reading a zip archive member
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl DumpError
{
    /// Shorthand for a [`DumpError::DataUnavailable`] naming `what`.
    pub fn unavailable(what: impl Into<String>) -> Self
    {
        Self::DataUnavailable(what.into())
    }

    /// Shorthand for a [`DumpError::CorruptData`] tied to `address`.
    pub fn corrupt_at(description: impl Into<String>, address: Address) -> Self
    {
        Self::CorruptData(CorruptData::at(description, address))
    }

    /// The tier this error belongs to.
    pub fn kind(&self) -> ErrorKind
    {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::DataUnavailable(_) => ErrorKind::DataUnavailable,
            Self::CorruptData(_) => ErrorKind::CorruptData,
            Self::UnsupportedFormat(_) | Self::Io(_) | Self::Archive(_) => ErrorKind::Io,
        }
    }

    /// Returns `true` for the data-unavailable tier.
    pub fn is_unavailable(&self) -> bool
    {
        self.kind() == ErrorKind::DataUnavailable
    }

    /// Returns `true` for the corrupt-data tier.
    pub fn is_corrupt(&self) -> bool
    {
        self.kind() == ErrorKind::CorruptData
    }
}

impl From<CorruptData> for DumpError
{
    fn from(corrupt: CorruptData) -> Self
    {
        Self::CorruptData(corrupt)
    }
}

/// Convenience type alias for `Result<T, DumpError>`
///
/// ```rust
/// use jcdump_core::error::DumpResult;
/// fn foo() -> DumpResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type DumpResult<T> = std::result::Result<T, DumpError>;

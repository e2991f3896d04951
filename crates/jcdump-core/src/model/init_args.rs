//! VM initialisation arguments.

use crate::types::Address;

/// One `-X`/`-D` style option the VM was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmOption
{
    option: String,
    extra_info: Option<Address>,
}

impl VmOption
{
    /// Create an option, with the `extraInfo` pointer when one was printed.
    #[must_use]
    pub fn new(option: impl Into<String>, extra_info: Option<Address>) -> Self
    {
        Self {
            option: option.into(),
            extra_info,
        }
    }

    /// The option string.
    pub fn option(&self) -> &str
    {
        &self.option
    }

    /// The `extraInfo` pointer printed next to some options (hooks such as
    /// `exit` and `abort`).
    pub fn extra_info(&self) -> Option<Address>
    {
        self.extra_info
    }
}

/// The arguments the VM was created with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VmInitArgs
{
    version: Option<i32>,
    ignore_unrecognized: bool,
    options: Vec<VmOption>,
}

impl VmInitArgs
{
    /// Create an empty argument set.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// JNI version requested, if known.
    pub fn version(&self) -> Option<i32>
    {
        self.version
    }

    /// Record the JNI version.
    pub fn set_version(&mut self, version: i32)
    {
        self.version = Some(version);
    }

    /// Whether unrecognised options were ignored.
    pub fn ignore_unrecognized(&self) -> bool
    {
        self.ignore_unrecognized
    }

    /// Record whether unrecognised options were ignored.
    pub fn set_ignore_unrecognized(&mut self, ignore: bool)
    {
        self.ignore_unrecognized = ignore;
    }

    /// Append an option. The list only grows.
    pub fn add_option(&mut self, option: VmOption)
    {
        self.options.push(option);
    }

    /// Options, in the order they were given.
    pub fn options(&self) -> &[VmOption]
    {
        &self.options
    }
}

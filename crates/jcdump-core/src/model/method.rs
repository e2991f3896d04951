//! Methods and code locations.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::heap::MemorySection;
use super::{Datum, JavaClass, JavaRuntime};
use crate::error::{CorruptData, DumpError, DumpResult};
use crate::types::Address;

/// Compilation tag that marks JIT-compiled code.
pub const COMPILED: &str = "compiled";
/// Compilation tag that marks interpreted code.
pub const INTERPRETED: &str = "interpreted";

/// A method, identified by its name within a declaring class.
///
/// Javacores name methods textually (`java/lang/Thread.sleep`) and never give
/// method addresses, so equality and hashing use the `(name, class)` pair.
#[derive(Debug, Clone)]
pub struct JavaMethod
{
    name: String,
    class_name: String,
    signature: Datum<String>,
    modifiers: Datum<u32>,
    bytecode_sections: Vec<MemorySection>,
    compiled_sections: Vec<MemorySection>,
}

impl JavaMethod
{
    /// Create a method named `name` declared by `class_name`.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if either name is empty.
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> DumpResult<Self>
    {
        let name = name.into();
        let class_name = class_name.into();
        if name.is_empty() {
            return Err(DumpError::InvalidArgument("method name must not be empty".to_string()));
        }
        if class_name.is_empty() {
            return Err(DumpError::InvalidArgument(format!(
                "declaring class of method {name} must not be empty"
            )));
        }
        Ok(Self {
            name,
            class_name,
            signature: Datum::Unavailable,
            modifiers: Datum::Unavailable,
            bytecode_sections: Vec::new(),
            compiled_sections: Vec::new(),
        })
    }

    /// Method name.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Name of the declaring class, as recorded (slash separated).
    pub fn class_name(&self) -> &str
    {
        &self.class_name
    }

    /// Resolve the declaring class through the runtime.
    ///
    /// ## Errors
    ///
    /// `CorruptData` if no class of that name is registered.
    pub fn declaring_class<'r>(&self, runtime: &'r JavaRuntime) -> DumpResult<&'r JavaClass>
    {
        runtime.find_class(&self.class_name).ok_or_else(|| {
            DumpError::CorruptData(CorruptData::new(format!(
                "declaring class {} of method {} is not registered",
                self.class_name, self.name
            )))
        })
    }

    /// Method signature.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn signature(&self) -> DumpResult<&str>
    {
        self.signature.get("method signature").map(String::as_str)
    }

    /// Record the method signature.
    pub fn set_signature(&mut self, signature: impl Into<String>)
    {
        self.signature.set(signature.into());
    }

    /// Access modifiers.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn modifiers(&self) -> DumpResult<u32>
    {
        self.modifiers.value("method modifiers")
    }

    /// Record the access modifiers.
    pub fn set_modifiers(&mut self, modifiers: u32)
    {
        self.modifiers.set(modifiers);
    }

    /// Bytecode sections, in insertion order.
    pub fn bytecode_sections(&self) -> &[MemorySection]
    {
        &self.bytecode_sections
    }

    /// Append a bytecode section.
    pub fn add_bytecode_section(&mut self, section: MemorySection)
    {
        self.bytecode_sections.push(section);
    }

    /// JIT-compiled sections, in insertion order.
    pub fn compiled_sections(&self) -> &[MemorySection]
    {
        &self.compiled_sections
    }

    /// Append a compiled section.
    pub fn add_compiled_section(&mut self, section: MemorySection)
    {
        self.compiled_sections.push(section);
    }
}

impl PartialEq for JavaMethod
{
    fn eq(&self, other: &Self) -> bool
    {
        self.name == other.name && self.class_name == other.class_name
    }
}

impl Eq for JavaMethod {}

impl Hash for JavaMethod
{
    fn hash<H: Hasher>(&self, state: &mut H)
    {
        self.name.hash(state);
        self.class_name.hash(state);
    }
}

/// A position within a method: the location half of a stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location
{
    method: JavaMethod,
    address: Datum<Address>,
    compilation_level: Datum<u8>,
    filename: Datum<String>,
    line_number: Datum<u32>,
}

impl Location
{
    /// Create a location inside `method`.
    #[must_use]
    pub fn new(method: JavaMethod) -> Self
    {
        Self {
            method,
            address: Datum::Unavailable,
            compilation_level: Datum::Unavailable,
            filename: Datum::Unavailable,
            line_number: Datum::Unavailable,
        }
    }

    /// The method this location lies in.
    pub fn method(&self) -> &JavaMethod
    {
        &self.method
    }

    /// Program counter.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn address(&self) -> DumpResult<Address>
    {
        self.address.value("location address")
    }

    /// Record the program counter.
    pub fn set_address(&mut self, address: Address)
    {
        self.address.set(address);
    }

    /// `1` for compiled code, `0` for interpreted code.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless a recognised tag was recorded.
    pub fn compilation_level(&self) -> DumpResult<u8>
    {
        self.compilation_level.value("compilation level")
    }

    /// Record the compilation level from a [`COMPILED`] / [`INTERPRETED`] tag.
    ///
    /// Other tags are ignored and leave the level unavailable.
    pub fn set_compilation(&mut self, tag: &str)
    {
        match tag.trim() {
            COMPILED => self.compilation_level.set(1),
            INTERPRETED => self.compilation_level.set(0),
            other => tracing::trace!("ignoring compilation tag {other:?}"),
        }
    }

    /// Source file name.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set, `CorruptData` if marked corrupt.
    pub fn filename(&self) -> DumpResult<&str>
    {
        self.filename.get("source file name").map(String::as_str)
    }

    /// Record the source file name.
    pub fn set_filename(&mut self, filename: impl Into<String>)
    {
        self.filename.set(filename.into());
    }

    /// Mark the source file name as present but unreadable.
    pub fn set_filename_corrupt(&mut self, corrupt: CorruptData)
    {
        self.filename.set_corrupt(corrupt);
    }

    /// Source line number.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn line_number(&self) -> DumpResult<u32>
    {
        self.line_number.value("line number")
    }

    /// Record the source line number.
    pub fn set_line_number(&mut self, line: u32)
    {
        self.line_number.set(line);
    }
}

/// Renders `a.b.C.method(File.java:12)`.
///
/// The source part falls back to `(File.java)` without a line, `(...)` when
/// only the line is known, `(corrupt)` for an unreadable file name and
/// `(data unavailable)` when nothing was recorded. Downstream tools parse
/// this text, so the forms are fixed.
impl fmt::Display for Location
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}.{}", self.method.class_name.replace('/', "."), self.method.name)?;
        match (&self.filename, &self.line_number) {
            (Datum::Available(file), Datum::Available(line)) => write!(f, "({file}:{line})"),
            (Datum::Available(file), _) => write!(f, "({file})"),
            (Datum::Corrupt(_), _) => f.write_str("(corrupt)"),
            (Datum::Unavailable, Datum::Available(_)) => f.write_str("(...)"),
            (Datum::Unavailable, _) => f.write_str("(data unavailable)"),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn location() -> Location
    {
        Location::new(JavaMethod::new("run", "com/example/Worker").unwrap())
    }

    #[test]
    fn test_method_identity_is_name_and_class()
    {
        let mut a = JavaMethod::new("run", "a/B").unwrap();
        a.set_signature("()V");
        let b = JavaMethod::new("run", "a/B").unwrap();
        let c = JavaMethod::new("run", "a/C").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_empty_names_rejected()
    {
        assert!(matches!(JavaMethod::new("", "a/B"), Err(DumpError::InvalidArgument(_))));
        assert!(matches!(JavaMethod::new("run", ""), Err(DumpError::InvalidArgument(_))));
    }

    #[test]
    fn test_compilation_tags()
    {
        let mut loc = location();
        assert!(loc.compilation_level().unwrap_err().is_unavailable());
        loc.set_compilation("compiled");
        assert_eq!(loc.compilation_level().unwrap(), 1);
        loc.set_compilation("interpreted");
        assert_eq!(loc.compilation_level().unwrap(), 0);
        loc.set_compilation("jitted?");
        assert_eq!(loc.compilation_level().unwrap(), 0);
    }

    #[test]
    fn test_display_fallbacks()
    {
        let mut loc = location();
        assert_eq!(loc.to_string(), "com.example.Worker.run(data unavailable)");

        loc.set_line_number(7);
        assert_eq!(loc.to_string(), "com.example.Worker.run(...)");

        loc.set_filename("Worker.java");
        assert_eq!(loc.to_string(), "com.example.Worker.run(Worker.java:7)");

        let mut no_line = location();
        no_line.set_filename("Worker.java");
        assert_eq!(no_line.to_string(), "com.example.Worker.run(Worker.java)");

        let mut corrupt = location();
        corrupt.set_filename_corrupt(CorruptData::new("unreadable"));
        assert_eq!(corrupt.to_string(), "com.example.Worker.run(corrupt)");
    }
}

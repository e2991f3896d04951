//! Java classes.

use super::{Datum, JavaClassLoader, JavaMethod, JavaObject, JavaRuntime};
use crate::error::{DumpError, DumpResult};
use crate::types::Address;

/// A field declared by a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaField
{
    name: String,
    signature: String,
    modifiers: Datum<u32>,
}

impl JavaField
{
    /// Create a field description.
    #[must_use]
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self
    {
        Self {
            name: name.into(),
            signature: signature.into(),
            modifiers: Datum::Unavailable,
        }
    }

    /// Field name.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Field type signature.
    pub fn signature(&self) -> &str
    {
        &self.signature
    }

    /// Access modifiers.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn modifiers(&self) -> DumpResult<u32>
    {
        self.modifiers.value("field modifiers")
    }

    /// Record the access modifiers.
    pub fn set_modifiers(&mut self, modifiers: u32)
    {
        self.modifiers.set(modifiers);
    }
}

/// A class known to the runtime.
///
/// A class is identified by its name. Its address may arrive later (or never),
/// which is why the registry indexes classes by name and by address
/// separately; see [`JavaRuntime::set_class_address`].
///
/// The superclass and loader are stored as addresses and resolved through the
/// runtime on every read, so a subclass may name a superclass that has not
/// been parsed yet.
#[derive(Debug, Clone)]
pub struct JavaClass
{
    name: String,
    pub(super) address: Datum<Address>,
    loader: Datum<Address>,
    superclass: Datum<Address>,
    object: Datum<JavaObject>,
    modifiers: Datum<u32>,
    methods: Vec<JavaMethod>,
    fields: Vec<JavaField>,
    interfaces: Vec<String>,
    constant_pool_references: Vec<Address>,
}

impl JavaClass
{
    /// Create an unregistered class called `name`.
    ///
    /// Prefer [`JavaRuntime::add_class`], which creates and registers in one step.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if `name` is empty.
    pub fn new(name: impl Into<String>) -> DumpResult<Self>
    {
        let name = name.into();
        if name.is_empty() {
            return Err(DumpError::InvalidArgument("class name must not be empty".to_string()));
        }
        Ok(Self {
            name,
            address: Datum::Unavailable,
            loader: Datum::Unavailable,
            superclass: Datum::Unavailable,
            object: Datum::Unavailable,
            modifiers: Datum::Unavailable,
            methods: Vec::new(),
            fields: Vec::new(),
            interfaces: Vec::new(),
            constant_pool_references: Vec::new(),
        })
    }

    /// Class name as recorded (slash separated, `[` prefix for arrays).
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Whether this is an array class. Derived from the name.
    pub fn is_array(&self) -> bool
    {
        self.name.starts_with('[')
    }

    /// Address of the class structure.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn address(&self) -> DumpResult<Address>
    {
        self.address.value("class address")
    }

    /// Record the address of the defining class loader.
    pub fn set_class_loader(&mut self, loader: Address)
    {
        self.loader.set(loader);
    }

    /// Resolve the defining class loader.
    ///
    /// ## Errors
    ///
    /// - `DataUnavailable` if no loader was recorded
    /// - `CorruptData` if the recorded loader is not registered
    pub fn class_loader<'r>(&self, runtime: &'r JavaRuntime) -> DumpResult<&'r JavaClassLoader>
    {
        let loader = self.loader.value("class loader")?;
        runtime
            .find_class_loader(loader)
            .ok_or_else(|| DumpError::corrupt_at(format!("class loader of {} not found", self.name), loader))
    }

    /// Record the superclass by address.
    ///
    /// [`Address::ZERO`] records that the class has no superclass.
    pub fn set_superclass(&mut self, superclass: Address)
    {
        self.superclass.set(superclass);
    }

    /// Resolve the superclass.
    ///
    /// Returns `Ok(None)` when the superclass was recorded as null.
    ///
    /// ## Errors
    ///
    /// - `DataUnavailable` if no superclass was recorded
    /// - `CorruptData` if the recorded superclass is not registered
    pub fn superclass<'r>(&self, runtime: &'r JavaRuntime) -> DumpResult<Option<&'r JavaClass>>
    {
        let superclass = self.superclass.value("superclass")?;
        if superclass == Address::ZERO {
            return Ok(None);
        }
        runtime
            .find_class_by_address(superclass)
            .map(Some)
            .ok_or_else(|| DumpError::corrupt_at(format!("superclass of {} not found", self.name), superclass))
    }

    /// The `java/lang/Class` instance for this class.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn object(&self) -> DumpResult<&JavaObject>
    {
        self.object.get("class object")
    }

    /// Record the `java/lang/Class` instance.
    pub fn set_object(&mut self, object: JavaObject)
    {
        self.object.set(object);
    }

    /// Access modifiers.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn modifiers(&self) -> DumpResult<u32>
    {
        self.modifiers.value("class modifiers")
    }

    /// Record the access modifiers.
    pub fn set_modifiers(&mut self, modifiers: u32)
    {
        self.modifiers.set(modifiers);
    }

    /// Declared methods, in insertion order.
    pub fn methods(&self) -> &[JavaMethod]
    {
        &self.methods
    }

    /// Append a declared method.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the method belongs to another class.
    pub fn add_method(&mut self, method: JavaMethod) -> DumpResult<()>
    {
        if method.class_name() != self.name {
            return Err(DumpError::InvalidArgument(format!(
                "method {} is declared by {}, not {}",
                method.name(),
                method.class_name(),
                self.name
            )));
        }
        self.methods.push(method);
        Ok(())
    }

    /// Declared fields, in insertion order.
    pub fn fields(&self) -> &[JavaField]
    {
        &self.fields
    }

    /// Append a declared field.
    pub fn add_field(&mut self, field: JavaField)
    {
        self.fields.push(field);
    }

    /// Names of implemented interfaces, in insertion order.
    pub fn interfaces(&self) -> &[String]
    {
        &self.interfaces
    }

    /// Append an implemented interface.
    pub fn add_interface(&mut self, interface: impl Into<String>)
    {
        self.interfaces.push(interface.into());
    }

    /// Constant pool references, in insertion order.
    pub fn constant_pool_references(&self) -> &[Address]
    {
        &self.constant_pool_references
    }

    /// Append a constant pool reference.
    pub fn add_constant_pool_reference(&mut self, reference: Address)
    {
        self.constant_pool_references.push(reference);
    }
}

//! Class loaders.

use indexmap::IndexMap;

use super::{Datum, JavaClass, JavaObject, JavaRuntime};
use crate::error::{CorruptData, DumpResult};
use crate::types::Address;

#[derive(Debug, Clone)]
struct LoadedClass
{
    name: String,
    address: Option<Address>,
}

/// A class loader, identified by its address.
///
/// The loader keeps the names of the classes it loaded, optionally with the
/// class address reported next to each name. Resolving a name to a
/// [`JavaClass`] goes through the runtime: by address when one was recorded,
/// by name otherwise.
#[derive(Debug, Clone)]
pub struct JavaClassLoader
{
    address: Address,
    name: Datum<String>,
    object: Datum<JavaObject>,
    classes: IndexMap<String, LoadedClass>,
}

impl JavaClassLoader
{
    /// Create an unregistered loader at `address`.
    ///
    /// Prefer [`JavaRuntime::add_class_loader`], which validates the address
    /// and registers in one step.
    #[must_use]
    pub fn new(address: Address) -> Self
    {
        Self {
            address,
            name: Datum::Unavailable,
            object: Datum::Unavailable,
            classes: IndexMap::new(),
        }
    }

    /// Address of the loader.
    pub fn address(&self) -> Address
    {
        self.address
    }

    /// Display name (`*System*`, or the loader's class name).
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn name(&self) -> DumpResult<&str>
    {
        self.name.get("class loader name").map(String::as_str)
    }

    /// Record the display name.
    pub fn set_name(&mut self, name: impl Into<String>)
    {
        self.name.set(name.into());
    }

    /// The `java/lang/ClassLoader` instance.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn object(&self) -> DumpResult<&JavaObject>
    {
        self.object.get("class loader object")
    }

    /// Record the `java/lang/ClassLoader` instance.
    pub fn set_object(&mut self, object: JavaObject)
    {
        self.object.set(object);
    }

    /// Record that this loader loaded `name`, optionally at `address`.
    ///
    /// Recording the same name again replaces the address.
    pub fn add_class(&mut self, name: impl Into<String>, address: Option<Address>)
    {
        let name = name.into();
        self.classes.insert(name.clone(), LoadedClass { name, address });
    }

    /// Names of the classes this loader loaded, in insertion order.
    pub fn class_names(&self) -> impl Iterator<Item = &str>
    {
        self.classes.values().map(|loaded| loaded.name.as_str())
    }

    /// Find a class loaded by this loader.
    ///
    /// Returns `None` if the loader never recorded `name` or the runtime does
    /// not know the class.
    pub fn find_class<'r>(&self, name: &str, runtime: &'r JavaRuntime) -> Option<&'r JavaClass>
    {
        self.classes.get(name).and_then(|loaded| resolve(loaded, runtime))
    }

    /// Classes defined by this loader.
    ///
    /// Entries the runtime cannot resolve are yielded as corrupt data.
    pub fn defined_classes<'a>(
        &'a self,
        runtime: &'a JavaRuntime,
    ) -> impl Iterator<Item = Result<&'a JavaClass, CorruptData>> + 'a
    {
        self.classes.values().map(move |loaded| {
            resolve(loaded, runtime).ok_or_else(|| match loaded.address {
                Some(address) => CorruptData::at(format!("class {} not found", loaded.name), address),
                None => CorruptData::new(format!("class {} not found", loaded.name)),
            })
        })
    }

    /// Classes cached by this loader.
    ///
    /// Javacores do not distinguish cached from defined classes, so this is
    /// the same sequence as [`JavaClassLoader::defined_classes`].
    pub fn cached_classes<'a>(
        &'a self,
        runtime: &'a JavaRuntime,
    ) -> impl Iterator<Item = Result<&'a JavaClass, CorruptData>> + 'a
    {
        self.defined_classes(runtime)
    }
}

fn resolve<'r>(loaded: &LoadedClass, runtime: &'r JavaRuntime) -> Option<&'r JavaClass>
{
    loaded
        .address
        .and_then(|address| runtime.find_class_by_address(address))
        .or_else(|| runtime.find_class(&loaded.name))
}

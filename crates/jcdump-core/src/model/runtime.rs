//! The runtime registry.
//!
//! [`JavaRuntime`] is the directory every model entity lives in. Entities refer
//! to each other by address or name and resolve those keys through the
//! runtime when read, so forward references made during parsing resolve once
//! the target shows up.
//!
//! ## Registration
//!
//! `register_*` inserts a fully built entity. `add_*` builds a fresh entity
//! from its identity, registers it and hands back a mutable reference for
//! enrichment, so creation and publication happen in one step. Both reject
//! identities that can never be valid and both overwrite any entry with the
//! same key: a placeholder registered early can be replaced by a fuller
//! object later.
//!
//! Lookups never fail loudly. Asking for something that has not been parsed
//! yet is normal and yields `None`.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::debug;

use super::{
    push_mut, Datum, Heap, JavaClass, JavaClassLoader, JavaMethod, JavaMonitor, JavaThread, MemoryCategory, VmInitArgs,
};
use crate::address_space::{AddressSpace, JavaCoreAddressSpace};
use crate::error::{DumpError, DumpResult};
use crate::types::Address;

/// One Java runtime found in a dump, with everything known about it.
#[derive(Debug, Clone)]
pub struct JavaRuntime
{
    id: String,
    address_space: Arc<dyn AddressSpace>,
    heaps: Vec<Heap>,
    compiled_methods: Vec<JavaMethod>,
    class_loaders: IndexMap<Address, JavaClassLoader>,
    classes: IndexMap<String, JavaClass>,
    classes_by_address: HashMap<Address, String>,
    monitors: IndexMap<Address, JavaMonitor>,
    threads: IndexMap<Address, JavaThread>,
    init_args: Option<VmInitArgs>,
    memory_categories: Vec<MemoryCategory>,
    version: Datum<String>,
    full_version: Datum<String>,
    jit_enabled: Datum<bool>,
    jit_options: Datum<String>,
    start_time: Datum<i64>,
    start_time_nanos: Datum<i64>,
}

impl JavaRuntime
{
    /// Create an empty runtime called `id` over `address_space`.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if `id` is empty.
    pub fn new(id: impl Into<String>, address_space: Arc<dyn AddressSpace>) -> DumpResult<Self>
    {
        let id = id.into();
        if id.is_empty() {
            return Err(DumpError::InvalidArgument("runtime id must not be empty".to_string()));
        }
        Ok(Self {
            id,
            address_space,
            heaps: Vec::new(),
            compiled_methods: Vec::new(),
            class_loaders: IndexMap::new(),
            classes: IndexMap::new(),
            classes_by_address: HashMap::new(),
            monitors: IndexMap::new(),
            threads: IndexMap::new(),
            init_args: None,
            memory_categories: Vec::new(),
            version: Datum::Unavailable,
            full_version: Datum::Unavailable,
            jit_enabled: Datum::Unavailable,
            jit_options: Datum::Unavailable,
            start_time: Datum::Unavailable,
            start_time_nanos: Datum::Unavailable,
        })
    }

    /// Create an empty runtime over a 64-bit [`JavaCoreAddressSpace`].
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if `id` is empty.
    pub fn with_default_space(id: impl Into<String>) -> DumpResult<Self>
    {
        Self::new(id, Arc::new(JavaCoreAddressSpace::default()))
    }

    /// Opaque runtime id.
    pub fn id(&self) -> &str
    {
        &self.id
    }

    /// The address space pointers are checked against.
    pub fn address_space(&self) -> &dyn AddressSpace
    {
        self.address_space.as_ref()
    }

    /// Whether `raw` could be a pointer in this runtime's process.
    pub fn is_valid_address(&self, raw: u64) -> bool
    {
        self.address_space.is_valid_address(raw)
    }

    fn check_identity(&self, address: Address, what: &str) -> DumpResult<()>
    {
        if self.is_valid_address(address.value()) {
            Ok(())
        } else {
            Err(DumpError::InvalidArgument(format!("{what} address {address} is not a valid pointer")))
        }
    }

    // ---- registration -------------------------------------------------

    /// Register a class loader under its address.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the loader's address is not a valid pointer.
    pub fn register_class_loader(&mut self, loader: JavaClassLoader) -> DumpResult<()>
    {
        self.insert_class_loader(loader).map(|_| ())
    }

    /// Create and register an empty class loader at `address`.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if `address` is not a valid pointer.
    pub fn add_class_loader(&mut self, address: Address) -> DumpResult<&mut JavaClassLoader>
    {
        self.insert_class_loader(JavaClassLoader::new(address))
    }

    fn insert_class_loader(&mut self, loader: JavaClassLoader) -> DumpResult<&mut JavaClassLoader>
    {
        let address = loader.address();
        self.check_identity(address, "class loader")?;
        let (slot, replaced) = insert_entry(&mut self.class_loaders, address, loader);
        if replaced.is_some() {
            debug!("class loader {address} re-registered");
        }
        Ok(slot)
    }

    /// Register a class under its name, and under its address if it has one.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the class carries an address that is not a valid
    /// pointer.
    pub fn register_class(&mut self, class: JavaClass) -> DumpResult<()>
    {
        self.insert_class(class).map(|_| ())
    }

    /// Create and register a class called `name`, with no address yet.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if `name` is empty.
    pub fn add_class(&mut self, name: impl Into<String>) -> DumpResult<&mut JavaClass>
    {
        self.insert_class(JavaClass::new(name)?)
    }

    fn insert_class(&mut self, class: JavaClass) -> DumpResult<&mut JavaClass>
    {
        let address = class.address.as_option().copied();
        if let Some(address) = address {
            self.check_identity(address, "class")?;
        }
        let name = class.name().to_string();
        let (slot, replaced) = insert_entry(&mut self.classes, name.clone(), class);
        if let Some(old) = replaced {
            debug!("class {name} re-registered");
            if let Some(old_address) = old.address.as_option() {
                if Some(*old_address) != address
                    && self.classes_by_address.get(old_address).is_some_and(|owner| *owner == name)
                {
                    self.classes_by_address.remove(old_address);
                }
            }
        }
        if let Some(address) = address {
            self.classes_by_address.insert(address, name);
        }
        Ok(slot)
    }

    /// Record the address of an already registered class and index the class
    /// under it.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if no class called `name` is registered or `address`
    /// is not a valid pointer.
    pub fn set_class_address(&mut self, name: &str, address: Address) -> DumpResult<()>
    {
        self.check_identity(address, "class")?;
        let class = self
            .classes
            .get_mut(name)
            .ok_or_else(|| DumpError::InvalidArgument(format!("class {name} is not registered")))?;
        if let Some(old) = class.address.as_option() {
            if *old != address {
                self.classes_by_address.remove(old);
            }
        }
        class.address.set(address);
        if let Some(previous) = self.classes_by_address.insert(address, name.to_string()) {
            if previous != name {
                debug!("class address {address} moved from {previous} to {name}");
            }
        }
        Ok(())
    }

    /// Register a monitor under its address.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the monitor's address is not a valid pointer.
    pub fn register_monitor(&mut self, monitor: JavaMonitor) -> DumpResult<()>
    {
        self.insert_monitor(monitor).map(|_| ())
    }

    /// Create and register an empty monitor at `address`.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if `address` is not a valid pointer.
    pub fn add_monitor(&mut self, address: Address) -> DumpResult<&mut JavaMonitor>
    {
        self.insert_monitor(JavaMonitor::new(address))
    }

    fn insert_monitor(&mut self, monitor: JavaMonitor) -> DumpResult<&mut JavaMonitor>
    {
        let address = monitor.address();
        self.check_identity(address, "monitor")?;
        let (slot, replaced) = insert_entry(&mut self.monitors, address, monitor);
        if replaced.is_some() {
            debug!("monitor {address} re-registered");
        }
        Ok(slot)
    }

    /// Register a thread under its address.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the thread's address is zero or not a valid
    /// pointer.
    pub fn register_thread(&mut self, thread: JavaThread) -> DumpResult<()>
    {
        self.insert_thread(thread).map(|_| ())
    }

    /// Create and register an empty thread at `address`.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if `address` is zero or not a valid pointer.
    pub fn add_thread(&mut self, address: Address) -> DumpResult<&mut JavaThread>
    {
        self.insert_thread(JavaThread::new(address))
    }

    fn insert_thread(&mut self, thread: JavaThread) -> DumpResult<&mut JavaThread>
    {
        let address = thread.address();
        if address == Address::ZERO {
            return Err(DumpError::InvalidArgument("thread address must not be null".to_string()));
        }
        self.check_identity(address, "thread")?;
        let (slot, replaced) = insert_entry(&mut self.threads, address, thread);
        if replaced.is_some() {
            debug!("thread {address} re-registered");
        }
        Ok(slot)
    }

    /// Install the VM init args, replacing any earlier set.
    pub fn register_init_args(&mut self, init_args: VmInitArgs)
    {
        if self.init_args.replace(init_args).is_some() {
            debug!("VM init args re-registered");
        }
    }

    /// Append a heap and return it for enrichment.
    pub fn add_heap(&mut self, heap: Heap) -> &mut Heap
    {
        push_mut(&mut self.heaps, heap)
    }

    /// Append a JIT-compiled method.
    pub fn add_compiled_method(&mut self, method: JavaMethod)
    {
        self.compiled_methods.push(method);
    }

    /// Append a top-level memory category and return it for enrichment.
    pub fn add_memory_category(&mut self, category: MemoryCategory) -> &mut MemoryCategory
    {
        push_mut(&mut self.memory_categories, category)
    }

    pub(crate) fn heaps_mut(&mut self) -> &mut Vec<Heap>
    {
        &mut self.heaps
    }

    pub(crate) fn memory_categories_mut(&mut self) -> &mut Vec<MemoryCategory>
    {
        &mut self.memory_categories
    }

    // ---- lookup -------------------------------------------------------

    /// Class loader registered at `address`.
    pub fn find_class_loader(&self, address: Address) -> Option<&JavaClassLoader>
    {
        if !self.is_valid_address(address.value()) {
            return None;
        }
        self.class_loaders.get(&address)
    }

    /// Mutable access to the class loader at `address`.
    pub fn find_class_loader_mut(&mut self, address: Address) -> Option<&mut JavaClassLoader>
    {
        self.class_loaders.get_mut(&address)
    }

    /// Monitor registered at `address`.
    pub fn find_monitor(&self, address: Address) -> Option<&JavaMonitor>
    {
        if !self.is_valid_address(address.value()) {
            return None;
        }
        self.monitors.get(&address)
    }

    /// Mutable access to the monitor at `address`.
    pub fn find_monitor_mut(&mut self, address: Address) -> Option<&mut JavaMonitor>
    {
        self.monitors.get_mut(&address)
    }

    /// Resolve a raw thread id.
    ///
    /// The id is first tried as a thread address. Failing that, the first
    /// thread whose native thread has `raw` as its system thread id or
    /// thread-library handle wins. Nothing is cached.
    pub fn find_thread(&self, raw: u64) -> Option<&JavaThread>
    {
        if !self.is_valid_address(raw) {
            return None;
        }
        self.threads
            .get(&Address::new(raw))
            .or_else(|| self.threads.values().find(|thread| thread.matches_native_id(raw)))
    }

    /// Mutable access to the thread registered at `address`. Exact match only.
    pub fn find_thread_mut(&mut self, address: Address) -> Option<&mut JavaThread>
    {
        self.threads.get_mut(&address)
    }

    /// Class registered under `name`.
    pub fn find_class(&self, name: &str) -> Option<&JavaClass>
    {
        self.classes.get(name)
    }

    /// Mutable access to the class registered under `name`.
    pub fn find_class_mut(&mut self, name: &str) -> Option<&mut JavaClass>
    {
        self.classes.get_mut(name)
    }

    /// Class whose address is `address`.
    ///
    /// Names and addresses are separate key spaces: a class registered only by
    /// name is not found here.
    pub fn find_class_by_address(&self, address: Address) -> Option<&JavaClass>
    {
        if !self.is_valid_address(address.value()) {
            return None;
        }
        self.classes_by_address
            .get(&address)
            .and_then(|name| self.classes.get(name.as_str()))
    }

    // ---- iteration ----------------------------------------------------

    /// Heaps in the order the dump lists them.
    pub fn heaps(&self) -> &[Heap]
    {
        &self.heaps
    }

    /// JIT-compiled methods seen on thread stacks, once each.
    pub fn compiled_methods(&self) -> &[JavaMethod]
    {
        &self.compiled_methods
    }

    /// Class loaders in registration order.
    pub fn class_loaders(&self) -> impl Iterator<Item = &JavaClassLoader>
    {
        self.class_loaders.values()
    }

    /// Classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &JavaClass>
    {
        self.classes.values()
    }

    /// Monitors in registration order.
    pub fn monitors(&self) -> impl Iterator<Item = &JavaMonitor>
    {
        self.monitors.values()
    }

    /// Threads in registration order.
    pub fn threads(&self) -> impl Iterator<Item = &JavaThread>
    {
        self.threads.values()
    }

    /// Top-level native memory categories.
    pub fn memory_categories(&self) -> &[MemoryCategory]
    {
        &self.memory_categories
    }

    // ---- runtime properties -------------------------------------------

    /// The VM init args.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless registered.
    pub fn init_args(&self) -> DumpResult<&VmInitArgs>
    {
        self.init_args.as_ref().ok_or_else(|| DumpError::unavailable("VM init args"))
    }

    /// Mutable access to the init args, creating an empty set on first use.
    pub fn init_args_mut(&mut self) -> &mut VmInitArgs
    {
        self.init_args.get_or_insert_with(VmInitArgs::new)
    }

    /// Short version string (`JRE 17.0.9 Linux amd64-64`).
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn version(&self) -> DumpResult<&str>
    {
        self.version.get("runtime version").map(String::as_str)
    }

    /// Record the short version string.
    pub fn set_version(&mut self, version: impl Into<String>)
    {
        self.version.set(version.into());
    }

    /// Full VM version banner.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn full_version(&self) -> DumpResult<&str>
    {
        self.full_version.get("full runtime version").map(String::as_str)
    }

    /// Record the full VM version banner.
    pub fn set_full_version(&mut self, version: impl Into<String>)
    {
        self.full_version.set(version.into());
    }

    /// Whether the JIT was enabled.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn is_jit_enabled(&self) -> DumpResult<bool>
    {
        self.jit_enabled.value("JIT enabled")
    }

    /// Record whether the JIT was enabled.
    pub fn set_jit_enabled(&mut self, enabled: bool)
    {
        self.jit_enabled.set(enabled);
    }

    /// JIT mode options.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn jit_options(&self) -> DumpResult<&str>
    {
        self.jit_options.get("JIT options").map(String::as_str)
    }

    /// Record the JIT mode options.
    pub fn set_jit_options(&mut self, options: impl Into<String>)
    {
        self.jit_options.set(options.into());
    }

    /// Wall-clock start time in milliseconds since the Unix epoch.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn start_time(&self) -> DumpResult<i64>
    {
        self.start_time.value("start time")
    }

    /// Record the wall-clock start time in milliseconds since the epoch.
    pub fn set_start_time(&mut self, millis: i64)
    {
        self.start_time.set(millis);
    }

    /// Monotonic start time in nanoseconds. Independent of [`Self::start_time`].
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn start_time_nanos(&self) -> DumpResult<i64>
    {
        self.start_time_nanos.value("start time nanos")
    }

    /// Record the monotonic start time in nanoseconds.
    pub fn set_start_time_nanos(&mut self, nanos: i64)
    {
        self.start_time_nanos.set(nanos);
    }
}

/// Insert `value` under `key`. A replaced entry keeps its position and is
/// handed back alongside the stored value.
fn insert_entry<K: Hash + Eq, V>(map: &mut IndexMap<K, V>, key: K, value: V) -> (&mut V, Option<V>)
{
    match map.entry(key) {
        Entry::Occupied(mut entry) => {
            let replaced = entry.insert(value);
            (entry.into_mut(), Some(replaced))
        }
        Entry::Vacant(entry) => (entry.insert(value), None),
    }
}

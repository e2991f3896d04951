//! # Runtime Model
//!
//! The in-memory picture of a Java runtime rebuilt from a javacore.
//!
//! Every entity is a record with fixed identity fields and optional
//! descriptive fields ([`Datum`]). Entities live in a [`JavaRuntime`] and
//! refer to each other through it by address or name, never by direct links.
//! The exceptions are children an entity owns outright: a thread's stack
//! frames, a class's methods, a memory category's sub-categories.
//!
//! ## Example
//!
//! ```rust
//! use jcdump_core::model::JavaRuntime;
//! use jcdump_core::types::Address;
//!
//! let mut runtime = JavaRuntime::with_default_space("r1").unwrap();
//! runtime.add_thread(Address::new(0x900)).unwrap().set_name("main");
//!
//! let monitor = runtime.add_monitor(Address::new(0x500)).unwrap();
//! monitor.set_owner(Address::new(0x900));
//!
//! let monitor = runtime.find_monitor(Address::new(0x500)).unwrap();
//! let owner = monitor.owner(&runtime).unwrap().unwrap();
//! assert_eq!(owner.name(), "main");
//! ```

mod class;
mod class_loader;
mod datum;
mod heap;
mod init_args;
mod memory_category;
mod method;
mod monitor;
mod object;
mod runtime;
mod thread;

pub use class::{JavaClass, JavaField};
pub use class_loader::JavaClassLoader;
pub use datum::Datum;
pub use heap::{Heap, MemorySection};
pub use init_args::{VmInitArgs, VmOption};
pub use memory_category::{group_thousands, MemoryCategory, OTHER};
pub use method::{JavaMethod, Location, COMPILED, INTERPRETED};
pub use monitor::{JavaMonitor, FLAT_LOCK_OWNER_LIMIT};
pub use object::JavaObject;
pub use runtime::JavaRuntime;
pub use thread::{ImageThread, JavaThread, StackFrame, ThreadState};

/// Append `item` and return it for enrichment.
pub(crate) fn push_mut<T>(items: &mut Vec<T>, item: T) -> &mut T
{
    let index = items.len();
    items.push(item);
    &mut items[index]
}

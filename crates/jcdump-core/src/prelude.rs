//! Common module for library exports

pub use crate::address_space::{AddressSpace, JavaCoreAddressSpace};
pub use crate::error::{CorruptData, DumpError, DumpResult, ErrorKind};
pub use crate::image::{BlockedThread, JavaCoreImage, RuntimeSummary};
pub use crate::javacore::JavaCoreReader;
pub use crate::model::{
    Datum, Heap, ImageThread, JavaClass, JavaClassLoader, JavaField, JavaMethod, JavaMonitor, JavaObject, JavaRuntime,
    JavaThread, Location, MemoryCategory, MemorySection, StackFrame, ThreadState, VmInitArgs, VmOption,
};
pub use crate::sniff::{classify, ImageKind, ImageSource, ImageSourceManager};
pub use crate::types::address::Address;

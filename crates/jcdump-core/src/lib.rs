//! # jcdump-core
//!
//! Rebuilds the state of a Java runtime from a javacore snapshot.
//!
//! This crate provides:
//! - A runtime registry and the entity family it holds (classes, loaders,
//!   methods, monitors, threads, heaps, native memory categories)
//! - A three-tier error taxonomy separating builder bugs, missing data and
//!   corrupt data
//! - Sniffing of diagnostic files and discovery of image sources on disk and
//!   inside zip archives
//! - A best-effort javacore reader that drives the model from real text
//!
//! ## Partial data
//!
//! A javacore is written by a process that may be crashing, so any section
//! can be missing or damaged. Every optional field of every entity is
//! therefore read through a `Result`: `DataUnavailable` when the dump never
//! said, `CorruptData` when it said something that does not resolve. Neither
//! is fatal.

pub mod address_space;
pub mod error;
pub mod image;
pub mod javacore;
pub mod model;
pub mod prelude;
pub mod sniff;
pub mod types;

pub use address_space::{AddressSpace, JavaCoreAddressSpace};
// Re-export commonly used types
pub use error::{CorruptData, DumpError, DumpResult, ErrorKind};
pub use image::{JavaCoreImage, RuntimeSummary};
pub use javacore::JavaCoreReader;
pub use model::JavaRuntime;
pub use types::Address;

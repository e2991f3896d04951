//! # Types
//!
//! Value types shared by the runtime model: addresses and fixed-width scalars.

pub mod address;
pub mod scalar;

// Re-export all public types
pub use address::Address;

//! Heaps and memory sections.

use super::JavaObject;
use crate::types::Address;

/// A contiguous range of memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySection
{
    name: String,
    base: Address,
    size: u64,
}

impl MemorySection
{
    /// Create a section of `size` bytes starting at `base`.
    #[must_use]
    pub fn new(name: impl Into<String>, base: Address, size: u64) -> Self
    {
        Self {
            name: name.into(),
            base,
            size,
        }
    }

    /// Section name.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// First byte of the section.
    pub fn base(&self) -> Address
    {
        self.base
    }

    /// Size in bytes.
    pub fn size(&self) -> u64
    {
        self.size
    }

    /// One past the last byte, saturating at the top of the address space.
    pub fn end(&self) -> Address
    {
        Address::new(self.base.value().saturating_add(self.size))
    }

    /// Whether `address` falls inside the section.
    pub fn contains(&self, address: Address) -> bool
    {
        address.value() >= self.base.value() && address.value() < self.end().value()
    }
}

/// A Java heap, identified by its display name.
///
/// A javacore lists heap regions but never the objects in them, so
/// [`Heap::objects`] is always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heap
{
    name: String,
    sections: Vec<MemorySection>,
}

impl Heap
{
    /// Create a heap with no sections.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self
    {
        Self {
            name: name.into(),
            sections: Vec::new(),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Append a section.
    pub fn add_section(&mut self, section: MemorySection)
    {
        self.sections.push(section);
    }

    /// Sections, in insertion order.
    pub fn sections(&self) -> &[MemorySection]
    {
        &self.sections
    }

    /// Total bytes across all sections.
    pub fn total_size(&self) -> u64
    {
        self.sections.iter().map(MemorySection::size).sum()
    }

    /// Objects on the heap. Always empty for javacores.
    pub fn objects(&self) -> impl Iterator<Item = &JavaObject>
    {
        std::iter::empty()
    }
}

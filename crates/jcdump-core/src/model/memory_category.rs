//! Native memory categories.

use std::fmt::{self, Write};

/// Name of the pseudo-category that stands for a node's own allocations.
pub const OTHER: &str = "Other";

/// A node in the native memory accounting tree.
///
/// Deep counts cover the category and everything below it. Shallow counts
/// cover the category alone and are derived when not set: a leaf's shallow
/// counts equal its deep counts, a parent's are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCategory
{
    name: String,
    deep_bytes: u64,
    deep_allocations: u64,
    shallow: Option<(u64, u64)>,
    children: Vec<MemoryCategory>,
}

impl MemoryCategory
{
    /// Create a category with its deep counts.
    #[must_use]
    pub fn new(name: impl Into<String>, deep_bytes: u64, deep_allocations: u64) -> Self
    {
        Self {
            name: name.into(),
            deep_bytes,
            deep_allocations,
            shallow: None,
            children: Vec::new(),
        }
    }

    /// Category name as printed in the chart.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Bytes allocated by this category and its descendants.
    pub fn deep_bytes(&self) -> u64
    {
        self.deep_bytes
    }

    /// Allocations made by this category and its descendants.
    pub fn deep_allocations(&self) -> u64
    {
        self.deep_allocations
    }

    /// Bytes allocated by this category alone.
    pub fn shallow_bytes(&self) -> u64
    {
        self.shallow_counts().0
    }

    /// Allocations made by this category alone.
    pub fn shallow_allocations(&self) -> u64
    {
        self.shallow_counts().1
    }

    /// Whether shallow counts were set rather than derived.
    pub fn has_explicit_shallow(&self) -> bool
    {
        self.shallow.is_some()
    }

    /// Set the shallow counts explicitly.
    pub fn set_shallow(&mut self, bytes: u64, allocations: u64)
    {
        self.shallow = Some((bytes, allocations));
    }

    fn shallow_counts(&self) -> (u64, u64)
    {
        match self.shallow {
            Some(counts) => counts,
            None if self.children.is_empty() => (self.deep_bytes, self.deep_allocations),
            None => (0, 0),
        }
    }

    /// Append a child and return it for further nesting.
    pub fn add_child(&mut self, child: MemoryCategory) -> &mut MemoryCategory
    {
        super::push_mut(&mut self.children, child)
    }

    /// Children, in insertion order.
    pub fn children(&self) -> &[MemoryCategory]
    {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<MemoryCategory>
    {
        &mut self.children
    }

    /// Render the subtree as an indented chart, one line per node.
    ///
    /// ```text
    /// JRE: 1,000 bytes / 3 allocations
    /// |
    /// +--Threads: 400 bytes / 1 allocation
    /// |
    /// +--Other: 600 bytes / 2 allocations
    /// ```
    ///
    /// Children follow their parent in pre-order. A parent with a nonzero
    /// shallow byte count gets an extra `Other` leaf after its real children.
    pub fn render_tree(&self) -> String
    {
        self.to_string()
    }

    fn write_tree(&self, out: &mut impl Write, depth: usize) -> fmt::Result
    {
        write_row(out, &self.name, depth, self.deep_bytes, self.deep_allocations)?;
        for child in &self.children {
            child.write_tree(out, depth + 1)?;
        }
        if !self.children.is_empty() {
            let (bytes, allocations) = self.shallow_counts();
            if bytes != 0 {
                write_row(out, OTHER, depth + 1, bytes, allocations)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for MemoryCategory
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        self.write_tree(f, 0)
    }
}

fn write_row(out: &mut impl Write, name: &str, depth: usize, bytes: u64, allocations: u64) -> fmt::Result
{
    if depth > 0 {
        out.write_char('|')?;
        for _ in 1..depth {
            out.write_str("  |")?;
        }
        out.write_char('\n')?;
        for _ in 1..depth {
            out.write_str("|  ")?;
        }
        out.write_str("+--")?;
    }
    let plural = if allocations > 1 { "s" } else { "" };
    writeln!(
        out,
        "{name}: {} bytes / {allocations} allocation{plural}",
        group_thousands(bytes)
    )
}

/// Format `value` with a comma every three digits.
pub fn group_thousands(value: u64) -> String
{
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

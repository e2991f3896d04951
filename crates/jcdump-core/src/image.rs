//! # Diagnostic Facade
//!
//! [`JavaCoreImage`] is what a reader hands back: the runtimes found in one
//! image source, plus enough provenance to say where they came from.
//! [`RuntimeSummary`] condenses a runtime into counts and the list of threads
//! stuck behind a monitor, resolved through the registry at the time of the
//! call.

use std::fmt;

use tracing::debug;

use crate::model::{group_thousands, JavaClass, JavaRuntime, MemoryCategory};
use crate::types::Address;

/// The runtimes found in one image source.
#[derive(Debug, Clone)]
pub struct JavaCoreImage
{
    source: String,
    creation_time: Option<i64>,
    runtimes: Vec<JavaRuntime>,
}

impl JavaCoreImage
{
    /// Create an image described by `source` (a path or archive member).
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self
    {
        Self {
            source: source.into(),
            creation_time: None,
            runtimes: Vec::new(),
        }
    }

    /// Where the image was read from.
    pub fn source(&self) -> &str
    {
        &self.source
    }

    /// When the dump was written, in milliseconds since the Unix epoch.
    pub fn creation_time(&self) -> Option<i64>
    {
        self.creation_time
    }

    /// Record when the dump was written, in milliseconds since the epoch.
    pub fn set_creation_time(&mut self, millis: i64)
    {
        self.creation_time = Some(millis);
    }

    /// Append a runtime and return it for population.
    pub fn add_runtime(&mut self, runtime: JavaRuntime) -> &mut JavaRuntime
    {
        crate::model::push_mut(&mut self.runtimes, runtime)
    }

    /// Runtimes, in the order they were found.
    pub fn runtimes(&self) -> &[JavaRuntime]
    {
        &self.runtimes
    }

    /// Runtime with the given id.
    pub fn runtime(&self, id: &str) -> Option<&JavaRuntime>
    {
        self.runtimes.iter().find(|runtime| runtime.id() == id)
    }

    /// First class called `name` in any runtime.
    pub fn find_class(&self, name: &str) -> Option<&JavaClass>
    {
        self.runtimes.iter().find_map(|runtime| runtime.find_class(name))
    }

    /// First class at `address` in any runtime.
    pub fn find_class_by_address(&self, address: Address) -> Option<&JavaClass>
    {
        self.runtimes
            .iter()
            .find_map(|runtime| runtime.find_class_by_address(address))
    }

    /// One summary per runtime.
    pub fn summary(&self) -> Vec<RuntimeSummary>
    {
        self.runtimes.iter().map(RuntimeSummary::of).collect()
    }
}

/// A thread waiting to enter a monitor, and who holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedThread
{
    pub thread: String,
    pub thread_address: Address,
    pub monitor: String,
    pub monitor_address: Address,
    /// Name of the owning thread. `None` when the monitor is unowned or the
    /// owner does not resolve.
    pub owner: Option<String>,
}

/// Counts and contention for one runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSummary
{
    pub id: String,
    pub version: Option<String>,
    pub jit_enabled: Option<bool>,
    pub heaps: usize,
    pub compiled_methods: usize,
    pub class_loaders: usize,
    pub classes: usize,
    pub monitors: usize,
    pub threads: usize,
    pub memory_categories: usize,
    /// Sum of the deep bytes of the top-level memory categories.
    pub native_bytes: u64,
    pub blocked: Vec<BlockedThread>,
}

impl RuntimeSummary
{
    /// Summarise `runtime`.
    ///
    /// Waiters and owners that do not resolve are logged and left out (or
    /// reported as unowned); a summary never fails.
    pub fn of(runtime: &JavaRuntime) -> Self
    {
        let mut blocked = Vec::new();
        for monitor in runtime.monitors() {
            let owner = match monitor.owner(runtime) {
                Ok(owner) => owner.map(|thread| thread.name()),
                Err(err) => {
                    debug!("owner of monitor {} unresolved: {err}", monitor.address());
                    None
                }
            };
            for waiter in monitor.enter_waiters(runtime) {
                match waiter {
                    Ok(thread) => blocked.push(BlockedThread {
                        thread: thread.name(),
                        thread_address: thread.address(),
                        monitor: monitor.name(),
                        monitor_address: monitor.address(),
                        owner: owner.clone(),
                    }),
                    Err(corrupt) => debug!("waiter on monitor {} unresolved: {corrupt}", monitor.address()),
                }
            }
        }

        Self {
            id: runtime.id().to_string(),
            version: runtime.version().ok().map(str::to_string),
            jit_enabled: runtime.is_jit_enabled().ok(),
            heaps: runtime.heaps().len(),
            compiled_methods: runtime.compiled_methods().len(),
            class_loaders: runtime.class_loaders().count(),
            classes: runtime.classes().count(),
            monitors: runtime.monitors().count(),
            threads: runtime.threads().count(),
            memory_categories: runtime.memory_categories().len(),
            native_bytes: runtime.memory_categories().iter().map(MemoryCategory::deep_bytes).sum(),
            blocked,
        }
    }
}

impl fmt::Display for RuntimeSummary
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        writeln!(f, "Runtime {}", self.id)?;
        writeln!(f, "  Version:           {}", self.version.as_deref().unwrap_or("<unavailable>"))?;
        let jit = match self.jit_enabled {
            Some(true) => "enabled",
            Some(false) => "disabled",
            None => "<unavailable>",
        };
        writeln!(f, "  JIT:               {jit}")?;
        writeln!(f, "  Threads:           {}", self.threads)?;
        writeln!(f, "  Monitors:          {}", self.monitors)?;
        writeln!(f, "  Class loaders:     {}", self.class_loaders)?;
        writeln!(f, "  Classes:           {}", self.classes)?;
        writeln!(f, "  Heaps:             {}", self.heaps)?;
        writeln!(f, "  Compiled methods:  {}", self.compiled_methods)?;
        writeln!(f, "  Native memory:     {} bytes", group_thousands(self.native_bytes))?;
        if !self.blocked.is_empty() {
            writeln!(f, "  Blocked threads:")?;
            for blocked in &self.blocked {
                let owner = blocked.owner.as_deref().unwrap_or("<unowned>");
                writeln!(f, "    \"{}\" waiting for {} held by \"{owner}\"", blocked.thread, blocked.monitor)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_summary_lists_blocked_threads()
    {
        let mut runtime = JavaRuntime::with_default_space("r1").unwrap();
        runtime.add_thread(Address::new(0x900)).unwrap().set_name("owner");
        runtime.add_thread(Address::new(0xa00)).unwrap().set_name("waiter");
        let monitor = runtime.add_monitor(Address::new(0x500)).unwrap();
        monitor.set_name("app lock");
        monitor.set_owner(Address::new(0x900));
        monitor.add_enter_waiter(Address::new(0xa00));
        monitor.add_enter_waiter(Address::new(0xdead));

        let mut image = JavaCoreImage::new("javacore.txt");
        image.add_runtime(runtime);

        let summaries = image.summary();
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.threads, 2);
        assert_eq!(summary.blocked.len(), 1);
        assert_eq!(summary.blocked[0].thread, "waiter");
        assert_eq!(summary.blocked[0].owner.as_deref(), Some("owner"));
        assert!(summary.to_string().contains("\"waiter\" waiting for app lock held by \"owner\""));
    }

    #[test]
    fn test_unresolved_owner_is_reported_unowned()
    {
        let mut runtime = JavaRuntime::with_default_space("r1").unwrap();
        runtime.add_thread(Address::new(0xa00)).unwrap();
        let monitor = runtime.add_monitor(Address::new(0x500)).unwrap();
        monitor.set_owner(Address::new(0x1_0000));
        monitor.add_enter_waiter(Address::new(0xa00));

        let summary = RuntimeSummary::of(&runtime);
        assert_eq!(summary.blocked[0].owner, None);
        assert_eq!(summary.blocked[0].thread, "vmthread @0xa00");
    }

    #[test]
    fn test_find_class_across_runtimes()
    {
        let mut first = JavaRuntime::with_default_space("r1").unwrap();
        first.add_class("a/A").unwrap();
        let mut second = JavaRuntime::with_default_space("r2").unwrap();
        second.add_class("b/B").unwrap();
        second.set_class_address("b/B", Address::new(0x40)).unwrap();

        let mut image = JavaCoreImage::new("x");
        image.add_runtime(first);
        image.add_runtime(second);

        assert_eq!(image.find_class("b/B").unwrap().name(), "b/B");
        assert_eq!(image.find_class_by_address(Address::new(0x40)).unwrap().name(), "b/B");
        assert!(image.runtime("r2").is_some());
        assert!(image.runtime("r3").is_none());
    }
}

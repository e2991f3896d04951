//! # Javacore Reader
//!
//! A best-effort reader that turns javacore text into a [`JavaCoreImage`].
//!
//! The reader walks the file line by line and dispatches on the tag at the
//! start of each line. Only the tags that feed the runtime model are handled;
//! everything else is skipped, and so is any recognised line whose payload
//! does not parse. A truncated or damaged javacore therefore yields a
//! partially populated runtime rather than an error.
//!
//! ## Example
//!
//! ```rust
//! use jcdump_core::javacore::JavaCoreReader;
//!
//! let text = "\
//! 0SECTION       TITLE subcomponent dump routine
//! 1CIJAVAVERSION JRE 17.0.9 Linux amd64-64
//! 3XMTHREADINFO      \"main\" J9VMThread:0x0000000001D20500, omrthread_t:0x0, java/lang/Thread:0x0, state:R, prio=5
//! 4XESTACKTRACE                at com/example/App.main(App.java:10)
//! ";
//!
//! let image = JavaCoreReader::default().read_str("javacore.txt", text).unwrap();
//! let runtime = &image.runtimes()[0];
//! assert_eq!(runtime.version().unwrap(), "JRE 17.0.9 Linux amd64-64");
//!
//! let main = runtime.find_thread(0x1d20500).unwrap();
//! assert_eq!(main.frames()[0].location().to_string(), "com.example.App.main(App.java:10)");
//! ```

pub mod line;

use std::io::Read;
use std::sync::Arc;

use tracing::{debug, trace};

use self::line::{MemoryRow, Owner};
use crate::address_space::{AddressSpace, JavaCoreAddressSpace};
use crate::error::{DumpError, DumpResult};
use crate::image::JavaCoreImage;
use crate::model::{
    Heap, ImageThread, JavaMethod, JavaObject, JavaRuntime, Location, MemoryCategory, MemorySection, VmOption, COMPILED,
    OTHER,
};
use crate::sniff::{classify_bytes, ImageKind, ImageSource, ImageSourceManager, SNIFF_LEN};
use crate::types::Address;

/// Id given to the single runtime a javacore describes.
pub const RUNTIME_ID: &str = "0";

/// Name of the heap created when regions appear before any heap space.
const DEFAULT_HEAP: &str = "Java heap";

/// Reads javacore text into the runtime model.
#[derive(Debug, Clone)]
pub struct JavaCoreReader
{
    address_space: Arc<dyn AddressSpace>,
    max_frames: Option<usize>,
}

impl Default for JavaCoreReader
{
    fn default() -> Self
    {
        Self::new(Arc::new(JavaCoreAddressSpace::default()))
    }
}

impl JavaCoreReader
{
    /// Create a reader whose runtime checks pointers against `address_space`.
    #[must_use]
    pub fn new(address_space: Arc<dyn AddressSpace>) -> Self
    {
        Self {
            address_space,
            max_frames: None,
        }
    }

    /// Keep at most `max_frames` stack frames per thread.
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self
    {
        self.max_frames = max_frames;
        self
    }

    /// Read an image source listed by `manager`.
    ///
    /// ## Errors
    ///
    /// Returns an I/O or archive error if the source cannot be read, or
    /// `UnsupportedFormat` if it is not a javacore.
    pub fn read_source(&self, manager: &ImageSourceManager, source: &ImageSource) -> DumpResult<JavaCoreImage>
    {
        if source.kind() != ImageKind::JavaCore {
            return Err(DumpError::UnsupportedFormat(format!(
                "{} is a {} image, not a javacore",
                source.name(),
                source.kind()
            )));
        }
        let text = manager.read_to_string(source)?;
        self.read_str(&source.name(), &text)
    }

    /// Read javacore text from `reader`.
    ///
    /// ## Errors
    ///
    /// Returns an I/O error if reading fails, or `UnsupportedFormat` if the
    /// text is not a javacore.
    pub fn read<R: Read>(&self, source: &str, mut reader: R) -> DumpResult<JavaCoreImage>
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.read_str(source, &String::from_utf8_lossy(&bytes))
    }

    /// Read javacore text already in memory.
    ///
    /// ## Errors
    ///
    /// `UnsupportedFormat` if the text is not a javacore.
    pub fn read_str(&self, source: &str, text: &str) -> DumpResult<JavaCoreImage>
    {
        let head = &text.as_bytes()[..text.len().min(SNIFF_LEN)];
        if classify_bytes(head) != ImageKind::JavaCore {
            return Err(DumpError::UnsupportedFormat(format!("{source} is not a javacore")));
        }

        let runtime = JavaRuntime::new(RUNTIME_ID, Arc::clone(&self.address_space))?;
        let mut builder = Builder::new(runtime, self.max_frames);
        for line in text.lines() {
            builder.line(line);
        }
        debug!(
            "read {source}: {} threads, {} monitors, {} classes",
            builder.runtime.threads().count(),
            builder.runtime.monitors().count(),
            builder.runtime.classes().count()
        );

        let mut image = JavaCoreImage::new(source);
        if let Some(millis) = builder.creation_time {
            image.set_creation_time(millis);
        }
        image.add_runtime(builder.runtime);
        Ok(image)
    }
}

/// Parse state carried between lines.
struct Builder
{
    runtime: JavaRuntime,
    creation_time: Option<i64>,
    max_frames: Option<usize>,
    thread: Option<Address>,
    loader: Option<Address>,
    monitor: Option<Address>,
    memory_path: Vec<usize>,
}

impl Builder
{
    fn new(runtime: JavaRuntime, max_frames: Option<usize>) -> Self
    {
        Self {
            runtime,
            creation_time: None,
            max_frames,
            thread: None,
            loader: None,
            monitor: None,
            memory_path: Vec::new(),
        }
    }

    fn line(&mut self, text: &str)
    {
        let text = text.trim_end();
        let (tag, rest) = text
            .split_once(|c: char| c.is_whitespace())
            .map_or((text, ""), |(tag, rest)| (tag, rest.trim()));

        let handled = match tag {
            "0SECTION" => {
                self.thread = None;
                self.loader = None;
                self.monitor = None;
                self.memory_path.clear();
                true
            }
            "1TIDATETIME" => self.creation_time(rest),
            "1CIJAVAVERSION" => {
                self.runtime.set_version(rest);
                true
            }
            "1CIVMVERSION" => {
                self.runtime.set_full_version(rest);
                true
            }
            "1CIJITMODES" => {
                self.runtime.set_jit_enabled(rest.starts_with("JIT enabled"));
                self.runtime.set_jit_options(rest);
                true
            }
            "1CISTARTTIME" => self.start_time(rest),
            "1CISTARTNANO" => self.start_nanos(rest),
            "1CIUSERARGS" => {
                self.runtime.init_args_mut();
                true
            }
            "2CIUSERARG" => {
                let (option, extra_info) = line::user_arg(rest);
                self.runtime.init_args_mut().add_option(VmOption::new(option, extra_info));
                true
            }
            "1STHEAPSPACE" => self.heap_space(rest),
            "1STHEAPREGION" => self.heap_region(rest),
            "2CLTEXTCLLOAD" => self.class_loader(rest),
            "3CLTEXTCLASS" => self.class(rest),
            "2LKMONINUSE" => self.monitor_in_use(rest),
            "3LKMONOBJECT" => self.monitor_object(rest),
            "2LKREGMON" => self.registered_monitor(rest),
            "3LKWAITER" => self.waiter(rest, false),
            "3LKWAITNOTIFY" => self.waiter(rest, true),
            "3XMTHREADINFO" => self.thread(rest),
            "3XMTHREADINFO1" => self.native_thread(rest),
            "3XMTHREADINFO2" => self.stack_range(rest),
            "3XMTHREADBLOCK" => self.blocking_object(rest),
            "4XESTACKTRACE" => self.frame(rest),
            _ => match tag.strip_suffix("MEMUSER").and_then(|level| level.parse::<usize>().ok()) {
                Some(level) => self.memory_row(level, rest),
                None => false,
            },
        };

        if !handled {
            trace!("skipping javacore line: {text}");
        }
    }

    fn creation_time(&mut self, rest: &str) -> bool
    {
        let Some(millis) = rest.strip_prefix("Date:").and_then(line::timestamp) else {
            return false;
        };
        self.creation_time = Some(millis);
        true
    }

    fn start_time(&mut self, rest: &str) -> bool
    {
        let Some(millis) = rest.strip_prefix("JVM start time:").and_then(line::timestamp) else {
            return false;
        };
        self.runtime.set_start_time(millis);
        true
    }

    fn start_nanos(&mut self, rest: &str) -> bool
    {
        let Some(nanos) = rest
            .strip_prefix("JVM start nanotime:")
            .and_then(|nanos| nanos.trim().parse::<u64>().ok())
        else {
            return false;
        };
        self.runtime.set_start_time_nanos(i64::try_from(nanos).unwrap_or(i64::MAX));
        true
    }

    // ---- heaps --------------------------------------------------------

    fn heap_space(&mut self, rest: &str) -> bool
    {
        let Some(name) = line::heap_space(rest) else {
            return false;
        };
        self.runtime.add_heap(Heap::new(name));
        true
    }

    fn heap_region(&mut self, rest: &str) -> bool
    {
        let Some((base, size, name)) = line::heap_region(rest) else {
            return false;
        };
        if self.runtime.heaps().is_empty() {
            self.runtime.add_heap(Heap::new(DEFAULT_HEAP));
        }
        if let Some(heap) = self.runtime.heaps_mut().last_mut() {
            heap.add_section(MemorySection::new(name, base, size));
        }
        true
    }

    // ---- classes ------------------------------------------------------

    fn class_loader(&mut self, rest: &str) -> bool
    {
        self.loader = None;
        let Some(info) = line::class_loader(rest) else {
            return false;
        };
        if info.object == Address::ZERO {
            return true;
        }
        let object = if info.name.starts_with(['*', '[']) {
            JavaObject::new(info.object)
        } else {
            JavaObject::with_class(info.object, info.name.clone())
        };

        if self.runtime.find_class_loader_mut(info.object).is_none() {
            if let Err(err) = self.runtime.add_class_loader(info.object) {
                debug!("class loader {}: {err}", info.object);
                return false;
            }
        }
        let Some(loader) = self.runtime.find_class_loader_mut(info.object) else {
            return false;
        };
        loader.set_name(info.name);
        loader.set_object(object);
        self.loader = Some(info.object);
        true
    }

    fn class(&mut self, rest: &str) -> bool
    {
        let Some((name, address)) = line::class_entry(rest) else {
            return false;
        };
        if self.runtime.find_class(&name).is_none() {
            if let Err(err) = self.runtime.add_class(name.as_str()) {
                debug!("class {name}: {err}");
                return false;
            }
        }
        if let Err(err) = self.runtime.set_class_address(&name, address) {
            debug!("class {name}: {err}");
            return false;
        }
        if let Some(loader) = self.loader {
            if let Some(class) = self.runtime.find_class_mut(&name) {
                class.set_class_loader(loader);
            }
            if let Some(loader) = self.runtime.find_class_loader_mut(loader) {
                loader.add_class(name, Some(address));
            }
        }
        true
    }

    // ---- monitors -----------------------------------------------------

    fn select_monitor(&mut self, address: Address) -> bool
    {
        self.monitor = None;
        if self.runtime.find_monitor_mut(address).is_none() {
            if let Err(err) = self.runtime.add_monitor(address) {
                debug!("monitor {address}: {err}");
                return false;
            }
        }
        self.monitor = Some(address);
        true
    }

    fn monitor_in_use(&mut self, rest: &str) -> bool
    {
        match line::monitor_in_use(rest) {
            Some(address) => self.select_monitor(address),
            None => {
                self.monitor = None;
                false
            }
        }
    }

    fn monitor_object(&mut self, rest: &str) -> bool
    {
        let Some((object, owner)) = line::monitor_object(rest) else {
            return false;
        };
        let Some(monitor) = self.monitor.and_then(|address| self.runtime.find_monitor_mut(address)) else {
            return false;
        };
        monitor.set_object(JavaObject::with_class(object.address, object.class_name));
        set_owner(monitor, owner);
        true
    }

    fn registered_monitor(&mut self, rest: &str) -> bool
    {
        let Some((name, address, owner)) = line::registered_monitor(rest) else {
            self.monitor = None;
            return false;
        };
        if !self.select_monitor(address) {
            return false;
        }
        let Some(monitor) = self.runtime.find_monitor_mut(address) else {
            return false;
        };
        if let Some(name) = name {
            monitor.set_name(name);
        }
        set_owner(monitor, owner);
        true
    }

    fn waiter(&mut self, rest: &str, notify: bool) -> bool
    {
        let Some(thread) = line::waiter(rest) else {
            return false;
        };
        let Some(monitor) = self.monitor.and_then(|address| self.runtime.find_monitor_mut(address)) else {
            return false;
        };
        if notify {
            monitor.add_notify_waiter(thread);
        } else {
            monitor.add_enter_waiter(thread);
        }
        true
    }

    // ---- threads ------------------------------------------------------

    fn thread(&mut self, rest: &str) -> bool
    {
        self.thread = None;
        let Some(info) = line::thread_info(rest) else {
            return rest.starts_with("Anonymous native thread");
        };

        // The current thread is written twice; the second copy replaces the first.
        let thread = match self.runtime.add_thread(info.vm_thread) {
            Ok(thread) => thread,
            Err(err) => {
                debug!("thread \"{}\": {err}", info.name);
                return false;
            }
        };
        thread.set_name(info.name);
        if let Some(object) = info.thread_object {
            thread.set_object(JavaObject::with_class(object, "java/lang/Thread"));
        }
        if let Some(os_thread) = info.os_thread {
            thread.set_image_thread(ImageThread::new(os_thread));
        }
        if let Some(state) = info.state {
            thread.set_state_code(&state);
        }
        if let Some(priority) = info.priority {
            thread.set_priority(priority);
        }
        self.thread = Some(info.vm_thread);
        true
    }

    fn native_thread(&mut self, rest: &str) -> bool
    {
        let Some(info) = line::native_thread_info(rest) else {
            return false;
        };
        let Some(thread) = self.thread.and_then(|address| self.runtime.find_thread_mut(address)) else {
            return false;
        };
        if thread.image_thread_mut().is_none() {
            thread.set_image_thread(ImageThread::new(Address::new(info.native_id)));
        }
        if let Some(native) = thread.image_thread_mut() {
            native.set_system_thread_id(info.native_id);
            if let Some(priority) = info.priority {
                native.set_property("priority", priority);
            }
            if let Some(policy) = info.policy {
                native.set_property("policy", policy);
            }
        }
        true
    }

    fn stack_range(&mut self, rest: &str) -> bool
    {
        let Some((from, to)) = line::stack_range(rest) else {
            return false;
        };
        let Some(native) = self
            .thread
            .and_then(|address| self.runtime.find_thread_mut(address))
            .and_then(|thread| thread.image_thread_mut())
        else {
            return false;
        };
        native.set_property("stack_start", from.to_string());
        native.set_property("stack_end", to.to_string());
        true
    }

    fn blocking_object(&mut self, rest: &str) -> bool
    {
        let Some(object) = line::blocking_object(rest) else {
            return false;
        };
        let Some(thread) = self.thread.and_then(|address| self.runtime.find_thread_mut(address)) else {
            return false;
        };
        thread.set_blocking_object(JavaObject::with_class(object.address, object.class_name));
        true
    }

    fn frame(&mut self, rest: &str) -> bool
    {
        let Some(frame) = line::stack_frame(rest) else {
            return false;
        };
        let Ok(method) = JavaMethod::new(frame.method_name, frame.class_name) else {
            return false;
        };
        if frame.compilation == Some(COMPILED) && !self.runtime.compiled_methods().contains(&method) {
            self.runtime.add_compiled_method(method.clone());
        }

        let max_frames = self.max_frames;
        let Some(thread) = self.thread.and_then(|address| self.runtime.find_thread_mut(address)) else {
            return false;
        };
        if max_frames.is_some_and(|max| thread.frames().len() >= max) {
            return true;
        }

        let mut location = Location::new(method);
        if let Some(file) = frame.file {
            location.set_filename(file);
        }
        if let Some(line) = frame.line {
            location.set_line_number(line);
        }
        if let Some(compilation) = frame.compilation {
            location.set_compilation(compilation);
        }
        thread.add_frame(location);
        true
    }

    // ---- native memory ------------------------------------------------

    fn memory_row(&mut self, level: usize, rest: &str) -> bool
    {
        // Separator rows carry no counts.
        if !rest.contains(" bytes / ") {
            return true;
        }
        let Some(MemoryRow {
            depth,
            name,
            bytes,
            allocations,
        }) = line::memory_row(level, rest)
        else {
            return false;
        };
        if depth > self.memory_path.len() {
            return false;
        }
        self.memory_path.truncate(depth);

        if depth == 0 {
            self.memory_path.push(self.runtime.memory_categories().len());
            self.runtime.add_memory_category(MemoryCategory::new(name, bytes, allocations));
            return true;
        }

        let Some(parent) = category_at(&mut self.runtime, &self.memory_path) else {
            return false;
        };
        if name == OTHER {
            parent.set_shallow(bytes, allocations);
            return true;
        }
        self.memory_path.push(parent.children().len());
        parent.add_child(MemoryCategory::new(name, bytes, allocations));
        true
    }
}

fn set_owner(monitor: &mut crate::model::JavaMonitor, owner: Owner)
{
    match owner {
        Owner::Unowned => {}
        Owner::VmThread(thread) => monitor.set_owner(thread),
        Owner::Native(id) => monitor.set_owner(Address::new(id)),
    }
}

fn category_at<'r>(runtime: &'r mut JavaRuntime, path: &[usize]) -> Option<&'r mut MemoryCategory>
{
    let (first, rest) = path.split_first()?;
    let mut node = runtime.memory_categories_mut().get_mut(*first)?;
    for &index in rest {
        node = node.children_mut().get_mut(index)?;
    }
    Some(node)
}

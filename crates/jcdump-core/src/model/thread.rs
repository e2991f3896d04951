//! Java threads, their stack frames, and the native threads behind them.

use std::collections::BTreeMap;

use bitflags::bitflags;

use super::{Datum, JavaObject, Location};
use crate::error::DumpResult;
use crate::types::Address;

bitflags! {
    /// Thread state, as a JVMTI-style bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ThreadState: u32
    {
        /// The thread has started and not terminated.
        const ALIVE = 0x0001;
        /// The thread has terminated.
        const TERMINATED = 0x0002;
        /// The thread is executing or ready to execute.
        const RUNNABLE = 0x0004;
        /// Waiting without a timeout.
        const WAITING_INDEFINITELY = 0x0010;
        /// Waiting with a timeout.
        const WAITING_WITH_TIMEOUT = 0x0020;
        /// Sleeping.
        const SLEEPING = 0x0040;
        /// Waiting of any kind.
        const WAITING = 0x0080;
        /// In `Object.wait()`.
        const IN_OBJECT_WAIT = 0x0100;
        /// Parked by `LockSupport`.
        const PARKED = 0x0200;
        /// Blocked entering a monitor.
        const BLOCKED_ON_MONITOR_ENTER = 0x0400;
        /// Suspended.
        const SUSPENDED = 0x10_0000;
        /// Interrupted.
        const INTERRUPTED = 0x20_0000;
        /// Executing native code.
        const IN_NATIVE = 0x40_0000;
    }
}

impl ThreadState
{
    /// Map a javacore state code to a state.
    ///
    /// | Code | State |
    /// |------|-------|
    /// | `R` | alive, runnable |
    /// | `CW` | alive, waiting, in object wait |
    /// | `P` | alive, waiting, parked |
    /// | `B`, `MW` | alive, waiting, blocked on monitor enter |
    ///
    /// Any other code yields `None`.
    pub fn from_code(code: &str) -> Option<Self>
    {
        match code.trim() {
            "R" => Some(Self::ALIVE | Self::RUNNABLE),
            "CW" => Some(Self::ALIVE | Self::WAITING | Self::IN_OBJECT_WAIT),
            "P" => Some(Self::ALIVE | Self::WAITING | Self::PARKED),
            "B" | "MW" => Some(Self::ALIVE | Self::WAITING | Self::BLOCKED_ON_MONITOR_ENTER),
            _ => None,
        }
    }
}

/// The native thread a Java thread runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageThread
{
    internal_id: Address,
    system_thread_id: Option<u64>,
    properties: BTreeMap<String, String>,
}

impl ImageThread
{
    /// Create a native thread record. `internal_id` is the thread-library
    /// handle (`omrthread_t`).
    #[must_use]
    pub fn new(internal_id: Address) -> Self
    {
        Self {
            internal_id,
            system_thread_id: None,
            properties: BTreeMap::new(),
        }
    }

    /// Thread-library handle.
    pub fn internal_id(&self) -> Address
    {
        self.internal_id
    }

    /// Operating-system thread id, if recorded.
    pub fn system_thread_id(&self) -> Option<u64>
    {
        self.system_thread_id
    }

    /// Record the operating-system thread id.
    pub fn set_system_thread_id(&mut self, id: u64)
    {
        self.system_thread_id = Some(id);
    }

    /// Free-form properties (native priority, policy, stack range).
    pub fn properties(&self) -> &BTreeMap<String, String>
    {
        &self.properties
    }

    /// Record a property.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>)
    {
        self.properties.insert(key.into(), value.into());
    }
}

/// One frame of a Java stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame
{
    thread: Address,
    location: Location,
    base_pointer: Datum<Address>,
}

impl StackFrame
{
    /// Address of the owning thread.
    pub fn thread(&self) -> Address
    {
        self.thread
    }

    /// Where in which method the frame is executing.
    pub fn location(&self) -> &Location
    {
        &self.location
    }

    /// Mutable access to the location, for enrichment.
    pub fn location_mut(&mut self) -> &mut Location
    {
        &mut self.location
    }

    /// Frame base pointer.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn base_pointer(&self) -> DumpResult<Address>
    {
        self.base_pointer.value("frame base pointer")
    }

    /// Record the frame base pointer.
    pub fn set_base_pointer(&mut self, base_pointer: Address)
    {
        self.base_pointer.set(base_pointer);
    }
}

/// A Java thread, identified by the address of its VM thread structure.
#[derive(Debug, Clone)]
pub struct JavaThread
{
    address: Address,
    name: Datum<String>,
    priority: Datum<i32>,
    state: Datum<ThreadState>,
    jni_env: Datum<Address>,
    object: Datum<JavaObject>,
    blocking_object: Datum<JavaObject>,
    image_thread: Datum<ImageThread>,
    frames: Vec<StackFrame>,
}

impl JavaThread
{
    /// Create an unregistered thread at `address`.
    ///
    /// Prefer [`super::JavaRuntime::add_thread`], which validates the address
    /// and registers in one step.
    #[must_use]
    pub fn new(address: Address) -> Self
    {
        Self {
            address,
            name: Datum::Unavailable,
            priority: Datum::Unavailable,
            state: Datum::Unavailable,
            jni_env: Datum::Unavailable,
            object: Datum::Unavailable,
            blocking_object: Datum::Unavailable,
            image_thread: Datum::Unavailable,
            frames: Vec::new(),
        }
    }

    /// Address of the VM thread structure.
    pub fn address(&self) -> Address
    {
        self.address
    }

    /// Thread name, or `vmthread @<address>` if none was recorded.
    pub fn name(&self) -> String
    {
        match self.name.as_option() {
            Some(name) => name.clone(),
            None => format!("vmthread @{}", self.address),
        }
    }

    /// Record the thread name.
    pub fn set_name(&mut self, name: impl Into<String>)
    {
        self.name.set(name.into());
    }

    /// Java priority.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn priority(&self) -> DumpResult<i32>
    {
        self.priority.value("thread priority")
    }

    /// Record the Java priority.
    pub fn set_priority(&mut self, priority: i32)
    {
        self.priority.set(priority);
    }

    /// Thread state.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless a recognised state was recorded.
    pub fn state(&self) -> DumpResult<ThreadState>
    {
        self.state.value("thread state")
    }

    /// Record the state directly.
    pub fn set_state(&mut self, state: ThreadState)
    {
        self.state.set(state);
    }

    /// Record the state from a javacore code; see [`ThreadState::from_code`].
    ///
    /// Returns `false` and leaves the state untouched for unknown codes.
    pub fn set_state_code(&mut self, code: &str) -> bool
    {
        match ThreadState::from_code(code) {
            Some(state) => {
                self.state.set(state);
                true
            }
            None => {
                tracing::trace!("thread {}: unrecognised state code {code:?}", self.address);
                false
            }
        }
    }

    /// JNI environment pointer.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn jni_env(&self) -> DumpResult<Address>
    {
        self.jni_env.value("JNI environment")
    }

    /// Record the JNI environment pointer.
    pub fn set_jni_env(&mut self, jni_env: Address)
    {
        self.jni_env.set(jni_env);
    }

    /// The `java/lang/Thread` instance.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn object(&self) -> DumpResult<&JavaObject>
    {
        self.object.get("thread object")
    }

    /// Record the `java/lang/Thread` instance.
    pub fn set_object(&mut self, object: JavaObject)
    {
        self.object.set(object);
    }

    /// The object the thread is blocked, waiting or parked on.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn blocking_object(&self) -> DumpResult<&JavaObject>
    {
        self.blocking_object.get("blocking object")
    }

    /// Record the blocking object.
    pub fn set_blocking_object(&mut self, object: JavaObject)
    {
        self.blocking_object.set(object);
    }

    /// The native thread behind this Java thread.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` unless set.
    pub fn image_thread(&self) -> DumpResult<&ImageThread>
    {
        self.image_thread.get("image thread")
    }

    /// Mutable access to the native thread, if recorded.
    pub fn image_thread_mut(&mut self) -> Option<&mut ImageThread>
    {
        match &mut self.image_thread {
            Datum::Available(thread) => Some(thread),
            _ => None,
        }
    }

    /// Record the native thread.
    pub fn set_image_thread(&mut self, image_thread: ImageThread)
    {
        self.image_thread.set(image_thread);
    }

    /// Whether `raw` names this thread's native thread, by system id first
    /// and by thread-library handle second.
    pub(crate) fn matches_native_id(&self, raw: u64) -> bool
    {
        self.image_thread.as_option().is_some_and(|native| {
            native.system_thread_id() == Some(raw) || native.internal_id().value() == raw
        })
    }

    /// Append a frame for `location` and return it for enrichment.
    pub fn add_frame(&mut self, location: Location) -> &mut StackFrame
    {
        let frame = StackFrame {
            thread: self.address,
            location,
            base_pointer: Datum::Unavailable,
        };
        super::push_mut(&mut self.frames, frame)
    }

    /// Stack frames, innermost first.
    pub fn frames(&self) -> &[StackFrame]
    {
        &self.frames
    }
}

//! Java monitors and owner resolution.

use smallvec::SmallVec;

use super::{Datum, JavaObject, JavaRuntime, JavaThread};
use crate::error::{CorruptData, DumpError, DumpResult};
use crate::types::Address;

/// Owner ids below this value are flat-lock indexes, not thread pointers.
pub const FLAT_LOCK_OWNER_LIMIT: u64 = 0x10000;

/// Bound on chained flat-lock indirections, so a monitor whose object points
/// back at itself cannot recurse forever.
const MAX_FLAT_LOCK_DEPTH: usize = 8;

/// A Java monitor, identified by its address.
///
/// Waiters and the owner are stored as raw pointers and resolved against the
/// runtime on every read: threads may be registered after the monitor that
/// names them.
#[derive(Debug, Clone)]
pub struct JavaMonitor
{
    address: Address,
    name: Datum<String>,
    object: Datum<JavaObject>,
    owner: Datum<Address>,
    enter_waiters: SmallVec<[Address; 4]>,
    notify_waiters: SmallVec<[Address; 4]>,
}

impl JavaMonitor
{
    /// Create an unregistered monitor at `address`.
    ///
    /// Prefer [`JavaRuntime::add_monitor`], which validates the address and
    /// registers in one step.
    #[must_use]
    pub fn new(address: Address) -> Self
    {
        Self {
            address,
            name: Datum::Unavailable,
            object: Datum::Unavailable,
            owner: Datum::Unavailable,
            enter_waiters: SmallVec::new(),
            notify_waiters: SmallVec::new(),
        }
    }

    /// Address of the monitor.
    pub fn address(&self) -> Address
    {
        self.address
    }

    /// Monitor name.
    ///
    /// Unnamed monitors get a name synthesised from their address (or their
    /// object's address) on every call. The synthesised name is not stored.
    pub fn name(&self) -> String
    {
        if let Some(name) = self.name.as_option() {
            return name.clone();
        }
        match self.object.as_option() {
            Some(object) => format!("(un-named monitor for object @{})", object.address()),
            None => format!("(un-named monitor @{})", self.address),
        }
    }

    /// Record the monitor name.
    pub fn set_name(&mut self, name: impl Into<String>)
    {
        self.name.set(name.into());
    }

    /// The object whose lock word this monitor belongs to.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` for raw (system) monitors.
    pub fn object(&self) -> DumpResult<&JavaObject>
    {
        self.object.get("monitor object")
    }

    /// Record the encompassing object.
    pub fn set_object(&mut self, object: JavaObject)
    {
        self.object.set(object);
    }

    /// The raw owner id, exactly as recorded.
    ///
    /// ## Errors
    ///
    /// `DataUnavailable` if the monitor is unowned.
    pub fn owner_id(&self) -> DumpResult<Address>
    {
        self.owner.value("monitor owner")
    }

    /// Record the raw owner id: a thread pointer or a flat-lock index.
    pub fn set_owner(&mut self, owner: Address)
    {
        self.owner.set(owner);
    }

    /// Resolve the owning thread.
    ///
    /// 1. No owner recorded: `Ok(None)`, nobody holds the lock.
    /// 2. Owner below [`FLAT_LOCK_OWNER_LIMIT`] and an object is recorded: the
    ///    owner is a flat-lock index. Resolve the owner of the monitor keyed
    ///    by the object's address instead. If that yields corrupt data, fall
    ///    through to 3.
    /// 3. Look the owner up as a thread.
    /// 4. Otherwise the owner is corrupt.
    ///
    /// ## Errors
    ///
    /// `CorruptData` carrying the owner pointer when it names no thread.
    pub fn owner<'r>(&self, runtime: &'r JavaRuntime) -> DumpResult<Option<&'r JavaThread>>
    {
        self.resolve_owner(runtime, 0)
    }

    fn resolve_owner<'r>(&self, runtime: &'r JavaRuntime, depth: usize) -> DumpResult<Option<&'r JavaThread>>
    {
        let owner = match &self.owner {
            Datum::Unavailable => return Ok(None),
            Datum::Corrupt(corrupt) => return Err(DumpError::CorruptData(corrupt.clone())),
            Datum::Available(owner) => *owner,
        };

        if owner.value() < FLAT_LOCK_OWNER_LIMIT && depth < MAX_FLAT_LOCK_DEPTH {
            if let Some(object) = self.object.as_option() {
                let inflated = runtime
                    .find_monitor(object.address())
                    .filter(|monitor| monitor.address != self.address);
                if let Some(inflated) = inflated {
                    match inflated.resolve_owner(runtime, depth + 1) {
                        Err(err) if err.is_corrupt() => {
                            tracing::debug!(
                                "flat lock on {} did not resolve through {}: {err}",
                                self.address,
                                inflated.address
                            );
                        }
                        resolved => return resolved,
                    }
                }
            }
        }

        runtime
            .find_thread(owner.value())
            .map(Some)
            .ok_or_else(|| DumpError::corrupt_at("monitor owner is not a known thread", owner))
    }

    /// Append a thread waiting to enter the monitor.
    pub fn add_enter_waiter(&mut self, thread: Address)
    {
        self.enter_waiters.push(thread);
    }

    /// Append a thread waiting to be notified.
    pub fn add_notify_waiter(&mut self, thread: Address)
    {
        self.notify_waiters.push(thread);
    }

    /// Raw ids of threads waiting to enter, in insertion order.
    pub fn enter_waiter_ids(&self) -> &[Address]
    {
        &self.enter_waiters
    }

    /// Raw ids of threads waiting to be notified, in insertion order.
    pub fn notify_waiter_ids(&self) -> &[Address]
    {
        &self.notify_waiters
    }

    /// Threads waiting to enter, resolved now.
    ///
    /// Ids that name no thread are yielded as corrupt data.
    pub fn enter_waiters<'a>(
        &'a self,
        runtime: &'a JavaRuntime,
    ) -> impl Iterator<Item = Result<&'a JavaThread, CorruptData>> + 'a
    {
        resolve_waiters(&self.enter_waiters, runtime)
    }

    /// Threads waiting to be notified, resolved now.
    ///
    /// Ids that name no thread are yielded as corrupt data.
    pub fn notify_waiters<'a>(
        &'a self,
        runtime: &'a JavaRuntime,
    ) -> impl Iterator<Item = Result<&'a JavaThread, CorruptData>> + 'a
    {
        resolve_waiters(&self.notify_waiters, runtime)
    }
}

fn resolve_waiters<'a>(
    waiters: &'a [Address],
    runtime: &'a JavaRuntime,
) -> impl Iterator<Item = Result<&'a JavaThread, CorruptData>> + 'a
{
    waiters.iter().map(move |&id| {
        runtime
            .find_thread(id.value())
            .ok_or_else(|| CorruptData::at("waiting thread not found", id))
    })
}

//! Tests for monitor naming, owner resolution and waiters

use jcdump_core::model::{JavaMonitor, JavaObject, JavaRuntime, FLAT_LOCK_OWNER_LIMIT};
use jcdump_core::types::Address;

fn runtime() -> JavaRuntime
{
    JavaRuntime::with_default_space("r1").unwrap()
}

#[test]
fn test_flat_lock_owner_resolves_through_inflated_monitor()
{
    let mut runtime = runtime();
    runtime.add_thread(Address::new(0x900)).unwrap().set_name("holder");

    let flat = runtime.add_monitor(Address::new(0x500)).unwrap();
    flat.set_owner(Address::new(0x50));
    flat.set_object(JavaObject::new(Address::new(0x600)));

    let inflated = runtime.add_monitor(Address::new(0x600)).unwrap();
    inflated.set_owner(Address::new(0x900));

    let monitor = runtime.find_monitor(Address::new(0x500)).unwrap();
    let owner = monitor.owner(&runtime).unwrap().unwrap();
    assert_eq!(owner.address(), Address::new(0x900));
    assert_eq!(owner.name(), "holder");
}

#[test]
fn test_no_owner_means_unowned()
{
    let mut runtime = runtime();
    runtime.add_monitor(Address::new(0x500)).unwrap();
    let monitor = runtime.find_monitor(Address::new(0x500)).unwrap();
    assert!(monitor.owner(&runtime).unwrap().is_none());
}

#[test]
fn test_unknown_owner_is_corrupt_with_pointer()
{
    let mut runtime = runtime();
    runtime.add_monitor(Address::new(0x500)).unwrap().set_owner(Address::new(0x12_3456));

    let monitor = runtime.find_monitor(Address::new(0x500)).unwrap();
    let err = monitor.owner(&runtime).unwrap_err();
    assert!(err.is_corrupt());
    assert!(err.to_string().contains("0x123456"));
}

#[test]
fn test_corrupt_flat_lock_falls_back_to_direct_lookup()
{
    let mut runtime = runtime();
    // A thread whose address happens to be the small owner value.
    runtime.add_thread(Address::new(0x50)).unwrap().set_name("direct");

    let flat = runtime.add_monitor(Address::new(0x500)).unwrap();
    flat.set_owner(Address::new(0x50));
    flat.set_object(JavaObject::new(Address::new(0x600)));
    runtime.add_monitor(Address::new(0x600)).unwrap().set_owner(Address::new(0xdead_0000));

    let monitor = runtime.find_monitor(Address::new(0x500)).unwrap();
    assert_eq!(monitor.owner(&runtime).unwrap().unwrap().name(), "direct");
}

#[test]
fn test_flat_lock_without_object_is_looked_up_directly()
{
    let mut runtime = runtime();
    runtime.add_monitor(Address::new(0x500)).unwrap().set_owner(Address::new(0x50));
    let monitor = runtime.find_monitor(Address::new(0x500)).unwrap();
    assert!(monitor.owner(&runtime).unwrap_err().is_corrupt());
    assert!(0x50 < FLAT_LOCK_OWNER_LIMIT);
}

#[test]
fn test_self_referencing_flat_lock_terminates()
{
    let mut runtime = runtime();
    let monitor = runtime.add_monitor(Address::new(0x600)).unwrap();
    monitor.set_owner(Address::new(0x10));
    monitor.set_object(JavaObject::new(Address::new(0x600)));

    let monitor = runtime.find_monitor(Address::new(0x600)).unwrap();
    assert!(monitor.owner(&runtime).unwrap_err().is_corrupt());
}

#[test]
fn test_default_names()
{
    let mut monitor = JavaMonitor::new(Address::new(0x500));
    assert_eq!(monitor.name(), "(un-named monitor @0x500)");
    assert_eq!(monitor.name(), monitor.name());

    monitor.set_object(JavaObject::new(Address::new(0x600)));
    assert_eq!(monitor.name(), "(un-named monitor for object @0x600)");

    monitor.set_name("Thread public flags mutex");
    assert_eq!(monitor.name(), "Thread public flags mutex");
}

#[test]
fn test_waiters_resolve_at_read_time()
{
    let mut runtime = runtime();
    let monitor = runtime.add_monitor(Address::new(0x500)).unwrap();
    monitor.add_enter_waiter(Address::new(0xa00));
    monitor.add_notify_waiter(Address::new(0xb00));

    // Threads registered after the monitor still resolve.
    runtime.add_thread(Address::new(0xa00)).unwrap();

    let monitor = runtime.find_monitor(Address::new(0x500)).unwrap();
    let enter: Vec<_> = monitor.enter_waiters(&runtime).collect();
    assert_eq!(enter.len(), 1);
    assert_eq!(enter[0].as_ref().unwrap().address(), Address::new(0xa00));

    let notify: Vec<_> = monitor.notify_waiters(&runtime).collect();
    let corrupt = notify[0].as_ref().unwrap_err();
    assert_eq!(corrupt.address(), Some(Address::new(0xb00)));
    assert_eq!(monitor.notify_waiter_ids(), &[Address::new(0xb00)]);
}

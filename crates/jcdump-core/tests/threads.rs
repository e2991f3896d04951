//! Tests for threads, thread state and native thread fallback

use jcdump_core::model::{ImageThread, JavaMethod, JavaObject, JavaRuntime, JavaThread, Location, ThreadState};
use jcdump_core::types::Address;

#[test]
fn test_find_thread_falls_back_to_native_id()
{
    let mut runtime = JavaRuntime::with_default_space("r1").unwrap();
    let mut native = ImageThread::new(Address::new(0x7000));
    native.set_system_thread_id(0x100);
    runtime.add_thread(Address::new(0x200)).unwrap().set_image_thread(native);

    let thread = runtime.find_thread(0x100).unwrap();
    assert_eq!(thread.address(), Address::new(0x200));

    // The internal id of the native thread is the second fallback.
    assert_eq!(runtime.find_thread(0x7000).unwrap().address(), Address::new(0x200));
    assert!(runtime.find_thread(0x300).is_none());
}

#[test]
fn test_exact_match_wins_over_fallback()
{
    let mut runtime = JavaRuntime::with_default_space("r1").unwrap();
    runtime.add_thread(Address::new(0x100)).unwrap().set_name("exact");
    let mut native = ImageThread::new(Address::new(0x7000));
    native.set_system_thread_id(0x100);
    let other = runtime.add_thread(Address::new(0x200)).unwrap();
    other.set_name("native");
    other.set_image_thread(native);

    assert_eq!(runtime.find_thread(0x100).unwrap().name(), "exact");
}

#[test]
fn test_unknown_state_code_leaves_state_unavailable()
{
    let mut thread = JavaThread::new(Address::new(0x100));
    assert!(!thread.set_state_code("Q"));

    let err = thread.state().unwrap_err();
    assert!(err.is_unavailable());
    assert!(!err.is_corrupt());
}

#[test]
fn test_state_codes()
{
    let cases = [
        ("R", ThreadState::ALIVE | ThreadState::RUNNABLE),
        ("CW", ThreadState::ALIVE | ThreadState::WAITING | ThreadState::IN_OBJECT_WAIT),
        ("P", ThreadState::ALIVE | ThreadState::WAITING | ThreadState::PARKED),
        ("B", ThreadState::ALIVE | ThreadState::WAITING | ThreadState::BLOCKED_ON_MONITOR_ENTER),
        ("MW", ThreadState::ALIVE | ThreadState::WAITING | ThreadState::BLOCKED_ON_MONITOR_ENTER),
    ];
    for (code, expected) in cases {
        let mut thread = JavaThread::new(Address::new(0x100));
        assert!(thread.set_state_code(code), "code {code}");
        assert_eq!(thread.state().unwrap(), expected, "code {code}");
    }
}

#[test]
fn test_default_name_and_unset_fields()
{
    let thread = JavaThread::new(Address::new(0x1d2_0500));
    assert_eq!(thread.name(), "vmthread @0x1d20500");
    assert!(thread.priority().unwrap_err().is_unavailable());
    assert!(thread.jni_env().unwrap_err().is_unavailable());
    assert!(thread.object().unwrap_err().is_unavailable());
    assert!(thread.blocking_object().unwrap_err().is_unavailable());
    assert!(thread.image_thread().unwrap_err().is_unavailable());
}

#[test]
fn test_priority_zero_is_a_value()
{
    let mut thread = JavaThread::new(Address::new(0x100));
    thread.set_priority(0);
    assert_eq!(thread.priority().unwrap(), 0);
}

#[test]
fn test_frames_keep_insertion_order()
{
    let mut thread = JavaThread::new(Address::new(0x100));
    thread.set_blocking_object(JavaObject::with_class(Address::new(0x40), "java/lang/Object"));

    let mut top = Location::new(JavaMethod::new("wait", "java/lang/Object").unwrap());
    top.set_compilation("compiled");
    thread.add_frame(top);
    let frame = thread.add_frame(Location::new(JavaMethod::new("run", "a/Worker").unwrap()));
    frame.set_base_pointer(Address::new(0x7ff0));

    let frames = thread.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].location().method().name(), "wait");
    assert_eq!(frames[0].location().compilation_level().unwrap(), 1);
    assert_eq!(frames[1].thread(), Address::new(0x100));
    assert_eq!(frames[1].base_pointer().unwrap(), Address::new(0x7ff0));
    assert!(frames[0].base_pointer().unwrap_err().is_unavailable());
    assert_eq!(thread.blocking_object().unwrap().class_name().unwrap(), "java/lang/Object");
}

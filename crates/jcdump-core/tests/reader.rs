//! End-to-end tests for the javacore reader

use std::fs::File;
use std::io::{Cursor, Write};
use std::sync::Arc;

use jcdump_core::address_space::JavaCoreAddressSpace;
use jcdump_core::error::DumpError;
use jcdump_core::javacore::{JavaCoreReader, RUNTIME_ID};
use jcdump_core::model::{JavaRuntime, ThreadState};
use jcdump_core::sniff::ImageSourceManager;
use jcdump_core::types::Address;
use jcdump_core::JavaCoreImage;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const JAVACORE: &str = include_str!("fixtures/javacore.txt");

const MAIN: u64 = 0x1d2_0500;
const WORKER: u64 = 0x1d2_0a00;

fn read() -> JavaCoreImage
{
    JavaCoreReader::default().read_str("javacore.txt", JAVACORE).unwrap()
}

fn runtime(image: &JavaCoreImage) -> &JavaRuntime
{
    image.runtime(RUNTIME_ID).unwrap()
}

#[test]
fn test_image_metadata()
{
    let image = read();
    assert_eq!(image.source(), "javacore.txt");
    assert_eq!(image.runtimes().len(), 1);
    assert_eq!(image.creation_time(), Some(1_704_190_210_123));
}

#[test]
fn test_runtime_properties()
{
    let image = read();
    let runtime = runtime(&image);
    assert_eq!(runtime.version().unwrap(), "JRE 17.0.9 Linux amd64-64 (build 17.0.9+9)");
    assert_eq!(runtime.full_version().unwrap(), "Eclipse OpenJ9 VM openj9-0.41.0");
    assert!(runtime.is_jit_enabled().unwrap());
    assert!(runtime.jit_options().unwrap().contains("AOT enabled"));
    assert_eq!(runtime.start_time().unwrap(), 1_704_189_600_000);
    assert_eq!(runtime.start_time_nanos().unwrap(), 3_534_023_113_503);

    let options = runtime.init_args().unwrap().options();
    assert_eq!(options.len(), 3);
    assert_eq!(options[1].option(), "-Xmx1g");
    assert_eq!(options[2].option(), "-Dsun.java.launcher.pid=4242");
    assert_eq!(options[2].extra_info(), Some(Address::new(0x7f0a_2c00_0010)));
}

#[test]
fn test_threads_and_frames()
{
    let image = read();
    let runtime = runtime(&image);
    assert_eq!(runtime.threads().count(), 3);

    // The current thread is listed twice; its stack is not doubled.
    let main = runtime.find_thread(MAIN).unwrap();
    assert_eq!(main.name(), "main");
    assert_eq!(main.priority().unwrap(), 5);
    assert_eq!(main.state().unwrap(), ThreadState::ALIVE | ThreadState::RUNNABLE);
    assert_eq!(main.object().unwrap().address(), Address::new(0xfff3_a2b8));

    let frames: Vec<String> = main.frames().iter().map(|frame| frame.location().to_string()).collect();
    assert_eq!(
        frames,
        vec![
            "java.lang.Object.wait(data unavailable)",
            "com.example.App.work(App.java:42)",
            "com.example.App.main(App.java:10)",
        ]
    );
    assert_eq!(main.frames()[1].location().compilation_level().unwrap(), 1);
    assert_eq!(main.frames()[2].location().compilation_level().unwrap(), 0);

    let native = main.image_thread().unwrap();
    assert_eq!(native.internal_id(), Address::new(0x7f0a_2c00_a9e8));
    assert_eq!(native.system_thread_id(), Some(0x5e03));
    assert_eq!(native.properties().get("stack_end").map(String::as_str), Some("0x7f0a30d5f000"));

    let worker = runtime.find_thread(WORKER).unwrap();
    assert!(worker.state().unwrap().contains(ThreadState::BLOCKED_ON_MONITOR_ENTER));
    assert_eq!(worker.blocking_object().unwrap().address(), Address::new(0xe000_1234));
}

#[test]
fn test_unknown_state_and_zero_priority()
{
    let image = read();
    let odd = runtime(&image).find_thread(0x1d2_0c00).unwrap();
    assert!(odd.state().unwrap_err().is_unavailable());
    assert_eq!(odd.priority().unwrap(), 0);
    assert!(odd.image_thread().unwrap_err().is_unavailable());
    assert!(odd.object().unwrap_err().is_unavailable());
}

#[test]
fn test_native_thread_id_resolves_to_java_thread()
{
    let image = read();
    let runtime = runtime(&image);
    assert_eq!(runtime.find_thread(0x5e03).unwrap().name(), "main");
    assert_eq!(runtime.find_thread(0x5e10).unwrap().name(), "worker-1");
    assert!(runtime.find_thread(0x5e20).is_none());
}

#[test]
fn test_compiled_methods_are_deduplicated()
{
    let image = read();
    let methods: Vec<String> = runtime(&image)
        .compiled_methods()
        .iter()
        .map(|method| format!("{}.{}", method.class_name(), method.name()))
        .collect();
    assert_eq!(methods, vec!["com/example/App.work"]);
}

#[test]
fn test_monitors()
{
    let image = read();
    let runtime = runtime(&image);
    assert_eq!(runtime.monitors().count(), 3);

    let inflated = runtime.find_monitor(Address::new(0x7f0a_2c0a_1c38)).unwrap();
    assert_eq!(inflated.name(), "(un-named monitor for object @0xe0001234)");
    assert_eq!(inflated.owner(runtime).unwrap().unwrap().name(), "main");
    let enter: Vec<_> = inflated.enter_waiters(runtime).collect();
    assert_eq!(enter[0].as_ref().unwrap().name(), "worker-1");
    let notify: Vec<_> = inflated.notify_waiters(runtime).collect();
    assert_eq!(notify[0].as_ref().unwrap_err().address(), Some(Address::new(0x1d2_ff00)));

    let flags = runtime.find_monitor(Address::new(0x7f0a_2c00_a2d8)).unwrap();
    assert_eq!(flags.name(), "Thread public flags mutex");
    assert!(flags.owner(runtime).unwrap().is_none());

    // Owned through a native thread id that maps to a Java thread.
    let sampler = runtime.find_monitor(Address::new(0x7f0a_2c00_b000)).unwrap();
    assert_eq!(sampler.owner(runtime).unwrap().unwrap().name(), "main");
}

#[test]
fn test_classes_and_loaders()
{
    let image = read();
    let runtime = runtime(&image);
    assert_eq!(runtime.class_loaders().count(), 2);
    assert_eq!(runtime.classes().count(), 3);

    let string = image.find_class_by_address(Address::new(0x1e0_a800)).unwrap();
    assert_eq!(string.name(), "java/lang/String");
    assert_eq!(string.class_loader(runtime).unwrap().name().unwrap(), "*System*");

    let app = image.find_class("com/example/App").unwrap();
    let loader = app.class_loader(runtime).unwrap();
    assert_eq!(loader.address(), Address::new(0xe005_0000));
    assert_eq!(
        loader.object().unwrap().class_name().unwrap(),
        "jdk/internal/loader/ClassLoaders$AppClassLoader"
    );
    let names: Vec<&str> = loader.class_names().collect();
    assert_eq!(names, vec!["com/example/App"]);
}

#[test]
fn test_heaps()
{
    let image = read();
    let heaps = runtime(&image).heaps();
    assert_eq!(heaps.len(), 1);
    assert_eq!(heaps[0].name(), "Generational");
    assert_eq!(heaps[0].sections().len(), 2);
    assert_eq!(heaps[0].sections()[1].name(), "Generational/Nursery Region");
    assert_eq!(heaps[0].total_size(), 0x70_0000);
    assert_eq!(heaps[0].objects().count(), 0);
}

#[test]
fn test_memory_tree_round_trips_the_chart()
{
    let image = read();
    let categories = runtime(&image).memory_categories();
    assert_eq!(categories.len(), 1);

    let jre = &categories[0];
    assert_eq!(jre.shallow_bytes(), 1_000);
    assert_eq!(jre.children()[0].shallow_bytes(), 500);
    assert_eq!(jre.children()[0].children()[0].shallow_bytes(), 1_500);

    let expected: String = JAVACORE
        .lines()
        .filter(|line| line.starts_with(['1', '2', '3']) && line.get(1..8) == Some("MEMUSER"))
        .map(|line| format!("{}\n", line[8..].trim()))
        .collect();
    assert_eq!(jre.render_tree(), expected);
}

#[test]
fn test_summary()
{
    let image = read();
    let summary = &image.summary()[0];
    assert_eq!(summary.id, RUNTIME_ID);
    assert_eq!(summary.threads, 3);
    assert_eq!(summary.monitors, 3);
    assert_eq!(summary.classes, 3);
    assert_eq!(summary.compiled_methods, 1);
    assert_eq!(summary.native_bytes, 3_000);
    assert_eq!(summary.blocked.len(), 1);
    assert_eq!(summary.blocked[0].thread, "worker-1");
    assert_eq!(summary.blocked[0].owner.as_deref(), Some("main"));
}

#[test]
fn test_max_frames()
{
    let image = JavaCoreReader::default()
        .with_max_frames(Some(1))
        .read_str("javacore.txt", JAVACORE)
        .unwrap();
    let runtime = runtime(&image);
    assert_eq!(runtime.find_thread(MAIN).unwrap().frames().len(), 1);
    // Compiled methods are still collected from frames past the limit.
    assert_eq!(runtime.compiled_methods().len(), 1);
}

#[test]
fn test_narrow_pointers_drop_wide_entities()
{
    let reader = JavaCoreReader::new(Arc::new(JavaCoreAddressSpace::new(32)));
    let image = reader.read_str("javacore.txt", JAVACORE).unwrap();
    let runtime = runtime(&image);

    // Threads live below 4 GiB; the 64-bit monitor and loader pointers do not.
    assert_eq!(runtime.threads().count(), 3);
    assert_eq!(runtime.monitors().count(), 0);
    assert!(runtime.find_class_loader(Address::new(0x7f0a_2c0a_9f28)).is_none());
}

#[test]
fn test_truncated_javacore_is_partial()
{
    let cut = JAVACORE.find("0SECTION       THREADS").unwrap();
    let image = JavaCoreReader::default().read_str("cut.txt", &JAVACORE[..cut]).unwrap();
    let runtime = runtime(&image);
    assert_eq!(runtime.threads().count(), 0);
    assert_eq!(runtime.monitors().count(), 3);

    let inflated = runtime.find_monitor(Address::new(0x7f0a_2c0a_1c38)).unwrap();
    assert!(inflated.owner(runtime).unwrap_err().is_corrupt());
}

#[test]
fn test_oversized_millis_skip_the_date_lines()
{
    let damaged = JAVACORE
        .replace("10:10:10:123", "10:10:10:9223372036854775000")
        .replace("10:00:00:000", "10:00:00:9223372036854775000");
    let image = JavaCoreReader::default().read_str("damaged.txt", &damaged).unwrap();
    assert_eq!(image.creation_time(), None);

    let runtime = runtime(&image);
    assert!(runtime.start_time().unwrap_err().is_unavailable());
    assert_eq!(runtime.version().unwrap(), "JRE 17.0.9 Linux amd64-64 (build 17.0.9+9)");
    assert_eq!(runtime.threads().count(), 3);
}

#[test]
fn test_rejects_other_formats()
{
    let err = JavaCoreReader::default().read_str("notes.txt", "hello").unwrap_err();
    assert!(matches!(err, DumpError::UnsupportedFormat(_)));
}

#[test]
fn test_read_from_stream()
{
    let image = JavaCoreReader::default()
        .read("stream", Cursor::new(JAVACORE.as_bytes()))
        .unwrap();
    assert_eq!(image.source(), "stream");
    assert_eq!(runtime(&image).threads().count(), 3);
}

#[test]
fn test_read_archived_source()
{
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("support.zip");
    let mut zip = ZipWriter::new(File::create(&archive).unwrap());
    zip.start_file("javacore.20240102.101010.4242.0002.txt", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(JAVACORE.as_bytes()).unwrap();
    zip.finish().unwrap();

    let manager = ImageSourceManager::new();
    let sources = manager.list_sources(&archive).unwrap();
    let image = JavaCoreReader::default().read_source(&manager, &sources[0]).unwrap();
    assert_eq!(image.source(), "javacore.20240102.101010.4242.0002.txt");
    assert_eq!(runtime(&image).classes().count(), 3);
}

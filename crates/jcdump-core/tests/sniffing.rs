//! Tests for image classification and source discovery

use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::Path;

use jcdump_core::error::DumpError;
use jcdump_core::sniff::{classify, classify_bytes, ImageKind, ImageSourceManager};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const JAVACORE: &str = "0SECTION       TITLE subcomponent dump routine\nNULL           ===============\n";

fn phd_bytes() -> Vec<u8>
{
    let mut bytes = vec![0x00, 0x12];
    bytes.extend_from_slice(b"portable heap dump");
    bytes.extend_from_slice(&[0, 0, 0, 6]);
    bytes
}

fn write_zip(path: &Path, members: &[(&str, &[u8])])
{
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, bytes) in members {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn test_classify_magic_numbers()
{
    assert_eq!(classify_bytes(b"\x7fELF\x02\x01\x01"), ImageKind::Core);
    assert_eq!(classify_bytes(b"MDMP\x93\xa7"), ImageKind::Core);
    assert_eq!(classify_bytes(&[0xcf, 0xfa, 0xed, 0xfe, 0x07]), ImageKind::Core);
    assert_eq!(classify_bytes(&phd_bytes()), ImageKind::Phd);
    assert_eq!(classify_bytes(JAVACORE.as_bytes()), ImageKind::JavaCore);
    assert_eq!(classify_bytes(b"<?xml version=\"1.0\"?><j9ddr/>"), ImageKind::Meta);
    assert_eq!(classify_bytes(b""), ImageKind::Unknown);
    assert_eq!(classify_bytes(b"hello world"), ImageKind::Unknown);
}

#[test]
fn test_javacore_needs_title_section()
{
    assert_eq!(classify_bytes(b"0SECTION       GPINFO subcomponent\n"), ImageKind::Unknown);
}

#[test]
fn test_classify_reads_from_stream()
{
    let mut cursor = Cursor::new(JAVACORE.as_bytes().to_vec());
    assert_eq!(classify(&mut cursor).unwrap(), ImageKind::JavaCore);
}

#[test]
fn test_plain_file_is_one_source()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "plain text").unwrap();

    let sources = ImageSourceManager::new().list_sources(&path).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].kind(), ImageKind::Unknown);
    assert!(!sources[0].is_archived());
}

#[test]
fn test_directory_lists_recognised_files_in_order()
{
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b-javacore.txt"), JAVACORE).unwrap();
    fs::write(dir.path().join("a-heap.phd"), phd_bytes()).unwrap();
    fs::write(dir.path().join("readme.md"), "# nothing").unwrap();

    let sources = ImageSourceManager::new().list_sources(dir.path()).unwrap();
    let names: Vec<String> = sources.iter().map(|source| source.name()).collect();
    assert_eq!(names, vec!["a-heap.phd", "b-javacore.txt"]);
    assert_eq!(sources[0].kind(), ImageKind::Phd);
    assert_eq!(sources[1].kind(), ImageKind::JavaCore);
}

#[test]
fn test_heap_dump_finds_sibling_javacore()
{
    let dir = tempfile::tempdir().unwrap();
    let phd = dir.path().join("heapdump.20240102.101010.4242.0009.phd");
    fs::write(&phd, phd_bytes()).unwrap();
    // seq - 1 exists but seq + 2 is probed first
    fs::write(dir.path().join("javacore.20240102.101010.4242.0008.txt"), JAVACORE).unwrap();
    fs::write(dir.path().join("javacore.20240102.101010.4242.0011.txt"), JAVACORE).unwrap();

    let sources = ImageSourceManager::new().list_sources(&phd).unwrap();
    let meta = sources[0].metadata().unwrap();
    assert_eq!(meta.name(), "javacore.20240102.101010.4242.0011.txt");
    assert_eq!(meta.kind(), ImageKind::JavaCore);
}

#[test]
fn test_core_file_finds_ddr_metadata()
{
    let dir = tempfile::tempdir().unwrap();
    let core = dir.path().join("core.20240102.101010.4242.0001.dmp");
    fs::write(&core, b"\x7fELF\x02\x01\x01\x00").unwrap();
    fs::write(dir.path().join("core.20240102.101010.4242.0001.dmp.xml"), "<?xml version=\"1.0\"?>").unwrap();

    let sources = ImageSourceManager::new().list_sources(&core).unwrap();
    assert_eq!(sources[0].kind(), ImageKind::Core);
    assert_eq!(sources[0].metadata().unwrap().kind(), ImageKind::Meta);
}

#[test]
fn test_zip_members_are_sources()
{
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("dumps.zip");
    let phd = phd_bytes();
    write_zip(
        &archive,
        &[
            ("dumps/javacore.txt", JAVACORE.as_bytes()),
            ("dumps/heapdump.phd", phd.as_slice()),
            ("dumps/README", b"not a dump".as_slice()),
        ],
    );

    let manager = ImageSourceManager::new();
    let sources = manager.list_sources(&archive).unwrap();
    assert_eq!(sources.len(), 2);
    assert!(sources.iter().all(|source| source.is_archived() && source.path() == archive));
    assert_eq!(sources[0].entry(), Some("dumps/javacore.txt"));

    let mut text = String::new();
    manager.open(&sources[0]).unwrap().read_to_string(&mut text).unwrap();
    assert_eq!(text, JAVACORE);
    assert_eq!(manager.read_to_string(&sources[0]).unwrap(), JAVACORE);
}

#[test]
fn test_zip_without_dumps_is_unsupported()
{
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("empty.zip");
    write_zip(&archive, &[("notes.txt", b"hello".as_slice())]);

    let err = ImageSourceManager::new().list_sources(&archive).unwrap_err();
    assert!(matches!(err, DumpError::UnsupportedFormat(_)));
}

#[test]
fn test_missing_path_is_io_error()
{
    let err = ImageSourceManager::new()
        .list_sources(Path::new("/no/such/javacore.txt"))
        .unwrap_err();
    assert!(matches!(err, DumpError::Io(_)));
}

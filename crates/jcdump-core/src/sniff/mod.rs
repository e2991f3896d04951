//! # Image Sniffing
//!
//! Works out what kind of diagnostic file a byte stream holds by looking at
//! its first few kilobytes.
//!
//! ## Example
//!
//! ```rust
//! use jcdump_core::sniff::{classify, ImageKind};
//!
//! let text = b"0SECTION       TITLE subcomponent dump routine\n";
//! assert_eq!(classify(&mut &text[..]).unwrap(), ImageKind::JavaCore);
//! assert_eq!(classify(&mut &b"\x7fELF\x02\x01"[..]).unwrap(), ImageKind::Core);
//! ```

mod manager;

use std::fmt;
use std::io::Read;

pub use manager::{ImageSource, ImageSourceManager};

use crate::error::DumpResult;

/// Number of leading bytes inspected by [`classify`].
pub const SNIFF_LEN: usize = 4096;

const PHD_MAGIC: &[u8] = b"portable heap dump";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// What an image source contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind
{
    /// A native process dump (ELF, minidump, Mach-O, AIX or z/OS).
    Core,
    /// A textual javacore.
    JavaCore,
    /// A portable heap dump.
    Phd,
    /// XML metadata describing another image.
    Meta,
    Unknown,
}

impl fmt::Display for ImageKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            Self::Core => "core",
            Self::JavaCore => "javacore",
            Self::Phd => "phd",
            Self::Meta => "meta",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Classify the stream by sniffing at most [`SNIFF_LEN`] bytes from it.
///
/// ## Errors
///
/// Returns an I/O error if reading fails. An empty or unrecognised stream is
/// not an error; it is [`ImageKind::Unknown`].
pub fn classify<R: Read + ?Sized>(reader: &mut R) -> DumpResult<ImageKind>
{
    let head = read_head(reader)?;
    Ok(classify_bytes(&head))
}

/// Classify an in-memory prefix of a file.
pub fn classify_bytes(head: &[u8]) -> ImageKind
{
    if is_core(head) {
        ImageKind::Core
    } else if is_phd(head) {
        ImageKind::Phd
    } else if is_javacore(head) {
        ImageKind::JavaCore
    } else if is_meta(head) {
        ImageKind::Meta
    } else {
        ImageKind::Unknown
    }
}

/// Whether `head` starts a zip archive.
pub fn is_zip(head: &[u8]) -> bool
{
    head.starts_with(ZIP_MAGIC)
}

pub(crate) fn read_head<R: Read + ?Sized>(reader: &mut R) -> DumpResult<Vec<u8>>
{
    let mut head = Vec::with_capacity(SNIFF_LEN);
    reader.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(head)
}

fn is_core(head: &[u8]) -> bool
{
    const MACHO: [[u8; 4]; 4] = [
        [0xfe, 0xed, 0xfa, 0xce],
        [0xce, 0xfa, 0xed, 0xfe],
        [0xfe, 0xed, 0xfa, 0xcf],
        [0xcf, 0xfa, 0xed, 0xfe],
    ];
    head.starts_with(b"\x7fELF")
        || head.starts_with(b"MDMP")
        || MACHO.iter().any(|magic| head.starts_with(magic))
        || is_aix_core(head)
        || is_zos_dump(head)
}

// AIX full core files carry the fdsinfo magic at offset 0x18.
fn is_aix_core(head: &[u8]) -> bool
{
    const AIX_CORE_MAGIC: [u8; 4] = [0x00, 0x00, 0xfe, 0xeb];
    head.get(0x18..0x1c).is_some_and(|magic| magic == AIX_CORE_MAGIC)
}

// z/OS SVC dumps start with the EBCDIC record header "DR1" / "DR2".
fn is_zos_dump(head: &[u8]) -> bool
{
    const DR1: [u8; 3] = [0xc4, 0xd9, 0xf1];
    const DR2: [u8; 3] = [0xc4, 0xd9, 0xf2];
    head.starts_with(&DR1) || head.starts_with(&DR2)
}

fn is_phd(head: &[u8]) -> bool
{
    let Some(len) = head.get(..2).map(|len| usize::from(u16::from_be_bytes([len[0], len[1]]))) else {
        return false;
    };
    len == PHD_MAGIC.len() && head.get(2..2 + len) == Some(PHD_MAGIC)
}

fn is_javacore(head: &[u8]) -> bool
{
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}');
    (text.starts_with("0SECTION") || text.starts_with("NULL")) && text.contains("TITLE")
}

fn is_meta(head: &[u8]) -> bool
{
    let text = String::from_utf8_lossy(head);
    text.trim_start_matches('\u{feff}').trim_start().starts_with("<?xml")
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn phd_header() -> Vec<u8>
    {
        let mut bytes = u16::try_from(PHD_MAGIC.len()).unwrap().to_be_bytes().to_vec();
        bytes.extend_from_slice(PHD_MAGIC);
        bytes.extend_from_slice(&[0, 0, 0, 6]);
        bytes
    }

    #[test]
    fn test_core_magics()
    {
        assert_eq!(classify_bytes(b"\x7fELF\x02\x01\x01"), ImageKind::Core);
        assert_eq!(classify_bytes(b"MDMP\x93\xa7"), ImageKind::Core);
        assert_eq!(classify_bytes(&[0xcf, 0xfa, 0xed, 0xfe, 7, 0, 0, 1]), ImageKind::Core);
        assert_eq!(classify_bytes(&[0xc4, 0xd9, 0xf1, 0x40]), ImageKind::Core);
    }

    #[test]
    fn test_phd()
    {
        assert_eq!(classify_bytes(&phd_header()), ImageKind::Phd);
        let mut wrong_len = phd_header();
        wrong_len[1] = 3;
        assert_eq!(classify_bytes(&wrong_len), ImageKind::Unknown);
    }

    #[test]
    fn test_javacore_needs_title()
    {
        let good = b"NULL           ---\n0SECTION       TITLE subcomponent dump routine\n";
        assert_eq!(classify_bytes(good), ImageKind::JavaCore);
        assert_eq!(classify_bytes(b"0SECTION       GPINFO\n"), ImageKind::Unknown);
    }

    #[test]
    fn test_meta_and_unknown()
    {
        assert_eq!(classify_bytes(b"<?xml version=\"1.0\"?><j9ddr/>"), ImageKind::Meta);
        assert_eq!(classify_bytes(b""), ImageKind::Unknown);
        assert_eq!(classify_bytes(b"hello world"), ImageKind::Unknown);
    }

    #[test]
    fn test_only_head_is_read()
    {
        let mut body = b"0SECTION       ".to_vec();
        body.resize(SNIFF_LEN, b' ');
        body.extend_from_slice(b"TITLE");
        assert_eq!(classify(&mut body.as_slice()).unwrap(), ImageKind::Unknown);
    }
}

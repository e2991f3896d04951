//! Finding image sources on disk and inside zip archives.

use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use zip::ZipArchive;

use super::{classify_bytes, is_zip, read_head, ImageKind};
use crate::error::{DumpError, DumpResult};

/// A classified file, or a classified member of a zip archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource
{
    path: PathBuf,
    entry: Option<String>,
    kind: ImageKind,
    metadata: Option<Box<ImageSource>>,
}

impl ImageSource
{
    /// A plain file.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>, kind: ImageKind) -> Self
    {
        Self {
            path: path.into(),
            entry: None,
            kind,
            metadata: None,
        }
    }

    /// A member of the zip archive at `archive`.
    #[must_use]
    pub fn archive_entry(archive: impl Into<PathBuf>, entry: impl Into<String>, kind: ImageKind) -> Self
    {
        Self {
            path: archive.into(),
            entry: Some(entry.into()),
            kind,
            metadata: None,
        }
    }

    /// Display name: the member name for archive entries, the file name
    /// otherwise.
    pub fn name(&self) -> String
    {
        match &self.entry {
            Some(entry) => entry.clone(),
            None => self
                .path
                .file_name()
                .map_or_else(|| self.path.display().to_string(), |name| name.to_string_lossy().into_owned()),
        }
    }

    /// The file on disk. For archive entries this is the archive.
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Member name inside the archive, if this source came from one.
    pub fn entry(&self) -> Option<&str>
    {
        self.entry.as_deref()
    }

    /// Whether the source is a member of a zip archive.
    pub fn is_archived(&self) -> bool
    {
        self.entry.is_some()
    }

    /// What the source was classified as.
    pub fn kind(&self) -> ImageKind
    {
        self.kind
    }

    /// Associated metadata found next to this source, such as the javacore
    /// written alongside a heap dump.
    pub fn metadata(&self) -> Option<&ImageSource>
    {
        self.metadata.as_deref()
    }

    /// Attach the metadata source found next to this one.
    pub fn set_metadata(&mut self, metadata: ImageSource)
    {
        self.metadata = Some(Box::new(metadata));
    }
}

/// Lists and opens image sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSourceManager;

impl ImageSourceManager
{
    #[must_use]
    pub fn new() -> Self
    {
        Self
    }

    /// Classify a single file on disk.
    ///
    /// ## Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn classify_path(&self, path: &Path) -> DumpResult<ImageKind>
    {
        let mut file = File::open(path)?;
        super::classify(&mut file)
    }

    /// Enumerate the image sources at `path`.
    ///
    /// - a zip archive yields one source per recognised member
    /// - a directory yields one source per recognised file (not recursive)
    /// - any other file yields exactly one source, possibly of kind
    ///   [`ImageKind::Unknown`]
    ///
    /// Heap dumps and core files on disk get their sibling metadata attached
    /// when a matching file exists.
    ///
    /// ## Errors
    ///
    /// Returns an I/O or archive error if `path` cannot be read.
    pub fn list_sources(&self, path: &Path) -> DumpResult<Vec<ImageSource>>
    {
        if path.is_dir() {
            return self.list_directory(path);
        }

        let head = read_head(&mut File::open(path)?)?;
        if is_zip(&head) {
            return list_archive(path);
        }

        let mut source = ImageSource::file(path, classify_bytes(&head));
        self.attach_sibling(&mut source);
        Ok(vec![source])
    }

    fn list_directory(&self, dir: &Path) -> DumpResult<Vec<ImageSource>>
    {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut sources = Vec::new();
        for path in paths {
            let kind = match self.classify_path(&path) {
                Ok(kind) => kind,
                Err(err) => {
                    debug!("skipping {}: {err}", path.display());
                    continue;
                }
            };
            if kind == ImageKind::Unknown {
                trace!("skipping unrecognised file {}", path.display());
                continue;
            }
            let mut source = ImageSource::file(path, kind);
            self.attach_sibling(&mut source);
            sources.push(source);
        }
        Ok(sources)
    }

    fn attach_sibling(&self, source: &mut ImageSource)
    {
        if source.is_archived() {
            return;
        }
        let Some(dir) = source.path().parent() else {
            return;
        };
        let name = source.name();
        let candidates = match source.kind() {
            ImageKind::Phd => javacore_candidates(&name),
            ImageKind::Core => core_metadata_candidates(&name),
            _ => Vec::new(),
        };
        for candidate in candidates {
            let path = dir.join(&candidate);
            if !path.is_file() {
                continue;
            }
            let kind = self.classify_path(&path).unwrap_or(ImageKind::Unknown);
            debug!("associating {} with {}", candidate, name);
            source.set_metadata(ImageSource::file(path, kind));
            return;
        }
    }

    /// Open the source for reading.
    ///
    /// Archive members are decompressed into memory.
    ///
    /// ## Errors
    ///
    /// Returns an I/O or archive error if the source cannot be opened.
    pub fn open(&self, source: &ImageSource) -> DumpResult<Box<dyn Read>>
    {
        let file = File::open(source.path())?;
        let Some(entry) = source.entry() else {
            return Ok(Box::new(BufReader::new(file)));
        };
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        let mut member = archive.by_name(entry)?;
        let mut bytes = Vec::new();
        member.read_to_end(&mut bytes)?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    /// Read the whole source as text, replacing invalid UTF-8.
    ///
    /// ## Errors
    ///
    /// Returns an I/O or archive error if the source cannot be read.
    pub fn read_to_string(&self, source: &ImageSource) -> DumpResult<String>
    {
        let mut bytes = Vec::new();
        self.open(source)?.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn list_archive(path: &Path) -> DumpResult<Vec<ImageSource>>
{
    let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
    let mut sources = Vec::new();
    for index in 0..archive.len() {
        let mut member = archive.by_index(index)?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        let head = read_head(&mut member)?;
        let kind = classify_bytes(&head);
        if kind == ImageKind::Unknown {
            trace!("skipping unrecognised archive member {name}");
            continue;
        }
        sources.push(ImageSource::archive_entry(path, name, kind));
    }
    if sources.is_empty() {
        return Err(DumpError::UnsupportedFormat(format!(
            "{} contains no recognised image sources",
            path.display()
        )));
    }
    Ok(sources)
}

/// Javacore names to try for `heapdump.<date>.<time>.<pid>.<seq>.phd`.
///
/// A javacore written by the same dump event carries a later sequence number
/// than the heap dump, so the next three are tried before the previous one.
pub fn javacore_candidates(phd_name: &str) -> Vec<String>
{
    let parts: Vec<&str> = phd_name.split('.').collect();
    let [prefix, date, time, pid, seq, ext] = parts.as_slice() else {
        return Vec::new();
    };
    if *prefix != "heapdump" || *ext != "phd" {
        return Vec::new();
    }
    let Ok(number) = seq.parse::<u64>() else {
        return Vec::new();
    };
    let width = seq.len();

    let mut numbers: Vec<u64> = (1..=3).filter_map(|step| number.checked_add(step)).collect();
    if let Some(previous) = number.checked_sub(1) {
        numbers.push(previous);
    }
    numbers
        .into_iter()
        .map(|n| format!("javacore.{date}.{time}.{pid}.{n:0width$}.txt"))
        .collect()
}

/// Metadata names to try for a `core.<…>.dmp` file.
pub fn core_metadata_candidates(core_name: &str) -> Vec<String>
{
    if core_name.starts_with("core.") && core_name.ends_with(".dmp") {
        vec![format!("{core_name}.xml")]
    } else {
        Vec::new()
    }
}

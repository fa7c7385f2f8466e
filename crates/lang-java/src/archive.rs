//! Classpath roots and reading entries out of them.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

/// Shape of one classpath root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Directory,
    Archive,
    Missing,
}

impl RootKind {
    pub fn of(path: &Path) -> Self {
        if path.is_dir() {
            RootKind::Directory
        } else if path.is_file() && is_archive(path) {
            RootKind::Archive
        } else {
            RootKind::Missing
        }
    }
}

/// `.jar` and `.zip` files are treated as archives
pub fn is_archive(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("jar") | Some("zip")
    )
}

/// Sources and javadoc jars never carry index fragments or classes
pub fn is_auxiliary_jar(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with("-sources.jar") || name.ends_with("-javadoc.jar")
}

pub fn open_archive(path: &Path) -> io::Result<ZipArchive<File>> {
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(io::Error::other)
}

/// Whether `archive` contains an entry named `entry`.
pub fn has_entry(archive: &mut ZipArchive<File>, entry: &str) -> io::Result<bool> {
    match archive.by_name(entry) {
        Ok(_) => Ok(true),
        Err(ZipError::FileNotFound) => Ok(false),
        Err(e) => Err(io::Error::other(e)),
    }
}

/// Read a whole entry; `Ok(None)` when the archive lacks it.
pub fn read_entry(archive: &mut ZipArchive<File>, entry: &str) -> io::Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(io::Error::other(e)),
    };

    let mut bytes = Vec::with_capacity(capacity_hint(file.size()));
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// Largest buffer reserved up front from a size an archive header declares.
const MAX_PREALLOC: usize = 1 << 20;

fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared).map_or(MAX_PREALLOC, |size| size.min(MAX_PREALLOC))
}

/// Read `relative` below a directory root; `Ok(None)` when absent.
pub fn read_from_dir(root: &Path, relative: &str) -> io::Result<Option<Vec<u8>>> {
    let path: PathBuf = root.join(relative);
    match std::fs::read(&path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

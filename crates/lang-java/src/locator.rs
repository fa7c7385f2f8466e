//! Locating index fragments on a Java classpath.
//!
//! Every classpath root (an output directory or a jar) may carry one
//! fragment at `META-INF/classtags.idx`.

use crate::archive::{self, RootKind};
use classtags_core::codec::TAG_FILE_NAME;
use classtags_core::error::{ClassTagsError, Result};
use classtags_core::fragment::{FileFragment, FragmentHandle, FragmentLocator, FragmentRef};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Fragment stored as an entry inside a jar or zip archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFragment {
    archive: PathBuf,
    entry: String,
}

impl ArchiveFragment {
    pub fn new(archive: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            entry: entry.into(),
        }
    }
}

impl FragmentHandle for ArchiveFragment {
    fn location(&self) -> String {
        format!("{}!/{}", self.archive.display(), self.entry)
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + Send + '_>> {
        let mut zip = archive::open_archive(&self.archive)?;
        let bytes = archive::read_entry(&mut zip, &self.entry)?.ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} has no entry {}", self.archive.display(), self.entry),
            )
        })?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}

/// Finds fragments across an ordered, de-duplicated set of classpath roots.
#[derive(Debug, Default, Clone)]
pub struct ClasspathLocator {
    roots: Vec<PathBuf>,
}

impl ClasspathLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a platform classpath string (`a:b.jar` on Unix, `a;b.jar` on Windows).
    pub fn from_classpath_str(classpath: &str) -> Self {
        std::env::split_paths(classpath)
            .filter(|p| !p.as_os_str().is_empty())
            .fold(Self::new(), |locator, root| locator.with_root(root))
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
        self
    }

    /// Add every jar below `dir`, skipping sources and javadoc jars.
    pub fn with_jar_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let mut jars: Vec<PathBuf> = WalkDir::new(dir.as_ref())
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|path| path.is_file() && archive::is_archive(path))
            .filter(|path| !archive::is_auxiliary_jar(path))
            .collect();
        jars.sort();

        debug!("Found {} jars under {}", jars.len(), dir.as_ref().display());
        for jar in jars {
            self = self.with_root(jar);
        }
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn fragment_of(root: &Path) -> Result<Option<FragmentRef>> {
        match RootKind::of(root) {
            RootKind::Directory => {
                let path = root.join(TAG_FILE_NAME);
                Ok(path.is_file().then(|| FileFragment::shared(path)))
            }
            RootKind::Archive => {
                let mut zip = archive::open_archive(root).map_err(|e| {
                    ClassTagsError::Fragment(format!("{}: {}", root.display(), e))
                })?;
                let present = archive::has_entry(&mut zip, TAG_FILE_NAME).map_err(|e| {
                    ClassTagsError::Fragment(format!("{}: {}", root.display(), e))
                })?;
                Ok(present.then(|| {
                    Arc::new(ArchiveFragment::new(root, TAG_FILE_NAME)) as FragmentRef
                }))
            }
            RootKind::Missing => {
                debug!("Skipping classpath root {}", root.display());
                Ok(None)
            }
        }
    }
}

impl FragmentLocator for ClasspathLocator {
    fn list_fragments(&self) -> Result<Vec<FragmentRef>> {
        let mut fragments = Vec::new();
        for root in &self.roots {
            if let Some(fragment) = Self::fragment_of(root)? {
                fragments.push(fragment);
            }
        }

        info!(
            "{} of {} classpath roots carry a tag index",
            fragments.len(),
            self.roots.len()
        );
        Ok(fragments)
    }

    fn name(&self) -> &str {
        "Classpath Locator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_roots_are_deduplicated() {
        let locator = ClasspathLocator::new()
            .with_root("/a")
            .with_root("/b")
            .with_root("/a");
        assert_eq!(locator.roots(), &[PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn test_directory_root_without_index_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let with = temp.path().join("with");
        let without = temp.path().join("without");
        fs::create_dir_all(with.join("META-INF")).unwrap();
        fs::create_dir_all(&without).unwrap();
        fs::write(with.join(TAG_FILE_NAME), "a.A:t.T\n").unwrap();

        let locator = ClasspathLocator::new()
            .with_root(&with)
            .with_root(&without)
            .with_root(temp.path().join("missing"));
        let fragments = locator.list_fragments().unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].location().ends_with("classtags.idx"));
    }

    #[test]
    fn test_jar_dir_skips_auxiliary_jars() {
        let temp = tempfile::tempdir().unwrap();
        let lib = temp.path().join("lib/nested");
        fs::create_dir_all(&lib).unwrap();
        fs::write(lib.join("core-1.0.jar"), b"").unwrap();
        fs::write(lib.join("core-1.0-sources.jar"), b"").unwrap();
        fs::write(lib.join("core-1.0-javadoc.jar"), b"").unwrap();
        fs::write(lib.join("notes.txt"), b"").unwrap();

        let locator = ClasspathLocator::new().with_jar_dir(temp.path());
        assert_eq!(locator.roots(), &[lib.join("core-1.0.jar")]);
    }

    #[test]
    fn test_corrupt_archive_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let jar = temp.path().join("broken.jar");
        fs::write(&jar, b"not a zip").unwrap();

        let result = ClasspathLocator::new().with_root(&jar).list_fragments();
        assert!(matches!(result, Err(ClassTagsError::Fragment(_))));
    }
}

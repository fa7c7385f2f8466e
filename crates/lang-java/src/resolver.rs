//! Resolving tagged entity names to class files on a classpath.

use crate::archive::{self, RootKind};
use crate::naming;
use classtags_core::error::ResolveError;
use classtags_core::query::{EntityResolver, ResolvedEntity};
use ristretto_classfile::{ClassAccessFlags, ClassFile};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};
use zip::ZipArchive;

/// A class found on the classpath, reduced to what tag queries look at.
#[derive(Debug, Clone)]
pub struct ClassHandle {
    name: String,
    origin: PathBuf,
    access_flags: ClassAccessFlags,
}

impl ClassHandle {
    /// Classpath root the class was loaded from
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn access_flags(&self) -> ClassAccessFlags {
        self.access_flags
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::ABSTRACT)
    }
}

impl ResolvedEntity for ClassHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_concrete(&self) -> bool {
        // Interfaces and annotation types are always flagged abstract as well
        !self.is_interface() && !self.is_abstract()
    }
}

/// Looks classes up across classpath roots, first match wins.
///
/// Each jar is opened on first use and kept open for later lookups.
#[derive(Default)]
pub struct ClassFileResolver {
    roots: Vec<PathBuf>,
    archives: Mutex<HashMap<PathBuf, ZipArchive<File>>>,
}

impl ClassFileResolver {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            archives: Mutex::default(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Number of archives opened so far
    pub fn open_archives(&self) -> usize {
        self.archives
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn find_in_root(&self, root: &Path, candidates: &[String]) -> io::Result<Option<Vec<u8>>> {
        match RootKind::of(root) {
            RootKind::Directory => {
                for candidate in candidates {
                    if let Some(bytes) = archive::read_from_dir(root, candidate)? {
                        return Ok(Some(bytes));
                    }
                }
                Ok(None)
            }
            RootKind::Archive => {
                let mut archives = self.archives.lock().unwrap_or_else(PoisonError::into_inner);
                let zip = match archives.entry(root.to_path_buf()) {
                    Entry::Occupied(slot) => slot.into_mut(),
                    Entry::Vacant(slot) => slot.insert(archive::open_archive(root)?),
                };
                for candidate in candidates {
                    if let Some(bytes) = archive::read_entry(zip, candidate)? {
                        return Ok(Some(bytes));
                    }
                }
                Ok(None)
            }
            RootKind::Missing => Ok(None),
        }
    }

    fn find_bytes(&self, name: &str) -> Option<(PathBuf, Vec<u8>)> {
        let candidates = naming::candidate_paths(name);

        for root in &self.roots {
            match self.find_in_root(root, &candidates) {
                Ok(Some(bytes)) => return Some((root.clone(), bytes)),
                Ok(None) => {}
                // An unreadable root must not hide classes from later roots
                Err(e) => warn!("Cannot read {} from {}: {}", name, root.display(), e),
            }
        }

        None
    }
}

impl fmt::Debug for ClassFileResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassFileResolver")
            .field("roots", &self.roots)
            .field("open_archives", &self.open_archives())
            .finish()
    }
}

impl EntityResolver for ClassFileResolver {
    type Handle = ClassHandle;

    fn resolve(&self, name: &str) -> Result<ClassHandle, ResolveError> {
        let Some((origin, bytes)) = self.find_bytes(name) else {
            debug!("Class {} not found on {} roots", name, self.roots.len());
            return Err(ResolveError::NotFound(name.to_string()));
        };

        let class = ClassFile::from_bytes(&mut Cursor::new(bytes)).map_err(|e| {
            ResolveError::Unreadable {
                name: name.to_string(),
                reason: format!("{e:?}"),
            }
        })?;

        Ok(ClassHandle {
            name: name.to_string(),
            origin,
            access_flags: class.access_flags,
        })
    }
}

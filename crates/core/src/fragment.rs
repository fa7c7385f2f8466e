//! Index fragments and the contract for finding them.
//!
//! A fragment is one persisted index produced by one independently built
//! unit. Locators know where fragments live (build output directories, jar
//! archives); handles know how to open one for reading.

use crate::error::Result;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A readable index fragment.
pub trait FragmentHandle: Send + Sync + fmt::Debug {
    /// Human readable location, used in logs and error messages
    fn location(&self) -> String;

    /// Open a fresh reader over the fragment content
    fn open(&self) -> std::io::Result<Box<dyn Read + Send + '_>>;
}

pub type FragmentRef = Arc<dyn FragmentHandle>;

/// Finds every fragment visible to one resolution context.
///
/// Each visible fragment must be returned exactly once; order is irrelevant.
pub trait FragmentLocator: Send + Sync {
    fn list_fragments(&self) -> Result<Vec<FragmentRef>>;

    /// Locator name (for logging)
    fn name(&self) -> &str;
}

/// Fragment stored as a plain file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileFragment {
    path: PathBuf,
}

impl FileFragment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shared(path: impl Into<PathBuf>) -> FragmentRef {
        Arc::new(Self::new(path))
    }
}

impl FragmentHandle for FileFragment {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(std::fs::File::open(&self.path)?))
    }
}

/// Fragment held in memory, e.g. a generated fixture.
#[derive(Clone, PartialEq, Eq)]
pub struct MemoryFragment {
    name: String,
    content: Arc<[u8]>,
}

impl MemoryFragment {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into().into(),
        }
    }

    pub fn shared(name: impl Into<String>, content: impl Into<Vec<u8>>) -> FragmentRef {
        Arc::new(Self::new(name, content))
    }
}

impl fmt::Debug for MemoryFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryFragment")
            .field("name", &self.name)
            .field("len", &self.content.len())
            .finish()
    }
}

impl FragmentHandle for MemoryFragment {
    fn location(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(Cursor::new(&self.content[..])))
    }
}

/// Fixed list of fragments, handy when discovery already happened elsewhere.
#[derive(Debug, Default, Clone)]
pub struct FragmentList {
    fragments: Vec<FragmentRef>,
}

impl FragmentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, fragment: FragmentRef) -> Self {
        self.fragments.push(fragment);
        self
    }
}

impl FromIterator<FragmentRef> for FragmentList {
    fn from_iter<T: IntoIterator<Item = FragmentRef>>(iter: T) -> Self {
        Self {
            fragments: iter.into_iter().collect(),
        }
    }
}

impl FragmentLocator for FragmentList {
    fn list_fragments(&self) -> Result<Vec<FragmentRef>> {
        Ok(self.fragments.clone())
    }

    fn name(&self) -> &str {
        "Fragment List"
    }
}

use thiserror::Error;

/// Error type for pluggable collaborators (inspectors, locators, resolvers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ClassTagsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Fragment error: {0}")]
    Fragment(String),
    #[error("Inspection error: {0}")]
    Inspection(String),
}

impl From<BoxError> for ClassTagsError {
    fn from(err: BoxError) -> Self {
        ClassTagsError::Inspection(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClassTagsError>;

/// Failure to turn an entity name into a loadable handle.
///
/// Never fatal for a query: the engine hands it to the caller's sink, if any,
/// and leaves the entity out of the result.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Entity {name} could not be read: {reason}")]
    Unreadable { name: String, reason: String },
}

impl ResolveError {
    pub fn entity(&self) -> &str {
        match self {
            ResolveError::NotFound(name) => name,
            ResolveError::Unreadable { name, .. } => name,
        }
    }
}

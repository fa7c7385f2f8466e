//! Turning entity names back into runtime handles.

use crate::error::ResolveError;

/// Resolved entity with the one piece of shape information queries need.
pub trait ResolvedEntity {
    fn name(&self) -> &str;

    /// False for interfaces, annotation types and abstract classes
    fn is_concrete(&self) -> bool;
}

/// Maps an entity name to its loadable representation.
pub trait EntityResolver: Send + Sync {
    type Handle: ResolvedEntity;

    fn resolve(&self, name: &str) -> Result<Self::Handle, ResolveError>;
}

impl<R: EntityResolver + ?Sized> EntityResolver for &R {
    type Handle = R::Handle;

    fn resolve(&self, name: &str) -> Result<Self::Handle, ResolveError> {
        (**self).resolve(name)
    }
}

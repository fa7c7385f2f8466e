//! Java classpath support for class tag indexes: fragment discovery in
//! output directories and jars, and class file based entity resolution.

pub mod archive;
pub mod locator;
pub mod naming;
pub mod resolver;

pub use locator::{ArchiveFragment, ClasspathLocator};
pub use resolver::{ClassFileResolver, ClassHandle};

impl From<&ClasspathLocator> for ClassFileResolver {
    fn from(locator: &ClasspathLocator) -> Self {
        ClassFileResolver::new(locator.roots().iter().cloned())
    }
}

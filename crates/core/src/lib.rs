pub mod error;
pub mod logging;

pub mod builder;
pub mod codec;
pub mod config;
pub mod entry;
pub mod fragment;
pub mod query;

pub use builder::{BuildSummary, BuilderOptions, IndexBuilder, TagInspector};
pub use entry::{EntityTags, TagEntry};
pub use error::{BoxError, ClassTagsError, ResolveError, Result};
pub use fragment::{FragmentHandle, FragmentLocator, FragmentRef};
pub use query::{EntityResolver, ResolvedEntity, TagQuery};

pub mod engine;
pub mod resolve;

pub use engine::{EntityFilter, EntryFilter, ErrorSink, TagQuery, list_concrete_by_tag, list_names_by_tag};
pub use resolve::{EntityResolver, ResolvedEntity};

use crate::codec::{self, DecodeStats};
use crate::entry::{EntityTags, TagEntry};
use crate::error::{ClassTagsError, ResolveError, Result};
use crate::fragment::{FragmentLocator, FragmentRef};
use crate::query::resolve::{EntityResolver, ResolvedEntity};
use std::collections::{BTreeMap, HashSet};
use std::io::BufReader;
use std::sync::Arc;
use tracing::{debug, info};

pub type EntryFilter = dyn Fn(&TagEntry) -> bool + Send + Sync;
pub type EntityFilter = dyn Fn(&EntityTags) -> bool + Send + Sync;
pub type ErrorSink = dyn Fn(&ResolveError) + Send + Sync;

/// Query over every index fragment visible to the configured locators.
///
/// A query holds no loaded state: each terminal call (`resolve`,
/// `list_entity_names`, ...) reads its own snapshot of the fragments, so one
/// query value can be shared and run from several threads.
#[derive(Clone, Default)]
pub struct TagQuery {
    locators: Vec<Arc<dyn FragmentLocator>>,
    extra_fragments: Vec<FragmentRef>,
    entry_filter: Option<Arc<EntryFilter>>,
    entity_filter: Option<Arc<EntityFilter>>,
    on_unresolved: Option<Arc<ErrorSink>>,
}

impl TagQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query the fragments found by `locator`
    pub fn with_locator(locator: Arc<dyn FragmentLocator>) -> Self {
        Self::new().locator(locator)
    }

    /// Add a locator whose fragments are merged with the others
    pub fn locator(mut self, locator: Arc<dyn FragmentLocator>) -> Self {
        self.locators.push(locator);
        self
    }

    /// Add one fragment that the locators would not find on their own
    pub fn fragment(mut self, fragment: FragmentRef) -> Self {
        self.extra_fragments.push(fragment);
        self
    }

    /// Keep only entries accepted by `filter`, before grouping.
    ///
    /// Replaces any previous entry filter. Rejected entries are never
    /// materialized, which keeps single-tag queries cheap on large indexes.
    pub fn filter_entries<F>(mut self, filter: F) -> Self
    where
        F: Fn(&TagEntry) -> bool + Send + Sync + 'static,
    {
        self.entry_filter = Some(Arc::new(filter));
        self
    }

    /// Entry filter keeping a single tag
    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.filter_entries(move |entry| entry.tag() == tag)
    }

    /// Keep only entities accepted by `filter`, after grouping.
    ///
    /// Use this for predicates over a whole tag set, like "has A and not B".
    /// Successive calls are combined: an entity must pass all of them.
    pub fn filter_entities<F>(mut self, filter: F) -> Self
    where
        F: Fn(&EntityTags) -> bool + Send + Sync + 'static,
    {
        let combined: Arc<EntityFilter> = match self.entity_filter.take() {
            Some(existing) => Arc::new(move |tags: &EntityTags| existing(tags) && filter(tags)),
            None => Arc::new(filter),
        };
        self.entity_filter = Some(combined);
        self
    }

    /// Entity filter requiring `tag`
    pub fn having_tag(self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.filter_entities(move |tags| tags.contains_tag(&tag))
    }

    /// Receive entities that fail to resolve in `list_entities`
    pub fn on_unresolved<F>(mut self, sink: F) -> Self
    where
        F: Fn(&ResolveError) + Send + Sync + 'static,
    {
        self.on_unresolved = Some(Arc::new(sink));
        self
    }

    fn fragments(&self) -> Result<Vec<FragmentRef>> {
        let mut fragments = Vec::new();
        for locator in &self.locators {
            let found = locator.list_fragments()?;
            debug!("Locator {} found {} fragments", locator.name(), found.len());
            fragments.extend(found);
        }
        fragments.extend(self.extra_fragments.iter().cloned());
        Ok(fragments)
    }

    /// Union of the entries of every fragment, entry filter applied.
    fn load_entries(&self) -> Result<HashSet<TagEntry>> {
        let fragments = self.fragments()?;
        let filter = self
            .entry_filter
            .as_deref()
            .map(|f| f as &dyn Fn(&TagEntry) -> bool);

        let mut entries = HashSet::new();
        let mut stats = DecodeStats::default();
        for fragment in &fragments {
            let reader = fragment
                .open()
                .map_err(|e| fragment_error(fragment, e))?;
            let fragment_stats = codec::decode_into(BufReader::new(reader), &mut entries, filter)
                .map_err(|e| match e {
                    ClassTagsError::Io(io) => fragment_error(fragment, io),
                    other => other,
                })?;
            debug!(
                "Read {} entries from {} ({} skipped)",
                fragment_stats.accepted,
                fragment.location(),
                fragment_stats.skipped
            );
            stats.merge(fragment_stats);
        }

        info!(
            "Merged {} fragments: {} entries accepted, {} filtered, {} malformed lines",
            fragments.len(),
            stats.accepted,
            stats.filtered,
            stats.skipped
        );
        Ok(entries)
    }

    /// Load, entry-filter, group by entity and entity-filter, in that order.
    pub fn resolve(&self) -> Result<BTreeMap<String, EntityTags>> {
        let entries = self.load_entries()?;

        let mut grouped: BTreeMap<String, EntityTags> = BTreeMap::new();
        for entry in entries {
            grouped
                .entry(entry.entity().to_string())
                .or_insert_with(|| EntityTags::new(entry.entity()))
                .tags
                .insert(entry.tag().to_string());
        }

        if let Some(filter) = &self.entity_filter {
            grouped.retain(|_, tags| filter(tags));
        }

        Ok(grouped)
    }

    /// Matching entities with their tags, sorted by entity name
    pub fn list_entity_tags(&self) -> Result<Vec<EntityTags>> {
        let mut result: Vec<EntityTags> = self.resolve()?.into_values().collect();
        result.sort_by(|a, b| a.entity.cmp(&b.entity));
        Ok(result)
    }

    /// Matching entity names, lexicographically sorted
    pub fn list_entity_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.resolve()?.into_keys().collect();
        names.sort();
        Ok(names)
    }

    /// Resolve every matching entity, in name order.
    ///
    /// Names that fail to resolve are passed to the `on_unresolved` sink (or
    /// dropped when none is set) and left out of the result. Only fragment
    /// I/O failures are returned as errors.
    pub fn list_entities<R: EntityResolver>(&self, resolver: &R) -> Result<Vec<R::Handle>> {
        let names = self.list_entity_names()?;
        let mut handles = Vec::with_capacity(names.len());

        for name in &names {
            match resolver.resolve(name) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    debug!("Unresolved entity {}: {}", name, e);
                    if let Some(sink) = &self.on_unresolved {
                        sink(&e);
                    }
                }
            }
        }

        Ok(handles)
    }

    /// Like `list_entities`, minus interfaces and abstract classes
    pub fn list_concrete_entities<R: EntityResolver>(
        &self,
        resolver: &R,
    ) -> Result<Vec<R::Handle>> {
        let mut handles = self.list_entities(resolver)?;
        handles.retain(|handle| handle.is_concrete());
        Ok(handles)
    }
}

fn fragment_error(fragment: &FragmentRef, err: std::io::Error) -> ClassTagsError {
    ClassTagsError::Fragment(format!("{}: {}", fragment.location(), err))
}

/// Names of all entities tagged with `tag`.
pub fn list_names_by_tag(locator: Arc<dyn FragmentLocator>, tag: &str) -> Result<Vec<String>> {
    TagQuery::with_locator(locator)
        .with_tag(tag)
        .list_entity_names()
}

/// Concrete entities tagged with `tag` that resolve without error.
pub fn list_concrete_by_tag<R: EntityResolver>(
    locator: Arc<dyn FragmentLocator>,
    resolver: &R,
    tag: &str,
) -> Result<Vec<R::Handle>> {
    TagQuery::with_locator(locator)
        .with_tag(tag)
        .list_concrete_entities(resolver)
}

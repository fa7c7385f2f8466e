//! Index facts and the per-entity view derived from them.

use crate::error::{ClassTagsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Single `(entity, tag)` fact of the index.
///
/// Ordering is lexicographic on `(entity, tag)`, which is also the order the
/// codec writes entries in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagEntry {
    entity: String,
    tag: String,
}

impl TagEntry {
    /// Build an entry, rejecting names the line format cannot carry.
    pub fn new(entity: impl Into<String>, tag: impl Into<String>) -> Result<Self> {
        let entity = entity.into();
        let tag = tag.into();
        validate_name("entity", &entity)?;
        validate_name("tag", &tag)?;
        Ok(Self { entity, tag })
    }

    /// Caller guarantees both names passed `validate_name`.
    pub(crate) fn new_unchecked(entity: &str, tag: &str) -> Self {
        Self {
            entity: entity.to_string(),
            tag: tag.to_string(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for TagEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.tag)
    }
}

pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains([':', '\n', '\r'])
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(ClassTagsError::InvalidEntry(format!(
            "{kind} name {name:?} must be non-empty and free of ':' and line breaks"
        )))
    }
}

/// Loadable name of a nested class: `pkg.Outer` + `Inner` -> `pkg.Outer$Inner`.
pub fn nested_name(outer: &str, simple: &str) -> String {
    format!("{outer}${simple}")
}

/// All tags carried by one entity after merging.
///
/// Built fresh by every query; the tag set is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTags {
    pub entity: String,
    pub tags: BTreeSet<String>,
}

impl EntityTags {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            tags: BTreeSet::new(),
        }
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Entries this view was grouped from.
    pub fn entries(&self) -> impl Iterator<Item = TagEntry> + '_ {
        self.tags
            .iter()
            .map(|tag| TagEntry::new_unchecked(&self.entity, tag))
    }
}

impl fmt::Display for EntityTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        write!(f, "{}:[{}]", self.entity, tags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_ordering_is_entity_then_tag() {
        let mut entries = vec![
            TagEntry::new("b.B", "t.A").unwrap(),
            TagEntry::new("a.A", "t.Z").unwrap(),
            TagEntry::new("a.A", "t.B").unwrap(),
        ];
        entries.sort();
        let rendered: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
        assert_eq!(rendered, vec!["a.A:t.B", "a.A:t.Z", "b.B:t.A"]);
    }

    #[test]
    fn test_entry_rejects_unencodable_names() {
        assert!(TagEntry::new("", "t.T").is_err());
        assert!(TagEntry::new("a.A", "").is_err());
        assert!(TagEntry::new("a:A", "t.T").is_err());
        assert!(TagEntry::new("a.A", "t.T\nb.B").is_err());
    }

    #[test]
    fn test_nested_name() {
        assert_eq!(nested_name("com.acme.Outer", "Inner"), "com.acme.Outer$Inner");
    }

    #[test]
    fn test_entity_tags_entries_roundtrip_to_facts() {
        let mut tags = EntityTags::new("a.A");
        tags.tags.insert("t.One".to_string());
        tags.tags.insert("t.Two".to_string());

        assert!(tags.contains_tag("t.One"));
        assert!(!tags.contains_tag("t.Three"));

        let entries: Vec<TagEntry> = tags.entries().collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.entity() == "a.A"));
        assert_eq!(tags.to_string(), "a.A:[t.One, t.Two]");
    }
}

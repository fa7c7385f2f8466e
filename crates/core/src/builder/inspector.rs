//! How the builder learns which tags an entity carries.

use crate::config::Configuration;
use crate::error::BoxError;
use std::collections::BTreeSet;

pub type TagSet = BTreeSet<String>;

/// Tag membership decision supplied by the build driver.
pub trait TagInspector {
    /// Whether `entity` still exists in the program being built
    fn exists(&self, entity: &str) -> Result<bool, BoxError>;

    /// Tags currently carried by `entity`; `None` or an empty set when untagged
    fn tags_of(&self, entity: &str) -> Result<Option<TagSet>, BoxError>;
}

impl<T: TagInspector + ?Sized> TagInspector for &T {
    fn exists(&self, entity: &str) -> Result<bool, BoxError> {
        (**self).exists(entity)
    }

    fn tags_of(&self, entity: &str) -> Result<Option<TagSet>, BoxError> {
        (**self).tags_of(entity)
    }
}

/// Annotation or interface found on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker {
    /// Loadable name of the annotation or interface type
    pub name: String,
    /// The marker type itself carries the tag-declaration marker
    pub declares_tag: bool,
}

impl Marker {
    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declares_tag: true,
        }
    }

    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declares_tag: false,
        }
    }
}

/// Raw program model: what markers an entity has.
///
/// Implementations are expected to report annotations present on the entity
/// plus every interface it implements, including those of its superclasses.
pub trait MarkerSource {
    fn exists(&self, entity: &str) -> Result<bool, BoxError>;

    fn markers_of(&self, entity: &str) -> Result<Vec<Marker>, BoxError>;
}

/// Derives tags from markers: a marker is a tag when it declares itself one
/// or when the configuration lists it as an external tag.
pub struct MarkerTagInspector<M> {
    source: M,
    config: Configuration,
}

impl<M: MarkerSource> MarkerTagInspector<M> {
    pub fn new(source: M, config: Configuration) -> Self {
        Self { source, config }
    }

    pub fn is_tag(&self, marker: &Marker) -> bool {
        marker.declares_tag || self.config.is_external_tag(&marker.name)
    }
}

impl<M: MarkerSource> TagInspector for MarkerTagInspector<M> {
    fn exists(&self, entity: &str) -> Result<bool, BoxError> {
        self.source.exists(entity)
    }

    fn tags_of(&self, entity: &str) -> Result<Option<TagSet>, BoxError> {
        let tags: TagSet = self
            .source
            .markers_of(entity)?
            .into_iter()
            .filter(|marker| self.is_tag(marker))
            .map(|marker| marker.name)
            .collect();

        Ok(if tags.is_empty() { None } else { Some(tags) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Markers(HashMap<&'static str, Vec<Marker>>);

    impl MarkerSource for Markers {
        fn exists(&self, entity: &str) -> Result<bool, BoxError> {
            Ok(self.0.contains_key(entity))
        }

        fn markers_of(&self, entity: &str) -> Result<Vec<Marker>, BoxError> {
            self.0
                .get(entity)
                .cloned()
                .ok_or_else(|| format!("unknown entity {entity}").into())
        }
    }

    fn source() -> Markers {
        Markers(HashMap::from([
            (
                "app.Service",
                vec![Marker::tag("app.Component"), Marker::plain("java.io.Serializable")],
            ),
            ("app.Plain", vec![Marker::plain("java.lang.Runnable")]),
            ("app.Legacy", vec![Marker::plain("lib.ExternalTag")]),
        ]))
    }

    #[test]
    fn test_declared_markers_become_tags() {
        let inspector = MarkerTagInspector::new(source(), Configuration::default());
        let tags = inspector.tags_of("app.Service").unwrap().unwrap();
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["app.Component"]);
        assert!(inspector.tags_of("app.Plain").unwrap().is_none());
    }

    #[test]
    fn test_external_tags_from_configuration() {
        let config = Configuration::parse("externalTags=lib.ExternalTag");
        let inspector = MarkerTagInspector::new(source(), config);
        let tags = inspector.tags_of("app.Legacy").unwrap().unwrap();
        assert!(tags.contains("lib.ExternalTag"));
    }

    #[test]
    fn test_exists_and_errors_pass_through() {
        let inspector = MarkerTagInspector::new(source(), Configuration::default());
        assert!(inspector.exists("app.Plain").unwrap());
        assert!(!inspector.exists("app.Missing").unwrap());
        assert!(inspector.tags_of("app.Missing").is_err());
    }
}

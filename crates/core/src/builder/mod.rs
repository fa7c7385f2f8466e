//! Incremental index builder.
//!
//! One builder serves one build invocation and is not re-entrant. It is
//! seeded from the previously persisted index, re-evaluates the entities the
//! driver presents in each compilation round, and on `finish` re-checks every
//! previously indexed entity that no round touched before writing the index
//! back. The sweep matters because the code that grants a tag can change
//! without the tagged entity being recompiled.

pub mod inspector;

pub use inspector::{Marker, MarkerSource, MarkerTagInspector, TagInspector, TagSet};

use crate::codec;
use crate::config::Configuration;
use crate::entry::TagEntry;
use crate::error::{ClassTagsError, Result};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Lifecycle of a builder; `finish` consumes it, so callers only observe the
/// first two phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Loaded,
    Scanning,
    Validating,
    Persisted,
}

/// Effect of re-evaluating one entity against the working index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Added,
    Updated,
    Removed,
    Unchanged,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    pub processed: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub failed: usize,
}

impl RoundSummary {
    fn record(&mut self, transition: Transition) {
        match transition {
            Transition::Added => self.added += 1,
            Transition::Updated => self.updated += 1,
            Transition::Removed => self.removed += 1,
            Transition::Unchanged => {}
        }
    }
}

/// Outcome of a complete build.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub rounds: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// Entities re-checked by the validation sweep
    pub validated: usize,
    /// Entities whose re-check failed and were kept as they were
    pub validation_failures: usize,
    /// Entries in the persisted index
    pub entries: usize,
    /// False when the index on disk already had identical content
    pub written: bool,
}

impl BuildSummary {
    fn absorb(&mut self, round: &RoundSummary) {
        self.added += round.added;
        self.updated += round.updated;
        self.removed += round.removed;
    }
}

#[derive(Debug, Clone)]
pub struct BuilderOptions {
    /// Canonical output location of the index, also read at startup
    pub index_path: PathBuf,
    /// Optional properties file with external tags
    pub config_path: Option<PathBuf>,
}

impl BuilderOptions {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            config_path: None,
        }
    }

    pub fn with_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }
}

pub struct IndexBuilder {
    index_path: PathBuf,
    config: Configuration,
    working: HashMap<String, BTreeSet<TagEntry>>,
    to_validate: HashSet<String>,
    phase: BuildPhase,
    summary: BuildSummary,
}

impl IndexBuilder {
    /// Load configuration and the previous index.
    ///
    /// Neither is required: a missing or unreadable file starts the build
    /// from an empty state, since a lost index is recovered by a full
    /// rebuild.
    pub fn open(options: BuilderOptions) -> Self {
        info!("Initializing the tag index builder.");

        let config = match &options.config_path {
            Some(path) => Configuration::load(path).unwrap_or_else(|e| {
                warn!("Failed to read configuration {}: {}", path.display(), e);
                Configuration::default()
            }),
            None => Configuration::default(),
        };

        let entries = Self::read_previous(&options.index_path);
        Self::with_state(options.index_path, config, entries)
    }

    /// Start from explicit state instead of reading it from disk.
    pub fn with_state(
        index_path: PathBuf,
        config: Configuration,
        entries: impl IntoIterator<Item = TagEntry>,
    ) -> Self {
        let mut working: HashMap<String, BTreeSet<TagEntry>> = HashMap::new();
        for entry in entries {
            working
                .entry(entry.entity().to_string())
                .or_default()
                .insert(entry);
        }
        let to_validate = working.keys().cloned().collect();

        Self {
            index_path,
            config,
            working,
            to_validate,
            phase: BuildPhase::Loaded,
            summary: BuildSummary::default(),
        }
    }

    fn read_previous(path: &Path) -> BTreeSet<TagEntry> {
        match std::fs::read(path) {
            Ok(bytes) => match codec::decode(&bytes[..]) {
                Ok(entries) => {
                    info!(
                        "Incremental build: {} entries loaded from {}",
                        entries.len(),
                        path.display()
                    );
                    entries
                }
                Err(e) => {
                    warn!("Failed to decode index {}: {}", path.display(), e);
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No previous index at {}", path.display());
                BTreeSet::new()
            }
            Err(e) => {
                warn!(
                    "Failed to read index {}: {}. Starting from an empty index.",
                    path.display(),
                    e
                );
                BTreeSet::new()
            }
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    /// Tags currently recorded for `entity`
    pub fn tags_of(&self, entity: &str) -> Option<TagSet> {
        self.working
            .get(entity)
            .map(|entries| entries.iter().map(|e| e.tag().to_string()).collect())
    }

    /// Snapshot of the working index
    pub fn entries(&self) -> BTreeSet<TagEntry> {
        self.working.values().flatten().cloned().collect()
    }

    /// Entities known from the previous build that no round has touched yet
    pub fn pending_validation(&self) -> usize {
        self.to_validate.len()
    }

    /// Re-evaluate the entities compiled in one round.
    ///
    /// An entity whose inspection fails is logged and left for the
    /// validation sweep to retry.
    pub fn process_round<I, S>(&mut self, entities: I, inspector: &dyn TagInspector) -> RoundSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.phase = BuildPhase::Scanning;
        self.summary.rounds += 1;

        let mut round = RoundSummary::default();
        for entity in entities {
            let entity = entity.as_ref();
            round.processed += 1;

            let outcome = inspector
                .tags_of(entity)
                .map_err(ClassTagsError::from)
                .and_then(|tags| self.apply(entity, tags));

            match outcome {
                Ok(transition) => {
                    round.record(transition);
                    self.to_validate.remove(entity);
                }
                Err(e) => {
                    warn!("Failed to inspect {}: {}", entity, e);
                    round.failed += 1;
                    self.to_validate.insert(entity.to_string());
                }
            }
        }

        debug!(
            "Round {}: {} processed, {} added, {} updated, {} removed, {} failed",
            self.summary.rounds,
            round.processed,
            round.added,
            round.updated,
            round.removed,
            round.failed
        );
        self.summary.absorb(&round);
        round
    }

    /// Apply the three-way transition for `entity` given its current tags.
    fn apply(&mut self, entity: &str, tags: Option<TagSet>) -> Result<Transition> {
        let tags = tags.filter(|t| !t.is_empty());
        let known = self.working.contains_key(entity);

        let Some(tags) = tags else {
            if known {
                debug!("Found an entity that is no longer tagged: {}", entity);
                self.working.remove(entity);
                return Ok(Transition::Removed);
            }
            return Ok(Transition::Unchanged);
        };

        let entries = tags
            .iter()
            .map(|tag| TagEntry::new(entity, tag.as_str()))
            .collect::<Result<BTreeSet<_>>>()?;

        match self.working.insert(entity.to_string(), entries) {
            None => {
                debug!("Found a new tagged entity: {}", entity);
                Ok(Transition::Added)
            }
            Some(previous) => {
                let current = &self.working[entity];
                if previous == *current {
                    Ok(Transition::Unchanged)
                } else {
                    debug!("Updating tagged entity: {}", entity);
                    Ok(Transition::Updated)
                }
            }
        }
    }

    fn validate_one(&mut self, entity: &str, inspector: &dyn TagInspector) -> Result<Transition> {
        if !inspector.exists(entity)? {
            debug!("Entity not found: {}", entity);
            return Ok(match self.working.remove(entity) {
                Some(_) => Transition::Removed,
                None => Transition::Unchanged,
            });
        }
        let tags = inspector.tags_of(entity)?;
        self.apply(entity, tags)
    }

    /// Validation sweep over untouched entities, then persist the index.
    ///
    /// A failure re-checking one entity is logged and keeps that entity as it
    /// was; a failure writing the index is returned.
    pub fn finish(mut self, inspector: &dyn TagInspector) -> Result<BuildSummary> {
        self.phase = BuildPhase::Validating;

        let mut stale: Vec<String> = self.to_validate.drain().collect();
        stale.sort();
        if !stale.is_empty() {
            info!("Validating {} entities that were not compiled.", stale.len());
        }

        let mut sweep = RoundSummary::default();
        for entity in &stale {
            sweep.processed += 1;
            match self.validate_one(entity, inspector) {
                Ok(transition) => sweep.record(transition),
                Err(e) => {
                    warn!("Error validating entity {}: {}", entity, e);
                    sweep.failed += 1;
                }
            }
        }
        self.summary.absorb(&sweep);
        self.summary.validated = sweep.processed;
        self.summary.validation_failures = sweep.failed;

        let entries = self.entries();
        self.summary.entries = entries.len();
        self.summary.written = persist(&self.index_path, &entries)?;
        self.phase = BuildPhase::Persisted;

        info!(
            "Completed tag index build: {} entries ({} added, {} updated, {} removed)",
            self.summary.entries, self.summary.added, self.summary.updated, self.summary.removed
        );
        debug!("Builder phase: {:?}", self.phase);
        Ok(self.summary)
    }
}

/// Replace the index at `path` with `entries`.
///
/// Returns `false` without touching the file when it already holds the same
/// bytes. Otherwise writes a temporary sibling and renames it over the target.
pub fn persist(path: &Path, entries: &BTreeSet<TagEntry>) -> Result<bool> {
    let bytes = codec::encode_to_vec(entries);

    if let Ok(existing) = std::fs::read(path) {
        if existing == bytes {
            debug!("Index at {} is up to date", path.display());
            return Ok(false);
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let written = std::fs::write(&temp_path, &bytes).and_then(|_| std::fs::rename(&temp_path, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    info!("Wrote tag index to {}", path.display());
    Ok(true)
}

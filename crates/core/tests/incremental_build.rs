//! Builder scenarios across separate build invocations sharing one index file.

use classtags_core::builder::{BuilderOptions, IndexBuilder, TagInspector, TagSet};
use classtags_core::codec::{self, TAG_FILE_NAME};
use classtags_core::error::BoxError;
use classtags_core::TagEntry;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Program state as seen by one build: entity name -> tags (empty when untagged).
#[derive(Default)]
struct Program(HashMap<String, Vec<String>>);

impl Program {
    fn with(mut self, entity: &str, tags: &[&str]) -> Self {
        self.0.insert(
            entity.to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
        );
        self
    }
}

impl TagInspector for Program {
    fn exists(&self, entity: &str) -> Result<bool, BoxError> {
        Ok(self.0.contains_key(entity))
    }

    fn tags_of(&self, entity: &str) -> Result<Option<TagSet>, BoxError> {
        Ok(self
            .0
            .get(entity)
            .filter(|tags| !tags.is_empty())
            .map(|tags| tags.iter().cloned().collect()))
    }
}

fn index_path(dir: &TempDir) -> PathBuf {
    dir.path().join("classes").join(TAG_FILE_NAME)
}

fn seed(path: &Path, text: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn persisted(path: &Path) -> BTreeSet<TagEntry> {
    codec::decode(std::fs::File::open(path).unwrap()).unwrap()
}

fn facts(pairs: &[(&str, &str)]) -> BTreeSet<TagEntry> {
    pairs
        .iter()
        .map(|(e, t)| TagEntry::new(*e, *t).unwrap())
        .collect()
}

/// Run one build: open, one round per slice, finish.
fn build(path: &Path, program: &Program, rounds: &[&[&str]]) {
    let mut builder = IndexBuilder::open(BuilderOptions::new(path));
    for round in rounds {
        builder.process_round(round.iter(), program);
    }
    builder.finish(program).unwrap();
}

#[test]
fn test_new_entity_added_untouched_entity_kept() {
    let dir = TempDir::new().unwrap();
    let path = index_path(&dir);
    seed(&path, "X:T1\n");

    let program = Program::default().with("X", &["T1"]).with("Y", &["T2"]);
    build(&path, &program, &[&["Y"]]);

    assert_eq!(persisted(&path), facts(&[("X", "T1"), ("Y", "T2")]));
}

#[test]
fn test_touched_entity_without_tags_is_removed() {
    let dir = TempDir::new().unwrap();
    let path = index_path(&dir);
    seed(&path, "X:T1\n");

    let program = Program::default().with("X", &[]);
    build(&path, &program, &[&["X"]]);

    assert!(persisted(&path).is_empty());
}

#[test]
fn test_vanished_entity_is_removed_by_validation() {
    let dir = TempDir::new().unwrap();
    let path = index_path(&dir);
    seed(&path, "X:T1\n");

    build(&path, &Program::default(), &[]);

    assert!(persisted(&path).is_empty());
}

#[test]
fn test_untouched_entity_losing_its_tag_is_removed() {
    // The marker definition changed, the tagged entity was not recompiled
    let dir = TempDir::new().unwrap();
    let path = index_path(&dir);
    seed(&path, "X:T1\nZ:T1\n");

    let program = Program::default().with("X", &[]).with("Z", &["T1"]);
    build(&path, &program, &[&["Unrelated"]]);

    assert_eq!(persisted(&path), facts(&[("Z", "T1")]));
}

#[test]
fn test_multiple_rounds_and_tag_changes() {
    let dir = TempDir::new().unwrap();
    let path = index_path(&dir);
    seed(&path, "a.A:t.Old\nb.B:t.One\n");

    let program = Program::default()
        .with("a.A", &["t.New"])
        .with("b.B", &["t.One", "t.Two"])
        .with("c.C", &["t.One"])
        .with("c.C$Inner", &["t.Two"]);
    build(&path, &program, &[&["a.A"], &["c.C", "c.C$Inner"]]);

    assert_eq!(
        persisted(&path),
        facts(&[
            ("a.A", "t.New"),
            ("b.B", "t.One"),
            ("b.B", "t.Two"),
            ("c.C", "t.One"),
            ("c.C$Inner", "t.Two"),
        ])
    );
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "a.A:t.New\nb.B:t.One\nb.B:t.Two\nc.C:t.One\nc.C$Inner:t.Two\n"
    );
}

#[test]
fn test_corrupted_previous_index_keeps_valid_lines() {
    let dir = TempDir::new().unwrap();
    let path = index_path(&dir);
    seed(&path, "X:T1\nthis line is garbage\n::\nY:T2\n");

    let program = Program::default().with("X", &["T1"]).with("Y", &["T2"]);
    let builder = IndexBuilder::open(BuilderOptions::new(&path));
    assert_eq!(builder.pending_validation(), 2);
    let summary = builder.finish(&program).unwrap();

    assert_eq!(summary.entries, 2);
    assert!(summary.written);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "X:T1\nY:T2\n");
}

#[test]
fn test_first_build_without_previous_index() {
    let dir = TempDir::new().unwrap();
    let path = index_path(&dir);

    let program = Program::default().with("p.Svc", &["t.Service"]).with("p.Util", &[]);
    build(&path, &program, &[&["p.Svc", "p.Util"]]);

    assert_eq!(persisted(&path), facts(&[("p.Svc", "t.Service")]));
}

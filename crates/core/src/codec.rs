//! Line-oriented text form of the index.
//!
//! One `entity:tag` fact per line, UTF-8, sorted on write so that identical
//! content always produces identical bytes. Reading is tolerant: a line that
//! is not exactly two non-empty colon-separated fields is skipped, so a single
//! corrupted or foreign line never blocks a build.

use crate::entry::{TagEntry, is_valid_name};
use crate::error::Result;
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Read, Write};
use tracing::debug;

/// Well-known location of an index fragment inside a classpath root.
pub const TAG_FILE_NAME: &str = "META-INF/classtags.idx";

/// Counters gathered while decoding one fragment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStats {
    /// Non-blank lines read
    pub lines: usize,
    /// Entries handed to the target collection
    pub accepted: usize,
    /// Well-formed entries rejected by the entry filter
    pub filtered: usize,
    /// Malformed lines ignored
    pub skipped: usize,
}

impl DecodeStats {
    pub fn merge(&mut self, other: DecodeStats) {
        self.lines += other.lines;
        self.accepted += other.accepted;
        self.filtered += other.filtered;
        self.skipped += other.skipped;
    }
}

/// Parse a single line, `None` when it is not a well-formed fact.
pub fn parse_line(line: &str) -> Option<TagEntry> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let mut parts = line.split(':');
    let entity = parts.next()?;
    let tag = parts.next()?;
    if parts.next().is_some() || !is_valid_name(entity) || !is_valid_name(tag) {
        return None;
    }
    Some(TagEntry::new_unchecked(entity, tag))
}

/// Decode a fragment into `to`, applying `filter` before insertion.
///
/// Only I/O failures are reported as errors.
pub fn decode_into<R, C>(
    reader: R,
    to: &mut C,
    filter: Option<&dyn Fn(&TagEntry) -> bool>,
) -> Result<DecodeStats>
where
    R: BufRead,
    C: Extend<TagEntry>,
{
    let mut stats = DecodeStats::default();

    for raw in reader.split(b'\n') {
        let raw = raw?;
        if raw.is_empty() || raw == b"\r" {
            continue;
        }
        stats.lines += 1;

        let entry = std::str::from_utf8(&raw).ok().and_then(parse_line);
        let Some(entry) = entry else {
            debug!("Skipping malformed index line: {:?}", String::from_utf8_lossy(&raw));
            stats.skipped += 1;
            continue;
        };

        if filter.is_some_and(|f| !f(&entry)) {
            stats.filtered += 1;
            continue;
        }

        stats.accepted += 1;
        to.extend(std::iter::once(entry));
    }

    Ok(stats)
}

/// Decode a whole fragment into a set.
pub fn decode<R: Read>(reader: R) -> Result<BTreeSet<TagEntry>> {
    let mut entries = BTreeSet::new();
    decode_into(BufReader::new(reader), &mut entries, None)?;
    Ok(entries)
}

/// Write `entries` sorted by `(entity, tag)`, one line each, duplicates collapsed.
pub fn encode<'a, W, I>(entries: I, mut writer: W) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a TagEntry>,
{
    let mut sorted: Vec<&TagEntry> = entries.into_iter().collect();
    sorted.sort();
    sorted.dedup();

    for entry in sorted {
        writeln!(writer, "{}:{}", entry.entity(), entry.tag())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn encode_to_vec<'a, I>(entries: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a TagEntry>,
{
    let mut out = Vec::new();
    // Writing into a Vec never fails.
    let _ = encode(entries, &mut out);
    out
}

//! Builder configuration loaded from a properties resource.

use crate::error::{ClassTagsError, Result};
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Conventional name of the configuration resource.
pub const CONFIG_FILE_NAME: &str = "classtags.properties";

/// Key listing extra tag names, e.g. `externalTags=myapp.Tag1;myapp.Tag2`.
pub const EXTERNAL_TAGS: &str = "externalTags";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    /// Names treated as tags even though they lack the tag-declaration marker
    pub external_tags: BTreeSet<String>,
}

impl Configuration {
    pub fn is_external_tag(&self, name: &str) -> bool {
        self.external_tags.contains(name)
    }

    /// Parse properties text. Unknown keys are ignored.
    pub fn parse(text: &str) -> Self {
        let props = parse_properties(text);
        let external_tags = props
            .get(EXTERNAL_TAGS)
            .map(|value| {
                value
                    .split(';')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self { external_tags }
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::parse(&text))
    }

    /// Load from `path`; a missing file yields the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::File::open(path) {
            Ok(file) => {
                let config = Self::from_reader(file).map_err(|e| match e {
                    ClassTagsError::Io(io) => config_error(path, io),
                    other => other,
                })?;
                info!(
                    "Loaded configuration from {} ({} external tags)",
                    path.display(),
                    config.external_tags.len()
                );
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(config_error(path, e)),
        }
    }
}

fn config_error(path: &Path, err: std::io::Error) -> ClassTagsError {
    ClassTagsError::Config(format!("{}: {}", path.display(), err))
}

/// Minimal reader for `.properties` text: comments, `=`/`:`/space separators,
/// backslash escapes and line continuations.
fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut props = HashMap::new();
    let mut pending = String::new();

    for line in text.lines() {
        let line = line.trim_start();
        if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }

        if continues(line) {
            pending.push_str(&line[..line.len() - 1]);
            continue;
        }
        pending.push_str(line);

        let logical = std::mem::take(&mut pending);
        if let Some((key, value)) = split_property(&logical) {
            props.insert(key, value);
        }
    }

    if !pending.is_empty() {
        if let Some((key, value)) = split_property(&pending) {
            props.insert(key, value);
        }
    }

    props
}

/// An odd number of trailing backslashes joins the next line; `\\` is a
/// literal backslash.
fn continues(line: &str) -> bool {
    line.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

fn split_property(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut key_end = line.len();
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || c.is_whitespace() {
            key_end = idx;
            break;
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start();
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start();
    }

    Some((unescape(key), unescape(rest)))
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration_is_empty() {
        let config = Configuration::default();
        assert!(config.external_tags.is_empty());
    }

    #[test]
    fn test_parse_external_tags() {
        let config = Configuration::parse(
            "# sample\nexternalTags=org.sample.ExternalTag;org.sample.ExternalTag2\nother=1\n",
        );
        let expected: BTreeSet<String> = ["org.sample.ExternalTag", "org.sample.ExternalTag2"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(config.external_tags, expected);
        assert!(config.is_external_tag("org.sample.ExternalTag2"));
    }

    #[test]
    fn test_parse_separators_and_continuations() {
        let config = Configuration::parse("externalTags : a.A; \\\n    b.B;;\n");
        assert_eq!(config.external_tags.len(), 2);
        assert!(config.is_external_tag("a.A"));
        assert!(config.is_external_tag("b.B"));
    }

    #[test]
    fn test_escaped_trailing_backslash_ends_the_line() {
        let config = Configuration::parse("externalTags=a.A\\\\\nother=x\n");
        let expected: BTreeSet<String> = ["a.A\\".to_string()].into_iter().collect();
        assert_eq!(config.external_tags, expected);

        let props = parse_properties("externalTags=a.A\\\\\nother=x\n");
        assert_eq!(props.get("other").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_escaped_separators_in_keys_and_values() {
        let props = parse_properties("key\\:with\\=sep = v\\=1\\:2\ntab=a\\tb\n");
        assert_eq!(props.get("key:with=sep").map(String::as_str), Some("v=1:2"));
        assert_eq!(props.get("tab").map(String::as_str), Some("a\tb"));
    }

    #[test]
    fn test_three_trailing_backslashes_continue() {
        let props = parse_properties("k=a\\\\\\\n  b\n");
        assert_eq!(props.get("k").map(String::as_str), Some("a\\b"));
    }

    #[test]
    fn test_unreadable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, [0xff, 0xfe, b'\n']).unwrap();
        assert!(matches!(
            Configuration::load(&path),
            Err(ClassTagsError::Config(_))
        ));
    }

    #[test]
    fn test_missing_key_is_empty() {
        let config = Configuration::parse("! nothing here\nunrelated=x");
        assert!(config.external_tags.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Configuration::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "externalTags=x.Tag\n").unwrap();
        let config = Configuration::load(&path).unwrap();
        assert!(config.is_external_tag("x.Tag"));
    }
}

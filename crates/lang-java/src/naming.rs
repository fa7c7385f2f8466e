//! Mapping between loadable class names and class file paths.

use classtags_core::entry::nested_name;

/// Separator between package segments in a loadable name.
pub const TYPE_SEPARATOR: char = '.';

/// Archive/directory path of the class file for a loadable name.
///
/// `com.example.Outer$Inner` => `com/example/Outer$Inner.class`
pub fn class_file_path(name: &str) -> String {
    format!("{}.class", name.replace(TYPE_SEPARATOR, "/"))
}

/// Class file paths to try for `name`, most likely first.
///
/// Canonical names of nested classes (`com.example.Outer.Inner`) are
/// accepted too: each trailing dot is retried as a nesting separator.
pub fn candidate_paths(name: &str) -> Vec<String> {
    let mut candidates = vec![class_file_path(name)];

    let mut current = name.to_string();
    while let Some(idx) = current.rfind(TYPE_SEPARATOR) {
        let (outer, simple) = (&current[..idx], &current[idx + 1..]);
        // Stop once the remaining prefix no longer looks like a class name
        let outer_simple = outer.rsplit(TYPE_SEPARATOR).next().unwrap_or("");
        if !outer_simple.starts_with(|c: char| c.is_uppercase()) {
            break;
        }
        current = nested_name(outer, simple);
        candidates.push(class_file_path(&current));
    }

    candidates
}

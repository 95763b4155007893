//! Archive path helpers.
//!
//! Index keys use `/` as the only separator, carry no leading, trailing or
//! doubled separators, and the root is the empty string.

/// Path separator used by index keys.
pub const SEPARATOR: char = '/';

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Normalize a record path or a caller query into an index key.
pub fn normalize(path: &str) -> String {
    let mut key = String::with_capacity(path.len());
    for component in path.split(is_separator).filter(|c| !c.is_empty()) {
        if !key.is_empty() {
            key.push(SEPARATOR);
        }
        key.push_str(component);
    }
    key
}

/// Whether a raw record path declares a directory.
pub fn is_dir_marker(path: &str) -> bool {
    path.ends_with(is_separator)
}

/// Parent key of a normalized key; `None` for the root.
pub fn parent(key: &str) -> Option<&str> {
    if key.is_empty() {
        return None;
    }
    Some(key.rfind(SEPARATOR).map_or("", |at| &key[..at]))
}

/// Final component of a normalized key.
pub fn basename(key: &str) -> &str {
    key.rfind(SEPARATOR).map_or(key, |at| &key[at + 1..])
}

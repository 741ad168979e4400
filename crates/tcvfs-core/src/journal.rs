//! Contract between the virtualization core and the sync journal.
//!
//! The journal records explicit pin states and item types per path. Paths
//! are relative to the sync root, `/`-separated, with `""` naming the root.

use crate::error::JournalError;
use crate::types::{HydrationFacts, PinState};

/// Mutable view of the pin-state table, only reachable inside
/// [`SyncJournal::write_pin_states`].
pub trait PinStateWriter {
    /// Drop explicit pin states of `path` and every path below it.
    fn wipe_for_path_and_below(&mut self, path: &str);

    /// Store an explicit pin state for `path`.
    fn set_for_path(&mut self, path: &str, state: PinState);
}

pub trait SyncJournal: Send + Sync {
    /// Apply a batch of pin-state writes as one atomic unit: readers see
    /// either none or all of the changes made by `f`.
    fn write_pin_states(
        &self,
        f: &mut dyn FnMut(&mut dyn PinStateWriter),
    ) -> Result<(), JournalError>;

    /// Explicit pin state of `path` or of its nearest ancestor that has one.
    fn effective_pin_state(&self, path: &str) -> Result<Option<PinState>, JournalError>;

    /// Pin state governing the subtree at `path`: the effective pin state of
    /// `path` itself. Explicit pins further down are not merged in.
    fn effective_pin_state_recursive(&self, path: &str)
        -> Result<Option<PinState>, JournalError>;

    /// Whether hydrated and/or dehydrated files exist at or below `path`.
    fn hydration_facts(&self, path: &str) -> Result<HydrationFacts, JournalError>;
}

/// True if `path` equals `ancestor` or lies below it.
pub fn is_at_or_below(path: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() {
        return true;
    }
    match path.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Parent of a journal path; `None` for the root.
pub fn parent_path(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rfind('/').map_or("", |idx| &path[..idx]))
}

/// Normalize a user-supplied relative path into journal form.
///
/// `\` becomes `/`, and empty and `.` segments are dropped, so `"./a//b/"`
/// becomes `"a/b"`.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// [`normalize_path`], refusing paths that could resolve outside the sync
/// root: `..` segments and segments carrying a drive or stream prefix.
pub fn checked_path(path: &str) -> Result<String, JournalError> {
    let normalized = normalize_path(path);
    if normalized
        .split('/')
        .any(|seg| seg == ".." || seg.contains(':'))
    {
        return Err(JournalError::InvalidPath(path.to_string()));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_or_below() {
        assert!(is_at_or_below("docs", "docs"));
        assert!(is_at_or_below("docs/a.txt", "docs"));
        assert!(is_at_or_below("anything", ""));
        assert!(!is_at_or_below("docs2/a.txt", "docs"));
        assert!(!is_at_or_below("doc", "docs"));
    }

    #[test]
    fn parents() {
        assert_eq!(parent_path("a/b/c"), Some("a/b"));
        assert_eq!(parent_path("a"), Some(""));
        assert_eq!(parent_path(""), None);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_path("./a//b/"), "a/b");
        assert_eq!(normalize_path("a\\b\\c.txt"), "a/b/c.txt");
        assert_eq!(normalize_path("/"), "");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn checked_path_refuses_escapes() {
        assert_eq!(checked_path("/docs/./a.txt").unwrap(), "docs/a.txt");
        assert_eq!(checked_path("..a/b..").unwrap(), "..a/b..");
        for bad in ["../outside.txt", "docs/../../x", "a\\..\\..\\x", "C:/Windows", "docs/C:x"] {
            assert!(
                matches!(checked_path(bad), Err(JournalError::InvalidPath(p)) if p == bad),
                "{bad}"
            );
        }
    }
}

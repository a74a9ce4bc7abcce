//! Dev-server response cache with targeted invalidation.
//!
//! Keys are request paths with any query string excluded; values are final
//! response text. Entries are created on a cache miss after a successful
//! transform and never expire on their own: they are removed only through
//! the two invalidation paths driven by file-change notifications.
//!
//! ## Invalidation
//!
//! - A changed content file removes its exact entry ([`ContentCache::remove`]).
//! - A changed override file removes the one entry belonging to its
//!   sibling content file ([`ContentCache::remove_override_match`]).
//!
//! The store synchronizes internally so concurrent request tasks share a
//! single instance behind `&self`. Two simultaneous misses for one key may
//! both compute and both write; the last write wins, which is harmless
//! because both computed the same text.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Cached dev-server output, owned by the plugin instance and shared by
/// its request tasks. Never touched during a build run.
#[derive(Default)]
pub struct ContentCache {
    entries: Mutex<BTreeMap<String, String>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.lock().unwrap().insert(key.into(), value.into());
    }

    /// Remove the exact entry for a changed content file.
    pub fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    /// Remove the entry served from the content file next to a changed
    /// override file.
    ///
    /// The content-file prefix is the override path with its
    /// `.unified.{js,ts}` suffix stripped. The entry removed is the first
    /// whose key starts with that prefix and whose final path segment
    /// starts with the prefix's final segment. The override convention
    /// maps one override to one content file, so the scan stops at the
    /// first match.
    pub fn remove_override_match(&self, override_path: &str) {
        let prefix = override_path
            .strip_suffix(".unified.js")
            .or_else(|| override_path.strip_suffix(".unified.ts"))
            .unwrap_or(override_path);
        let base = final_segment(prefix);

        let mut entries = self.entries.lock().unwrap();
        let matched = entries
            .keys()
            .find(|key| key.starts_with(prefix) && final_segment(key).starts_with(base))
            .cloned();
        if let Some(key) = matched {
            entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn final_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(entries: &[(&str, &str)]) -> ContentCache {
        let cache = ContentCache::new();
        for (key, value) in entries {
            cache.insert(*key, *value);
        }
        cache
    }

    #[test]
    fn get_returns_inserted_value() {
        let cache = cache_with(&[("/src/pages/test.md", "body")]);
        assert_eq!(cache.get("/src/pages/test.md"), Some("body".to_string()));
        assert_eq!(cache.get("/src/pages/other.md"), None);
    }

    #[test]
    fn insert_overwrites() {
        let cache = cache_with(&[("/a.md", "one")]);
        cache.insert("/a.md", "two");
        assert_eq!(cache.get("/a.md"), Some("two".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_deletes_exact_key_only() {
        let cache = cache_with(&[
            ("/src/pages/test.md", "a"),
            ("/src/pages/test2.md", "b"),
        ]);
        cache.remove("/src/pages/test.md");
        assert_eq!(cache.get("/src/pages/test.md"), None);
        assert_eq!(cache.get("/src/pages/test2.md"), Some("b".to_string()));
    }

    // =========================================================================
    // Override invalidation
    // =========================================================================

    #[test]
    fn override_change_removes_matching_entry() {
        let cache = cache_with(&[
            ("/src/pages/test.md", "a"),
            ("/src/pages/other.md", "b"),
        ]);
        cache.remove_override_match("/src/pages/test.unified.ts");
        assert_eq!(cache.get("/src/pages/test.md"), None);
        assert_eq!(cache.get("/src/pages/other.md"), Some("b".to_string()));
    }

    #[test]
    fn js_suffix_is_stripped_too() {
        let cache = cache_with(&[("/src/pages/test.md", "a")]);
        cache.remove_override_match("/src/pages/test.unified.js");
        assert!(cache.is_empty());
    }

    #[test]
    fn basename_must_match_as_well() {
        // Same directory prefix but a different basename stays untouched.
        let cache = cache_with(&[("/src/pages/nested/test.md", "a")]);
        cache.remove_override_match("/src/pages/test.unified.ts");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn only_the_first_match_is_removed() {
        // Two keys share the prefix and basename prefix; one survives.
        let cache = cache_with(&[
            ("/src/pages/test.md", "a"),
            ("/src/pages/test2.md", "b"),
        ]);
        cache.remove_override_match("/src/pages/test.unified.ts");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn no_match_removes_nothing() {
        let cache = cache_with(&[("/src/pages/test.md", "a")]);
        cache.remove_override_match("/src/pages/missing.unified.ts");
        assert_eq!(cache.len(), 1);
    }
}

//! Content-hash index of files already on disk.
//!
//! The [`HashIndex`] maps a [`ContentHash`] to the first path known to hold
//! that content. It is owned by a single run, grows monotonically, and is
//! seeded either empty or from [`scan_existing_files`].

mod scan;

pub use scan::{DEFAULT_SCAN_WORKERS, ScanError, scan_existing_files};

use std::collections::HashMap;
use std::collections::hash_map::Iter;
use std::path::{Path, PathBuf};

use crate::hash::ContentHash;

/// Mapping from content hash to an on-disk path holding that content.
#[derive(Debug, Clone, Default)]
pub struct HashIndex {
    entries: HashMap<ContentHash, PathBuf>,
}

impl HashIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path recorded for `hash`, if any.
    #[must_use]
    pub fn get(&self, hash: &ContentHash) -> Option<&Path> {
        self.entries.get(hash).map(PathBuf::as_path)
    }

    #[must_use]
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Records `path` for `hash`, returning the previously recorded path.
    ///
    /// Replaces any existing entry. Callers must only insert paths that exist
    /// on disk.
    pub fn insert(&mut self, hash: ContentHash, path: PathBuf) -> Option<PathBuf> {
        self.entries.insert(hash, path)
    }

    /// Records `path` for `hash` unless the hash is already known.
    ///
    /// Returns the path now recorded for `hash`.
    pub fn insert_if_absent(&mut self, hash: ContentHash, path: PathBuf) -> &Path {
        self.entries.entry(hash).or_insert(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, ContentHash, PathBuf> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a HashIndex {
    type Item = (&'a ContentHash, &'a PathBuf);
    type IntoIter = Iter<'a, ContentHash, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_index_is_empty() {
        let index = HashIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut index = HashIndex::new();
        let hash = ContentHash::of_bytes(b"content");
        assert!(index.insert(hash.clone(), PathBuf::from("a.txt")).is_none());
        assert!(index.contains(&hash));
        assert_eq!(index.get(&hash).unwrap(), Path::new("a.txt"));
        assert!(!index.contains(&ContentHash::of_bytes(b"other")));
    }

    #[test]
    fn test_insert_same_hash_replaces_path() {
        let mut index = HashIndex::new();
        let hash = ContentHash::of_bytes(b"content");
        index.insert(hash.clone(), PathBuf::from("a.txt"));
        let previous = index.insert(hash.clone(), PathBuf::from("b.txt"));
        assert_eq!(previous.unwrap(), PathBuf::from("a.txt"));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&hash).unwrap(), Path::new("b.txt"));
    }

    #[test]
    fn test_insert_if_absent_keeps_first_path() {
        let mut index = HashIndex::new();
        let hash = ContentHash::of_bytes(b"content");
        assert_eq!(
            index.insert_if_absent(hash.clone(), PathBuf::from("a.txt")),
            Path::new("a.txt")
        );
        assert_eq!(
            index.insert_if_absent(hash.clone(), PathBuf::from("b.txt")),
            Path::new("a.txt")
        );
        assert_eq!(index.len(), 1);
    }
}

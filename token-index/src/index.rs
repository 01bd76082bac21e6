//! Inverted index from tokens to the files containing them.
//!
//! Each walk task owns one `TokenIndex` and hands it to its parent by value,
//! so the index itself needs no locking. Set semantics per (token, path)
//! are enforced here rather than in the tokenizer.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::tokenizer::Token;

/// Mapping from each token to the set of paths it occurs in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenIndex {
    entries: HashMap<Token, HashSet<PathBuf>>,
}

impl TokenIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a single-file index from the tokens found in `path`.
    pub fn from_file<I>(path: &Path, tokens: I) -> Self
    where
        I: IntoIterator<Item = Token>,
    {
        let mut index = Self::new();
        for token in tokens {
            index.insert(token, path);
        }
        index
    }

    /// Record that `token` occurs in `path`. Returns false if the pair was
    /// already present.
    pub fn insert(&mut self, token: Token, path: &Path) -> bool {
        let paths = self.entries.entry(token).or_default();
        if paths.contains(path) {
            return false;
        }
        paths.insert(path.to_path_buf())
    }

    /// Fold `other` into this index.
    pub fn merge_from(&mut self, other: TokenIndex) {
        for (token, paths) in other.entries {
            match self.entries.entry(token) {
                Entry::Occupied(mut existing) => {
                    let existing = existing.get_mut();
                    if existing.len() < paths.len() {
                        let smaller = std::mem::replace(existing, paths);
                        existing.extend(smaller);
                    } else {
                        existing.extend(paths);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(paths);
                }
            }
        }
    }

    /// Paths containing `token`.
    pub fn get(&self, token: &str) -> Option<&HashSet<PathBuf>> {
        self.entries.get(token)
    }

    /// Whether `token` occurs in `path`.
    pub fn contains(&self, token: &str, path: &Path) -> bool {
        self.get(token).is_some_and(|paths| paths.contains(path))
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct (token, path) pairs.
    pub fn pair_count(&self) -> usize {
        self.entries.values().map(HashSet::len).sum()
    }

    /// Iterate over tokens and their path sets in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Token, &HashSet<PathBuf>)> {
        self.entries.iter()
    }

    /// All tokens, sorted.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut tokens: Vec<&Token> = self.entries.keys().collect();
        tokens.sort();
        tokens
    }

    /// The represented (token, path) set in a canonical order, for comparing
    /// indexes regardless of how they were assembled.
    pub fn pairs(&self) -> BTreeSet<(&str, &Path)> {
        self.entries
            .iter()
            .flat_map(|(token, paths)| {
                paths
                    .iter()
                    .map(move |path| (token.as_str(), path.as_path()))
            })
            .collect()
    }
}

/// Combine two indexes into one holding the union of their (token, path) pairs.
pub fn merge(a: TokenIndex, b: TokenIndex) -> TokenIndex {
    let (mut larger, smaller) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    larger.merge_from(smaller);
    larger
}

impl Serialize for TokenIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for token in self.tokens() {
            let mut paths: Vec<&PathBuf> = self.entries[token].iter().collect();
            paths.sort();
            map.serialize_entry(token, &paths)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_bytes;
    use pretty_assertions::assert_eq;

    fn index(path: &str, content: &str) -> TokenIndex {
        TokenIndex::from_file(Path::new(path), tokenize_bytes(content.as_bytes()))
    }

    #[test]
    fn test_single_file_index_dedupes() {
        let idx = index("a.rs", "foo bar foo foo");
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.pair_count(), 2);
        assert!(idx.contains("foo", Path::new("a.rs")));
        assert!(!idx.contains("baz", Path::new("a.rs")));
    }

    #[test]
    fn test_merge_unions_paths() {
        let merged = merge(index("x/a.txt", "foo bar"), index("y/a.txt", "foo baz"));

        let expected: BTreeSet<(&str, &Path)> = [
            ("bar", Path::new("x/a.txt")),
            ("baz", Path::new("y/a.txt")),
            ("foo", Path::new("x/a.txt")),
            ("foo", Path::new("y/a.txt")),
        ]
        .into_iter()
        .collect();
        assert_eq!(merged.pairs(), expected);
    }

    #[test]
    fn test_merge_with_overlap_keeps_pairs_unique() {
        let merged = merge(index("a.rs", "one two"), index("a.rs", "two three"));
        assert_eq!(merged.pair_count(), 3);
        assert_eq!(merged.get("two").map(HashSet::len), Some(1));
    }

    #[test]
    fn test_merge_is_commutative_and_associative() {
        let a = || merge(index("a", "alpha beta"), index("b", "beta gamma"));
        let b = || index("c", "gamma delta alpha");
        let c = || merge(index("d", "epsilon"), index("a", "zeta alpha"));

        let ab = merge(a(), b());
        let ba = merge(b(), a());
        assert_eq!(ab.pairs(), ba.pairs());

        let left = merge(merge(a(), b()), c());
        let right = merge(a(), merge(b(), c()));
        assert_eq!(left.pairs(), right.pairs());
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let idx = index("a.rs", "keep these tokens");
        assert_eq!(merge(idx.clone(), TokenIndex::new()), idx);
        assert_eq!(merge(TokenIndex::new(), idx.clone()), idx);
    }

    #[test]
    fn test_serializes_sorted() {
        let merged = merge(index("b.rs", "zz aa"), index("a.rs", "aa"));
        let json = serde_json::to_string(&merged).unwrap();
        assert_eq!(json, r#"{"aa":["a.rs","b.rs"],"zz":["b.rs"]}"#);
    }
}

//! Prefix-ordered string-keyed container.
//!
//! Keys are compared byte-wise, so a section key sorts immediately before
//! everything stored below it. Every walk in the assembler relies on that.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::ops::ControlFlow;

/// Ordered map with prefix queries.
#[derive(Debug, Clone)]
pub struct KeyedTree<T> {
    name: &'static str,
    entries: BTreeMap<String, T>,
}

impl<T> KeyedTree<T> {
    /// Create an empty tree. The name is only used in logs.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: BTreeMap::new(),
        }
    }

    /// Tree name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Insert a value, returning the previous one for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Option<T> {
        self.entries.insert(key.into(), value)
    }

    /// Exact lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    /// Exact mutable lookup.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a single key.
    pub fn delete(&mut self, key: &str) -> Option<T> {
        self.entries.remove(key)
    }

    /// Most specific stored key that is a prefix of `key`.
    #[must_use]
    pub fn longest_prefix<'a>(&'a self, key: &str) -> Option<(&'a str, &'a T)> {
        let mut end = key.len();
        loop {
            if key.is_char_boundary(end)
                && let Some((k, v)) = self.entries.get_key_value(&key[..end])
            {
                return Some((k.as_str(), v));
            }
            if end == 0 {
                return None;
            }
            end -= 1;
        }
    }

    /// Iterate over all entries whose key starts with `prefix`, in key order.
    pub fn iter_prefix<'a, 'p>(
        &'a self,
        prefix: &'p str,
    ) -> impl Iterator<Item = (&'a str, &'a T)> {
        self.entries
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Visit entries whose key starts with `prefix` until the visitor breaks.
    ///
    /// Returns `true` if the walk was stopped early.
    pub fn walk_prefix<F>(&self, prefix: &str, mut visit: F) -> bool
    where
        F: FnMut(&str, &T) -> ControlFlow<()>,
    {
        for (k, v) in self.iter_prefix(prefix) {
            if visit(k, v).is_break() {
                return true;
            }
        }
        false
    }

    /// Visit every entry in key order until the visitor breaks.
    pub fn walk<F>(&self, visit: F) -> bool
    where
        F: FnMut(&str, &T) -> ControlFlow<()>,
    {
        self.walk_prefix("", visit)
    }

    /// True if any key other than `prefix` itself starts with `prefix`.
    #[must_use]
    pub fn has_below(&self, prefix: &str) -> bool {
        self.iter_prefix(prefix).any(|(k, _)| k != prefix)
    }

    /// Keys starting with `prefix`, in key order.
    #[must_use]
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.iter_prefix(prefix).map(|(k, _)| k.to_owned()).collect()
    }

    /// Remove every key starting with `prefix`, returning the removed count.
    pub fn delete_prefix(&mut self, prefix: &str) -> usize {
        let keys = self.keys_with_prefix(prefix);
        for key in &keys {
            self.entries.remove(key);
        }
        keys.len()
    }

    /// All keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, T> {
        self.entries.iter()
    }

    /// Iterate mutably over all entries in key order.
    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, T> {
        self.entries.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

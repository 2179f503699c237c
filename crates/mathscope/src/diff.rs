//! Change tracking for the scope's output maps.
//!
//! A [`DiffingMap`] wraps a map for the duration of one mutating call and
//! remembers each key's state the first time it is written. At the end the
//! remembered state is compared with the current one, so the cost is
//! proportional to the keys written, not the size of the map.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Which keys of a map changed during one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diff<K: Ord = String> {
    /// Keys present now that were absent before.
    pub added: BTreeSet<K>,
    /// Keys absent now that were present before.
    pub deleted: BTreeSet<K>,
    /// Keys present before and after whose value changed.
    pub updated: BTreeSet<K>,
}

impl<K: Ord> Default for Diff<K> {
    fn default() -> Self {
        Self {
            added: BTreeSet::new(),
            deleted: BTreeSet::new(),
            updated: BTreeSet::new(),
        }
    }
}

impl<K: Ord + Clone> Diff<K> {
    /// Keys whose presence changed: `added ∪ deleted`.
    pub fn touched(&self) -> BTreeSet<K> {
        self.added.union(&self.deleted).cloned().collect()
    }

    /// Keys that changed in any way.
    pub fn changed(&self) -> BTreeSet<K> {
        let mut all = self.touched();
        all.extend(self.updated.iter().cloned());
        all
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.updated.is_empty()
    }
}

pub struct DiffingMap<'a, K, V> {
    map: &'a mut BTreeMap<K, V>,
    initial: BTreeMap<K, Option<V>>,
}

impl<'a, K: Ord + Clone, V: Clone + PartialEq> DiffingMap<'a, K, V> {
    pub fn new(map: &'a mut BTreeMap<K, V>) -> Self {
        Self {
            map,
            initial: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: K, value: V) {
        self.remember(&key);
        self.map.insert(key, value);
    }

    pub fn delete(&mut self, key: &K) {
        if self.map.contains_key(key) {
            self.remember(key);
            self.map.remove(key);
        }
    }

    fn remember(&mut self, key: &K) {
        if !self.initial.contains_key(key) {
            self.initial.insert(key.clone(), self.map.get(key).cloned());
        }
    }

    /// Compare every written key with its remembered state.
    pub fn into_diff(self) -> Diff<K> {
        let mut diff = Diff::default();
        for (key, before) in self.initial {
            match (before, self.map.get(&key)) {
                (None, Some(_)) => {
                    diff.added.insert(key);
                }
                (Some(_), None) => {
                    diff.deleted.insert(key);
                }
                (Some(before), Some(after)) if before != *after => {
                    diff.updated.insert(key);
                }
                _ => {}
            }
        }
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BTreeMap<String, i32> {
        [("a", 1), ("b", 2)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn keys(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_classifies_changes() {
        let mut map = base();
        let mut diffing = DiffingMap::new(&mut map);
        diffing.set("a".into(), 10);
        diffing.delete(&"b".into());
        diffing.set("c".into(), 3);
        let diff = diffing.into_diff();
        assert_eq!(diff.updated, keys(&["a"]));
        assert_eq!(diff.deleted, keys(&["b"]));
        assert_eq!(diff.added, keys(&["c"]));
        assert_eq!(diff.touched(), keys(&["b", "c"]));
        assert_eq!(map.get("a"), Some(&10));
    }

    #[test]
    fn test_rewriting_same_value_is_not_a_change() {
        let mut map = base();
        let mut diffing = DiffingMap::new(&mut map);
        diffing.set("a".into(), 1);
        diffing.delete(&"b".into());
        diffing.set("b".into(), 2);
        assert!(diffing.into_diff().is_empty());
    }

    #[test]
    fn test_delete_then_add_within_call() {
        let mut map = base();
        let mut diffing = DiffingMap::new(&mut map);
        diffing.delete(&"a".into());
        diffing.set("a".into(), 5);
        diffing.delete(&"missing".into());
        let diff = diffing.into_diff();
        assert_eq!(diff.updated, keys(&["a"]));
        assert!(diff.touched().is_empty());
    }
}

//! `KeySet`: an ordered sequence that behaves as a set keyed by canonical
//! key identity (spec.md §4.A).
//!
//! Backed by a sorted `Vec<Key>` with binary-search insertion, mirroring
//! the teacher's sorted-index-plus-binary-search pattern
//! (`crates/storage/src/index.rs`) generalized from byte-string keys to
//! `Key`'s canonical order.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::namespace::Namespace;
use std::cmp::Ordering;

/// Flags for [`KeySet::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Leave the matching key in the set.
    None,
    /// Remove the matching key from the set and return it.
    Pop,
}

/// An ordered set of keys, iteration order always equal to canonical order.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<Key>,
    /// Set whenever an append/remove mutates the set; cleared explicitly at
    /// the end of a successful `set` (spec.md §4.A).
    sync: bool,
}

impl KeySet {
    pub fn new() -> KeySet {
        KeySet {
            keys: Vec::new(),
            sync: false,
        }
    }

    pub fn with_capacity(cap: usize) -> KeySet {
        KeySet {
            keys: Vec::with_capacity(cap),
            sync: false,
        }
    }

    pub fn from_keys(keys: impl IntoIterator<Item = Key>) -> Result<KeySet> {
        let mut ks = KeySet::new();
        for k in keys {
            ks.append(k)?;
        }
        Ok(ks)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn needs_sync(&self) -> bool {
        self.sync || self.keys.iter().any(Key::needs_sync)
    }

    /// Clear the per-set sync flag. Individual keys' own `needs_sync` flags
    /// are cleared by the caller via `Key::mark_synced` as each commits.
    pub fn clear_sync(&mut self) {
        self.sync = false;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    pub fn as_slice(&self) -> &[Key] {
        &self.keys
    }

    fn binary_search(&self, key: &Key) -> std::result::Result<usize, usize> {
        self.keys.binary_search_by(|probe| probe.identity_cmp(key))
    }

    /// Insert `key`, replacing an existing key of equal identity in place
    /// (the old key's reference is dropped). Rejects a cascading-namespace
    /// key, since a cascading name is a query template and must never be
    /// stored in a set.
    pub fn append(&mut self, key: Key) -> Result<()> {
        if key.namespace() == Namespace::Cascading {
            return Err(Error::Interface(
                "cannot append a cascading-namespace key into a KeySet".into(),
            ));
        }
        match self.binary_search(&key) {
            Ok(idx) => self.keys[idx] = key,
            Err(idx) => self.keys.insert(idx, key),
        }
        self.sync = true;
        Ok(())
    }

    /// Append every key from `other`, preserving order (equal-identity
    /// keys from `other` replace this set's existing entries).
    pub fn append_set(&mut self, other: &KeySet) -> Result<()> {
        for key in other.iter() {
            self.append(key.clone())?;
        }
        Ok(())
    }

    /// Look up by a key's identity, optionally popping it out of the set.
    pub fn lookup(&mut self, key: &Key, mode: LookupMode) -> Option<Key> {
        match self.binary_search(key) {
            Ok(idx) => match mode {
                LookupMode::None => Some(self.keys[idx].clone()),
                LookupMode::Pop => {
                    self.sync = true;
                    Some(self.keys.remove(idx))
                }
            },
            Err(_) => None,
        }
    }

    /// Binary-search for the half-open index range `[start, end)` of keys
    /// equal to `prefix` or below it.
    pub fn find_hierarchy(&self, prefix: &Key) -> (usize, usize) {
        let start = self.keys.partition_point(|k| k.identity_cmp(prefix) == Ordering::Less);
        let end = start
            + self.keys[start..]
                .iter()
                .take_while(|k| k.is_below_or_same(prefix))
                .count();
        (start, end)
    }

    /// Remove and return the maximal contiguous run whose names equal
    /// `prefix` or are below it; the remainder stays ordered.
    pub fn cut(&mut self, prefix: &Key) -> KeySet {
        let (start, end) = self.find_hierarchy(prefix);
        let removed: Vec<Key> = self.keys.drain(start..end).collect();
        if !removed.is_empty() {
            self.sync = true;
        }
        KeySet {
            keys: removed,
            sync: false,
        }
    }

    /// Return a new set of every key equal to `prefix` or below it,
    /// leaving `self` untouched.
    pub fn below(&self, prefix: &Key) -> KeySet {
        let (start, end) = self.find_hierarchy(prefix);
        KeySet {
            keys: self.keys[start..end].to_vec(),
            sync: false,
        }
    }

    /// Rewrite every key's prefix from `from` to `to`. Keys not below
    /// `from` are left untouched. Returns a fresh, re-sorted set.
    pub fn rename(&self, from: &Key, to: &Key) -> Result<KeySet> {
        let mut renamed = KeySet::new();
        for key in &self.keys {
            if key.is_below_or_same(from) {
                let suffix = &key.name().parts()[from.name().parts().len()..];
                let mut new_name = to.name().clone();
                for part in suffix {
                    new_name = new_name.with_part(part.clone());
                }
                let mut moved = key.duplicate(crate::key::DuplicateSelector::All);
                moved.detach();
                moved.set_name(new_name)?;
                renamed.append(moved)?;
            } else {
                renamed.append(key.clone())?;
            }
        }
        Ok(renamed)
    }

    /// Divide `self` among `backend_prefixes`, assigning every key to the
    /// backend with the longest matching prefix. Backends are ranked by
    /// specificity once up front, then each key does a linear scan over
    /// that ranking — O(n*m) in the number of keys and backends, which is
    /// fine since a handle mounts at most a handful of backends.
    ///
    /// Returns one `KeySet` per backend prefix, in the same order as
    /// `backend_prefixes`, plus a leftover set of keys matching none of
    /// them.
    pub fn divide(&self, backend_prefixes: &[Key]) -> (Vec<KeySet>, KeySet) {
        let mut buckets: Vec<KeySet> = backend_prefixes.iter().map(|_| KeySet::new()).collect();
        let mut leftover = KeySet::new();

        // Candidate backends sorted by descending specificity (longest
        // name first) so the first match for a key is the longest prefix.
        let mut order: Vec<usize> = (0..backend_prefixes.len()).collect();
        order.sort_by(|&a, &b| {
            backend_prefixes[b]
                .name()
                .parts()
                .len()
                .cmp(&backend_prefixes[a].name().parts().len())
        });

        for key in &self.keys {
            let mut placed = false;
            for &bi in &order {
                if key.is_below_or_same(&backend_prefixes[bi]) {
                    buckets[bi].append(key.clone()).expect("key already validated");
                    placed = true;
                    break;
                }
            }
            if !placed {
                leftover.append(key.clone()).expect("key already validated");
            }
        }
        (buckets, leftover)
    }

    /// Deep-duplicate: every contained key is duplicated (selector `All`),
    /// producing a set independent of `self`'s key identities. Used by
    /// `set` to isolate in-process state from plugin-applied
    /// transformations (spec.md §4.E.3 step 1).
    pub fn deep_duplicate(&self) -> KeySet {
        KeySet {
            keys: self
                .keys
                .iter()
                .map(|k| k.duplicate(crate::key::DuplicateSelector::All))
                .collect(),
            sync: self.sync,
        }
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;
    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

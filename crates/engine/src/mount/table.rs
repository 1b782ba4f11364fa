//! Mountpoint table (spec.md §4.C): maps key-name prefixes to backend
//! records, held as an ordered index plus a side table of the backend
//! records themselves (a `Backend` carries trait objects and can't live
//! inside a `KeySet` value, which is only ever a string or byte blob).
//!
//! Grounded on the teacher's `crates/engine/src/database/registry.rs`
//! (name -> record table keyed on a path-like prefix).

use kdb_backend::{Backend, Plugin, Phase, ReturnCode};
use kdb_core::{Key, KeySet, Namespace, Result};
use std::collections::HashMap;
use tracing::info;

/// A minimal in-memory stand-in for "a default resolver and a default
/// storage plugin" (spec.md §4.C step 1, §4.C step 6). Concrete storage
/// codecs are explicitly out of scope (spec.md §1); this plugin never
/// touches disk, it only round-trips whatever key set it was last handed
/// through `set`, which is enough to make the hardcoded root mountpoints
/// and the bootstrap backend behave like real backends for the session
/// engine's phase protocol.
pub struct InMemoryStore {
    store: KeySet,
    pending: Option<KeySet>,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore {
            store: KeySet::new(),
            pending: None,
        }
    }

    pub fn seeded(store: KeySet) -> InMemoryStore {
        InMemoryStore {
            store,
            pending: None,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        InMemoryStore::new()
    }
}

impl Plugin for InMemoryStore {
    fn name(&self) -> &str {
        "in-memory-store"
    }

    fn init(&mut self, _definition: &KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        Ok(ReturnCode::Success)
    }

    fn get(&mut self, phase: Phase, ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        match phase {
            Phase::Resolver => Ok(ReturnCode::Success),
            Phase::Storage => {
                ks.append_set(&self.store)?;
                Ok(ReturnCode::Success)
            }
            _ => Ok(ReturnCode::Success),
        }
    }

    fn set(&mut self, phase: Phase, ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        if phase == Phase::Storage {
            self.pending = Some(ks.deep_duplicate());
        }
        Ok(ReturnCode::Success)
    }

    fn commit(&mut self, phase: Phase, _ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        if phase == Phase::Commit {
            if let Some(pending) = self.pending.take() {
                self.store = pending;
            }
        }
        Ok(ReturnCode::Success)
    }

    fn error(&mut self, phase: Phase, _ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        if phase == Phase::Rollback {
            self.pending = None;
        }
        Ok(ReturnCode::Success)
    }
}

/// The mountpoint table: an ordered index of mountpoint prefixes plus the
/// backend record each prefix resolves to.
#[derive(Default)]
pub struct MountpointTable {
    index: KeySet,
    backends: HashMap<String, Backend>,
}

impl MountpointTable {
    pub fn new() -> MountpointTable {
        MountpointTable::default()
    }

    /// Install a parsed or hardcoded backend under its mountpoint prefix.
    pub fn insert(&mut self, backend: Backend) -> Result<()> {
        let key = backend.prefix().duplicate(kdb_core::DuplicateSelector::NameOnly);
        let id = key.name().to_escaped_string();
        self.index.append(key)?;
        self.backends.insert(id, backend);
        Ok(())
    }

    pub fn remove(&mut self, prefix: &Key) -> Option<Backend> {
        let id = prefix.name().to_escaped_string();
        self.index.lookup(prefix, kdb_core::LookupMode::Pop);
        self.backends.remove(&id)
    }

    pub fn backend(&self, prefix: &Key) -> Option<&Backend> {
        self.backends.get(&prefix.name().to_escaped_string())
    }

    pub fn backend_mut(&mut self, prefix: &Key) -> Option<&mut Backend> {
        self.backends.get_mut(&prefix.name().to_escaped_string())
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Every mountpoint installed, in canonical order.
    pub fn mountpoints(&self) -> impl Iterator<Item = &Key> {
        self.index.iter()
    }

    pub fn backends_mut(&mut self) -> impl Iterator<Item = &mut Backend> {
        self.backends.values_mut()
    }

    /// `backends-for-parent(parent)` (spec.md §4.C "Lookup"): the ordered
    /// subset of mountpoints that intersect `parent` — below, equal to,
    /// or an ancestor of it. A cascading `parent` expands to one lookup
    /// per non-meta mountable namespace, mirroring the parent's parts.
    pub fn prefixes_for_parent(&self, parent: &Key) -> Vec<Key> {
        if parent.namespace() == Namespace::Cascading {
            let mut result = Vec::new();
            for ns in Namespace::cascading_targets() {
                let concrete_name =
                    kdb_core::KeyName::from_parts(ns, parent.name().parts().to_vec());
                let concrete = Key::from_name(concrete_name);
                result.extend(self.prefixes_for_parent(&concrete));
            }
            result
        } else {
            self.index
                .iter()
                .filter(|mp| {
                    mp.namespace() == parent.namespace()
                        && (mp.is_below_or_same(parent) || parent.is_below_or_same(mp))
                })
                .cloned()
                .collect()
        }
    }

    /// `system:/elektra/modules`, `system:/elektra/modules/<name>`,
    /// `system:/elektra/version` (spec.md §4.C step 6, supplementing from
    /// `original_source/src/libs/elektra/kdb.c`'s `addHardcodedMountpoints`).
    pub fn introspection_keyset(&self, module_names: &[String]) -> Result<KeySet> {
        let mut ks = KeySet::new();
        ks.append(Key::new("system:/elektra/modules")?)?;
        for name in module_names {
            ks.append(
                Key::builder(&format!("system:/elektra/modules/{name}"))?
                    .value(name.as_str())
                    .build(),
            )?;
        }
        ks.append(
            Key::builder("system:/elektra/version")?
                .value(env!("CARGO_PKG_VERSION"))
                .build(),
        )?;
        Ok(ks)
    }

    /// Add the root mountpoint for each non-meta namespace (spec.md §4.C
    /// step 6: "a root mountpoint per non-meta namespace using the
    /// default resolver+storage").
    pub fn add_hardcoded_mountpoints(&mut self) -> Result<()> {
        for ns in [Namespace::Spec, Namespace::System, Namespace::User, Namespace::Dir] {
            let prefix = Key::from_name(kdb_core::KeyName::from_parts(ns, Vec::new()));
            let name = prefix.name().to_escaped_string();
            if self.backend(&prefix).is_some() {
                continue;
            }
            info!(target: "kdb::mount", mountpoint = %name, "adding hardcoded mountpoint");
            let backend = Backend::new(
                prefix,
                vec![Box::new(InMemoryStore::new())],
                0,
                KeySet::new(),
                name,
            );
            self.insert(backend)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_at(prefix: &str) -> Backend {
        Backend::new(
            Key::new(prefix).unwrap(),
            vec![Box::new(InMemoryStore::new())],
            0,
            KeySet::new(),
            prefix.to_string(),
        )
    }

    #[test]
    fn insert_and_lookup_round_trips() {
        let mut table = MountpointTable::new();
        table.insert(backend_at("user:/app")).unwrap();
        assert!(table.backend(&Key::new("user:/app").unwrap()).is_some());
    }

    #[test]
    fn prefixes_for_parent_selects_ancestors_and_descendants() {
        let mut table = MountpointTable::new();
        table.insert(backend_at("user:/app")).unwrap();
        table.insert(backend_at("user:/app/sub")).unwrap();
        table.insert(backend_at("user:/other")).unwrap();

        let hits = table.prefixes_for_parent(&Key::new("user:/app").unwrap());
        let names: Vec<String> = hits.iter().map(|k| k.name().to_string()).collect();
        assert_eq!(names, vec!["user:/app", "user:/app/sub"]);
    }

    #[test]
    fn cascading_parent_expands_to_mountable_namespaces() {
        let mut table = MountpointTable::new();
        table.insert(backend_at("user:/app")).unwrap();
        table.insert(backend_at("system:/app")).unwrap();
        let hits = table.prefixes_for_parent(&Key::new("/app").unwrap());
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn hardcoded_mountpoints_cover_every_non_meta_namespace() {
        let mut table = MountpointTable::new();
        table.add_hardcoded_mountpoints().unwrap();
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn introspection_keyset_lists_modules_and_version() {
        let table = MountpointTable::new();
        let ks = table
            .introspection_keyset(&["resolver".to_string(), "storage".to_string()])
            .unwrap();
        let names: Vec<String> = ks.iter().map(|k| k.name().to_string()).collect();
        assert!(names.contains(&"system:/elektra/modules/resolver".to_string()));
        assert!(names.contains(&"system:/elektra/version".to_string()));
    }
}

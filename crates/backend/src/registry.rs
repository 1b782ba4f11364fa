//! The backend record (spec.md §3 "Backend record", §4.D): a mountpoint's
//! plugin pipeline plus its private key slice and per-run state.
//!
//! Grounded on the teacher's `PrimitiveRegistry` (`HashMap<id, Arc<dyn
//! Trait>>` with typed lookup), generalized from a keyed lookup table to
//! an ordered `Vec` pipeline, since here plugin *order* is load-bearing
//! (pipeline execution order), not just name-based retrieval.

use crate::plugin::Plugin;
use kdb_core::{Key, KeySet};

/// Per-run bookkeeping the core maintains for a backend (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct BackendMetadata {
    pub mountpoint: String,
    pub resolved_filename: Option<String>,
    pub needs_update: bool,
    pub read_only: bool,
}

/// A mountpoint's plugin pipeline, its private key slice, and its
/// lifecycle flags. Exclusively owns its plugin instances (spec.md §5:
/// "backends own plugins").
pub struct Backend {
    /// The mountpoint's key-name prefix, e.g. `user:/app`.
    pub prefix: Key,
    /// Ordered pipeline; `backend_index` names the slot playing the
    /// "backend plugin" role (the one `init`/resolver/storage are driven
    /// through as the authoritative store).
    plugins: Vec<Box<dyn Plugin>>,
    backend_index: usize,
    /// This backend's definition key set (its mountpoint configuration).
    definition: KeySet,
    /// The backend's private, exclusive view of its slice of keys.
    keys: KeySet,
    pub initialized: bool,
    pub meta: BackendMetadata,
}

impl Backend {
    pub fn new(
        prefix: Key,
        plugins: Vec<Box<dyn Plugin>>,
        backend_index: usize,
        definition: KeySet,
        mountpoint: String,
    ) -> Backend {
        Backend {
            prefix,
            plugins,
            backend_index,
            definition,
            keys: KeySet::new(),
            initialized: false,
            meta: BackendMetadata {
                mountpoint,
                ..Default::default()
            },
        }
    }

    pub fn prefix(&self) -> &Key {
        &self.prefix
    }

    pub fn definition(&self) -> &KeySet {
        &self.definition
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut KeySet {
        &mut self.keys
    }

    pub fn set_keys(&mut self, ks: KeySet) {
        self.keys = ks;
    }

    /// Replace the backend's slice with an empty one, returning the old
    /// contents (used between pre-storage and storage: pre-storage's
    /// output is advisory and discarded, spec.md §4.E.2 step 5).
    pub fn clear_keys(&mut self) -> KeySet {
        std::mem::take(&mut self.keys)
    }

    pub fn backend_plugin(&self) -> &dyn Plugin {
        self.plugins[self.backend_index].as_ref()
    }

    pub fn backend_plugin_mut(&mut self) -> &mut (dyn Plugin + 'static) {
        self.plugins[self.backend_index].as_mut()
    }

    /// Every plugin in pipeline order, front to back.
    pub fn pipeline(&self) -> impl Iterator<Item = &Box<dyn Plugin>> {
        self.plugins.iter()
    }

    pub fn pipeline_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Plugin>> {
        self.plugins.iter_mut()
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

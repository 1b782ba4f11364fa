//! Module registry (spec.md §4.B): maps plugin names to the factories
//! that open instances of them.
//!
//! Dynamic loading from shared objects is explicitly out of scope
//! (spec.md §1); statically linked plugins register a [`PluginFactory`]
//! at process-init time instead (Design Notes §9: "let the loader return
//! a trait object; statically linked plugins register factories at
//! initialization"). Grounded on the teacher's
//! `crates/storage/src/registry.rs` (`HashMap<id, Arc<dyn Trait>>` with
//! typed lookup), keyed here by plugin name instead of a primitive type id.

use kdb_backend::Plugin;
use kdb_core::{metadata, Error, Key, KeySet, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Opens a new instance of one plugin, given its mountpoint-scoped config.
pub trait PluginFactory: Send + Sync {
    fn name(&self) -> &str;
    fn open(&self, config: &KeySet) -> Result<Box<dyn Plugin>>;
}

/// Maps a plugin name to its registered factory. The registry itself
/// never owns plugin *instances* — those are owned by the `Backend`s that
/// opened them (spec.md §3: "backends own plugins").
#[derive(Default)]
pub struct ModuleRegistry {
    factories: HashMap<String, Arc<dyn PluginFactory>>,
}

impl ModuleRegistry {
    pub fn new() -> ModuleRegistry {
        ModuleRegistry {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, factory: Arc<dyn PluginFactory>) {
        self.factories.insert(factory.name().to_string(), factory);
    }

    /// Resolve a plugin name to its factory (the module-load "symbol
    /// resolution" step). Appends a warning onto `error_key` and returns
    /// *InstallationError* on an unknown name, per spec.md §4.B.
    pub fn load(&self, name: &str, error_key: &mut Key) -> Result<Arc<dyn PluginFactory>> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory.clone()),
            None => {
                let err = Error::Installation(format!("no plugin registered under {name:?}"));
                warn!(target: "kdb::modules", plugin = name, "module load failure");
                metadata::append_warning(error_key, &err, Some("modules"))?;
                Err(err)
            }
        }
    }

    /// Open a fresh plugin instance by name with the given config.
    pub fn open(&self, name: &str, config: &KeySet, error_key: &mut Key) -> Result<Box<dyn Plugin>> {
        let factory = self.load(name, error_key)?;
        factory.open(config)
    }

    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tear down the registry. Plugin instances are closed by their
    /// owning backends before this runs (spec.md §4.E.4 close ordering);
    /// this just drops the factory table.
    pub fn close(&mut self) {
        self.factories.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdb_backend::{Phase, ReturnCode};

    struct NoopPlugin;
    impl Plugin for NoopPlugin {
        fn name(&self) -> &str {
            "noop"
        }
    }

    struct NoopFactory;
    impl PluginFactory for NoopFactory {
        fn name(&self) -> &str {
            "noop"
        }
        fn open(&self, _config: &KeySet) -> Result<Box<dyn Plugin>> {
            Ok(Box::new(NoopPlugin))
        }
    }

    #[test]
    fn open_resolves_registered_factory() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(NoopFactory));
        let mut error_key = Key::new("meta:/error").unwrap();
        let mut plugin = registry.open("noop", &KeySet::new(), &mut error_key).unwrap();
        let mut ks = KeySet::new();
        let mut parent = Key::new("user:/app").unwrap();
        assert_eq!(
            plugin.get(Phase::Storage, &mut ks, &mut parent).unwrap(),
            ReturnCode::Success
        );
    }

    #[test]
    fn load_failure_appends_warning_and_errors() {
        let registry = ModuleRegistry::new();
        let mut error_key = Key::new("user:/app").unwrap();
        let result = registry.open("missing", &KeySet::new(), &mut error_key);
        assert!(result.is_err());
        assert!(error_key.meta("meta:/warnings/#0/number").is_some());
    }

    #[test]
    fn registered_names_are_sorted() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(NoopFactory));
        assert_eq!(registry.registered_names(), vec!["noop".to_string()]);
    }
}

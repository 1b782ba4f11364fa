//! Public `Kdb` facade: a thin wrapper over [`kdb_engine::Kdb`] that
//! accepts plain `&str` parent names and keeps a running diagnostics key
//! instead of asking every caller to thread one through.
//!
//! Grounded on the teacher's `FacadeImpl` (`crates/api/src/facade/
//! impl_.rs`): the facade wraps the engine type, supplies sensible
//! defaults (there: a default run id and auto-commit; here: an empty
//! bootstrap and a no-op cache), and only converts errors at the boundary.

use kdb_core::{Key, KeySet};
use kdb_engine::{BootstrapSource, EmptyBootstrapSource, ModuleRegistry, NoCache, PostGetCache, TomlBootstrapSource};
use std::path::Path;
use thiserror::Error;

/// Errors the facade surfaces. Wraps [`kdb_core::Error`] for anything the
/// engine itself reports; [`KdbError::InvalidParent`] is the facade's own
/// addition for the `&str` convenience layer, since a malformed name never
/// reaches `kdb_engine` at all.
#[derive(Debug, Error)]
pub enum KdbError {
    #[error(transparent)]
    Engine(#[from] kdb_core::Error),
    #[error("invalid parent key name {name:?}: {source}")]
    InvalidParent { name: String, source: kdb_core::Error },
}

fn parse_parent(name: &str) -> Result<Key, KdbError> {
    Key::new(name).map_err(|source| KdbError::InvalidParent {
        name: name.to_string(),
        source,
    })
}

/// An open configuration database handle.
pub struct Kdb {
    inner: kdb_engine::Kdb,
    diagnostics: Key,
}

impl Kdb {
    /// Open with no persisted configuration: only the hardcoded per-
    /// namespace mountpoints and the introspection backend are installed
    /// (spec.md §8 S6).
    pub fn open(modules: ModuleRegistry) -> Result<Kdb, KdbError> {
        Kdb::open_with(modules, &EmptyBootstrapSource, Box::new(NoCache), KeySet::new())
    }

    /// Open against a persisted TOML mountpoint configuration (see
    /// [`TomlBootstrapSource`]).
    pub fn open_from_file(modules: ModuleRegistry, path: impl AsRef<Path>) -> Result<Kdb, KdbError> {
        Kdb::open_with(
            modules,
            &TomlBootstrapSource::new(path),
            Box::new(NoCache),
            KeySet::new(),
        )
    }

    /// Open with full control over the bootstrap source, post-get cache,
    /// and contract key set (see [`crate::ContractBuilder`]).
    pub fn open_with(
        modules: ModuleRegistry,
        bootstrap: &dyn BootstrapSource,
        cache: Box<dyn PostGetCache>,
        contract: KeySet,
    ) -> Result<Kdb, KdbError> {
        let mut diagnostics = Key::new("system:/elektra/kdb")?;
        let inner = kdb_engine::Kdb::open(modules, bootstrap, cache, &contract, &mut diagnostics)?;
        Ok(Kdb { inner, diagnostics })
    }

    /// The most recent call's warnings and summary error, if any
    /// (`meta:/error/*`, `meta:/warnings/#N/*`).
    pub fn diagnostics(&self) -> &Key {
        &self.diagnostics
    }

    pub fn get(&mut self, ks: &mut KeySet, parent: &str) -> Result<i8, KdbError> {
        let mut parent_key = parse_parent(parent)?;
        let rc = self.inner.get(ks, &mut parent_key)?;
        self.diagnostics = parent_key;
        Ok(rc)
    }

    pub fn set(&mut self, ks: &mut KeySet, parent: &str) -> Result<i8, KdbError> {
        let mut parent_key = parse_parent(parent)?;
        let rc = self.inner.set(ks, &mut parent_key)?;
        self.diagnostics = parent_key;
        Ok(rc)
    }

    pub fn close(self) -> Result<(), KdbError> {
        let mut error_key = self.diagnostics;
        self.inner.close(&mut error_key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_with_no_config_succeeds() {
        let kdb = Kdb::open(ModuleRegistry::new()).unwrap();
        kdb.close().unwrap();
    }

    #[test]
    fn get_and_set_round_trip_through_facade() {
        let mut kdb = Kdb::open(ModuleRegistry::new()).unwrap();
        let mut ks = KeySet::new();
        assert_eq!(kdb.get(&mut ks, "user:/app").unwrap(), 1);

        ks.append(kdb_core::Key::builder("user:/app/x").unwrap().value("1").build())
            .unwrap();
        assert_eq!(kdb.set(&mut ks, "user:/app").unwrap(), 1);
        kdb.close().unwrap();
    }

    #[test]
    fn invalid_parent_name_is_rejected_before_reaching_the_engine() {
        let mut kdb = Kdb::open(ModuleRegistry::new()).unwrap();
        let mut ks = KeySet::new();
        let err = kdb.get(&mut ks, "not-a-valid-name").unwrap_err();
        assert!(matches!(err, KdbError::InvalidParent { .. }));
    }
}

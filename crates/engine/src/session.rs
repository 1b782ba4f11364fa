//! The `Kdb` session engine (spec.md §4.E): `open`/`get`/`set`/`close`, the
//! handle's state, and the phase-lockstep driver that sits on top of
//! `kdb-backend`'s single-backend dispatch.
//!
//! Grounded on the teacher's `coordinator.rs` (a driver that walks a fixed
//! phase sequence across a set of participants, stopping at the first
//! failure and collecting the rest as warnings during rollback) and
//! `database/mod.rs` (the top-level struct that owns the registry, the
//! mountpoint table, and the public verbs built on top of them).

use crate::cache::{CacheLookup, PostGetCache};
use crate::global::GlobalPlugins;
use crate::modules::ModuleRegistry;
use crate::mount::{self, BootstrapSource, MountpointTable};
use kdb_backend::{
    run_commit, run_get_phase, run_init, run_rollback, run_set_phase, Backend, GlobalPosition,
    GlobalSubposition, Phase, ReturnCode,
};
use kdb_core::{metadata, DuplicateSelector, Error, Key, KeySet, Namespace, Result};

/// Every global position a `mountglobal` contract directive mounts its
/// plugin at (spec.md §4.C step 3: "mounted at every global position").
const ALL_GLOBAL_POSITIONS: [GlobalPosition; 12] = [
    GlobalPosition::PreGetStorage,
    GlobalPosition::ProcGetStorage,
    GlobalPosition::PostGetStorage,
    GlobalPosition::PostGetCleanup,
    GlobalPosition::PreSetStorage,
    GlobalPosition::PreSetCleanup,
    GlobalPosition::PreCommit,
    GlobalPosition::Commit,
    GlobalPosition::PostCommit,
    GlobalPosition::PreRollback,
    GlobalPosition::Rollback,
    GlobalPosition::PostRollback,
];

/// An open session against a mountpoint table (spec.md §3 "KDB handle").
///
/// Owns the module registry, the mountpoint table, the handle-global
/// plugins, the post-get cache, and the handle-wide global key set every
/// plugin call mirrors the active phase onto. There is no separate
/// open/gotten/closed state flag: "has this backend been gotten yet" is
/// the backend's own `initialized` bit, and "is this session closed" is
/// simply whether the handle has been consumed by [`Kdb::close`].
pub struct Kdb {
    modules: ModuleRegistry,
    mountpoints: MountpointTable,
    global_plugins: GlobalPlugins,
    global: parking_lot::RwLock<KeySet>,
    cache: Box<dyn PostGetCache>,
}

fn prefix_name(prefix: &Key) -> String {
    prefix.name().to_string()
}

/// Reconstruct a typed [`Error`] from whatever a plugin left on `parent`'s
/// `meta:/error/*` fields, for the case where it signaled failure via a
/// bare `ReturnCode::Error` instead of a Rust `Err`. Falls back to
/// `PluginMisbehavior` when nothing was written.
fn phase_error(parent: &Key, default_reason: &str) -> Error {
    match parent.meta("meta:/error/number") {
        Some(code) => {
            let reason = parent
                .meta("meta:/error/reason")
                .unwrap_or(default_reason)
                .to_string();
            Error::from_code(code, reason)
        }
        None => Error::PluginMisbehavior(default_reason.to_string()),
    }
}

fn normalize(result: Result<ReturnCode>, parent: &Key) -> Result<ReturnCode> {
    match result {
        Ok(ReturnCode::Error) => Err(phase_error(parent, "plugin returned error")),
        other => other,
    }
}

fn record_warning(parent: &mut Key, err: &Error, module: &str) -> Result<()> {
    metadata::append_warning(parent, err, Some(module))
}

fn finish_with_error(parent: &mut Key, err: &Error, module: &str) -> Result<i8> {
    metadata::set_error(parent, err, Some(module), Some(module))?;
    Ok(-1)
}

/// Demote `err` to a warning and set it as the summary error, in one call —
/// used wherever a phase fails and the current `get`/`set` terminates
/// immediately without a rollback sweep (spec.md §7: "the core demotes its
/// diagnostic to a warning, sets a summary error on parent").
fn fail(parent: &mut Key, err: Error, module: &str) -> Result<i8> {
    record_warning(parent, &err, module)?;
    finish_with_error(parent, &err, module)
}

/// Remove every key below-or-equal each of `prefixes` from `ks`, in
/// preparation for re-appending each backend's final slice (spec.md
/// §4.E.2 step 10, §4.E.3's mirrored publish).
fn cut_publish(ks: &mut KeySet, prefixes: &[Key]) {
    for prefix in prefixes {
        ks.cut(prefix);
    }
}

impl Kdb {
    /// Open a handle against the given module registry and bootstrap
    /// source (spec.md §4.E.1, §4.C).
    ///
    /// Steps, matching spec.md §4.E.1:
    /// 1. Load the persisted `system:/elektra` configuration through
    ///    `bootstrap`.
    /// 2. Process the contract: merge its global keyset entries, and mount
    ///    any `mountglobal` plugins (requires a `list` plugin registered).
    /// 3. Parse the persisted configuration into real backends and install
    ///    them, skipping anything mounted below `system:/elektra` (that
    ///    subtree is reserved for the hardcoded mountpoints below).
    /// 4. Add the hardcoded per-namespace root mountpoints plus the
    ///    introspection backend at `system:/elektra`.
    ///
    /// A failure at any step returns `Err` and drops whatever partial
    /// state had been built — there is no "null handle" to tear down, a
    /// dropped `Kdb`-in-progress releases everything it owns.
    pub fn open(
        modules: ModuleRegistry,
        bootstrap: &dyn BootstrapSource,
        cache: Box<dyn PostGetCache>,
        contract: &KeySet,
        error_key: &mut Key,
    ) -> Result<Kdb> {
        let persisted = bootstrap.load()?;

        let parsed_contract = mount::parse_contract(contract)?;
        let mut global = KeySet::new();
        global.append_set(&parsed_contract.global_keyset)?;

        let mut global_plugins = GlobalPlugins::new();
        if !parsed_contract.mount_global.is_empty() {
            if modules.load("list", error_key).is_err() {
                return Err(Error::Installation(
                    "mountglobal requested but no `list` plugin is registered".into(),
                ));
            }
            for name in &parsed_contract.mount_global {
                let factory = modules.load(name, error_key)?;
                for position in ALL_GLOBAL_POSITIONS {
                    let plugin = factory.open(&KeySet::new())?;
                    global_plugins.mount(position, GlobalSubposition::Foreach, plugin);
                }
            }
        }
        global_plugins.run_init(error_key)?;

        let mut mountpoints = MountpointTable::new();
        let elektra_root = Key::new("system:/elektra")?;
        let backends = mount::mount_backends_from_bootstrap(&modules, &persisted, error_key)?;
        for backend in backends {
            if backend.prefix().is_below_or_same(&elektra_root) {
                let err = Error::Installation(format!(
                    "mountpoint {} below system:/elektra is forbidden",
                    backend.prefix().name()
                ));
                metadata::append_warning(error_key, &err, Some("mount"))?;
                continue;
            }
            mountpoints.insert(backend)?;
        }

        mountpoints.add_hardcoded_mountpoints()?;
        let introspection = mountpoints.introspection_keyset(&modules.registered_names())?;
        mountpoints.insert(Backend::new(
            elektra_root,
            vec![Box::new(mount::InMemoryStore::seeded(introspection))],
            0,
            KeySet::new(),
            "system:/elektra".to_string(),
        ))?;

        Ok(Kdb {
            modules,
            mountpoints,
            global_plugins,
            global: parking_lot::RwLock::new(global),
            cache,
        })
    }

    /// The handle-global key set every plugin call mirrors the active
    /// phase onto (`system:/elektra/kdb/backend/phase`), plus whatever the
    /// contract's `globalkeyset` entries merged in at `open`.
    pub fn global_keyset(&self) -> KeySet {
        self.global.read().clone()
    }

    pub fn mountpoints(&self) -> &MountpointTable {
        &self.mountpoints
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    fn mirror_phase(&self, phase: Phase) {
        let mut g = self.global.write();
        let _ = g.append(
            Key::builder(kdb_backend::PHASE_KEY)
                .expect("PHASE_KEY is a well-formed name")
                .value(phase.as_str())
                .build(),
        );
    }

    fn phase_get(&mut self, prefix: &Key, phase: Phase, parent: &mut Key) -> Result<ReturnCode> {
        self.mirror_phase(phase);
        let backend = self
            .mountpoints
            .backend_mut(prefix)
            .expect("prefix resolves to a live mountpoint");
        normalize(run_get_phase(backend, phase, parent), parent)
    }

    fn phase_set(&mut self, prefix: &Key, phase: Phase, parent: &mut Key) -> Result<ReturnCode> {
        self.mirror_phase(phase);
        let backend = self
            .mountpoints
            .backend_mut(prefix)
            .expect("prefix resolves to a live mountpoint");
        normalize(run_set_phase(backend, phase, parent), parent)
    }

    fn phase_commit(&mut self, prefix: &Key, phase: Phase, parent: &mut Key) -> Result<ReturnCode> {
        self.mirror_phase(phase);
        let backend = self
            .mountpoints
            .backend_mut(prefix)
            .expect("prefix resolves to a live mountpoint");
        normalize(run_commit(backend, phase, parent), parent)
    }

    /// Retrieve configuration under `parent` into `ks` (spec.md §4.E.2).
    ///
    /// Returns `1` if fresh data was read, `0` if nothing needed updating,
    /// `-1` on error (with `meta:/error/*` and `meta:/warnings/*` set on
    /// `parent`).
    pub fn get(&mut self, ks: &mut KeySet, parent: &mut Key) -> Result<i8> {
        if parent.namespace() == Namespace::Meta {
            return Err(Error::Interface(
                "get: parent must not be in the meta namespace".into(),
            ));
        }
        parent.clear_error_and_warnings()?;

        let prefixes = self.mountpoints.prefixes_for_parent(parent);
        if prefixes.is_empty() {
            return Ok(0);
        }

        // Step 1: init, once per backend per handle. A failure here warns
        // and continues (every backend still gets a chance to init), but
        // the overall call fails once the loop is done.
        let mut init_failure: Option<(Error, String)> = None;
        for prefix in &prefixes {
            if self.mountpoints.backend(prefix).unwrap().initialized {
                continue;
            }
            let mountpoint = self.mountpoints.backend(prefix).unwrap().meta.mountpoint.clone();
            let backend = self.mountpoints.backend_mut(prefix).unwrap();
            let outcome = match run_init(backend, parent) {
                Ok(ReturnCode::Error) => Err(phase_error(parent, "init failed")),
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                record_warning(parent, &e, &mountpoint)?;
                if init_failure.is_none() {
                    init_failure = Some((e, mountpoint));
                }
            }
        }
        if let Some((err, module)) = init_failure {
            return finish_with_error(parent, &err, &module);
        }

        // Step 2: resolver phase, decides which backends need updating.
        for prefix in &prefixes {
            match self.phase_get(prefix, Phase::Resolver, parent) {
                Ok(ReturnCode::CacheHit) => {
                    self.mountpoints.backend_mut(prefix).unwrap().meta.needs_update = true;
                }
                Ok(_) => {}
                Err(e) => return fail(parent, e, &prefix_name(prefix)),
            }
        }

        // Step 3: short-circuit when nothing needs updating.
        let active: Vec<Key> = prefixes
            .iter()
            .filter(|p| self.mountpoints.backend(p).unwrap().meta.needs_update)
            .cloned()
            .collect();
        if active.is_empty() {
            return Ok(0);
        }

        // Step 4: optional post-get cache.
        if let CacheLookup::Hit(slice) = self.cache.lookup(parent) {
            cut_publish(ks, &active);
            ks.append_set(&slice)?;
            return Ok(1);
        }

        // Step 5: pre-storage, storage, post-storage, phase-by-phase
        // across every active backend (lock-step: every backend finishes
        // phase P before any backend enters phase P+1).
        for phase in [Phase::PreStorage, Phase::Storage, Phase::PostStorage] {
            for prefix in &active {
                if let Err(e) = self.phase_get(prefix, phase, parent) {
                    return fail(parent, e, &prefix_name(prefix));
                }
            }
        }

        // Step 6: spec post-storage re-run, so spec:/-rooted backends can
        // still see their own derivations after the regular pass.
        for prefix in &active {
            if prefix.namespace() == Namespace::Spec {
                if let Err(e) = self.phase_get(prefix, Phase::PostStorage, parent) {
                    return fail(parent, e, &prefix_name(prefix));
                }
            }
        }

        // Step 7: merge every backend's slice into one working set.
        let mut data_ks = KeySet::new();
        for prefix in &active {
            data_ks.append_set(self.mountpoints.backend(prefix).unwrap().keys())?;
        }

        // Step 8: global procgetstorage + postgetstorage on the merged set.
        self.mirror_phase(Phase::Storage);
        if let Err(e) = self.global_plugins.run(GlobalPosition::ProcGetStorage, &mut data_ks, parent) {
            return fail(parent, e, "global");
        }
        self.mirror_phase(Phase::PostStorage);
        if let Err(e) = self.global_plugins.run(GlobalPosition::PostGetStorage, &mut data_ks, parent) {
            return fail(parent, e, "global");
        }

        // Step 9: divide back per backend for a final post-storage pass,
        // so plugins see the merged, spec-resolved world.
        let (buckets, _leftover) = data_ks.divide(&active);
        for (prefix, bucket) in active.iter().zip(buckets.into_iter()) {
            self.mountpoints.backend_mut(prefix).unwrap().set_keys(bucket);
            if let Err(e) = self.phase_get(prefix, Phase::PostStorage, parent) {
                return fail(parent, e, &prefix_name(prefix));
            }
        }
        let mut cleanup_ks = KeySet::new();
        if let Err(e) = self
            .global_plugins
            .run(GlobalPosition::PostGetCleanup, &mut cleanup_ks, parent)
        {
            return fail(parent, e, "global");
        }

        // Step 10: publish — remove each active backend's previous
        // contribution from the caller's view, then append its final one.
        // The appended keys must land in `ks` already synced: `Key::builder`
        // always hands back a key with `needs_sync` set, and `KeySet::append`
        // marks the whole set dirty again, which would otherwise make a
        // clean `get` look like it still needs a `set` (invariant 6).
        cut_publish(ks, &active);
        for prefix in &active {
            let backend = self.mountpoints.backend(prefix).unwrap();
            self.cache.store(parent, backend.keys());
            for key in backend.keys().iter() {
                let mut fresh = key.duplicate(DuplicateSelector::All);
                fresh.mark_synced()?;
                ks.append(fresh)?;
            }
        }
        ks.clear_sync();

        Ok(1)
    }

    /// Persist `ks` under `parent` (spec.md §4.E.3). Returns `1` on
    /// success, `0` if nothing needed syncing, `-1` on error (or conflict).
    pub fn set(&mut self, ks: &mut KeySet, parent: &mut Key) -> Result<i8> {
        if parent.namespace() == Namespace::Meta {
            return Err(Error::Interface(
                "set: parent must not be in the meta namespace".into(),
            ));
        }
        parent.clear_error_and_warnings()?;

        if !ks.needs_sync() {
            return Ok(0);
        }

        let prefixes = self.mountpoints.prefixes_for_parent(parent);
        if prefixes.is_empty() {
            return Ok(0);
        }

        // Step 1+2+3: divide a deep-duplicated view among backends. The
        // must-have-been-gotten precondition (step 2) only applies to a
        // backend that actually receives keys here — an intersecting
        // backend with an empty bucket (e.g. one of the per-namespace
        // roots a cascading parent expands to, spec.md §4.C "Lookup")
        // must not block the transaction just because it was never the
        // target of a prior `get`. Read-only backends are dropped from
        // the commit set entirely.
        let deep = ks.deep_duplicate();
        let (buckets, _leftover) = deep.divide(&prefixes);
        let mut touched: Vec<Key> = Vec::new();
        for (prefix, bucket) in prefixes.iter().zip(buckets.into_iter()) {
            if bucket.is_empty() {
                continue;
            }
            let backend = self.mountpoints.backend_mut(prefix).unwrap();
            if !backend.initialized {
                let err = Error::Interface(format!(
                    "set: backend {} requires a prior get",
                    backend.meta.mountpoint
                ));
                return fail(parent, err, &backend.meta.mountpoint);
            }
            if backend.meta.read_only {
                continue;
            }
            backend.set_keys(bucket);
            touched.push(prefix.clone());
        }
        if touched.is_empty() {
            return Ok(0);
        }

        // Step 4: global presetstorage — spec metadata injection, run per
        // touched backend against its own assigned bucket.
        for prefix in &touched {
            self.mirror_phase(Phase::PreStorage);
            let mut bucket = self.mountpoints.backend_mut(prefix).unwrap().clear_keys();
            let result = self
                .global_plugins
                .run(GlobalPosition::PreSetStorage, &mut bucket, parent);
            self.mountpoints.backend_mut(prefix).unwrap().set_keys(bucket);
            if let Err(e) = result {
                return self.rollback_and_fail(&touched, e, "global", parent);
            }
        }

        // Step 5: resolver phase, per backend — this is where conflict
        // detection against a concurrent writer happens.
        for prefix in &touched {
            if let Err(e) = self.phase_set(prefix, Phase::Resolver, parent) {
                return self.rollback_and_fail(&touched, e, &prefix_name(prefix), parent);
            }
        }

        // Step 6: pre-storage, storage, post-storage, phase-by-phase
        // across every touched backend.
        for phase in [Phase::PreStorage, Phase::Storage, Phase::PostStorage] {
            for prefix in &touched {
                if let Err(e) = self.phase_set(prefix, phase, parent) {
                    return self.rollback_and_fail(&touched, e, &prefix_name(prefix), parent);
                }
            }
        }

        // Step 7: pre-commit, commit.
        for prefix in &touched {
            if let Err(e) = self.phase_commit(prefix, Phase::PreCommit, parent) {
                return self.rollback_and_fail(&touched, e, &prefix_name(prefix), parent);
            }
        }
        if let Err(e) = self
            .global_plugins
            .run(GlobalPosition::PreCommit, &mut KeySet::new(), parent)
        {
            return self.rollback_and_fail(&touched, e, "global", parent);
        }
        for prefix in &touched {
            if let Err(e) = self.phase_commit(prefix, Phase::Commit, parent) {
                return self.rollback_and_fail(&touched, e, &prefix_name(prefix), parent);
            }
        }
        if let Err(e) = self
            .global_plugins
            .run(GlobalPosition::Commit, &mut KeySet::new(), parent)
        {
            return self.rollback_and_fail(&touched, e, "global", parent);
        }

        // Post-commit: the transaction is already durable, so errors here
        // are demoted to warnings only — no rollback (spec.md §4.E.3
        // step 7).
        for prefix in &touched {
            if let Err(e) = self.phase_commit(prefix, Phase::PostCommit, parent) {
                record_warning(parent, &e, &prefix_name(prefix))?;
            }
        }
        if let Err(e) = self
            .global_plugins
            .run(GlobalPosition::PostCommit, &mut KeySet::new(), parent)
        {
            record_warning(parent, &e, "global")?;
        }

        // Reflect each touched backend's final view back into the
        // caller's key set, then clear every key's sync flag (spec.md §8
        // invariant: "needsSync == false for every key after a successful
        // set").
        cut_publish(ks, &touched);
        for prefix in &touched {
            ks.append_set(self.mountpoints.backend(prefix).unwrap().keys())?;
        }
        let mut synced = KeySet::with_capacity(ks.len());
        for key in ks.iter() {
            let mut fresh = key.duplicate(DuplicateSelector::All);
            fresh.mark_synced()?;
            synced.append(fresh)?;
        }
        synced.clear_sync();
        *ks = synced;

        Ok(1)
    }

    /// Roll back every touched backend (pre-rollback, rollback,
    /// post-rollback, in order) and finish with `err` as the summary
    /// error (spec.md §4.E.3 step 8, §7: "during rollback, all errors are
    /// captured as warnings — rollback never stops early").
    fn rollback_and_fail(&mut self, touched: &[Key], err: Error, module: &str, parent: &mut Key) -> Result<i8> {
        record_warning(parent, &err, module)?;
        for phase in [Phase::PreRollback, Phase::Rollback, Phase::PostRollback] {
            for prefix in touched {
                self.mirror_phase(phase);
                let backend = self
                    .mountpoints
                    .backend_mut(prefix)
                    .expect("touched prefix is a live mountpoint");
                for result in run_rollback(backend, phase, parent) {
                    if let Err(e) = result {
                        record_warning(parent, &e, &prefix_name(prefix))?;
                    }
                }
            }
            let position = match phase {
                Phase::PreRollback => GlobalPosition::PreRollback,
                Phase::Rollback => GlobalPosition::Rollback,
                Phase::PostRollback => GlobalPosition::PostRollback,
                _ => unreachable!("only rollback phases are looped here"),
            };
            if let Err(e) = self.global_plugins.run(position, &mut KeySet::new(), parent) {
                record_warning(parent, &e, "global")?;
            }
        }
        finish_with_error(parent, &err, module)
    }

    /// Close the handle (spec.md §4.E.4): every backend's plugins in
    /// pipeline order, then every global plugin, then the module
    /// registry. Dropping `self` at the end releases the global key set
    /// and the handle itself.
    pub fn close(mut self, error_key: &mut Key) -> Result<()> {
        for backend in self.mountpoints.backends_mut() {
            let mountpoint = backend.meta.mountpoint.clone();
            for plugin in backend.pipeline_mut() {
                if let Err(e) = plugin.close(error_key) {
                    metadata::append_warning(error_key, &e, Some(&mountpoint))?;
                }
            }
        }
        self.global_plugins.close(error_key)?;
        self.modules.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::EmptyBootstrapSource;
    use crate::NoCache;

    #[test]
    fn open_with_empty_config_installs_only_hardcoded_mountpoints() {
        let modules = ModuleRegistry::new();
        let mut error_key = Key::new("user:/app").unwrap();
        let handle = Kdb::open(
            modules,
            &EmptyBootstrapSource,
            Box::new(NoCache),
            &KeySet::new(),
            &mut error_key,
        )
        .unwrap();
        // Spec, System, User, Dir roots plus the system:/elektra backend.
        assert_eq!(handle.mountpoints().len(), 5);
    }

    #[test]
    fn get_on_root_surfaces_introspection_keys_only() {
        let modules = ModuleRegistry::new();
        let mut error_key = Key::new("user:/app").unwrap();
        let mut handle = Kdb::open(
            modules,
            &EmptyBootstrapSource,
            Box::new(NoCache),
            &KeySet::new(),
            &mut error_key,
        )
        .unwrap();
        let mut ks = KeySet::new();
        let mut parent = Key::new("/").unwrap();
        assert_eq!(handle.get(&mut ks, &mut parent).unwrap(), 1);
        let names: Vec<String> = ks.iter().map(|k| k.name().to_string()).collect();
        assert!(names.contains(&"system:/elektra/version".to_string()));
    }

    #[test]
    fn set_without_prior_get_is_rejected() {
        let modules = ModuleRegistry::new();
        let mut error_key = Key::new("user:/app").unwrap();
        let mut handle = Kdb::open(
            modules,
            &EmptyBootstrapSource,
            Box::new(NoCache),
            &KeySet::new(),
            &mut error_key,
        )
        .unwrap();
        let mut ks = KeySet::new();
        ks.append(Key::builder("user:/app/x").unwrap().value("v").build()).unwrap();
        let mut parent = Key::new("user:/app").unwrap();
        let rc = handle.set(&mut ks, &mut parent).unwrap();
        assert_eq!(rc, -1);
        assert_eq!(parent.meta("meta:/error/number"), Some("C01000"));
    }

    #[test]
    fn get_then_set_round_trips_through_hardcoded_mountpoint() {
        let modules = ModuleRegistry::new();
        let mut error_key = Key::new("user:/app").unwrap();
        let mut handle = Kdb::open(
            modules,
            &EmptyBootstrapSource,
            Box::new(NoCache),
            &KeySet::new(),
            &mut error_key,
        )
        .unwrap();
        let mut parent = Key::new("user:/app").unwrap();
        let mut ks = KeySet::new();
        assert_eq!(handle.get(&mut ks, &mut parent).unwrap(), 1);

        ks.append(Key::builder("user:/app/greeting").unwrap().value("hi").build())
            .unwrap();
        assert_eq!(handle.set(&mut ks, &mut parent).unwrap(), 1);
        for key in ks.iter() {
            assert!(!key.needs_sync());
        }

        let mut reread = KeySet::new();
        assert_eq!(handle.get(&mut reread, &mut parent).unwrap(), 1);
        let greeting = reread
            .iter()
            .find(|k| k.name().to_string() == "user:/app/greeting")
            .unwrap();
        assert_eq!(greeting.value().unwrap().as_str(), Some("hi"));
    }

    #[test]
    fn close_is_idempotent_with_no_mounted_plugins_left_open() {
        let modules = ModuleRegistry::new();
        let mut error_key = Key::new("user:/app").unwrap();
        let handle = Kdb::open(
            modules,
            &EmptyBootstrapSource,
            Box::new(NoCache),
            &KeySet::new(),
            &mut error_key,
        )
        .unwrap();
        handle.close(&mut error_key).unwrap();
    }
}

//! Phase-dispatch logic for a [`Backend`] (spec.md §4.D): the four
//! capabilities `init`/`get`/`set`/`commit`/`error`, each driven by a
//! phase tag.
//!
//! Grounded on the teacher's `crates/concurrency/src/transaction.rs`
//! phase-tagged state-machine driver, reapplied here to plugin pipelines
//! instead of MVCC transactions: both are "drive a fixed sequence of
//! named steps across a collection of participants, stop at the first
//! failure" drivers.

use crate::plugin::{Phase, ReturnCode};
use crate::registry::Backend;
use kdb_core::{Error, Key, Result};
use tracing::{debug, warn};

/// Resolver and storage are driven only through the backend's designated
/// "backend plugin" slot — the store of record. Every other phase runs
/// across the whole pipeline in order, since pre/post phases are where
/// logging, validation, and notification plugins hook in.
fn is_backend_plugin_only(phase: Phase) -> bool {
    matches!(phase, Phase::Resolver | Phase::Storage)
}

/// Run `init` once per backend (spec.md §4.E.2 step 1). Must be called
/// before the backend's first `get`.
pub fn run_init(backend: &mut Backend, parent: &mut Key) -> Result<ReturnCode> {
    let definition = backend.definition().clone();
    let rc = backend.backend_plugin_mut().init(&definition, parent)?;
    match rc {
        ReturnCode::NoUpdate => {
            backend.meta.read_only = true;
            backend.initialized = true;
        }
        ReturnCode::Success => {
            backend.initialized = true;
        }
        ReturnCode::Error => {
            warn!(target: "kdb::backend", mountpoint = %backend.meta.mountpoint, "init failed");
        }
        ReturnCode::CacheHit => {
            return Err(Error::PluginMisbehavior(
                "init must not return cache-hit".into(),
            ));
        }
    }
    Ok(rc)
}

/// Run one `get` phase. Every phase but `storage` operates on whatever is
/// already in `backend`'s `keys` slice, so post-storage sees storage's
/// output. `storage` itself always starts from an empty slice, discarding
/// anything pre-storage left behind — that output is advisory only
/// (spec.md §4.E.2 step 5).
pub fn run_get_phase(backend: &mut Backend, phase: Phase, parent: &mut Key) -> Result<ReturnCode> {
    debug!(target: "kdb::backend", mountpoint = %backend.meta.mountpoint, phase = phase.as_str(), "get phase");
    if is_backend_plugin_only(phase) {
        // Storage fully repopulates the slice from the store of record;
        // anything pre-storage left behind is advisory and discarded here
        // rather than reused, per spec.md §4.E.2 step 5.
        let mut ks = if phase == Phase::Storage {
            backend.clear_keys();
            kdb_core::KeySet::new()
        } else {
            backend.clear_keys()
        };
        let rc = backend.backend_plugin_mut().get(phase, &mut ks, parent)?;
        backend.set_keys(ks);
        if phase == Phase::Resolver {
            match rc {
                ReturnCode::Success => backend.meta.needs_update = true,
                ReturnCode::NoUpdate => backend.meta.needs_update = false,
                _ => {}
            }
        }
        Ok(rc)
    } else {
        run_pipeline_get(backend, phase, parent)
    }
}

fn run_pipeline_get(backend: &mut Backend, phase: Phase, parent: &mut Key) -> Result<ReturnCode> {
    let mut ks = backend.clear_keys();
    let mut any_success = false;
    let mut result = ReturnCode::NoUpdate;
    for plugin in backend.pipeline_mut() {
        match plugin.get(phase, &mut ks, parent)? {
            ReturnCode::Error => {
                backend.set_keys(ks);
                return Ok(ReturnCode::Error);
            }
            ReturnCode::Success => any_success = true,
            ReturnCode::NoUpdate => {}
            ReturnCode::CacheHit => {
                return Err(Error::PluginMisbehavior(format!(
                    "{} returned cache-hit outside resolver phase",
                    plugin.name()
                )));
            }
        }
    }
    if any_success {
        result = ReturnCode::Success;
    }
    backend.set_keys(ks);
    Ok(result)
}

/// Run one `set` phase, mirroring [`run_get_phase`]'s dispatch rule.
pub fn run_set_phase(backend: &mut Backend, phase: Phase, parent: &mut Key) -> Result<ReturnCode> {
    debug!(target: "kdb::backend", mountpoint = %backend.meta.mountpoint, phase = phase.as_str(), "set phase");
    if is_backend_plugin_only(phase) {
        let mut ks = if phase == Phase::Storage {
            backend.clear_keys();
            kdb_core::KeySet::new()
        } else {
            backend.clear_keys()
        };
        let rc = backend.backend_plugin_mut().set(phase, &mut ks, parent)?;
        backend.set_keys(ks);
        Ok(rc)
    } else {
        let mut ks = backend.clear_keys();
        let mut any_success = false;
        for plugin in backend.pipeline_mut() {
            match plugin.set(phase, &mut ks, parent)? {
                ReturnCode::Error => {
                    backend.set_keys(ks);
                    return Ok(ReturnCode::Error);
                }
                ReturnCode::Success => any_success = true,
                ReturnCode::NoUpdate => {}
                ReturnCode::CacheHit => {
                    return Err(Error::PluginMisbehavior(format!(
                        "{} returned cache-hit from set",
                        plugin.name()
                    )));
                }
            }
        }
        backend.set_keys(ks);
        Ok(if any_success {
            ReturnCode::Success
        } else {
            ReturnCode::NoUpdate
        })
    }
}

/// Run `commit` across the whole pipeline, in order (spec.md §4.E.3
/// step 7). Stops at the first error.
pub fn run_commit(backend: &mut Backend, phase: Phase, parent: &mut Key) -> Result<ReturnCode> {
    let mut ks = backend.clear_keys();
    let mut rc = ReturnCode::NoUpdate;
    for plugin in backend.pipeline_mut() {
        match plugin.commit(phase, &mut ks, parent)? {
            ReturnCode::Error => {
                backend.set_keys(ks);
                return Ok(ReturnCode::Error);
            }
            ReturnCode::Success => rc = ReturnCode::Success,
            ReturnCode::NoUpdate => {}
            ReturnCode::CacheHit => {
                return Err(Error::PluginMisbehavior(format!(
                    "{} returned cache-hit from commit",
                    plugin.name()
                )));
            }
        }
    }
    backend.set_keys(ks);
    Ok(rc)
}

/// Run `error`/rollback across the whole pipeline. Never fails: every
/// plugin's error is captured as a warning by the caller, per spec.md §7
/// ("during rollback, all errors are captured as warnings").
pub fn run_rollback(backend: &mut Backend, phase: Phase, parent: &mut Key) -> Vec<Result<ReturnCode>> {
    let mut ks = backend.clear_keys();
    let results = backend
        .pipeline_mut()
        .map(|plugin| plugin.error(phase, &mut ks, parent))
        .collect();
    backend.set_keys(ks);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Plugin;
    use kdb_core::KeySet;

    struct AlwaysSuccess;
    impl Plugin for AlwaysSuccess {
        fn name(&self) -> &str {
            "always-success"
        }
        fn get(&mut self, _phase: Phase, ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
            ks.append(Key::new("user:/app/x").unwrap())?;
            Ok(ReturnCode::Success)
        }
        fn init(&mut self, _def: &KeySet, _parent: &mut Key) -> Result<ReturnCode> {
            Ok(ReturnCode::Success)
        }
    }

    struct AlwaysError;
    impl Plugin for AlwaysError {
        fn name(&self) -> &str {
            "always-error"
        }
        fn set(&mut self, _phase: Phase, _ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
            Ok(ReturnCode::Error)
        }
    }

    fn backend_with(plugins: Vec<Box<dyn Plugin>>, backend_index: usize) -> Backend {
        Backend::new(
            Key::new("user:/app").unwrap(),
            plugins,
            backend_index,
            KeySet::new(),
            "user:/app".into(),
        )
    }

    #[test]
    fn init_marks_initialized_on_success() {
        let mut backend = backend_with(vec![Box::new(AlwaysSuccess)], 0);
        let mut parent = Key::new("user:/app").unwrap();
        run_init(&mut backend, &mut parent).unwrap();
        assert!(backend.initialized);
        assert!(!backend.meta.read_only);
    }

    #[test]
    fn resolver_phase_only_calls_backend_plugin() {
        let mut backend = backend_with(vec![Box::new(AlwaysSuccess)], 0);
        let mut parent = Key::new("user:/app").unwrap();
        let rc = run_get_phase(&mut backend, Phase::Resolver, &mut parent).unwrap();
        assert_eq!(rc, ReturnCode::Success);
        assert!(backend.meta.needs_update);
        assert_eq!(backend.keys().len(), 1);
    }

    #[test]
    fn set_phase_stops_at_first_error() {
        let mut backend = backend_with(vec![Box::new(AlwaysSuccess), Box::new(AlwaysError)], 0);
        let mut parent = Key::new("user:/app").unwrap();
        let rc = run_set_phase(&mut backend, Phase::PreStorage, &mut parent).unwrap();
        assert_eq!(rc, ReturnCode::Error);
    }

    #[test]
    fn rollback_never_short_circuits_and_collects_all_results() {
        let mut backend = backend_with(vec![Box::new(AlwaysSuccess), Box::new(AlwaysSuccess)], 0);
        let mut parent = Key::new("user:/app").unwrap();
        let results = run_rollback(&mut backend, Phase::Rollback, &mut parent);
        assert_eq!(results.len(), 2);
    }
}

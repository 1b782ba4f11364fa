//! Integration tests for backend phase dispatch, driven by a scripted
//! `FakePlugin` test double (spec.md §8, §4.D).

use kdb_backend::{run_get_phase, run_init, run_rollback, run_set_phase, Backend, Phase, Plugin, ReturnCode};
use kdb_core::{Key, KeySet, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A plugin whose response to each entry point is scripted up front, and
/// which records every phase it was invoked with for assertions.
struct FakePlugin {
    name: &'static str,
    init_response: ReturnCode,
    get_responses: std::collections::HashMap<&'static str, ReturnCode>,
    set_response: ReturnCode,
    calls: Arc<AtomicUsize>,
}

impl FakePlugin {
    fn new(name: &'static str) -> FakePlugin {
        FakePlugin {
            name,
            init_response: ReturnCode::Success,
            get_responses: std::collections::HashMap::new(),
            set_response: ReturnCode::Success,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_get(mut self, phase: &'static str, rc: ReturnCode) -> Self {
        self.get_responses.insert(phase, rc);
        self
    }

    fn with_set(mut self, rc: ReturnCode) -> Self {
        self.set_response = rc;
        self
    }
}

impl Plugin for FakePlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn init(&mut self, _definition: &KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        Ok(self.init_response)
    }

    fn get(&mut self, phase: Phase, ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rc = *self
            .get_responses
            .get(phase.as_str())
            .unwrap_or(&ReturnCode::Success);
        if rc == ReturnCode::Success {
            ks.append(Key::builder("user:/app/value")
                .unwrap()
                .value(self.name)
                .build())?;
        }
        Ok(rc)
    }

    fn set(&mut self, _phase: Phase, _ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.set_response)
    }

    fn error(&mut self, _phase: Phase, _ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ReturnCode::Success)
    }
}

fn backend_with(plugins: Vec<Box<dyn Plugin>>) -> Backend {
    Backend::new(
        Key::new("user:/app").unwrap(),
        plugins,
        0,
        KeySet::new(),
        "user:/app".into(),
    )
}

#[test]
fn init_no_update_marks_backend_read_only() {
    let mut fake = FakePlugin::new("store");
    fake.init_response = ReturnCode::NoUpdate;
    let mut backend = backend_with(vec![Box::new(fake)]);
    let mut parent = Key::new("user:/app").unwrap();
    run_init(&mut backend, &mut parent).unwrap();
    assert!(backend.initialized);
    assert!(backend.meta.read_only);
}

#[test]
fn get_storage_phase_populates_keys_from_backend_plugin() {
    let fake = FakePlugin::new("store");
    let mut backend = backend_with(vec![Box::new(fake)]);
    let mut parent = Key::new("user:/app").unwrap();
    run_get_phase(&mut backend, Phase::Resolver, &mut parent).unwrap();
    run_get_phase(&mut backend, Phase::Storage, &mut parent).unwrap();
    assert_eq!(backend.keys().len(), 1);
}

/// S5-adjacent: a backend whose storage plugin errors during `set` must
/// report `Error` so the session engine can initiate rollback, without
/// this crate needing to know about the second mountpoint.
#[test]
fn set_storage_error_is_reported_without_partial_commit() {
    let fake = FakePlugin::new("store").with_set(ReturnCode::Error);
    let mut backend = backend_with(vec![Box::new(fake)]);
    let mut parent = Key::new("user:/app").unwrap();
    let rc = run_set_phase(&mut backend, Phase::Storage, &mut parent).unwrap();
    assert_eq!(rc, ReturnCode::Error);
}

#[test]
fn rollback_invokes_every_pipeline_plugin_in_order() {
    let calls_a = Arc::new(AtomicUsize::new(0));
    let calls_b = Arc::new(AtomicUsize::new(0));
    let mut plugin_a = FakePlugin::new("a");
    plugin_a.calls = calls_a.clone();
    let mut plugin_b = FakePlugin::new("b");
    plugin_b.calls = calls_b.clone();
    let mut backend = backend_with(vec![Box::new(plugin_a), Box::new(plugin_b)]);
    let mut parent = Key::new("user:/app").unwrap();
    let results = run_rollback(&mut backend, Phase::Rollback, &mut parent);
    assert_eq!(results.len(), 2);
    assert_eq!(calls_a.load(Ordering::SeqCst), 1);
    assert_eq!(calls_b.load(Ordering::SeqCst), 1);
}

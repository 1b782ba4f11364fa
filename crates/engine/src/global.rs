//! The handle's global plugin table, indexed by (position, subposition)
//! (spec.md §3 "KDB handle").
//!
//! Grounded on the same registry-of-trait-objects shape used throughout
//! this port (`crates/storage/src/registry.rs`), here keyed by the
//! cross-cutting position a plugin was mounted at rather than by name.

use kdb_backend::{GlobalPosition, GlobalSubposition, Phase, Plugin, ReturnCode};
use kdb_core::{Key, KeySet, Result};
use std::collections::{HashMap, HashSet};

struct Slot {
    plugin: Box<dyn Plugin>,
    subposition: GlobalSubposition,
}

/// Whether a position's plugins are driven through `get`, `set`,
/// `commit`, or `error` when the session engine reaches that moment.
enum Dispatch {
    Get,
    Set,
    Commit,
    Error,
}

fn dispatch_for(position: GlobalPosition) -> (Dispatch, Phase) {
    use GlobalPosition::*;
    match position {
        PreGetStorage => (Dispatch::Get, Phase::PreStorage),
        ProcGetStorage => (Dispatch::Get, Phase::Storage),
        PostGetStorage => (Dispatch::Get, Phase::PostStorage),
        PostGetCleanup => (Dispatch::Get, Phase::PostStorage),
        PreSetStorage => (Dispatch::Set, Phase::PreStorage),
        PreSetCleanup => (Dispatch::Set, Phase::PreStorage),
        PreCommit => (Dispatch::Commit, Phase::PreCommit),
        Commit => (Dispatch::Commit, Phase::Commit),
        PostCommit => (Dispatch::Commit, Phase::PostCommit),
        PreRollback => (Dispatch::Error, Phase::PreRollback),
        Rollback => (Dispatch::Error, Phase::Rollback),
        PostRollback => (Dispatch::Error, Phase::PostRollback),
    }
}

/// Plugins mounted at handle-global positions, outside any single
/// backend's pipeline.
#[derive(Default)]
pub struct GlobalPlugins {
    slots: HashMap<GlobalPosition, Vec<Slot>>,
    fired_max_once: HashSet<GlobalPosition>,
}

impl GlobalPlugins {
    pub fn new() -> GlobalPlugins {
        GlobalPlugins::default()
    }

    pub fn mount(&mut self, position: GlobalPosition, subposition: GlobalSubposition, plugin: Box<dyn Plugin>) {
        self.slots.entry(position).or_default().push(Slot { plugin, subposition });
    }

    pub fn is_mounted(&self, position: GlobalPosition) -> bool {
        self.slots.get(&position).is_some_and(|v| !v.is_empty())
    }

    /// Run every `foreach`/eligible `max-once` plugin mounted at
    /// `position` against `ks`, stopping at the first plugin error.
    pub fn run(&mut self, position: GlobalPosition, ks: &mut KeySet, parent: &mut Key) -> Result<()> {
        let (dispatch, phase) = dispatch_for(position);
        let already_fired = self.fired_max_once.contains(&position);
        if let Some(slots) = self.slots.get_mut(&position) {
            for slot in slots.iter_mut() {
                match slot.subposition {
                    GlobalSubposition::Init | GlobalSubposition::Deinit => continue,
                    GlobalSubposition::MaxOnce if already_fired => continue,
                    GlobalSubposition::MaxOnce | GlobalSubposition::Foreach => {}
                }
                let rc = match dispatch {
                    Dispatch::Get => slot.plugin.get(phase, ks, parent)?,
                    Dispatch::Set => slot.plugin.set(phase, ks, parent)?,
                    Dispatch::Commit => slot.plugin.commit(phase, ks, parent)?,
                    Dispatch::Error => slot.plugin.error(phase, ks, parent)?,
                };
                if rc == ReturnCode::Error {
                    self.fired_max_once.insert(position);
                    return Err(kdb_core::Error::PluginMisbehavior(format!(
                        "global plugin at {position:?} returned error"
                    )));
                }
            }
        }
        self.fired_max_once.insert(position);
        Ok(())
    }

    /// Call `open`/`init`-subposition plugins once, at handle `open`.
    pub fn run_init(&mut self, error_key: &mut Key) -> Result<()> {
        for slots in self.slots.values_mut() {
            for slot in slots.iter_mut() {
                if slot.subposition == GlobalSubposition::Init {
                    slot.plugin.open(&KeySet::new(), error_key)?;
                }
            }
        }
        Ok(())
    }

    /// Close every mounted plugin, in position-then-slot order
    /// (spec.md §4.E.4 "then every global plugin").
    pub fn close(&mut self, error_key: &mut Key) -> Result<()> {
        for slots in self.slots.values_mut() {
            for slot in slots.iter_mut() {
                slot.plugin.close(error_key)?;
            }
        }
        self.slots.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingPlugin(std::sync::Arc<std::sync::atomic::AtomicUsize>);
    impl Plugin for CountingPlugin {
        fn name(&self) -> &str {
            "counting"
        }
        fn get(&mut self, _phase: Phase, _ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(ReturnCode::Success)
        }
    }

    #[test]
    fn foreach_plugin_runs_every_call() {
        let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut globals = GlobalPlugins::new();
        globals.mount(
            GlobalPosition::PostGetStorage,
            GlobalSubposition::Foreach,
            Box::new(CountingPlugin(counter.clone())),
        );
        let mut ks = KeySet::new();
        let mut parent = Key::new("user:/app").unwrap();
        globals.run(GlobalPosition::PostGetStorage, &mut ks, &mut parent).unwrap();
        globals.run(GlobalPosition::PostGetStorage, &mut ks, &mut parent).unwrap();
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn max_once_plugin_runs_a_single_time() {
        let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut globals = GlobalPlugins::new();
        globals.mount(
            GlobalPosition::PostGetStorage,
            GlobalSubposition::MaxOnce,
            Box::new(CountingPlugin(counter.clone())),
        );
        let mut ks = KeySet::new();
        let mut parent = Key::new("user:/app").unwrap();
        globals.run(GlobalPosition::PostGetStorage, &mut ks, &mut parent).unwrap();
        globals.run(GlobalPosition::PostGetStorage, &mut ks, &mut parent).unwrap();
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}

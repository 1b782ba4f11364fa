//! The Plugin Interface (spec.md §6): the contract every storage/resolver/
//! validation/notification plugin implements, and the phase tags and
//! return codes that drive it.
//!
//! Design Notes §9 of SPEC_FULL.md suggests representing the phase as a
//! tagged variant "so unrecognized phases are rejected at compile time" —
//! this is exactly what [`Phase`] is. The core still mirrors the active
//! phase onto `system:/elektra/kdb/backend/phase` in the handle's global
//! key set (see `kdb-engine`), matching the wire-level contract described
//! in spec.md §4.D/§6 for plugins that want to introspect it that way, but
//! every call into this crate's [`Plugin`] trait also receives the phase
//! as a typed argument so implementors never need to parse it back out.

use kdb_core::{Key, KeySet, Result};

/// A labeled step in the `get`/`set` protocol (spec.md §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Resolver,
    PreStorage,
    Storage,
    PostStorage,
    PreCommit,
    Commit,
    PostCommit,
    PreRollback,
    Rollback,
    PostRollback,
}

impl Phase {
    /// The string written to `system:/elektra/kdb/backend/phase`.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Resolver => "resolver",
            Phase::PreStorage => "prestorage",
            Phase::Storage => "storage",
            Phase::PostStorage => "poststorage",
            Phase::PreCommit => "precommit",
            Phase::Commit => "commit",
            Phase::PostCommit => "postcommit",
            Phase::PreRollback => "prerollback",
            Phase::Rollback => "rollback",
            Phase::PostRollback => "postrollback",
        }
    }
}

/// The key name the core writes the active phase to before every plugin
/// invocation (spec.md §4.D).
pub const PHASE_KEY: &str = "system:/elektra/kdb/backend/phase";

/// Result of any plugin entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    /// The plugin made progress / has data.
    Success,
    /// The plugin did nothing; the caller should treat this as "unchanged".
    NoUpdate,
    /// The plugin failed; see the error returned alongside.
    Error,
    /// Resolver-only: the post-get cache was valid and should be used.
    CacheHit,
}

impl ReturnCode {
    pub fn is_error(self) -> bool {
        matches!(self, ReturnCode::Error)
    }
}

/// Global position for a cross-cutting plugin (spec.md §3 "KDB handle").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalPosition {
    PreGetStorage,
    ProcGetStorage,
    PostGetStorage,
    PostGetCleanup,
    PreSetStorage,
    PreSetCleanup,
    PreCommit,
    Commit,
    PostCommit,
    PreRollback,
    Rollback,
    PostRollback,
}

/// Global subposition (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalSubposition {
    Init,
    MaxOnce,
    Deinit,
    Foreach,
}

/// A reflective accessor signature used by the `list` plugin to look up
/// another plugin's `mountplugin`/`unmountplugin` functions (spec.md §6).
pub type PluginFn = fn(&mut dyn Plugin, &[&str]) -> Result<()>;

/// The contract every plugin must implement.
///
/// Every entry point returns `Ok(ReturnCode)` on a well-formed (even if
/// unsuccessful) outcome, and `Err` only for conditions the plugin cannot
/// itself express as a `ReturnCode` (e.g. a panic-worthy internal bug it
/// chooses to surface as a hard error instead). In practice almost every
/// plugin should prefer returning `Ok(ReturnCode::Error)` with the reason
/// recorded on `parent`'s metadata, per spec.md §7's propagation policy.
///
/// Default method bodies implement an inert passthrough plugin (useful as
/// a base for plugins that only care about one or two entry points, and
/// for test doubles).
pub trait Plugin: Send + Sync {
    /// Stable plugin name, used for module-registry lookups and error
    /// reporting (`meta:/error/module`).
    fn name(&self) -> &str;

    /// Open the plugin with its mountpoint-scoped configuration.
    fn open(&mut self, _config: &KeySet, _error_key: &mut Key) -> Result<()> {
        Ok(())
    }

    /// Release any resources. Called exactly once per successful `open`.
    fn close(&mut self, _error_key: &mut Key) -> Result<()> {
        Ok(())
    }

    /// Load configuration for the current `phase` into `ks`.
    fn get(&mut self, _phase: Phase, _ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        Ok(ReturnCode::Success)
    }

    /// Persist `ks` for the current `phase`.
    fn set(&mut self, _phase: Phase, _ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        Ok(ReturnCode::Success)
    }

    /// Finalize a transaction (phase is always one of the commit phases).
    fn commit(&mut self, _phase: Phase, _ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        Ok(ReturnCode::Success)
    }

    /// Handle a failure (phase is always one of the rollback phases).
    fn error(&mut self, _phase: Phase, _ks: &mut KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        Ok(ReturnCode::Success)
    }

    /// Called once per backend per handle before the first `get`.
    /// `definition` is the backend's definition key set (its mountpoint
    /// configuration). Returning `NoUpdate` marks the backend read-only.
    fn init(&mut self, _definition: &KeySet, _parent: &mut Key) -> Result<ReturnCode> {
        Ok(ReturnCode::Success)
    }

    /// Reflective accessor used by the `list` plugin for
    /// `mountplugin`/`unmountplugin`. Most plugins have nothing to expose.
    fn get_function(&self, _name: &str) -> Option<PluginFn> {
        None
    }
}

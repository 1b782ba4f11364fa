//! The Plugin Interface and the Backend record (spec.md §6, §4.D).
//!
//! This crate knows nothing about mountpoints, the module registry, or
//! the session engine's multi-backend orchestration — those live in
//! `kdb-engine`. It only defines what a single backend *is* (a pipeline
//! of plugins plus a key slice) and how a single phase call is dispatched
//! across that pipeline.

pub mod backend;
pub mod plugin;
pub mod registry;

pub use backend::{run_commit, run_get_phase, run_init, run_rollback, run_set_phase};
pub use plugin::{GlobalPosition, GlobalSubposition, Phase, Plugin, PluginFn, ReturnCode, PHASE_KEY};
pub use registry::{Backend, BackendMetadata};

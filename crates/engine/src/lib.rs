//! The session engine: module registry, mountpoint table, handle-global
//! plugins, and the `Kdb` handle that drives `open`/`get`/`set`/`close`
//! (spec.md §4.B–§4.E).
//!
//! `kdb-core` knows keys and key sets; `kdb-backend` knows how to dispatch
//! one phase call across one backend's pipeline. This crate is where those
//! pieces become a session: picking which backends a given parent touches,
//! running the phase sequence in lock-step across all of them, and
//! reconciling the result.

pub mod cache;
pub mod global;
pub mod modules;
pub mod mount;
pub mod session;

pub use cache::{CacheLookup, NoCache, PostGetCache};
pub use global::GlobalPlugins;
pub use modules::{ModuleRegistry, PluginFactory};
pub use mount::{
    mount_backends_from_bootstrap, parse_contract, BootstrapSource, Contract, EmptyBootstrapSource,
    InMemoryStore, MountpointTable, TomlBootstrapSource,
};
pub use session::Kdb;

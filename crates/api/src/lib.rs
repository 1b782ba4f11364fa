//! Public facade for the kdb configuration database session engine
//! (spec.md §1 "Public surface"): a thin, ergonomic wrapper over
//! `kdb-engine`'s `Kdb` handle plus a fluent contract builder.
//!
//! `kdb-core` and `kdb-backend` are re-exported so a caller building a
//! plugin never has to depend on them directly.

pub mod contract;
pub mod handle;

pub use contract::ContractBuilder;
pub use handle::{Kdb, KdbError};

pub use kdb_backend::{
    GlobalPosition, GlobalSubposition, Phase, Plugin, PluginFn, ReturnCode, PHASE_KEY,
};
pub use kdb_core::{DuplicateSelector, Error, Key, KeySet, KeyValue, LookupMode, Namespace, Result};
pub use kdb_engine::{ModuleRegistry, PluginFactory, PostGetCache};

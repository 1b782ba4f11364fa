//! # kdb
//!
//! A hierarchical, namespaced configuration database session engine.
//!
//! Applications open a [`Kdb`] handle, fetch a subtree of configuration
//! keys into an in-memory [`KeySet`], optionally modify it, and commit it
//! back. Persistence, syntax, validation and cross-cutting behavior are
//! supplied by [`Plugin`]s composed by mountpoints, each binding a
//! key-name prefix to a pipeline executed through a fixed multi-phase
//! `get`/`set` protocol.
//!
//! # Quick start
//!
//! ```no_run
//! use kdb::{Kdb, KeySet, ModuleRegistry};
//!
//! fn main() -> Result<(), kdb::KdbError> {
//!     let mut db = Kdb::open(ModuleRegistry::new())?;
//!
//!     let mut ks = KeySet::new();
//!     db.get(&mut ks, "user:/app")?;
//!
//!     ks.append(kdb::Key::builder("user:/app/greeting")?.value("hi").build())?;
//!     db.set(&mut ks, "user:/app")?;
//!
//!     db.close()?;
//!     Ok(())
//! }
//! ```
//!
//! Internal crates (`kdb-core`, `kdb-backend`, `kdb-engine`) are not
//! exposed directly; this crate re-exports the stable surface from
//! `kdb-api`, the same way a concrete plugin or application depends on
//! `kdb` alone.

pub use kdb_api::*;

//! Key and KeySet data model for the kdb configuration database.
//!
//! This crate implements spec.md §3–§4.A: the canonical key name and
//! ordering rules, the reference-counted `Key` type, and the ordered
//! `KeySet` container with its append/cut/below/divide algorithms. It has
//! no knowledge of plugins, backends, or the session engine — those live
//! in `kdb-backend` and `kdb-engine`.

pub mod error;
pub mod key;
pub mod keyset;
pub mod metadata;
pub mod name;
pub mod namespace;

pub use error::{Error, Result};
pub use key::{DuplicateSelector, Key, KeyBuilder, KeyValue};
pub use keyset::{KeySet, LookupMode};
pub use name::KeyName;
pub use namespace::Namespace;

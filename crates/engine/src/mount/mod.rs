//! Mountpoint table and contract processing (spec.md §4.C, §6).

pub mod contract;
pub mod table;

pub use contract::{
    mount_backends_from_bootstrap, parse_contract, BootstrapSource, Contract, EmptyBootstrapSource,
    TomlBootstrapSource,
};
pub use table::{InMemoryStore, MountpointTable};

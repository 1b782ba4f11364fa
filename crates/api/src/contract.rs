//! Fluent builder for the `open` contract key set (spec.md §6 "Contract
//! key set").
//!
//! Grounded on the teacher's `DatabaseBuilder` (`crates/engine/src/
//! database/builder.rs`): a small `self`-consuming builder with one
//! terminal method, here `build()` instead of `open()` since constructing
//! the contract key set and opening the handle are two separate steps of
//! `kdb_engine::Kdb::open`.

use kdb_core::{Key, KeySet, Result};

/// Builds the `system:/elektra/contract/…` key set passed to
/// [`kdb_engine::Kdb::open`](kdb_engine::Kdb::open).
#[derive(Debug, Default)]
pub struct ContractBuilder {
    ks: KeySet,
}

impl ContractBuilder {
    pub fn new() -> ContractBuilder {
        ContractBuilder { ks: KeySet::new() }
    }

    /// Merge `name=value` into the handle's global key set at open time
    /// (`system:/elektra/contract/globalkeyset/<name>`).
    pub fn global_key(mut self, name: &str, value: &str) -> Result<ContractBuilder> {
        self.ks.append(
            Key::builder(&format!("system:/elektra/contract/globalkeyset/{name}"))?
                .value(value)
                .build(),
        )?;
        Ok(self)
    }

    /// Request `plugin_name` be mounted at every global position through
    /// the `list` plugin (`system:/elektra/contract/mountglobal/
    /// <pluginName>`).
    pub fn mount_global(mut self, plugin_name: &str) -> Result<ContractBuilder> {
        self.ks.append(Key::new(&format!(
            "system:/elektra/contract/mountglobal/{plugin_name}/ref"
        ))?)?;
        Ok(self)
    }

    pub fn build(self) -> KeySet {
        self.ks
    }
}

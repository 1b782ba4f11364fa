//! Contract processing (spec.md §6 "Contract key set") and the bootstrap
//! source that seeds the mountpoint table's persisted configuration
//! (spec.md §4.C step 1).
//!
//! The bootstrap/persistence format is not specified — concrete storage
//! plugins are out of scope (spec.md §1) — so this crate defines a small
//! `BootstrapSource` trait with one concrete implementation backed by
//! TOML, the same way the teacher's `database/config.rs` deserializes
//! `strata.toml` into a `StrataConfig` with `serde`.

use crate::modules::ModuleRegistry;
use kdb_backend::Backend;
use kdb_core::{Key, KeySet, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Global keys to merge plus global-plugin mount requests parsed out of
/// the contract key set passed to `open` (spec.md §6).
#[derive(Debug, Default)]
pub struct Contract {
    /// Verbatim entries from `system:/elektra/contract/globalkeyset/…`,
    /// renamed onto `system:/elektra/…` for merging into the handle's
    /// global key set.
    pub global_keyset: KeySet,
    /// Plugin names requested (via `system:/elektra/contract/mountglobal/
    /// <pluginName>/…`) to be mounted at every global position through
    /// the `list` plugin.
    pub mount_global: Vec<String>,
}

const GLOBALKEYSET_PREFIX: &str = "system:/elektra/contract/globalkeyset";
const MOUNTGLOBAL_PREFIX: &str = "system:/elektra/contract/mountglobal";

/// Split the contract key set (spec.md §4.C step 3) into the global keys
/// to merge and the plugin names requesting a global mount.
pub fn parse_contract(contract: &KeySet) -> Result<Contract> {
    let globalkeyset_root = Key::new(GLOBALKEYSET_PREFIX)?;
    let target_root = Key::new("system:/elektra")?;
    let under_globalkeyset = contract.below(&globalkeyset_root);
    let global_keyset = under_globalkeyset.rename(&globalkeyset_root, &target_root)?;

    let mountglobal_root = Key::new(MOUNTGLOBAL_PREFIX)?;
    let prefix_len = mountglobal_root.name().parts().len();
    let mut mount_global: Vec<String> = contract
        .below(&mountglobal_root)
        .iter()
        .filter_map(|k| k.name().parts().get(prefix_len).cloned())
        .collect();
    mount_global.sort();
    mount_global.dedup();

    Ok(Contract {
        global_keyset,
        mount_global,
    })
}

/// Loads the persisted contents of `system:/elektra` before the real
/// mountpoint table is parsed (spec.md §4.C steps 1-2: "Open a bootstrap
/// backend … read a well-known on-disk init path").
pub trait BootstrapSource: Send + Sync {
    fn load(&self) -> Result<KeySet>;
}

/// A `BootstrapSource` with no persisted state: `open` proceeds straight
/// to the hardcoded mountpoints. This is the default for a handle with an
/// empty mountpoints configuration (spec.md §8 S6).
pub struct EmptyBootstrapSource;

impl BootstrapSource for EmptyBootstrapSource {
    fn load(&self) -> Result<KeySet> {
        Ok(KeySet::new())
    }
}

#[derive(Debug, Deserialize, Default)]
struct BootstrapFile {
    #[serde(default)]
    mountpoints: BTreeMap<String, MountpointEntry>,
}

#[derive(Debug, Deserialize, Default)]
struct MountpointEntry {
    backend: usize,
    #[serde(default)]
    plugins: Vec<PluginEntry>,
}

#[derive(Debug, Deserialize, Default)]
struct PluginEntry {
    name: String,
    #[serde(default)]
    config: BTreeMap<String, String>,
}

/// Loads `system:/elektra/mountpoints/…` from a TOML file on disk, the
/// smallest faithful stand-in for "a default resolver and a default
/// storage plugin" reading configuration (spec.md §4.C step 1) without
/// shipping a real storage codec.
pub struct TomlBootstrapSource {
    path: std::path::PathBuf,
}

impl TomlBootstrapSource {
    pub fn new(path: impl AsRef<Path>) -> TomlBootstrapSource {
        TomlBootstrapSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl BootstrapSource for TomlBootstrapSource {
    fn load(&self) -> Result<KeySet> {
        if !self.path.exists() {
            return Ok(KeySet::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| kdb_core::Error::Resource(format!("reading {:?}: {e}", self.path)))?;
        let parsed: BootstrapFile = toml::from_str(&contents)
            .map_err(|e| kdb_core::Error::Installation(format!("parsing {:?}: {e}", self.path)))?;

        let mut ks = KeySet::new();
        for (mountpoint_name, entry) in &parsed.mountpoints {
            let escaped = escape_for_embedding(mountpoint_name);
            let base = format!("system:/elektra/mountpoints/{escaped}");
            ks.append(
                Key::builder(&format!("{base}/backend"))?
                    .value(entry.backend.to_string())
                    .build(),
            )?;
            for (i, plugin) in entry.plugins.iter().enumerate() {
                ks.append(
                    Key::builder(&format!("{base}/plugins/#{i}/name"))?
                        .value(plugin.name.as_str())
                        .build(),
                )?;
                for (k, v) in &plugin.config {
                    ks.append(
                        Key::builder(&format!("{base}/plugins/#{i}/config/{k}"))?
                            .value(v.as_str())
                            .build(),
                    )?;
                }
            }
        }
        Ok(ks)
    }
}

fn escape_for_embedding(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('/', "\\/")
}

fn hash_index(token: &str) -> Option<usize> {
    token.strip_prefix('#').and_then(|n| n.parse::<usize>().ok())
}

/// Build one [`Backend`] per mountpoint found under `system:/elektra/
/// mountpoints` in `bootstrap` (the inverse of
/// [`TomlBootstrapSource::load`]'s key layout), opening each listed plugin
/// through `modules` (spec.md §4.C step 2: "for every persisted mountpoint,
/// open its plugins through the module registry").
pub fn mount_backends_from_bootstrap(
    modules: &ModuleRegistry,
    bootstrap: &KeySet,
    error_key: &mut Key,
) -> Result<Vec<Backend>> {
    let mountpoints_root = Key::new("system:/elektra/mountpoints")?;
    let prefix_len = mountpoints_root.name().parts().len();
    let under = bootstrap.below(&mountpoints_root);

    let mut ids: Vec<String> = Vec::new();
    for k in under.iter() {
        if let Some(id) = k.name().parts().get(prefix_len) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
    }

    let mut backends = Vec::new();
    for id in ids {
        let mp_root = Key::builder(&format!("system:/elektra/mountpoints/{id}"))?.build();
        let entries = under.below(&mp_root);

        let backend_index: usize = entries
            .iter()
            .find(|k| k.name().base_name() == Some("backend"))
            .and_then(|k| k.value().and_then(|v| v.as_str()))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let mut plugin_names: BTreeMap<usize, String> = BTreeMap::new();
        let mut plugin_configs: BTreeMap<usize, KeySet> = BTreeMap::new();
        let plugins_root = Key::builder(&format!("system:/elektra/mountpoints/{id}/plugins"))?.build();
        let plugins_prefix_len = plugins_root.name().parts().len();
        for k in entries.below(&plugins_root).iter() {
            let parts = k.name().parts();
            let Some(slot_token) = parts.get(plugins_prefix_len) else { continue };
            let Some(slot) = hash_index(slot_token) else { continue };
            match parts.get(plugins_prefix_len + 1).map(String::as_str) {
                Some("name") => {
                    if let Some(v) = k.value().and_then(|v| v.as_str()) {
                        plugin_names.insert(slot, v.to_string());
                    }
                }
                Some("config") => {
                    let config = plugin_configs.entry(slot).or_insert_with(KeySet::new);
                    config.append(k.duplicate(kdb_core::DuplicateSelector::All))?;
                }
                _ => {}
            }
        }

        if plugin_names.is_empty() {
            continue;
        }

        let mut plugins = Vec::new();
        for (slot, name) in &plugin_names {
            let empty = KeySet::new();
            let config = plugin_configs.get(slot).unwrap_or(&empty);
            plugins.push(modules.open(name, config, error_key)?);
        }

        let raw_name = id.replace("\\/", "/").replace("\\\\", "\\");
        let prefix = Key::new(&raw_name)?;
        backends.push(Backend::new(
            prefix,
            plugins,
            backend_index.min(plugin_names.len().saturating_sub(1)),
            entries.deep_duplicate(),
            raw_name,
        ));
    }
    Ok(backends)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_contract_extracts_global_keyset_and_mount_requests() {
        let mut contract = KeySet::new();
        contract
            .append(
                Key::builder("system:/elektra/contract/globalkeyset/foo")
                    .unwrap()
                    .value("bar")
                    .build(),
            )
            .unwrap();
        contract
            .append(Key::new("system:/elektra/contract/mountglobal/list/ref").unwrap())
            .unwrap();

        let parsed = parse_contract(&contract).unwrap();
        assert_eq!(parsed.mount_global, vec!["list".to_string()]);
        let names: Vec<String> = parsed
            .global_keyset
            .iter()
            .map(|k| k.name().to_string())
            .collect();
        assert_eq!(names, vec!["system:/elektra/foo"]);
    }

    #[test]
    fn empty_bootstrap_source_returns_empty_set() {
        let ks = EmptyBootstrapSource.load().unwrap();
        assert!(ks.is_empty());
    }

    #[test]
    fn toml_bootstrap_source_parses_mountpoints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kdb.toml");
        std::fs::write(
            &path,
            r#"
            [mountpoints."user:/x"]
            backend = 0

            [[mountpoints."user:/x".plugins]]
            name = "storage"
            "#,
        )
        .unwrap();
        let source = TomlBootstrapSource::new(&path);
        let ks = source.load().unwrap();
        let names: Vec<String> = ks.iter().map(|k| k.name().to_string()).collect();
        assert!(names
            .iter()
            .any(|n| n == r"system:/elektra/mountpoints/user:\/x/backend"));
    }

    #[test]
    fn escape_for_embedding_escapes_slashes() {
        assert_eq!(escape_for_embedding("user:/x"), r"user:\/x");
    }
}

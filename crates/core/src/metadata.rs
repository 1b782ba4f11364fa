//! Structured metadata helpers for the reserved `meta:/error/…`,
//! `meta:/warnings/#N/…` and `meta:/internal/…` prefixes (spec.md §3, §6).

use crate::error::{Error, Result};
use crate::key::Key;

/// Write `error` onto `parent`'s `meta:/error/*` fields. `parent` must be
/// uniquely owned and meta-unlocked (call `detach()` first if needed).
pub fn set_error(
    parent: &mut Key,
    error: &Error,
    module: Option<&str>,
    mountpoint: Option<&str>,
) -> Result<()> {
    parent.set_meta("meta:/error/number", error.code())?;
    parent.set_meta("meta:/error/reason", error.reason())?;
    parent.set_meta("meta:/error/description", error.to_string())?;
    if let Some(m) = module {
        parent.set_meta("meta:/error/module", m)?;
    }
    if let Some(mp) = mountpoint {
        parent.set_meta("meta:/error/mountpoint", mp)?;
    }
    Ok(())
}

/// Append a non-fatal diagnostic as `meta:/warnings/#N/*`, where `N` is the
/// next free index (scanning existing `meta:/warnings/#*` entries).
pub fn append_warning(parent: &mut Key, error: &Error, module: Option<&str>) -> Result<()> {
    let next = next_warning_index(parent);
    let prefix = format!("meta:/warnings/#{next}");
    parent.set_meta(format!("{prefix}/number"), error.code())?;
    parent.set_meta(format!("{prefix}/reason"), error.reason())?;
    if let Some(m) = module {
        parent.set_meta(format!("{prefix}/module"), m)?;
    }
    Ok(())
}

fn next_warning_index(parent: &Key) -> usize {
    let prefix = "meta:/warnings/#";
    parent
        .metadata()
        .keys()
        .filter_map(|k| k.strip_prefix(prefix))
        .filter_map(|rest| rest.split('/').next())
        .filter_map(|n| n.parse::<usize>().ok())
        .max()
        .map(|n| n + 1)
        .unwrap_or(0)
}

/// Clear every `meta:/error/*` and `meta:/warnings/*` entry. Thin wrapper
/// kept alongside the other metadata helpers for discoverability; defers
/// to `Key::clear_error_and_warnings`.
pub fn clear(parent: &mut Key) -> crate::error::Result<()> {
    parent.clear_error_and_warnings()
}

/// Read/write helper for the `meta:/internal/*` namespace the core itself
/// uses to stash per-run bookkeeping it must not let plugins see as
/// ordinary metadata (e.g. `meta:/internal/kdbmountpoint`).
pub fn set_internal(key: &mut Key, name: &str, value: impl Into<String>) -> crate::error::Result<()> {
    key.set_meta(format!("meta:/internal/{name}"), value.into())
}

pub fn get_internal<'a>(key: &'a Key, name: &str) -> Option<&'a str> {
    key.meta(&format!("meta:/internal/{name}"))
}

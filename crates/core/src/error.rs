//! Error taxonomy for the kdb configuration database.
//!
//! Mirrors spec.md §7: seven stable error kinds, each exposed on
//! `meta:/error/number` with a stable code such as `C02000` for a
//! conflicting-state detection. `Result<T>` is the crate-wide alias used by
//! every fallible entry point in `kdb-core`, `kdb-backend`, `kdb-engine` and
//! `kdb-api`.

use thiserror::Error;

/// Result type alias for kdb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the kdb session engine and its plugins.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caller contract violation: null/locked key, wrong namespace, `set`
    /// without a prior `get`, etc.
    #[error("interface error: {0}")]
    Interface(String),

    /// Bad mountpoint configuration, missing plugin, version mismatch.
    #[error("installation error: {0}")]
    Installation(String),

    /// I/O, permission, disk-full class failures surfaced by a plugin.
    #[error("resource error: {0}")]
    Resource(String),

    /// The resolver detected a concurrent writer between this session's
    /// last `get` and the current `set` (`C02000`).
    #[error("conflicting state: {0}")]
    ConflictingState(String),

    /// A value or piece of metadata was rejected by a plugin.
    #[error("validation error: {0}")]
    Validation(String),

    /// A plugin returned a result outside its contract (e.g. `cache-hit`
    /// from a non-resolver phase).
    #[error("plugin misbehavior: {0}")]
    PluginMisbehavior(String),

    /// An invariant was violated inside the core itself.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable error-number code exposed on `meta:/error/number`.
    ///
    /// Follows the original implementation's numbering convention:
    /// `C01xxx` interface, `C02xxx` conflict/resource, `C03xxx` validation,
    /// `C04xxx` installation, `C05xxx` plugin/internal.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Interface(_) => "C01000",
            Error::Resource(_) => "C02100",
            Error::ConflictingState(_) => "C02000",
            Error::Validation(_) => "C03000",
            Error::Installation(_) => "C04000",
            Error::PluginMisbehavior(_) => "C05100",
            Error::Internal(_) => "C05000",
        }
    }

    /// Whether the documented recovery is "call `get` and retry `set`".
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ConflictingState(_))
    }

    /// The human-readable reason text, stripped of the kind prefix.
    pub fn reason(&self) -> &str {
        match self {
            Error::Interface(s)
            | Error::Installation(s)
            | Error::Resource(s)
            | Error::ConflictingState(s)
            | Error::Validation(s)
            | Error::PluginMisbehavior(s)
            | Error::Internal(s) => s,
        }
    }

    /// Reconstruct an `Error` from a stable `meta:/error/number` code plus
    /// its reason text — the inverse of [`Error::code`]. Used by the
    /// session engine to turn a plugin-written `meta:/error/*` block back
    /// into a typed error when a plugin signals failure via
    /// `ReturnCode::Error` instead of a Rust `Err`. Unknown codes fall back
    /// to `Internal`.
    pub fn from_code(code: &str, reason: String) -> Error {
        match code {
            "C01000" => Error::Interface(reason),
            "C02100" => Error::Resource(reason),
            "C02000" => Error::ConflictingState(reason),
            "C03000" => Error::Validation(reason),
            "C04000" => Error::Installation(reason),
            "C05100" => Error::PluginMisbehavior(reason),
            _ => Error::Internal(reason),
        }
    }
}

//! Key namespaces and their canonical ordering rank.
//!
//! Per spec: namespace rank is
//! `meta < spec < proc < dir < user < system < default`, with `cascading`
//! (`/`) sorting as a query template that is never itself stored in a
//! key set.

use std::fmt;

/// One of the fixed namespace labels that prefixes a key name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// `meta:/...` — metadata-only namespace, ranks below everything else.
    Meta,
    /// `spec:/...` — specification / schema namespace.
    Spec,
    /// `proc:/...` — process-local, never persisted.
    Proc,
    /// `dir:/...` — directory-local configuration.
    Dir,
    /// `user:/...` — per-user configuration.
    User,
    /// `system:/...` — system-wide configuration.
    System,
    /// `default:/...` — fallback values, ranks highest.
    Default,
    /// `/...` — cascading query namespace; matched against the others, never
    /// stored directly in a `KeySet`.
    Cascading,
}

impl Namespace {
    /// Canonical ordering rank. Lower sorts first.
    ///
    /// `Cascading` has no place in the stored order (a cascading key can
    /// never live in a `KeySet`); it is assigned a rank after `Default` so
    /// that accidental comparisons do not silently alias another namespace.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Namespace::Meta => 0,
            Namespace::Spec => 1,
            Namespace::Proc => 2,
            Namespace::Dir => 3,
            Namespace::User => 4,
            Namespace::System => 5,
            Namespace::Default => 6,
            Namespace::Cascading => 7,
        }
    }

    /// Whether this namespace may be used as a mountpoint root / stored key.
    pub fn is_storable(self) -> bool {
        !matches!(self, Namespace::Cascading)
    }

    /// The canonical name prefix, e.g. `"user"` for [`Namespace::User`].
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Meta => "meta",
            Namespace::Spec => "spec",
            Namespace::Proc => "proc",
            Namespace::Dir => "dir",
            Namespace::User => "user",
            Namespace::System => "system",
            Namespace::Default => "default",
            Namespace::Cascading => "",
        }
    }

    /// Parse a namespace prefix (the part before `:` or the bare `/`).
    pub fn parse(prefix: &str) -> Option<Namespace> {
        match prefix {
            "meta" => Some(Namespace::Meta),
            "spec" => Some(Namespace::Spec),
            "proc" => Some(Namespace::Proc),
            "dir" => Some(Namespace::Dir),
            "user" => Some(Namespace::User),
            "system" => Some(Namespace::System),
            "default" => Some(Namespace::Default),
            "" => Some(Namespace::Cascading),
            _ => None,
        }
    }

    /// All namespaces that a cascading key expands to when resolving
    /// mountpoints, in canonical order. `meta` and `default` are excluded:
    /// cascading lookups only ever touch the mountable namespaces.
    pub fn cascading_targets() -> [Namespace; 4] {
        [
            Namespace::Spec,
            Namespace::Dir,
            Namespace::User,
            Namespace::System,
        ]
    }
}

impl PartialOrd for Namespace {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Namespace {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Namespace::Cascading {
            write!(f, "/")
        } else {
            write!(f, "{}", self.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_order_matches_spec() {
        assert!(Namespace::Meta < Namespace::Spec);
        assert!(Namespace::Spec < Namespace::Proc);
        assert!(Namespace::Proc < Namespace::Dir);
        assert!(Namespace::Dir < Namespace::User);
        assert!(Namespace::User < Namespace::System);
        assert!(Namespace::System < Namespace::Default);
    }

    #[test]
    fn parse_round_trips_as_str() {
        for ns in [
            Namespace::Meta,
            Namespace::Spec,
            Namespace::Proc,
            Namespace::Dir,
            Namespace::User,
            Namespace::System,
            Namespace::Default,
        ] {
            assert_eq!(Namespace::parse(ns.as_str()), Some(ns));
        }
    }

    #[test]
    fn cascading_parses_from_empty_prefix() {
        assert_eq!(Namespace::parse(""), Some(Namespace::Cascading));
        assert!(!Namespace::Cascading.is_storable());
    }

    #[test]
    fn unknown_prefix_rejected() {
        assert_eq!(Namespace::parse("bogus"), None);
    }
}

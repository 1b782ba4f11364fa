//! Key name parsing: namespace + sequence of unescaped name parts.
//!
//! A key name on the wire looks like `user:/a/b/c`: a namespace prefix,
//! a `:` (omitted for the cascading namespace, which is spelled `/a/b/c`),
//! then `/`-separated parts. `\/` escapes a literal slash inside a part;
//! `\\` escapes a literal backslash. Escaping is resolved once, at parse
//! time — everywhere else (ordering, hierarchy tests) operates on the
//! unescaped parts, per spec.md §3.

use crate::error::{Error, Result};
use crate::namespace::Namespace;
use std::fmt;

/// A fully parsed key name: namespace plus unescaped parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyName {
    namespace: Namespace,
    parts: Vec<String>,
}

impl KeyName {
    /// Parse a fully qualified key name such as `"user:/a/b"` or the
    /// cascading form `"/a/b"`.
    pub fn parse(full: &str) -> Result<KeyName> {
        let (prefix, rest) = split_prefix(full)?;
        let namespace = Namespace::parse(prefix)
            .ok_or_else(|| Error::Interface(format!("unknown namespace prefix {prefix:?}")))?;
        let parts = split_unescaped(rest)?;
        Ok(KeyName { namespace, parts })
    }

    /// Build a name directly from a namespace and pre-split parts, skipping
    /// escaping. Used internally by rename/append-part operations.
    pub fn from_parts(namespace: Namespace, parts: Vec<String>) -> KeyName {
        KeyName { namespace, parts }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The last unescaped part, i.e. the key's "base name".
    pub fn base_name(&self) -> Option<&str> {
        self.parts.last().map(String::as_str)
    }

    /// Append a new unescaped part, returning the child name.
    pub fn with_part(mut self, part: impl Into<String>) -> KeyName {
        self.parts.push(part.into());
        self
    }

    /// Remove and return the base name part, if any.
    pub fn pop_part(mut self) -> (KeyName, Option<String>) {
        let popped = self.parts.pop();
        (self, popped)
    }

    /// `true` if `self` is the same key as, or lexically below, `prefix`.
    pub fn is_below_or_same(&self, prefix: &KeyName) -> bool {
        self.namespace == prefix.namespace
            && self.parts.len() >= prefix.parts.len()
            && self.parts[..prefix.parts.len()] == prefix.parts[..]
    }

    /// `true` if `self` is strictly below `prefix` (not equal).
    pub fn is_below(&self, prefix: &KeyName) -> bool {
        self.is_below_or_same(prefix) && self.parts.len() > prefix.parts.len()
    }

    /// `true` if `self` is a direct child of `prefix` (exactly one more part).
    pub fn is_directly_below(&self, prefix: &KeyName) -> bool {
        self.is_below(prefix) && self.parts.len() == prefix.parts.len() + 1
    }

    /// Canonical total order per spec.md §3: namespace rank first, then
    /// part-by-part lexicographic comparison, shorter prefix sorts first.
    pub fn canonical_cmp(&self, other: &KeyName) -> std::cmp::Ordering {
        self.namespace
            .cmp(&other.namespace)
            .then_with(|| self.parts.cmp(&other.parts))
    }

    /// Render back to escaped wire form, e.g. `"user:/a/b"`.
    pub fn to_escaped_string(&self) -> String {
        let mut s = String::new();
        if self.namespace != Namespace::Cascading {
            s.push_str(self.namespace.as_str());
            s.push(':');
        }
        if self.parts.is_empty() {
            s.push('/');
        } else {
            for part in &self.parts {
                s.push('/');
                for ch in part.chars() {
                    if ch == '/' || ch == '\\' {
                        s.push('\\');
                    }
                    s.push(ch);
                }
            }
        }
        s
    }
}

impl PartialOrd for KeyName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.canonical_cmp(other))
    }
}

impl Ord for KeyName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.canonical_cmp(other)
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_escaped_string())
    }
}

fn split_prefix(full: &str) -> Result<(&str, &str)> {
    if let Some(rest) = full.strip_prefix('/') {
        return Ok(("", rest));
    }
    match full.split_once(':') {
        Some((prefix, rest)) => {
            let rest = rest.strip_prefix('/').ok_or_else(|| {
                Error::Interface(format!("key name {full:?} missing '/' after namespace"))
            })?;
            Ok((prefix, rest))
        }
        None => Err(Error::Interface(format!("malformed key name {full:?}"))),
    }
}

/// Split `rest` (the part after the namespace prefix) on unescaped `/`.
fn split_unescaped(rest: &str) -> Result<Vec<String>> {
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped @ ('/' | '\\')) => current.push(escaped),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => return Err(Error::Interface("trailing escape character".into())),
            },
            '/' => {
                parts.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }
    parts.push(current);
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_name() {
        let n = KeyName::parse("user:/a/b/c").unwrap();
        assert_eq!(n.namespace(), Namespace::User);
        assert_eq!(n.parts(), &["a", "b", "c"]);
    }

    #[test]
    fn parses_cascading_name() {
        let n = KeyName::parse("/a/b").unwrap();
        assert_eq!(n.namespace(), Namespace::Cascading);
        assert_eq!(n.parts(), &["a", "b"]);
    }

    #[test]
    fn escaped_slash_stays_in_one_part() {
        let n = KeyName::parse(r"user:/a\/b/c").unwrap();
        assert_eq!(n.parts(), &["a/b", "c"]);
    }

    #[test]
    fn round_trips_through_escaped_string() {
        let n = KeyName::parse(r"user:/a\/b/c").unwrap();
        let again = KeyName::parse(&n.to_escaped_string()).unwrap();
        assert_eq!(n, again);
    }

    #[test]
    fn below_and_directly_below() {
        let parent = KeyName::parse("user:/a").unwrap();
        let child = KeyName::parse("user:/a/b").unwrap();
        let grandchild = KeyName::parse("user:/a/b/c").unwrap();
        assert!(child.is_below(&parent));
        assert!(child.is_directly_below(&parent));
        assert!(grandchild.is_below(&parent));
        assert!(!grandchild.is_directly_below(&parent));
        assert!(parent.is_below_or_same(&parent));
        assert!(!parent.is_below(&parent));
    }

    #[test]
    fn different_namespaces_never_below() {
        let a = KeyName::parse("user:/a").unwrap();
        let b = KeyName::parse("system:/a").unwrap();
        assert!(!a.is_below_or_same(&b));
    }

    #[test]
    fn shorter_prefix_sorts_before_longer() {
        let a = KeyName::parse("user:/a").unwrap();
        let b = KeyName::parse("user:/a/b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn malformed_name_rejected() {
        assert!(KeyName::parse("nonsense").is_err());
        assert!(KeyName::parse("user:noSlash").is_err());
    }
}

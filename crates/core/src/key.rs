//! `Key`: a named, valued, metadata-carrying, reference-counted entity.
//!
//! Ownership-discipline equivalent of Elektra's refcounted `Key*` (per
//! Design Notes §9 of SPEC_FULL.md): `Key` wraps an `Arc<KeyInner>`.
//! Sharing a key (appending it into more than one place) is simply cloning
//! the handle, which is exactly an increffed reference. Mutating methods
//! require the caller to have called [`Key::detach`] first whenever the
//! key might be shared — `detach` clones the inner data only if the
//! strong count is greater than one, mirroring "clone on write only when
//! actually shared".

use crate::error::{Error, Result};
use crate::name::KeyName;
use crate::namespace::Namespace;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A key's value: either a UTF-8 string or an opaque byte blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValue {
    Str(String),
    Binary(Vec<u8>),
}

impl KeyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeyValue::Str(s) => Some(s),
            KeyValue::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            KeyValue::Str(s) => s.as_bytes(),
            KeyValue::Binary(b) => b,
        }
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::Str(s.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        KeyValue::Str(s)
    }
}

impl From<Vec<u8>> for KeyValue {
    fn from(b: Vec<u8>) -> Self {
        KeyValue::Binary(b)
    }
}

/// Which part of a key is locked against mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockKind {
    Name,
    Value,
    Meta,
}

#[derive(Debug, Clone)]
struct KeyInner {
    name: KeyName,
    /// The historical "owner" tag; sorts after the bare name within a
    /// namespace per spec.md §4.A comparison rule.
    owner: Option<String>,
    value: Option<KeyValue>,
    metadata: BTreeMap<String, String>,
    name_locked: bool,
    value_locked: bool,
    meta_locked: bool,
    needs_sync: bool,
}

/// A named, valued, metadata-carrying key.
///
/// Cloning a `Key` is cheap (an `Arc` clone) and models sharing the same
/// underlying key between multiple key sets, exactly as spec.md describes.
#[derive(Debug, Clone)]
pub struct Key(Arc<KeyInner>);

/// Selector for what [`Key::duplicate`] copies from the source key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateSelector {
    NameOnly,
    ValueOnly,
    MetadataOnly,
    All,
}

/// Builder for constructing a [`Key`] with optional value/metadata/owner/locks.
pub struct KeyBuilder {
    name: KeyName,
    owner: Option<String>,
    value: Option<KeyValue>,
    metadata: BTreeMap<String, String>,
    name_locked: bool,
    value_locked: bool,
    meta_locked: bool,
}

impl KeyBuilder {
    fn new(name: KeyName) -> Self {
        KeyBuilder {
            name,
            owner: None,
            value: None,
            metadata: BTreeMap::new(),
            name_locked: false,
            value_locked: false,
            meta_locked: false,
        }
    }

    pub fn value(mut self, value: impl Into<KeyValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn binary(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.value = Some(KeyValue::Binary(bytes.into()));
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn locked_name(mut self) -> Self {
        self.name_locked = true;
        self
    }

    pub fn locked_value(mut self) -> Self {
        self.value_locked = true;
        self
    }

    pub fn locked_meta(mut self) -> Self {
        self.meta_locked = true;
        self
    }

    pub fn build(self) -> Key {
        Key(Arc::new(KeyInner {
            name: self.name,
            owner: self.owner,
            value: self.value,
            metadata: self.metadata,
            name_locked: self.name_locked,
            value_locked: self.value_locked,
            meta_locked: self.meta_locked,
            needs_sync: true,
        }))
    }
}

impl Key {
    /// Create a fresh, uniquely-owned key from a fully qualified name.
    pub fn new(full_name: &str) -> Result<Key> {
        Ok(Self::builder(full_name)?.build())
    }

    /// Start building a key with options (value, metadata, owner, locks).
    pub fn builder(full_name: &str) -> Result<KeyBuilder> {
        Ok(KeyBuilder::new(KeyName::parse(full_name)?))
    }

    /// Build directly from an already-parsed [`KeyName`].
    pub fn from_name(name: KeyName) -> Key {
        KeyBuilder::new(name).build()
    }

    pub fn name(&self) -> &KeyName {
        &self.0.name
    }

    pub fn namespace(&self) -> Namespace {
        self.0.name.namespace()
    }

    pub fn owner(&self) -> Option<&str> {
        self.0.owner.as_deref()
    }

    pub fn base_name(&self) -> Option<&str> {
        self.0.name.base_name()
    }

    pub fn value(&self) -> Option<&KeyValue> {
        self.0.value.as_ref()
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.0.metadata.get(key).map(String::as_str)
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.0.metadata
    }

    pub fn is_name_locked(&self) -> bool {
        self.0.name_locked
    }

    pub fn is_value_locked(&self) -> bool {
        self.0.value_locked
    }

    pub fn is_meta_locked(&self) -> bool {
        self.0.meta_locked
    }

    pub fn needs_sync(&self) -> bool {
        self.0.needs_sync
    }

    /// Number of live handles sharing this key's data (the reference count).
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Ensure this handle uniquely owns its data, cloning if it does not.
    /// Must be called before any mutating method when the key might be
    /// shared; mutating methods themselves only check lock flags and
    /// uniqueness, they never clone on your behalf.
    pub fn detach(&mut self) {
        if Arc::strong_count(&self.0) != 1 {
            self.0 = Arc::new((*self.0).clone());
        }
    }

    fn require_unique_and_unlocked(&self, kind: LockKind) -> Result<()> {
        let locked = match kind {
            LockKind::Name => self.0.name_locked,
            LockKind::Value => self.0.value_locked,
            LockKind::Meta => self.0.meta_locked,
        };
        if locked {
            return Err(Error::Interface(format!(
                "key {} has its {:?} locked",
                self.0.name, kind
            )));
        }
        if Arc::strong_count(&self.0) != 1 {
            return Err(Error::Interface(format!(
                "key {} is shared (refcount {}); call detach() first",
                self.0.name,
                Arc::strong_count(&self.0)
            )));
        }
        Ok(())
    }

    /// Replace this key's name. Rejected for a key whose name is locked.
    /// Setting a cascading name on a key that is to be stored in a
    /// `KeySet` is rejected by `KeySet::append`, not here, since whether a
    /// name is "stored" is a property of the set, not the key.
    pub fn set_name(&mut self, name: KeyName) -> Result<()> {
        self.require_unique_and_unlocked(LockKind::Name)?;
        let inner = Arc::get_mut(&mut self.0).expect("checked unique above");
        inner.name = name;
        inner.needs_sync = true;
        Ok(())
    }

    pub fn append_name_part(&mut self, part: impl Into<String>) -> Result<()> {
        self.require_unique_and_unlocked(LockKind::Name)?;
        let inner = Arc::get_mut(&mut self.0).expect("checked unique above");
        inner.name = inner.name.clone().with_part(part);
        inner.needs_sync = true;
        Ok(())
    }

    pub fn set_value(&mut self, value: impl Into<KeyValue>) -> Result<()> {
        self.require_unique_and_unlocked(LockKind::Value)?;
        let inner = Arc::get_mut(&mut self.0).expect("checked unique above");
        inner.value = Some(value.into());
        inner.needs_sync = true;
        Ok(())
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.require_unique_and_unlocked(LockKind::Meta)?;
        let inner = Arc::get_mut(&mut self.0).expect("checked unique above");
        inner.metadata.insert(key.into(), value.into());
        inner.needs_sync = true;
        Ok(())
    }

    pub fn remove_meta(&mut self, key: &str) -> Result<Option<String>> {
        self.require_unique_and_unlocked(LockKind::Meta)?;
        let inner = Arc::get_mut(&mut self.0).expect("checked unique above");
        let removed = inner.metadata.remove(key);
        if removed.is_some() {
            inner.needs_sync = true;
        }
        Ok(removed)
    }

    /// Clear `meta:/error/*` and `meta:/warnings/*` entries. Called on the
    /// parent key before each `get`/`set`, per spec.md §4.E.2.
    pub fn clear_error_and_warnings(&mut self) -> Result<()> {
        self.require_unique_and_unlocked(LockKind::Meta)?;
        let inner = Arc::get_mut(&mut self.0).expect("checked unique above");
        inner
            .metadata
            .retain(|k, _| !k.starts_with("meta:/error/") && !k.starts_with("meta:/warnings/"));
        Ok(())
    }

    pub fn mark_synced(&mut self) -> Result<()> {
        self.require_unique_and_unlocked(LockKind::Meta)?;
        let inner = Arc::get_mut(&mut self.0).expect("checked unique above");
        inner.needs_sync = false;
        Ok(())
    }

    /// Duplicate this key, copying only the parts the selector names. The
    /// result is a fresh, uniquely-owned key (refcount 1) regardless of
    /// `self`'s sharing state.
    pub fn duplicate(&self, selector: DuplicateSelector) -> Key {
        use DuplicateSelector::*;
        let name = self.0.name.clone();
        match selector {
            NameOnly => Key::from_name(name),
            ValueOnly => {
                let mut b = KeyBuilder::new(name);
                b.value = self.0.value.clone();
                b.build()
            }
            MetadataOnly => {
                let mut b = KeyBuilder::new(name);
                b.metadata = self.0.metadata.clone();
                b.build()
            }
            All => Key(Arc::new((*self.0).clone())),
        }
    }

    /// `true` if `self` is the same canonical identity (namespace + name +
    /// owner tag) as `other` — not the same `Arc` allocation.
    pub fn same_identity(&self, other: &Key) -> bool {
        self.identity_cmp(other) == Ordering::Equal
    }

    /// Canonical comparison used for `KeySet` ordering: namespace rank,
    /// then unescaped name parts, then the owner tag sorts after the bare
    /// name within a namespace.
    pub fn identity_cmp(&self, other: &Key) -> Ordering {
        self.0
            .name
            .canonical_cmp(&other.0.name)
            .then_with(|| self.0.owner.cmp(&other.0.owner))
    }

    pub fn is_below(&self, prefix: &Key) -> bool {
        self.0.name.is_below(&prefix.0.name)
    }

    pub fn is_below_or_same(&self, prefix: &Key) -> bool {
        self.0.name.is_below_or_same(&prefix.0.name)
    }

    pub fn is_directly_below(&self, prefix: &Key) -> bool {
        self.0.name.is_directly_below(&prefix.0.name)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}
impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.identity_cmp(other))
    }
}
impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity_cmp(other)
    }
}

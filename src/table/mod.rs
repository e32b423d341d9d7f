//! Complete finite-domain tables.
//!
//! A [`Table`] maps every key of a declared [`KeyDomain`] to a value. The
//! domain is an ordered list of axes (named enumerations); multi-axis
//! domains span the Cartesian product of their axes. Completeness is a
//! construction invariant: a table either covers the whole domain or it is
//! not a table, so lookups never fail for a well-formed domain key.
//!
//! Values are stored densely in domain enumeration order, which makes
//! iteration order deterministic regardless of how the table was authored.

use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("table is missing keys: [{}]", missing.join(", "))]
    IncompleteTable { missing: Vec<String> },
    #[error("table key '{key}' is outside the declared domain")]
    UnknownTableKey { key: String },
    #[error("malformed table key '{key}': {reason}")]
    KeyNotFound { key: String, reason: String },
    #[error("invalid key domain '{name}': {reason}")]
    InvalidDomain { name: String, reason: String },
}

/// A named, ordered enumeration used as one table-key axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDomain {
    name: String,
    variants: Vec<String>,
}

impl EnumDomain {
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Result<Arc<Self>, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        if variants.is_empty() {
            return Err(TableError::InvalidDomain {
                name,
                reason: "an enumeration needs at least one variant".to_string(),
            });
        }
        for (i, variant) in variants.iter().enumerate() {
            if variants[..i].contains(variant) {
                return Err(TableError::InvalidDomain {
                    name,
                    reason: format!("duplicate variant '{variant}'"),
                });
            }
        }
        Ok(Arc::new(EnumDomain { name, variants }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variants in declared order.
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    fn index_of(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == variant)
    }
}

/// One table key: one variant per domain axis, in axis order.
///
/// The textual encoding is the comma-joined variant sequence, e.g.
/// `launch,safe` for a two-axis key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableKey(SmallVec<[String; 2]>);

impl TableKey {
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TableKey(components.into_iter().map(Into::into).collect())
    }

    pub fn single(component: impl Into<String>) -> Self {
        TableKey::new([component.into()])
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

/// The declared key domain of a table: one or more enumeration axes.
#[derive(Debug, Clone)]
pub struct KeyDomain {
    axes: SmallVec<[Arc<EnumDomain>; 2]>,
}

impl PartialEq for KeyDomain {
    fn eq(&self, other: &Self) -> bool {
        self.axes.len() == other.axes.len()
            && self
                .axes
                .iter()
                .zip(&other.axes)
                .all(|(a, b)| a.as_ref() == b.as_ref())
    }
}

impl Eq for KeyDomain {}

impl KeyDomain {
    pub fn new<I>(axes: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = Arc<EnumDomain>>,
    {
        let axes: SmallVec<[Arc<EnumDomain>; 2]> = axes.into_iter().collect();
        if axes.is_empty() {
            return Err(TableError::InvalidDomain {
                name: "(empty)".to_string(),
                reason: "a key domain needs at least one axis".to_string(),
            });
        }
        Ok(KeyDomain { axes })
    }

    pub fn single(axis: Arc<EnumDomain>) -> Self {
        KeyDomain {
            axes: [axis].into_iter().collect(),
        }
    }

    pub fn axes(&self) -> &[Arc<EnumDomain>] {
        &self.axes
    }

    pub fn arity(&self) -> usize {
        self.axes.len()
    }

    /// Total number of keys (Cartesian product of the axis sizes).
    pub fn len(&self) -> usize {
        self.axes.iter().map(|axis| axis.variants.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        false // every axis has at least one variant
    }

    /// Flat index of `key` in domain enumeration order.
    ///
    /// Fails with [`TableError::KeyNotFound`] when the key is malformed:
    /// wrong arity, or a component outside its axis.
    pub fn index_of(&self, key: &TableKey) -> Result<usize, TableError> {
        if key.arity() != self.arity() {
            return Err(TableError::KeyNotFound {
                key: key.to_string(),
                reason: format!("expected {} component(s), got {}", self.arity(), key.arity()),
            });
        }
        let mut index = 0;
        for (axis, component) in self.axes.iter().zip(key.components()) {
            let position = axis.index_of(component).ok_or_else(|| TableError::KeyNotFound {
                key: key.to_string(),
                reason: format!("'{component}' is not a variant of '{}'", axis.name),
            })?;
            index = index * axis.variants.len() + position;
        }
        Ok(index)
    }

    /// The key at flat `index` in domain enumeration order.
    fn key_at(&self, mut index: usize) -> TableKey {
        let mut components: SmallVec<[String; 2]> = SmallVec::new();
        components.resize(self.arity(), String::new());
        for (slot, axis) in components.iter_mut().zip(&self.axes).rev() {
            let size = axis.variants.len();
            *slot = axis.variants[index % size].clone();
            index /= size;
        }
        TableKey(components)
    }

    /// All keys in declared enumeration order.
    pub fn keys(&self) -> impl Iterator<Item = TableKey> + '_ {
        (0..self.len()).map(|index| self.key_at(index))
    }

    /// Parses a comma-joined key encoding against this domain.
    pub fn parse_key(&self, text: &str) -> Result<TableKey, TableError> {
        let key = TableKey::new(text.split(',').map(str::trim));
        self.index_of(&key)?;
        Ok(key)
    }
}

/// An immutable, complete mapping from domain keys to values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table<V> {
    domain: KeyDomain,
    values: Vec<V>,
}

impl<V> Table<V> {
    /// Builds a table from a complete key-value mapping.
    ///
    /// Every domain key must be present ([`TableError::IncompleteTable`]);
    /// keys outside the domain are rejected
    /// ([`TableError::UnknownTableKey`]). A key supplied twice keeps the
    /// last value, matching plain-map authoring.
    pub fn new<I>(domain: KeyDomain, entries: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (TableKey, V)>,
    {
        let mut slots: Vec<Option<V>> = Vec::new();
        slots.resize_with(domain.len(), || None);
        for (key, value) in entries {
            let index = domain
                .index_of(&key)
                .map_err(|_| TableError::UnknownTableKey {
                    key: key.to_string(),
                })?;
            slots[index] = Some(value);
        }

        let missing: Vec<String> = domain
            .keys()
            .enumerate()
            .filter(|(index, _)| slots[*index].is_none())
            .map(|(_, key)| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(TableError::IncompleteTable { missing });
        }

        Ok(Table {
            domain,
            values: slots.into_iter().map(|slot| slot.unwrap()).collect(),
        })
    }

    /// Builds a table by evaluating `f` for every domain key.
    pub fn from_fn(domain: KeyDomain, mut f: impl FnMut(&TableKey) -> V) -> Self {
        let values = domain.keys().map(|key| f(&key)).collect();
        Table { domain, values }
    }

    pub fn domain(&self) -> &KeyDomain {
        &self.domain
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        false // completeness over a non-empty domain
    }

    /// Looks up one entry. Completeness is enforced at construction, so
    /// this fails only for malformed keys, never for missing ones.
    pub fn get(&self, key: &TableKey) -> Result<&V, TableError> {
        let index = self.domain.index_of(key)?;
        Ok(&self.values[index])
    }

    /// Maps values into a new table over the same domain.
    pub fn map<V2>(&self, mut f: impl FnMut(&TableKey, &V) -> V2) -> Table<V2> {
        let values = self
            .domain
            .keys()
            .zip(&self.values)
            .map(|(key, value)| f(&key, value))
            .collect();
        Table {
            domain: self.domain.clone(),
            values,
        }
    }

    /// Entries in domain enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (TableKey, &V)> + '_ {
        self.domain.keys().zip(self.values.iter())
    }
}

impl<V: Serialize> Serialize for Table<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

//! Immutable property trees built from flat, dot-keyed input
//!
//! Input properties arrive as a flat mapping such as:
//!
//! ```text
//! .properties.system_blobstore                       = "external"
//! .properties.system_blobstore.external.versioning   = true
//! .properties.system_blobstore.external.secret_key   = { secret: "..." }
//! ```
//!
//! [`PropertyTree::build`] expands the dotted keys into nested mappings. A
//! single leading `.` is stripped. A scalar assigned to a node that also has
//! dotted children is a *selector*: its value is kept under
//! [`SELECTED_OPTION_KEY`] and read back with [`PropertyTree::selection`].

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::path;
use crate::value::PropertyValue;

/// Key under which a selector node records its chosen option
pub const SELECTED_OPTION_KEY: &str = "selected_option";

/// How [`PropertyTree::merge`] treats leaves present on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverridePolicy {
    /// The other tree's leaves replace this tree's leaves
    #[default]
    Override,
    /// This tree's leaves are kept; the other tree only fills gaps
    Preserve,
}

/// What an input key assigned to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assigned {
    Scalar,
    Compound,
}

/// A nested, path-addressable set of configuration values.
///
/// The root is always a mapping. Trees are immutable: [`merge`](Self::merge)
/// returns a new tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PropertyTree {
    root: PropertyValue,
    #[serde(skip)]
    keys: Vec<String>,
}

impl Default for PropertyTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl PropertyTree {
    /// A tree with no properties.
    pub fn empty() -> Self {
        Self {
            root: PropertyValue::empty_mapping(),
            keys: Vec::new(),
        }
    }

    /// Wrap an existing mapping value as a tree.
    ///
    /// Fails if `root` is not a mapping.
    pub fn from_value(root: PropertyValue) -> Result<Self> {
        match root {
            PropertyValue::Mapping(_) => Ok(Self {
                root,
                keys: Vec::new(),
            }),
            other => Err(Error::InvalidValue {
                message: format!("tree root must be a mapping, got {}", other.type_name()),
            }),
        }
    }

    /// Expand flat dotted keys into a nested tree.
    ///
    /// The result never depends on the iteration order of the caller's
    /// collection.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidKey`] for empty keys or empty segments (`a..b`)
    /// - [`Error::ReservedKey`] for a segment named [`SELECTED_OPTION_KEY`]
    /// - [`Error::ConflictingPath`] when two keys give one node incompatible
    ///   shapes, e.g. a mapping value extended by a dotted child key
    pub fn build<K, V>(flat: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        let mut entries: BTreeMap<Vec<String>, (String, PropertyValue)> = BTreeMap::new();
        for (key, value) in flat {
            let key = key.into();
            let segments = parse_dotted_key(&key)?;
            if let Some((previous, _)) = entries.get(&segments) {
                return Err(Error::conflict(
                    segments.join("."),
                    format!("assigned by both {previous:?} and {key:?}"),
                ));
            }
            entries.insert(segments, (key, value.into()));
        }

        // Sorted order puts every parent key before its children, so a selector
        // scalar is always seen before the option keys nested under it.
        let mut root = PropertyValue::empty_mapping();
        let mut assigned: BTreeMap<Vec<String>, Assigned> = BTreeMap::new();
        let mut keys = Vec::with_capacity(entries.len());

        for (segments, (key, value)) in entries {
            insert(&mut root, &mut assigned, &segments, value)?;
            keys.push(key);
        }

        tracing::trace!(keys = keys.len(), "built property tree");
        Ok(Self { root, keys })
    }

    /// Build from a flat JSON object of dotted keys.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::InvalidValue {
                message: "flat properties must be a JSON object".to_string(),
            });
        };
        let flat = map
            .into_iter()
            .map(|(k, v)| Ok((k, PropertyValue::from_json(v)?)))
            .collect::<Result<Vec<_>>>()?;
        Self::build(flat)
    }

    /// The root mapping.
    pub fn root(&self) -> &PropertyValue {
        &self.root
    }

    /// The original input keys, sorted.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Exact lookup of a dotted path. No defaults, no merging.
    pub fn get(&self, dotted: &str) -> Result<&PropertyValue> {
        let segments = parse_dotted_key(dotted)?;
        path::resolve_segments(&self.root, &segments)
            .map_err(|segment| Error::not_found(segments.join("."), segment))
    }

    /// Lookup of a dotted path, resolving selector nodes to their chosen option.
    pub fn selection(&self, dotted: &str) -> Result<&PropertyValue> {
        let node = self.get(dotted)?;
        Ok(node.get(SELECTED_OPTION_KEY).unwrap_or(node))
    }

    /// Whether a dotted path resolves to a value.
    pub fn contains(&self, dotted: &str) -> bool {
        self.get(dotted).is_ok()
    }

    /// Lookup of a slash-delimited path, addressing list items by `name`.
    pub fn resolve(&self, path: &str) -> Result<&PropertyValue> {
        path::resolve(&self.root, path)
    }

    /// Recursively merge `other` into a copy of this tree.
    ///
    /// Mappings merge key by key. Leaves present on both sides follow
    /// `policy`. Lists are leaves: an override list replaces the base list
    /// wholesale.
    pub fn merge(&self, other: &PropertyTree, policy: OverridePolicy) -> PropertyTree {
        let mut root = self.root.clone();
        merge_value(&mut root, &other.root, policy);
        let mut keys = self.keys.clone();
        keys.extend(other.keys.iter().cloned());
        keys.sort();
        keys.dedup();
        PropertyTree { root, keys }
    }
}

/// Split a dotted input key into segments.
///
/// One leading `.` is dropped, so `.properties.a` and `properties.a` name the
/// same node.
pub fn parse_dotted_key(key: &str) -> Result<Vec<String>> {
    let trimmed = key.strip_prefix('.').unwrap_or(key);
    if trimmed.is_empty() {
        return Err(Error::InvalidKey {
            key: key.to_string(),
            reason: "key is empty".to_string(),
        });
    }
    trimmed
        .split('.')
        .map(|segment| {
            if segment.is_empty() {
                Err(Error::InvalidKey {
                    key: key.to_string(),
                    reason: "key contains an empty segment".to_string(),
                })
            } else {
                Ok(segment.to_string())
            }
        })
        .collect()
}

fn insert(
    root: &mut PropertyValue,
    assigned: &mut BTreeMap<Vec<String>, Assigned>,
    segments: &[String],
    value: PropertyValue,
) -> Result<()> {
    let joined = segments.join(".");
    if segments.iter().any(|s| s == SELECTED_OPTION_KEY) {
        return Err(Error::ReservedKey { path: joined });
    }

    let mut current = root;
    for depth in 0..segments.len() - 1 {
        let prefix = &segments[..=depth];
        match assigned.get(prefix) {
            Some(Assigned::Compound) => {
                return Err(Error::conflict(
                    &joined,
                    format!("{} holds a mapping or list value", prefix.join(".")),
                ));
            }
            Some(Assigned::Scalar) => promote_to_selector(current, &prefix[depth]),
            None => {}
        }
        current = descend(current, &segments[depth], &joined)?;
    }

    let last = &segments[segments.len() - 1];
    let PropertyValue::Mapping(map) = current else {
        return Err(Error::conflict(&joined, "parent is not a mapping"));
    };

    if map.contains_key(last.as_str()) {
        return Err(Error::conflict(&joined, "node is already assigned"));
    }
    let kind = if value.is_scalar() {
        Assigned::Scalar
    } else {
        Assigned::Compound
    };
    map.insert(last.clone(), value);
    assigned.insert(segments.to_vec(), kind);
    Ok(())
}

/// Turn a scalar leaf at `key` into a mapping that keeps the scalar as its
/// selected option.
fn promote_to_selector(parent: &mut PropertyValue, key: &str) {
    if let PropertyValue::Mapping(map) = parent {
        if let Some(slot) = map.get_mut(key) {
            if slot.is_scalar() {
                let selected = std::mem::replace(slot, PropertyValue::empty_mapping());
                if let PropertyValue::Mapping(children) = slot {
                    children.insert(SELECTED_OPTION_KEY.to_string(), selected);
                }
            }
        }
    }
}

fn descend<'a>(
    current: &'a mut PropertyValue,
    segment: &str,
    joined: &str,
) -> Result<&'a mut PropertyValue> {
    match current {
        PropertyValue::Mapping(map) => Ok(map
            .entry(segment.to_string())
            .or_insert_with(PropertyValue::empty_mapping)),
        other => Err(Error::conflict(
            joined,
            format!("cannot nest {:?} under a {}", segment, other.type_name()),
        )),
    }
}

/// Deep merge `other` into `base` according to `policy`.
///
/// Mappings merge key by key; anything else is a leaf. Lists are leaves.
pub fn merge_value(base: &mut PropertyValue, other: &PropertyValue, policy: OverridePolicy) {
    match (base, other) {
        (PropertyValue::Mapping(base_map), PropertyValue::Mapping(other_map)) => {
            for (key, other_val) in other_map {
                if let Some(base_val) = base_map.get_mut(key) {
                    merge_value(base_val, other_val, policy);
                } else {
                    base_map.insert(key.clone(), other_val.clone());
                }
            }
        }
        (base, other) => {
            if policy == OverridePolicy::Override {
                *base = other.clone();
            }
        }
    }
}

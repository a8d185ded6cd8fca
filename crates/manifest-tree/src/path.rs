//! Slash-delimited path resolution
//!
//! Paths address values inside a [`PropertyValue`] tree:
//!
//! - Mapping children by key: `buckets/buildpacks/backup`
//! - List items by their `name` field: `instance_groups/backup-prepare/jobs`
//!
//! Empty segments are ignored, so `a//b/` is the same path as `a/b`, and the
//! empty path addresses the root.
//!
//! # Examples
//!
//! ```
//! use manifest_tree::{PropertyValue, path::resolve};
//!
//! let bag = PropertyValue::mapping([(
//!     "buckets",
//!     PropertyValue::List(vec![PropertyValue::mapping([
//!         ("name", PropertyValue::from("droplets")),
//!         ("region", PropertyValue::from("eu-west-1")),
//!     ])]),
//! )]);
//!
//! assert_eq!(resolve(&bag, "buckets/droplets/region").unwrap(), "eu-west-1");
//! assert!(resolve(&bag, "buckets/unknown/region").is_err());
//! ```

use crate::error::{Error, Result};
use crate::value::{Mapping, PropertyValue};

/// Split a slash-delimited path into its non-empty segments.
///
/// # Examples
///
/// ```
/// use manifest_tree::parse_path;
///
/// assert_eq!(parse_path("buckets/droplets/name"), vec!["buckets", "droplets", "name"]);
/// assert_eq!(parse_path("/enabled/"), vec!["enabled"]);
/// assert!(parse_path("").is_empty());
/// ```
pub fn parse_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Resolve `path` against `root`.
///
/// Fails with [`Error::NotFound`] naming the first segment that matched
/// nothing; a missing value is never replaced by a default.
pub fn resolve<'a>(root: &'a PropertyValue, path: &str) -> Result<&'a PropertyValue> {
    resolve_segments(root, &parse_path(path)).map_err(|segment| Error::not_found(path, segment))
}

/// Resolve pre-split segments, returning the unmatched segment on failure.
pub fn resolve_segments<'a, S: AsRef<str>>(
    root: &'a PropertyValue,
    segments: &[S],
) -> std::result::Result<&'a PropertyValue, String> {
    let mut current = root;
    for segment in segments {
        let segment = segment.as_ref();
        current = child(current, segment).ok_or_else(|| segment.to_string())?;
    }
    Ok(current)
}

fn child<'a>(node: &'a PropertyValue, segment: &str) -> Option<&'a PropertyValue> {
    match node {
        PropertyValue::Mapping(map) => map.get(segment),
        PropertyValue::List(items) => items.iter().find(|item| item.item_name() == Some(segment)),
        _ => None,
    }
}

fn find_item_mut<'a>(items: &'a mut [PropertyValue], name: &str) -> Option<&'a mut PropertyValue> {
    items.iter_mut().find(|item| item.item_name() == Some(name))
}

/// Write `value` at `path` inside `root`, replacing whatever was there.
///
/// Missing mapping keys along the way are created as empty mappings. List
/// items are located by `name` and are never created, since list membership
/// belongs to whoever declared the list. Writing through a scalar is a
/// [`Error::ConflictingPath`].
///
/// # Examples
///
/// ```
/// use manifest_tree::{PropertyValue, path::{resolve, set_at_path}};
///
/// let mut bag = PropertyValue::empty_mapping();
/// set_at_path(&mut bag, "buckets/buildpacks/backup/region", "us-east-1".into()).unwrap();
/// assert_eq!(resolve(&bag, "buckets/buildpacks/backup/region").unwrap(), "us-east-1");
/// ```
pub fn set_at_path(root: &mut PropertyValue, path: &str, value: PropertyValue) -> Result<()> {
    let segments = parse_path(path);
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;
    for segment in parents {
        current = match current {
            PropertyValue::Mapping(map) => map
                .entry(segment.to_string())
                .or_insert_with(PropertyValue::empty_mapping),
            PropertyValue::List(items) => find_item_mut(items, segment)
                .ok_or_else(|| Error::not_found(path, *segment))?,
            other => {
                return Err(Error::conflict(
                    path,
                    format!("cannot descend into {} at {:?}", other.type_name(), segment),
                ));
            }
        };
    }

    match current {
        PropertyValue::Mapping(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        PropertyValue::List(items) => {
            let slot = find_item_mut(items, last).ok_or_else(|| Error::not_found(path, *last))?;
            *slot = value;
            Ok(())
        }
        other => Err(Error::conflict(
            path,
            format!("cannot set key {:?} on a {}", last, other.type_name()),
        )),
    }
}

/// Collect every leaf path below `root`, in key order.
///
/// Used to report which user-supplied values were shadowed during a merge.
pub fn leaf_paths(root: &PropertyValue) -> Vec<String> {
    fn walk(node: &PropertyValue, prefix: &str, out: &mut Vec<String>) {
        match node {
            PropertyValue::Mapping(map) if !map.is_empty() => walk_mapping(map, prefix, out),
            _ => out.push(prefix.to_string()),
        }
    }

    fn walk_mapping(map: &Mapping, prefix: &str, out: &mut Vec<String>) {
        for (key, value) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}/{key}")
            };
            walk(value, &path, out);
        }
    }

    let mut out = Vec::new();
    if let PropertyValue::Mapping(map) = root {
        walk_mapping(map, "", &mut out);
    } else {
        out.push(String::new());
    }
    out
}

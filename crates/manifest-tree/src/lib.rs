//! Property trees for manifest rendering.
//!
//! This crate provides the data layer the renderer works on:
//!
//! - [`PropertyValue`] - a tagged union of strings, booleans, numbers,
//!   mappings and ordered lists
//! - [`PropertyTree`] - an immutable tree built from flat, dot-keyed input
//!   properties, with exact lookup and policy-driven deep merge
//! - [`path`] - slash-delimited path resolution, addressing list items by
//!   their `name` field
//!
//! # Example
//!
//! ```
//! use manifest_tree::{PropertyTree, PropertyValue};
//!
//! let tree = PropertyTree::build([
//!     (".properties.system_blobstore", PropertyValue::from("external")),
//!     (".properties.system_blobstore.external.versioning", PropertyValue::from(true)),
//! ])
//! .unwrap();
//!
//! assert_eq!(
//!     tree.selection("properties.system_blobstore").unwrap(),
//!     &PropertyValue::from("external")
//! );
//! assert_eq!(
//!     tree.get("properties.system_blobstore.external.versioning").unwrap(),
//!     &PropertyValue::Bool(true)
//! );
//! ```

pub mod error;
pub mod path;
pub mod tree;
pub mod value;

pub use error::{Error, Result};
pub use path::{parse_path, resolve, set_at_path};
pub use tree::{OverridePolicy, PropertyTree, SELECTED_OPTION_KEY, merge_value, parse_dotted_key};
pub use value::{Mapping, PropertyValue};

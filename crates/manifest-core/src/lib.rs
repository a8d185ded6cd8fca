//! Declarative manifest rendering.
//!
//! Given a [`TemplateSpec`] and a tree of input properties, the renderer
//! resolves each job's mutually exclusive alternatives, layers defaults,
//! alternative patches, and user overrides into a property bag, and enforces
//! the enablement rules between sibling jobs.
//!
//! - [`template`] - the template model, parsing, and validation
//! - [`predicate`] - guards over input properties
//! - [`selector`] - exactly-one alternative selection
//! - [`merge`] - layered property bag materialization
//! - [`renderer`] - orchestration and enablement invariants
//! - [`manifest`] - the rendered manifest and its query façade
//!
//! # Example
//!
//! ```
//! use manifest_core::{ManifestRenderer, TemplateSpec};
//! use manifest_tree::PropertyValue;
//!
//! let spec = TemplateSpec::from_yaml_str(r#"
//! instance_groups:
//!   - name: backup-prepare
//!     jobs:
//!       - name: restorer
//!         alternatives:
//!           - name: external
//!             when: { equals: { property: .properties.system_blobstore, value: external } }
//!             enabled: true
//!             bindings:
//!               - from: .properties.system_blobstore.external.backup_region
//!                 to: buckets/buildpacks/backup/region
//!           - name: internal
//!             when: { not: { equals: { property: .properties.system_blobstore, value: external } } }
//!             enabled: false
//! "#).unwrap();
//!
//! let renderer = ManifestRenderer::new(&spec).unwrap();
//! let manifest = renderer
//!     .render_properties([
//!         (".properties.system_blobstore", PropertyValue::from("external")),
//!         (".properties.system_blobstore.external.backup_region", PropertyValue::from("eu-west-1")),
//!     ])
//!     .unwrap();
//!
//! let job = manifest.find_instance_group_job("backup-prepare", "restorer").unwrap();
//! assert_eq!(job.property("enabled").unwrap(), &true);
//! assert_eq!(job.property("buckets/buildpacks/backup/region").unwrap(), "eu-west-1");
//! ```

pub mod error;
pub mod logging;
pub mod manifest;
pub mod merge;
pub mod predicate;
pub mod renderer;
pub mod selector;
pub mod template;

pub use error::{Error, Result};
pub use manifest::{InstanceGroup, Job, RenderedManifest};
pub use merge::MergeEngine;
pub use predicate::Predicate;
pub use renderer::ManifestRenderer;
pub use selector::SelectorResolver;
pub use template::{
    Alternative, Binding, EnablementRule, InstanceGroupTemplate, JobTemplate, PropertySelector,
    TemplateSpec,
};

//! Rendered manifests and the query façade over them

use manifest_tree::{PropertyTree, PropertyValue};
use serde::Serialize;

use crate::error::{Error, Result};

/// The output of a render: instance groups in template order.
///
/// Owned entirely by the caller; it holds no reference to the template or
/// the input properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedManifest {
    pub instance_groups: Vec<InstanceGroup>,
}

/// A named collection of rendered jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceGroup {
    pub name: String,
    pub jobs: Vec<Job>,
}

/// A rendered job: its enablement and its property bag.
///
/// The bag always carries the enablement under `enabled`, so
/// `job.property("enabled")` and [`Job::is_enabled`] agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    name: String,
    enabled: bool,
    properties: PropertyTree,
}

impl RenderedManifest {
    pub fn new(instance_groups: Vec<InstanceGroup>) -> Self {
        Self { instance_groups }
    }

    pub fn find_instance_group(&self, group: &str) -> Result<&InstanceGroup> {
        self.instance_groups
            .iter()
            .find(|g| g.name == group)
            .ok_or_else(|| Error::InstanceGroupNotFound {
                group: group.to_string(),
            })
    }

    /// Look up a job by instance group and job name.
    ///
    /// # Example
    ///
    /// ```
    /// use manifest_core::{ManifestRenderer, TemplateSpec};
    /// use manifest_tree::PropertyTree;
    ///
    /// let spec = TemplateSpec::from_yaml_str(r#"
    /// instance_groups:
    ///   - name: web
    ///     jobs:
    ///       - name: nginx
    ///         properties: { port: 8080 }
    /// "#).unwrap();
    ///
    /// let manifest = ManifestRenderer::new(&spec)
    ///     .unwrap()
    ///     .render_manifest(&PropertyTree::empty())
    ///     .unwrap();
    ///
    /// let job = manifest.find_instance_group_job("web", "nginx").unwrap();
    /// assert_eq!(job.property("enabled").unwrap(), &true);
    /// assert!(manifest.find_instance_group_job("web", "haproxy").is_err());
    /// ```
    pub fn find_instance_group_job(&self, group: &str, job: &str) -> Result<&Job> {
        self.find_instance_group(group)?.find_job(job)
    }

    /// All jobs across all instance groups, in manifest order.
    pub fn jobs(&self) -> impl Iterator<Item = (&str, &Job)> {
        self.instance_groups
            .iter()
            .flat_map(|g| g.jobs.iter().map(move |j| (g.name.as_str(), j)))
    }
}

impl InstanceGroup {
    pub fn new(name: impl Into<String>, jobs: Vec<Job>) -> Self {
        Self {
            name: name.into(),
            jobs,
        }
    }

    pub fn find_job(&self, job: &str) -> Result<&Job> {
        self.jobs
            .iter()
            .find(|j| j.name == job)
            .ok_or_else(|| Error::JobNotFound {
                group: self.name.clone(),
                job: job.to_string(),
            })
    }
}

impl Job {
    pub fn new(name: impl Into<String>, enabled: bool, properties: PropertyTree) -> Self {
        Self {
            name: name.into(),
            enabled,
            properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn properties(&self) -> &PropertyTree {
        &self.properties
    }

    /// Resolve a slash-delimited path in the property bag.
    ///
    /// List items are addressed by their `name` field. A missing path fails
    /// with a not-found error naming the first unmatched segment.
    pub fn property(&self, path: &str) -> Result<&PropertyValue> {
        Ok(self.properties.resolve(path)?)
    }
}

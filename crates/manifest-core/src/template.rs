//! Template document model
//!
//! A [`TemplateSpec`] declares every instance group and job a manifest can
//! contain, the default properties of each job, and the alternatives that
//! input properties choose between. It is loaded once, validated, and then
//! only read.
//!
//! # Example YAML
//!
//! ```yaml
//! instance_groups:
//!   - name: backup-prepare
//!     jobs:
//!       - name: s3-versioned-blobstore-backup-restorer
//!         properties:
//!           buckets: {}
//!         alternatives:
//!           - name: versioned
//!             when:
//!               all:
//!                 - equals: { property: .properties.system_blobstore, value: external }
//!                 - truthy: .properties.system_blobstore.external.versioning
//!             enabled: true
//!             bindings:
//!               - from: .properties.system_blobstore.external.buildpacks_bucket
//!                 to: buckets/buildpacks/name
//!           - name: inactive
//!             when:
//!               not:
//!                 all:
//!                   - equals: { property: .properties.system_blobstore, value: external }
//!                   - truthy: .properties.system_blobstore.external.versioning
//!             enabled: false
//!         enablement:
//!           exclusive_with: s3-unversioned-blobstore-backup-restorer
//! ```

use std::collections::HashSet;

use manifest_tree::{Mapping, PropertyValue, parse_path};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::predicate::Predicate;

fn default_enabled() -> bool {
    true
}

/// The complete, read-only template document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSpec {
    /// Instance groups in manifest order
    #[serde(default)]
    pub instance_groups: Vec<InstanceGroupTemplate>,
}

/// A named group of job templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceGroupTemplate {
    pub name: String,
    #[serde(default)]
    pub jobs: Vec<JobTemplate>,
}

/// Declaration of one job and how its properties are produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobTemplate {
    pub name: String,

    /// Enablement used when the job declares no alternatives, or when the
    /// chosen alternative leaves it unspecified
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Dotted input path whose children are merged into the job's properties
    /// where the template leaves gaps
    #[serde(default)]
    pub namespace: Option<String>,

    /// Default property bag
    #[serde(default)]
    pub properties: Mapping,

    /// Primary selector; the chosen alternative decides `enabled`
    #[serde(default)]
    pub alternatives: Vec<Alternative>,

    /// Further independent selectors, each contributing a property patch
    #[serde(default)]
    pub selectors: Vec<PropertySelector>,

    /// Mutual exclusivity with a sibling job
    #[serde(default)]
    pub enablement: Option<EnablementRule>,
}

/// One guarded branch of a selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Alternative {
    pub name: String,
    pub when: Predicate,
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Patch merged over the job defaults
    #[serde(default)]
    pub properties: Mapping,
    /// Values written into the property bag after the patch
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// A named set of alternatives resolved independently of the primary selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertySelector {
    pub name: String,
    pub alternatives: Vec<Alternative>,
}

/// A value written to a location in the job's property bag.
///
/// The value is either copied from an input property (`from`) or given
/// literally (`value`); exactly one of the two is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Binding {
    /// Dotted input key
    #[serde(default)]
    pub from: Option<String>,
    /// Literal value
    #[serde(default)]
    pub value: Option<PropertyValue>,
    /// Slash-delimited output path
    pub to: String,
    /// Fail the render when the input is missing instead of skipping
    #[serde(default)]
    pub required: bool,
}

/// Declares that a job and a sibling must not both be enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnablementRule {
    /// Sibling job in the same instance group
    pub exclusive_with: String,
    /// When this holds (or is absent), exactly one of the pair must be
    /// enabled; otherwise at most one
    #[serde(default)]
    pub when: Option<Predicate>,
}

impl TemplateSpec {
    /// Parse and validate a YAML document.
    ///
    /// # Example
    ///
    /// ```
    /// use manifest_core::TemplateSpec;
    ///
    /// let spec = TemplateSpec::from_yaml_str(r#"
    /// instance_groups:
    ///   - name: web
    ///     jobs:
    ///       - name: nginx
    ///         properties:
    ///           port: 8080
    /// "#).unwrap();
    ///
    /// assert_eq!(spec.instance_groups[0].jobs[0].name, "nginx");
    /// ```
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_yaml::from_str(content)?;
        Self::from_json_value(value)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let value: serde_json::Value = toml::from_str(content)?;
        Self::from_json_value(value)
    }

    /// Deserialize and validate an already-parsed document.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let spec: TemplateSpec = serde_json::from_value(value)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn new(instance_groups: Vec<InstanceGroupTemplate>) -> Self {
        Self { instance_groups }
    }

    pub fn instance_group(&self, name: &str) -> Option<&InstanceGroupTemplate> {
        self.instance_groups.iter().find(|g| g.name == name)
    }

    /// Check the structural rules rendering relies on.
    ///
    /// - instance group names are unique, as are job names within a group
    /// - enablement rules name an existing sibling other than the job itself
    /// - alternative names are unique within a selector
    /// - secondary selectors have alternatives, and those never set `enabled`
    /// - bindings carry exactly one of `from` and `value`, and a non-empty target
    pub fn validate(&self) -> Result<()> {
        let mut groups = HashSet::new();
        for group in &self.instance_groups {
            if !groups.insert(group.name.as_str()) {
                return Err(Error::invalid_template(format!(
                    "duplicate instance group {:?}",
                    group.name
                )));
            }
            group.validate()?;
        }
        Ok(())
    }
}

impl InstanceGroupTemplate {
    pub fn new(name: impl Into<String>, jobs: Vec<JobTemplate>) -> Self {
        Self {
            name: name.into(),
            jobs,
        }
    }

    pub fn job(&self, name: &str) -> Option<&JobTemplate> {
        self.jobs.iter().find(|j| j.name == name)
    }

    fn validate(&self) -> Result<()> {
        let mut jobs = HashSet::new();
        for job in &self.jobs {
            if !jobs.insert(job.name.as_str()) {
                return Err(Error::invalid_template(format!(
                    "duplicate job {:?} in instance group {:?}",
                    job.name, self.name
                )));
            }
        }

        for job in &self.jobs {
            let context = format!("{}/{}", self.name, job.name);
            if let Some(rule) = &job.enablement {
                if rule.exclusive_with == job.name {
                    return Err(Error::invalid_template(format!(
                        "{context}: job cannot be exclusive with itself"
                    )));
                }
                if !jobs.contains(rule.exclusive_with.as_str()) {
                    return Err(Error::invalid_template(format!(
                        "{context}: exclusive sibling {:?} is not in the instance group",
                        rule.exclusive_with
                    )));
                }
            }

            validate_alternatives(&context, &job.alternatives, true)?;
            for selector in &job.selectors {
                let context = format!("{context} selector {:?}", selector.name);
                if selector.alternatives.is_empty() {
                    return Err(Error::invalid_template(format!(
                        "{context}: selector declares no alternatives"
                    )));
                }
                validate_alternatives(&context, &selector.alternatives, false)?;
            }
        }
        Ok(())
    }
}

fn validate_alternatives(context: &str, alternatives: &[Alternative], primary: bool) -> Result<()> {
    let mut names = HashSet::new();
    for alternative in alternatives {
        if !names.insert(alternative.name.as_str()) {
            return Err(Error::invalid_template(format!(
                "{context}: duplicate alternative {:?}",
                alternative.name
            )));
        }
        if !primary && alternative.enabled.is_some() {
            return Err(Error::invalid_template(format!(
                "{context}: alternative {:?} sets `enabled` outside the primary selector",
                alternative.name
            )));
        }
        for binding in &alternative.bindings {
            let source_ok = match (&binding.from, &binding.value) {
                (Some(from), None) => !from.trim_start_matches('.').is_empty(),
                (None, Some(_)) => true,
                _ => false,
            };
            if !source_ok || parse_path(&binding.to).is_empty() {
                return Err(Error::invalid_template(format!(
                    "{context}: alternative {:?} has a binding to {:?} without exactly one \
                     non-empty `from` or `value`, or without a target",
                    alternative.name, binding.to
                )));
            }
        }
    }
    Ok(())
}

impl JobTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: default_enabled(),
            namespace: None,
            properties: Mapping::new(),
            alternatives: Vec::new(),
            selectors: Vec::new(),
            enablement: None,
        }
    }

    pub fn with_properties(mut self, properties: Mapping) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_alternative(mut self, alternative: Alternative) -> Self {
        self.alternatives.push(alternative);
        self
    }

    pub fn with_selector(
        mut self,
        name: impl Into<String>,
        alternatives: Vec<Alternative>,
    ) -> Self {
        self.selectors.push(PropertySelector {
            name: name.into(),
            alternatives,
        });
        self
    }

    pub fn exclusive_with(mut self, sibling: impl Into<String>, when: Option<Predicate>) -> Self {
        self.enablement = Some(EnablementRule {
            exclusive_with: sibling.into(),
            when,
        });
        self
    }
}

impl Alternative {
    pub fn new(name: impl Into<String>, when: Predicate) -> Self {
        Self {
            name: name.into(),
            when,
            enabled: None,
            properties: Mapping::new(),
            bindings: Vec::new(),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_properties(mut self, properties: Mapping) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_binding(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.bindings.push(Binding {
            from: Some(from.into()),
            value: None,
            to: to.into(),
            required: false,
        });
        self
    }

    pub fn with_required_binding(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.bindings.push(Binding {
            from: Some(from.into()),
            value: None,
            to: to.into(),
            required: true,
        });
        self
    }

    pub fn with_value(mut self, to: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.bindings.push(Binding {
            from: None,
            value: Some(value.into()),
            to: to.into(),
            required: false,
        });
        self
    }
}

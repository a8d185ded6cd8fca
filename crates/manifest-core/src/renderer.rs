//! Manifest rendering
//!
//! [`ManifestRenderer`] walks every instance group and job of a
//! [`TemplateSpec`], resolves each job's selectors, materializes its property
//! bag, and finally checks the enablement rules of each group. Rendering is a
//! pure function of the template and the input tree; any error aborts the
//! whole render and no partial manifest is returned.

use manifest_tree::{PropertyTree, PropertyValue};

use crate::error::{Error, Result};
use crate::manifest::{InstanceGroup, Job, RenderedManifest};
use crate::merge::MergeEngine;
use crate::selector::SelectorResolver;
use crate::template::{Alternative, InstanceGroupTemplate, JobTemplate, TemplateSpec};

/// Name used for the primary selector in error messages
const PRIMARY_SELECTOR: &str = "alternatives";

/// Renders manifests from one validated template.
///
/// The renderer only borrows the template, so one template can back any
/// number of renderers and concurrent renders.
#[derive(Debug, Clone, Copy)]
pub struct ManifestRenderer<'a> {
    spec: &'a TemplateSpec,
}

impl<'a> ManifestRenderer<'a> {
    /// Validate `spec` and create a renderer over it.
    pub fn new(spec: &'a TemplateSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self { spec })
    }

    /// Build the input tree from flat dotted properties, then render.
    pub fn render_properties<K, V>(
        &self,
        flat: impl IntoIterator<Item = (K, V)>,
    ) -> Result<RenderedManifest>
    where
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        let input = PropertyTree::build(flat)?;
        self.render_manifest(&input)
    }

    /// Render every instance group declared by the template.
    pub fn render_manifest(&self, input: &PropertyTree) -> Result<RenderedManifest> {
        tracing::info!(
            instance_groups = self.spec.instance_groups.len(),
            input_keys = input.keys().len(),
            "rendering manifest"
        );

        let instance_groups = self
            .spec
            .instance_groups
            .iter()
            .map(|group| self.render_group(group, input))
            .collect::<Result<Vec<_>>>()?;

        let manifest = RenderedManifest::new(instance_groups);
        tracing::info!(
            jobs = manifest.jobs().count(),
            enabled = manifest.jobs().filter(|(_, job)| job.is_enabled()).count(),
            "rendered manifest"
        );
        Ok(manifest)
    }

    fn render_group(
        &self,
        group: &InstanceGroupTemplate,
        input: &PropertyTree,
    ) -> Result<InstanceGroup> {
        let jobs = group
            .jobs
            .iter()
            .map(|job| {
                render_job(job, input).map_err(|err| err.in_job(&group.name, &job.name))
            })
            .collect::<Result<Vec<_>>>()?;

        check_enablement(group, &jobs, input).map_err(|err| err.in_group(&group.name))?;
        Ok(InstanceGroup::new(group.name.clone(), jobs))
    }
}

fn render_job(job: &JobTemplate, input: &PropertyTree) -> Result<Job> {
    let resolver = SelectorResolver::new(input);
    let mut chosen: Vec<&Alternative> = Vec::with_capacity(1 + job.selectors.len());

    let enabled = if job.alternatives.is_empty() {
        job.enabled
    } else {
        let alternative = resolver.resolve(PRIMARY_SELECTOR, &job.alternatives)?;
        chosen.push(alternative);
        alternative.enabled.unwrap_or(job.enabled)
    };

    for selector in &job.selectors {
        chosen.push(resolver.resolve(&selector.name, &selector.alternatives)?);
    }

    let bag = MergeEngine::new(input).materialize(job, &chosen, enabled)?;

    tracing::debug!(
        job = %job.name,
        enabled,
        alternatives = ?chosen.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
        "rendered job"
    );
    Ok(Job::new(job.name.clone(), enabled, PropertyTree::from_value(bag)?))
}

/// Check every declared enablement rule of `group` against its rendered jobs.
///
/// A rule whose `when` holds (or is absent) needs exactly one of the pair
/// enabled; otherwise at most one may be.
fn check_enablement(
    group: &InstanceGroupTemplate,
    jobs: &[Job],
    input: &PropertyTree,
) -> Result<()> {
    let is_enabled = |name: &str| -> Result<bool> {
        jobs.iter()
            .find(|job| job.name() == name)
            .map(Job::is_enabled)
            .ok_or_else(|| Error::JobNotFound {
                group: group.name.clone(),
                job: name.to_string(),
            })
    };

    for job in &group.jobs {
        let Some(rule) = &job.enablement else {
            continue;
        };
        let enabled = usize::from(is_enabled(&job.name)?)
            + usize::from(is_enabled(&rule.exclusive_with)?);
        let exactly_one = rule.when.as_ref().is_none_or(|when| when.evaluate(input));
        let holds = if exactly_one { enabled == 1 } else { enabled <= 1 };

        if !holds {
            return Err(Error::InvariantViolation {
                group: group.name.clone(),
                job: job.name.clone(),
                sibling: rule.exclusive_with.clone(),
                enabled,
            });
        }
    }
    Ok(())
}

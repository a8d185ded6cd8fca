//! Layered materialization of a job's property bag
//!
//! Layers, later over earlier, with mappings merged key by key:
//!
//! 1. the job template's default properties
//! 2. each chosen alternative's patch followed by its bindings, primary
//!    selector first, then secondary selectors in declaration order
//! 3. the resolved `enabled` flag
//! 4. user properties under the job's `namespace`, filling only the keys
//!    earlier layers left empty
//!
//! User values shadowed in layer 4 are reported with `warn!`, never dropped
//! silently.

use manifest_tree::path::{leaf_paths, resolve, set_at_path};
use manifest_tree::{
    OverridePolicy, PropertyTree, PropertyValue, SELECTED_OPTION_KEY, merge_value,
};

use crate::error::Result;
use crate::template::{Alternative, Binding, JobTemplate};

/// Builds property bags for jobs from one input tree.
pub struct MergeEngine<'a> {
    input: &'a PropertyTree,
}

impl<'a> MergeEngine<'a> {
    pub fn new(input: &'a PropertyTree) -> Self {
        Self { input }
    }

    /// Produce the property bag for `job` given its chosen alternatives and
    /// resolved enablement, which is stored under `enabled`.
    ///
    /// The returned value is an owned copy; it shares nothing with the
    /// template or the input tree.
    pub fn materialize(
        &self,
        job: &JobTemplate,
        chosen: &[&Alternative],
        enabled: bool,
    ) -> Result<PropertyValue> {
        let mut bag = PropertyValue::Mapping(job.properties.clone());

        for alternative in chosen {
            merge_value(
                &mut bag,
                &PropertyValue::Mapping(alternative.properties.clone()),
                OverridePolicy::Override,
            );
            for binding in &alternative.bindings {
                self.apply_binding(&mut bag, binding)?;
            }
            tracing::trace!(
                job = %job.name,
                alternative = %alternative.name,
                bindings = alternative.bindings.len(),
                "applied alternative patch"
            );
        }

        set_at_path(&mut bag, "enabled", PropertyValue::Bool(enabled))?;

        if let Some(namespace) = &job.namespace {
            self.fill_from_namespace(&mut bag, &job.name, namespace)?;
        }

        Ok(bag)
    }

    fn apply_binding(&self, bag: &mut PropertyValue, binding: &Binding) -> Result<()> {
        let from = match (&binding.from, &binding.value) {
            (_, Some(value)) => {
                set_at_path(bag, &binding.to, value.clone())?;
                return Ok(());
            }
            (Some(from), None) => from,
            (None, None) => return Ok(()),
        };

        match self.input.selection(from) {
            Ok(value) => {
                set_at_path(bag, &binding.to, value.clone())?;
                Ok(())
            }
            Err(err) if err.is_not_found() && !binding.required => {
                tracing::debug!(
                    from = %from,
                    to = %binding.to,
                    "optional binding source is absent, skipping"
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn fill_from_namespace(
        &self,
        bag: &mut PropertyValue,
        job: &str,
        namespace: &str,
    ) -> Result<()> {
        let mut user = match self.input.get(namespace) {
            Ok(value) => value.clone(),
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let kind = user.type_name();
        let PropertyValue::Mapping(map) = &mut user else {
            return Err(manifest_tree::Error::InvalidValue {
                message: format!(
                    "namespace {namespace} for job {job} holds a {kind}, expected a mapping"
                ),
            }
            .into());
        };
        map.remove(SELECTED_OPTION_KEY);

        merge_value(bag, &user, OverridePolicy::Preserve);

        for leaf in leaf_paths(&user) {
            let supplied = resolve(&user, &leaf).ok();
            let effective = resolve(bag, &leaf).ok();
            if supplied != effective {
                tracing::warn!(
                    job,
                    namespace,
                    property = %leaf,
                    "user-supplied property is shadowed by the template"
                );
            }
        }
        Ok(())
    }
}

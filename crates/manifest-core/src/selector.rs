//! Exactly-one selection among declared alternatives

use manifest_tree::PropertyTree;

use crate::error::{Error, Result};
use crate::template::Alternative;

/// Picks the single alternative whose predicate holds for an input tree.
///
/// Ambiguity is a template defect: when several predicates hold the resolver
/// fails instead of taking the first, so overlapping branches surface as
/// soon as an input exercises them.
pub struct SelectorResolver<'a> {
    input: &'a PropertyTree,
}

impl<'a> SelectorResolver<'a> {
    pub fn new(input: &'a PropertyTree) -> Self {
        Self { input }
    }

    /// Resolve `alternatives`, evaluated in declaration order.
    ///
    /// `selector` names the choice in error messages, e.g. `backup-prepare/restorer`.
    ///
    /// # Errors
    ///
    /// - [`Error::NoMatchingAlternative`] when no predicate holds
    /// - [`Error::AmbiguousAlternative`] when more than one holds
    pub fn resolve<'t>(
        &self,
        selector: &str,
        alternatives: &'t [Alternative],
    ) -> Result<&'t Alternative> {
        let matched: Vec<&Alternative> = alternatives
            .iter()
            .filter(|alternative| alternative.when.evaluate(self.input))
            .collect();

        match matched.as_slice() {
            [chosen] => {
                tracing::debug!(selector, alternative = %chosen.name, "selected alternative");
                Ok(chosen)
            }
            [] => Err(Error::NoMatchingAlternative {
                selector: selector.to_string(),
            }),
            many => Err(Error::AmbiguousAlternative {
                selector: selector.to_string(),
                matched: many.iter().map(|a| a.name.clone()).collect(),
            }),
        }
    }
}

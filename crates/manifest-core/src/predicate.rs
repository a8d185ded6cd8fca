//! Predicates over input properties
//!
//! Predicates guard template alternatives. They are deliberately small:
//! equality, presence, boolean truth, and boolean combinations of those.
//!
//! ```yaml
//! when:
//!   all:
//!     - equals: { property: .properties.system_blobstore, value: external }
//!     - truthy: .properties.system_blobstore.external.versioning
//! ```
//!
//! A property the input does not define never matches `equals` or
//! `truthy`, so partial input selects the branches written for it instead of
//! failing.

use manifest_tree::{PropertyTree, PropertyValue};
use serde::{Deserialize, Serialize};

/// A boolean test over an input [`PropertyTree`].
///
/// Property references are dotted input keys, with or without the leading `.`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// The property's selection equals `value`
    Equals {
        property: String,
        value: PropertyValue,
    },
    /// The property is defined
    Present(String),
    /// The property is not defined
    Absent(String),
    /// The property's selection is the boolean `true`
    Truthy(String),
    /// Every inner predicate holds; an empty list always holds
    All(Vec<Predicate>),
    /// At least one inner predicate holds
    Any(Vec<Predicate>),
    /// The inner predicate does not hold
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn equals(property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::Equals {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn truthy(property: impl Into<String>) -> Self {
        Self::Truthy(property.into())
    }

    pub fn present(property: impl Into<String>) -> Self {
        Self::Present(property.into())
    }

    pub fn absent(property: impl Into<String>) -> Self {
        Self::Absent(property.into())
    }

    /// A predicate that always holds.
    pub fn always() -> Self {
        Self::All(Vec::new())
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluate against `input`.
    pub fn evaluate(&self, input: &PropertyTree) -> bool {
        match self {
            Self::Equals { property, value } => input
                .selection(property)
                .is_ok_and(|actual| actual == value),
            Self::Present(property) => input.contains(property),
            Self::Absent(property) => !input.contains(property),
            Self::Truthy(property) => match input.selection(property) {
                Ok(PropertyValue::Bool(b)) => *b,
                Ok(other) => {
                    tracing::debug!(
                        property = %property,
                        found = other.type_name(),
                        "truthy test on a non-boolean property does not match"
                    );
                    false
                }
                Err(_) => false,
            },
            Self::All(inner) => inner.iter().all(|p| p.evaluate(input)),
            Self::Any(inner) => inner.iter().any(|p| p.evaluate(input)),
            Self::Not(inner) => !inner.evaluate(input),
        }
    }
}

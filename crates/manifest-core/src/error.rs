//! Error types for manifest-core

/// Result type for manifest-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading templates, rendering, or querying
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input construction or path lookup error from manifest-tree
    #[error(transparent)]
    Tree(#[from] manifest_tree::Error),

    /// No alternative's predicate matched the input
    #[error("No alternative of {selector} matched the input properties")]
    NoMatchingAlternative { selector: String },

    /// More than one alternative's predicate matched the input
    #[error("Ambiguous selection for {selector}: alternatives {matched:?} all matched")]
    AmbiguousAlternative {
        selector: String,
        matched: Vec<String>,
    },

    /// A mutually exclusive job pair ended up with the wrong enablement
    #[error(
        "Invariant violated in instance group {group}: {job} and {sibling} are exclusive but {enabled} of them are enabled"
    )]
    InvariantViolation {
        group: String,
        job: String,
        sibling: String,
        enabled: usize,
    },

    /// Instance group not present in the rendered manifest
    #[error("Instance group not found: {group}")]
    InstanceGroupNotFound { group: String },

    /// Job not present in the instance group
    #[error("Job not found: {job} in instance group {group}")]
    JobNotFound { group: String, job: String },

    /// The template document is structurally invalid
    #[error("Invalid template: {message}")]
    InvalidTemplate { message: String },

    /// Rendering failed; carries where and the first underlying cause
    #[error("Failed to render {}: {source}", location(.group, .job.as_deref()))]
    Render {
        group: String,
        job: Option<String>,
        #[source]
        source: Box<Error>,
    },

    /// YAML deserialization error
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// JSON deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn location(group: &str, job: Option<&str>) -> String {
    match job {
        Some(job) => format!("{group}/{job}"),
        None => group.to_string(),
    }
}

impl Error {
    pub fn invalid_template(message: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            message: message.into(),
        }
    }

    /// Wrap `self` with the instance group and job being rendered.
    pub fn in_job(self, group: &str, job: &str) -> Self {
        Self::Render {
            group: group.to_string(),
            job: Some(job.to_string()),
            source: Box::new(self),
        }
    }

    /// Wrap `self` with the instance group being rendered.
    pub fn in_group(self, group: &str) -> Self {
        Self::Render {
            group: group.to_string(),
            job: None,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through [`Error::Render`] wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Render { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether the root cause is a missing path, group, or job.
    pub fn is_not_found(&self) -> bool {
        match self.root_cause() {
            Self::Tree(inner) => inner.is_not_found(),
            Self::InstanceGroupNotFound { .. } | Self::JobNotFound { .. } => true,
            _ => false,
        }
    }
}

//! System blobstore backup fixtures.
//!
//! [`system_blobstore_spec`] loads the template shipped under
//! `test-fixtures/templates/system_blobstore.yml`; [`BlobstoreInput`] builds
//! the flat input properties that template reads.

use manifest_core::TemplateSpec;
use manifest_tree::{PropertyTree, PropertyValue};

/// Instance group holding both backup restorers
pub const BACKUP_PREPARE: &str = "backup-prepare";

pub const VERSIONED_RESTORER: &str = "s3-versioned-blobstore-backup-restorer";

pub const UNVERSIONED_RESTORER: &str = "s3-unversioned-blobstore-backup-restorer";

/// Every bucket the restorers back up, in template order
pub const BUCKETS: [&str; 4] = ["buildpacks", "droplets", "packages", "resources"];

const SYSTEM_BLOBSTORE_YAML: &str =
    include_str!("../../../test-fixtures/templates/system_blobstore.yml");

const EXTERNAL: &str = ".properties.system_blobstore.external";

/// Parse the system blobstore template.
///
/// # Panics
/// Panics if the fixture is not a valid template.
pub fn system_blobstore_spec() -> TemplateSpec {
    TemplateSpec::from_yaml_str(SYSTEM_BLOBSTORE_YAML)
        .unwrap_or_else(|e| panic!("system_blobstore_spec: invalid fixture template: {e}"))
}

/// Builder for the flat input properties of the system blobstore template.
///
/// Starts from an external blobstore with all four bucket names set and
/// nothing else; each method adds the properties of one scenario.
///
/// ```
/// use manifest_test_utils::BlobstoreInput;
///
/// let input = BlobstoreInput::external()
///     .versioned(true)
///     .access_keys("some-access-key", "some-secret-key")
///     .tree();
/// assert_eq!(input.selection(".properties.system_blobstore").unwrap(), "external");
/// ```
#[derive(Debug, Clone)]
pub struct BlobstoreInput {
    properties: Vec<(String, PropertyValue)>,
}

impl BlobstoreInput {
    /// An internal blobstore: only the selector is set.
    pub fn internal() -> Self {
        Self {
            properties: vec![(".properties.system_blobstore".to_string(), "internal".into())],
        }
    }

    /// An external blobstore with `some-<bucket>-bucket` bucket names.
    pub fn external() -> Self {
        let mut input = Self {
            properties: vec![(".properties.system_blobstore".to_string(), "external".into())],
        };
        for bucket in BUCKETS {
            input = input.external_property(
                &format!("{bucket}_bucket"),
                format!("some-{bucket}-bucket"),
            );
        }
        input
    }

    pub fn versioned(self, versioning: bool) -> Self {
        self.external_property("versioning", versioning)
    }

    pub fn iam_instance_profile(self, enabled: bool) -> Self {
        self.external_property("iam_instance_profile_authentication", enabled)
    }

    /// Static credentials; the secret is nested the way credential
    /// properties are delivered.
    pub fn access_keys(self, access_key: &str, secret_key: &str) -> Self {
        self.external_property("access_key", access_key).external_property(
            "secret_key",
            PropertyValue::mapping([("secret", secret_key)]),
        )
    }

    pub fn region(self, region: &str) -> Self {
        self.external_property("region", region)
    }

    /// Backup region plus `some-<bucket>-backup-bucket` backup bucket names.
    pub fn backup(mut self, backup_region: &str) -> Self {
        self = self.external_property("backup_region", backup_region);
        for bucket in BUCKETS {
            self = self.external_property(
                &format!("{bucket}_backup_bucket"),
                format!("some-{bucket}-backup-bucket"),
            );
        }
        self
    }

    /// Set any other property under the external blobstore namespace.
    pub fn external_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((format!("{EXTERNAL}.{key}"), value.into()));
        self
    }

    /// The flat dotted properties, in insertion order.
    pub fn properties(&self) -> &[(String, PropertyValue)] {
        &self.properties
    }

    pub fn into_properties(self) -> Vec<(String, PropertyValue)> {
        self.properties
    }

    /// Build the input tree.
    ///
    /// # Panics
    /// Panics if the properties do not form a valid tree.
    pub fn tree(&self) -> PropertyTree {
        PropertyTree::build(self.properties.iter().cloned())
            .unwrap_or_else(|e| panic!("BlobstoreInput::tree: invalid input properties: {e}"))
    }
}

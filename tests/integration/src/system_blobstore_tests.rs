//! End-to-end rendering of the system blobstore backup template
//!
//! Each module is one blobstore scenario: build the input properties, render
//! the full manifest, then query jobs and properties by path.

use manifest_core::{Job, ManifestRenderer, RenderedManifest};
use manifest_test_utils::blobstore::{BACKUP_PREPARE, UNVERSIONED_RESTORER, VERSIONED_RESTORER};
use manifest_test_utils::{BUCKETS, BlobstoreInput, system_blobstore_spec};
use pretty_assertions::assert_eq;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn render(input: &BlobstoreInput) -> RenderedManifest {
    let spec = system_blobstore_spec();
    ManifestRenderer::new(&spec)
        .unwrap()
        .render_manifest(&input.tree())
        .unwrap()
}

fn job<'m>(manifest: &'m RenderedManifest, name: &str) -> &'m Job {
    manifest.find_instance_group_job(BACKUP_PREPARE, name).unwrap()
}

fn assert_enabled(manifest: &RenderedManifest, name: &str, expected: bool) {
    let job = job(manifest, name);
    assert_eq!(job.property("enabled").unwrap().as_bool(), Some(expected), "{name}");
    assert_eq!(job.is_enabled(), expected, "{name}");
}

fn assert_uses_access_keys(job: &Job) {
    for bucket in BUCKETS {
        let properties = job.property(&format!("buckets/{bucket}")).unwrap();
        assert!(!properties.contains_key("use_iam_profile"), "{bucket}");
        assert_eq!(
            properties.get("aws_access_key_id").and_then(|v| v.as_str()),
            Some("some-access-key-id"),
            "{bucket}"
        );
        assert_eq!(
            properties.get("aws_secret_access_key").and_then(|v| v.as_str()),
            Some("some-secret-access-key"),
            "{bucket}"
        );
    }
}

fn assert_uses_iam_profile(job: &Job) {
    for bucket in BUCKETS {
        assert_eq!(
            job.property(&format!("buckets/{bucket}/use_iam_profile")).unwrap(),
            &true,
            "{bucket}"
        );
        let properties = job.property(&format!("buckets/{bucket}")).unwrap();
        assert!(!properties.contains_key("aws_access_key_id"), "{bucket}");
        assert!(!properties.contains_key("aws_secret_access_key"), "{bucket}");
    }
}

fn with_access_keys(input: BlobstoreInput) -> BlobstoreInput {
    input
        .iam_instance_profile(false)
        .access_keys("some-access-key-id", "some-secret-access-key")
}

// =============================================================================
// External blobstore with versioning
// =============================================================================

mod versioning_enabled {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input() -> BlobstoreInput {
        BlobstoreInput::external().versioned(true)
    }

    #[test]
    fn test_enables_versioned_and_disables_unversioned_restorer() {
        let manifest = render(&input());
        assert_enabled(&manifest, VERSIONED_RESTORER, true);
        assert_enabled(&manifest, UNVERSIONED_RESTORER, false);
    }

    #[test]
    fn test_bucket_names_come_from_input() {
        let manifest = render(&input());
        let job = job(&manifest, VERSIONED_RESTORER);
        for bucket in BUCKETS {
            assert_eq!(
                job.property(&format!("buckets/{bucket}/name")).unwrap(),
                format!("some-{bucket}-bucket").as_str()
            );
        }
    }

    #[test]
    fn test_access_keys_when_iam_profiles_disabled() {
        let manifest = render(&with_access_keys(input()));
        assert_uses_access_keys(job(&manifest, VERSIONED_RESTORER));
    }

    #[test]
    fn test_iam_profile_when_enabled() {
        let manifest = render(&input().iam_instance_profile(true));
        assert_uses_iam_profile(job(&manifest, VERSIONED_RESTORER));
    }

    #[test]
    fn test_iam_profile_wins_over_supplied_keys() {
        let input = input()
            .iam_instance_profile(true)
            .access_keys("some-access-key-id", "some-secret-access-key");
        let manifest = render(&input);
        assert_uses_iam_profile(job(&manifest, VERSIONED_RESTORER));
    }

    #[test]
    fn test_versioned_restorer_has_no_backup_buckets() {
        let manifest = render(&input().backup("some-backup-region"));
        let job = job(&manifest, VERSIONED_RESTORER);
        let err = job.property("buckets/droplets/backup/region").unwrap_err();
        assert!(err.is_not_found());
    }
}

// =============================================================================
// External blobstore without versioning
// =============================================================================

mod versioning_disabled {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input() -> BlobstoreInput {
        BlobstoreInput::external().backup("some-backup-region")
    }

    #[test]
    fn test_disables_versioned_and_enables_unversioned_restorer() {
        let manifest = render(&input());
        assert_enabled(&manifest, VERSIONED_RESTORER, false);
        assert_enabled(&manifest, UNVERSIONED_RESTORER, true);
    }

    #[test]
    fn test_explicit_false_matches_absent_versioning() {
        assert_eq!(render(&input()), render(&input().versioned(false)));
    }

    #[test]
    fn test_backup_buckets_and_region() {
        let manifest = render(&input());
        let job = job(&manifest, UNVERSIONED_RESTORER);
        for bucket in BUCKETS {
            assert_eq!(
                job.property(&format!("buckets/{bucket}/backup/region")).unwrap(),
                "some-backup-region"
            );
            assert_eq!(
                job.property(&format!("buckets/{bucket}/backup/name")).unwrap(),
                format!("some-{bucket}-backup-bucket").as_str()
            );
            assert_eq!(
                job.property(&format!("buckets/{bucket}/name")).unwrap(),
                format!("some-{bucket}-bucket").as_str()
            );
        }
    }

    #[test]
    fn test_access_keys_when_iam_profiles_disabled() {
        let manifest = render(&with_access_keys(input()));
        assert_uses_access_keys(job(&manifest, UNVERSIONED_RESTORER));
    }

    #[test]
    fn test_iam_profile_when_enabled() {
        let manifest = render(&input().iam_instance_profile(true));
        assert_uses_iam_profile(job(&manifest, UNVERSIONED_RESTORER));
    }

    #[test]
    fn test_primary_region_is_bound_when_supplied() {
        let manifest = render(&input().region("some-region"));
        let job = job(&manifest, UNVERSIONED_RESTORER);
        assert_eq!(job.property("buckets/packages/region").unwrap(), "some-region");
        assert_eq!(
            job.property("buckets/packages/backup/region").unwrap(),
            "some-backup-region"
        );
    }
}

// =============================================================================
// Internal blobstore
// =============================================================================

mod internal_blobstore {
    use super::*;

    #[test]
    fn test_both_restorers_disabled() {
        let manifest = render(&BlobstoreInput::internal());
        assert_enabled(&manifest, VERSIONED_RESTORER, false);
        assert_enabled(&manifest, UNVERSIONED_RESTORER, false);
    }

    #[test]
    fn test_bucket_defaults_are_left_bare() {
        let manifest = render(&BlobstoreInput::internal());
        let job = job(&manifest, VERSIONED_RESTORER);
        let err = job.property("buckets/droplets/name").unwrap_err();
        assert!(err.is_not_found());
        assert!(job.property("buckets/droplets").is_ok());
    }
}

// =============================================================================
// Queries
// =============================================================================

mod queries {
    use super::*;
    use pretty_assertions::assert_eq;
    use manifest_core::Error;

    #[test]
    fn test_unknown_bucket_names_the_failing_segment() {
        let manifest = render(&BlobstoreInput::external().versioned(true));
        let err = job(&manifest, VERSIONED_RESTORER)
            .property("buckets/unknown-bucket/name")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Tree(manifest_tree::Error::NotFound { ref segment, .. }) if segment == "unknown-bucket"
        ));
    }

    #[test]
    fn test_unknown_group_and_job() {
        let manifest = render(&BlobstoreInput::internal());
        assert!(matches!(
            manifest.find_instance_group_job("compute", VERSIONED_RESTORER),
            Err(Error::InstanceGroupNotFound { .. })
        ));
        assert!(matches!(
            manifest.find_instance_group_job(BACKUP_PREPARE, "gcs-blobstore-backup-restorer"),
            Err(Error::JobNotFound { .. })
        ));
    }

    #[test]
    fn test_manifest_serializes_as_plain_data() {
        let manifest = render(&BlobstoreInput::external().versioned(true));
        let json = serde_json::to_value(&manifest).unwrap();
        let jobs = &json["instance_groups"][0]["jobs"];
        assert_eq!(jobs[0]["name"], VERSIONED_RESTORER);
        assert_eq!(jobs[0]["enabled"], true);
        assert_eq!(
            jobs[0]["properties"]["buckets"]["droplets"]["name"],
            "some-droplets-bucket"
        );
    }

    #[test]
    fn test_rendered_manifest_outlives_template_and_input() {
        let manifest = {
            let spec = system_blobstore_spec();
            let input = BlobstoreInput::external().versioned(true).tree();
            ManifestRenderer::new(&spec)
                .unwrap()
                .render_manifest(&input)
                .unwrap()
        };
        assert!(job(&manifest, VERSIONED_RESTORER).is_enabled());
    }
}

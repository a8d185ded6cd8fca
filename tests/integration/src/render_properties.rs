//! Property-based checks over the system blobstore template
//!
//! Inputs are drawn from every combination the template reads (versioning,
//! authentication mode, credentials, backup buckets, region) and the
//! manifest-level guarantees are checked for each.

use std::thread;

use manifest_core::{Error, ManifestRenderer, RenderedManifest};
use manifest_test_utils::blobstore::{BACKUP_PREPARE, UNVERSIONED_RESTORER, VERSIONED_RESTORER};
use manifest_test_utils::{BUCKETS, BlobstoreInput, system_blobstore_spec};
use manifest_tree::PropertyValue;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

fn render(properties: Vec<(String, PropertyValue)>) -> Result<RenderedManifest, Error> {
    let spec = system_blobstore_spec();
    ManifestRenderer::new(&spec)?.render_properties(properties)
}

fn enabled_restorers(manifest: &RenderedManifest) -> Vec<&str> {
    [VERSIONED_RESTORER, UNVERSIONED_RESTORER]
        .into_iter()
        .filter(|name| {
            manifest
                .find_instance_group_job(BACKUP_PREPARE, name)
                .unwrap()
                .is_enabled()
        })
        .collect()
}

prop_compose! {
    fn external_input()(
        versioning in proptest::option::of(any::<bool>()),
        iam in proptest::option::of(any::<bool>()),
        keys in any::<bool>(),
        backup in proptest::option::of("[a-z]{2}-[a-z]{4,9}-[1-3]"),
        region in proptest::option::of("[a-z]{2}-[a-z]{4,9}-[1-3]"),
    ) -> BlobstoreInput {
        let mut input = BlobstoreInput::external();
        if let Some(versioning) = versioning {
            input = input.versioned(versioning);
        }
        if let Some(iam) = iam {
            input = input.iam_instance_profile(iam);
        }
        if keys {
            input = input.access_keys("some-access-key-id", "some-secret-access-key");
        }
        if let Some(backup) = backup {
            input = input.backup(&backup);
        }
        if let Some(region) = region {
            input = input.region(&region);
        }
        input
    }
}

proptest! {
    #[test]
    fn prop_render_is_deterministic(input in external_input()) {
        let first = render(input.properties().to_vec()).unwrap();
        let second = render(input.into_properties()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_input_order_does_not_matter(
        shuffled in Just(
            BlobstoreInput::external()
                .iam_instance_profile(false)
                .access_keys("some-access-key-id", "some-secret-access-key")
                .backup("some-backup-region")
                .into_properties()
        ).prop_shuffle()
    ) {
        let expected = render(
            BlobstoreInput::external()
                .iam_instance_profile(false)
                .access_keys("some-access-key-id", "some-secret-access-key")
                .backup("some-backup-region")
                .into_properties(),
        )
        .unwrap();
        prop_assert_eq!(render(shuffled).unwrap(), expected);
    }

    #[test]
    fn prop_exactly_one_restorer_for_external_blobstore(input in external_input()) {
        let manifest = render(input.into_properties()).unwrap();
        prop_assert_eq!(enabled_restorers(&manifest).len(), 1);
    }

    #[test]
    fn prop_enabled_restorer_follows_versioning(input in external_input()) {
        let versioned = input
            .tree()
            .get(".properties.system_blobstore.external.versioning")
            .ok()
            .and_then(PropertyValue::as_bool)
            .unwrap_or(false);
        let manifest = render(input.into_properties()).unwrap();
        let expected = if versioned { VERSIONED_RESTORER } else { UNVERSIONED_RESTORER };
        prop_assert_eq!(enabled_restorers(&manifest), vec![expected]);
    }

    #[test]
    fn prop_buckets_never_mix_iam_and_keys(input in external_input()) {
        let manifest = render(input.into_properties()).unwrap();
        for (_, job) in manifest.jobs() {
            for bucket in BUCKETS {
                let properties = job.property(&format!("buckets/{bucket}")).unwrap();
                prop_assert!(
                    !(properties.contains_key("use_iam_profile")
                        && properties.contains_key("aws_access_key_id")),
                    "{}/{bucket} carries both authentication modes",
                    job.name()
                );
            }
        }
    }

    #[test]
    fn prop_enabled_flag_matches_property(input in external_input()) {
        let manifest = render(input.into_properties()).unwrap();
        for (_, job) in manifest.jobs() {
            prop_assert_eq!(job.property("enabled").unwrap().as_bool(), Some(job.is_enabled()));
        }
    }
}

#[test]
fn test_internal_blobstore_enables_no_restorer() {
    let manifest = render(BlobstoreInput::internal().into_properties()).unwrap();
    assert!(enabled_restorers(&manifest).is_empty());
}

#[test]
fn test_concurrent_renders_share_one_template() {
    let spec = system_blobstore_spec();
    let renderer = ManifestRenderer::new(&spec).unwrap();
    let inputs = [
        BlobstoreInput::external().versioned(true).tree(),
        BlobstoreInput::external().backup("some-backup-region").tree(),
        BlobstoreInput::internal().tree(),
    ];
    let expected: Vec<_> = inputs
        .iter()
        .map(|input| renderer.render_manifest(input).unwrap())
        .collect();

    thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| scope.spawn(move || renderer.render_manifest(input).unwrap()))
            .collect();
        for (handle, expected) in handles.into_iter().zip(&expected) {
            assert_eq!(&handle.join().unwrap(), expected);
        }
    });
}

#[rstest]
#[case::empty_segment(".properties..versioning")]
#[case::trailing_dot(".properties.system_blobstore.")]
#[case::empty_key("")]
fn test_malformed_input_keys_are_rejected(#[case] key: &str) {
    let mut properties = BlobstoreInput::external().into_properties();
    properties.push((key.to_string(), PropertyValue::from(true)));
    let err = render(properties).unwrap_err();
    assert!(
        matches!(err, Error::Tree(manifest_tree::Error::InvalidKey { .. })),
        "{key}: {err}"
    );
}

#[rstest]
#[case::duplicate_key(
    ".properties.system_blobstore.external.versioning",
    PropertyValue::from(false)
)]
#[case::child_of_mapping_value(
    ".properties.system_blobstore.external.secret_key.secret",
    PropertyValue::from("other")
)]
fn test_conflicting_input_is_rejected(#[case] key: &str, #[case] value: PropertyValue) {
    let mut properties = BlobstoreInput::external()
        .versioned(true)
        .access_keys("some-access-key-id", "some-secret-access-key")
        .into_properties();
    properties.push((key.to_string(), value));
    let err = render(properties).unwrap_err();
    assert!(
        matches!(err, Error::Tree(manifest_tree::Error::ConflictingPath { .. })),
        "{key}: {err}"
    );
}

#[test]
fn test_reserved_selector_key_is_rejected() {
    let mut properties = BlobstoreInput::external().into_properties();
    properties.push((
        ".properties.system_blobstore.selected_option".to_string(),
        PropertyValue::from("internal"),
    ));
    let err = render(properties).unwrap_err();
    assert!(matches!(
        err,
        Error::Tree(manifest_tree::Error::ReservedKey { .. })
    ));
}

//! Shared test fixtures for the manifest rendering workspace.
//!
//! This crate gives every test suite the same templates and input builders
//! instead of each suite spelling out its own. It is a dev-dependency only,
//! never published.
//!
//! # Modules
//!
//! - [`blobstore`]: the system blobstore backup template and an input
//!   builder covering every property it reads

pub mod blobstore;

pub use blobstore::{BUCKETS, BlobstoreInput, system_blobstore_spec};

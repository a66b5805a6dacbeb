//! S3-compatible object store gateway.
//!
//! This crate provides:
//! - File fetch/publish against `(bucket, key)` addressing
//! - Processed-artifact key derivation (`processed/` namespace)
//! - Local staging path derivation for downloads and outputs
//! - Object-key validation

pub mod client;
pub mod error;
pub mod keys;

pub use client::{ObjectStore, StoreConfig};
pub use error::{StorageError, StorageResult};
pub use keys::{download_path, guess_content_type, output_path, processed_object_key, validate_key};

//! Storage abstraction for Statement Vault.
//!
//! The [`StatementStore`] trait is the repository port the engine writes
//! and reads through: blob content on one side, metadata rows on the
//! other. Implementations must be `Send + Sync` so one store can back a
//! whole concurrent batch.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewStatement, StatementRecord};

/// Predicates for a metadata query, already validated by the caller.
///
/// The last name matches as a case-insensitive prefix; birth year is an
/// exact match; contact digits filter only when present.
#[derive(Debug, Clone)]
pub struct StatementFilter {
    pub last_name_prefix: String,
    pub birth_year: i32,
    pub contact_digits: Option<String>,
}

/// Failures surfaced by store implementations.
///
/// Blob and metadata causes stay distinguishable so batch failures can be
/// reported with the original error attached.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob '{key}' already exists and overwrite is disabled")]
    BlobExists { key: String },
    #[error("blob transport failed for '{key}': {source}")]
    BlobTransport {
        key: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("blob store rejected '{key}' (HTTP {status}): {body}")]
    BlobStatus {
        key: String,
        status: u16,
        body: String,
    },
    #[error("blob I/O failed for '{key}': {source}")]
    BlobIo {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bucket credentials missing: {0} not set")]
    MissingCredentials(&'static str),
    #[error("metadata store error: {0}")]
    Metadata(#[from] sqlx::Error),
}

/// Abstract statement storage: blobs plus queryable metadata.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`put_blob`](StatementStore::put_blob) | Write statement bytes under a key |
/// | [`public_url_for`](StatementStore::public_url_for) | Derive the retrieval URL for a key |
/// | [`insert_metadata`](StatementStore::insert_metadata) | Upsert the metadata row for a filename |
/// | [`query_metadata`](StatementStore::query_metadata) | Fetch records matching an identity filter |
#[async_trait]
pub trait StatementStore: Send + Sync {
    /// Write statement bytes under `key`, returning the stored locator.
    ///
    /// With `overwrite` disabled an existing blob under the same key is an
    /// error ([`StoreError::BlobExists`]) and nothing is written.
    async fn put_blob(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        overwrite: bool,
    ) -> Result<String, StoreError>;

    /// Derive the public retrieval URL for a stored key. Pure computation.
    fn public_url_for(&self, key: &str) -> String;

    /// Insert or update the metadata row keyed by `file_name`.
    ///
    /// Returns the stored record; `id` and `created_at` come from the
    /// first insert and survive re-uploads.
    async fn insert_metadata(&self, new: NewStatement) -> Result<StatementRecord, StoreError>;

    /// Fetch records matching the filter, in the store's natural order.
    async fn query_metadata(
        &self,
        filter: StatementFilter,
    ) -> Result<Vec<StatementRecord>, StoreError>;
}

//! Core data models used throughout Statement Vault.
//!
//! These types represent the identities, upload candidates, and stored
//! statement records that flow through the ingestion and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Patient identity derived from a statement filename.
///
/// Immutable once parsed: `last_name` is normalized (first letter upper,
/// rest lower), `birth_year` is range-checked, and `contact_digits` has
/// exactly the configured digit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub last_name: String,
    pub birth_year: i32,
    pub contact_digits: String,
}

/// A file selected for ingestion, before any validation.
///
/// Exists only for the duration of one batch call; it is consumed into a
/// [`StatementRecord`] or discarded with a per-candidate failure.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub declared_size: i64,
    /// MIME type declared by the caller (derived from the file extension
    /// by the CLI). Only `application/pdf` candidates enter the batch.
    pub content_type: String,
}

/// Persisted statement metadata plus its blob locator.
///
/// Owned by the store: `id` and `created_at` are assigned on first insert
/// and survive re-uploads of the same filename.
#[derive(Debug, Clone, Serialize)]
pub struct StatementRecord {
    pub id: String,
    pub file_name: String,
    pub byte_size: i64,
    pub created_at: DateTime<Utc>,
    pub identity: Identity,
    pub blob_key: String,
    pub blob_url: Option<String>,
}

/// Arguments for a metadata upsert. The store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewStatement {
    pub file_name: String,
    pub byte_size: i64,
    pub identity: Identity,
    pub blob_key: String,
    pub blob_url: Option<String>,
}

/// Fields a patient supplies to retrieve their statements. Not persisted.
///
/// `birth_year` stays a string here; the query builder validates the
/// 4-digit format before it is parsed.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    pub last_name: String,
    pub birth_year: String,
    pub contact_digits: Option<String>,
}

//! In-memory [`StatementStore`] implementation.
//!
//! Backs the engine tests and doubles as a scratch store. Blobs live in a
//! `HashMap`, metadata rows in a `Vec`, both behind `std::sync::RwLock`
//! for thread safety. Query results come back in insertion order.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{NewStatement, StatementRecord};

use super::{StatementFilter, StatementStore, StoreError};

struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

/// In-memory store for tests and ephemeral runs.
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
    records: RwLock<Vec<StatementRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored blobs.
    pub fn blob_count(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    /// Number of metadata rows.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Stored bytes for a key, if present.
    pub fn blob_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.read().unwrap().get(key).map(|b| b.bytes.clone())
    }

    /// Declared content type for a key, if present.
    pub fn blob_content_type(&self, key: &str) -> Option<String> {
        self.blobs
            .read()
            .unwrap()
            .get(key)
            .map(|b| b.content_type.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatementStore for MemoryStore {
    async fn put_blob(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        overwrite: bool,
    ) -> Result<String, StoreError> {
        let mut blobs = self.blobs.write().unwrap();
        if !overwrite && blobs.contains_key(key) {
            return Err(StoreError::BlobExists {
                key: key.to_string(),
            });
        }
        blobs.insert(
            key.to_string(),
            StoredBlob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(key.to_string())
    }

    fn public_url_for(&self, key: &str) -> String {
        format!("memory://statements/{}", key)
    }

    async fn insert_metadata(&self, new: NewStatement) -> Result<StatementRecord, StoreError> {
        let mut records = self.records.write().unwrap();
        match records.iter_mut().find(|r| r.file_name == new.file_name) {
            Some(existing) => {
                // Upsert keeps the original id and created_at.
                existing.byte_size = new.byte_size;
                existing.identity = new.identity;
                existing.blob_key = new.blob_key;
                existing.blob_url = new.blob_url;
                Ok(existing.clone())
            }
            None => {
                let record = StatementRecord {
                    id: Uuid::new_v4().to_string(),
                    file_name: new.file_name,
                    byte_size: new.byte_size,
                    created_at: Utc::now(),
                    identity: new.identity,
                    blob_key: new.blob_key,
                    blob_url: new.blob_url,
                };
                records.push(record.clone());
                Ok(record)
            }
        }
    }

    async fn query_metadata(
        &self,
        filter: StatementFilter,
    ) -> Result<Vec<StatementRecord>, StoreError> {
        let prefix = filter.last_name_prefix.to_ascii_lowercase();
        let records = self.records.read().unwrap();
        let matches = records
            .iter()
            .filter(|r| {
                r.identity
                    .last_name
                    .to_ascii_lowercase()
                    .starts_with(&prefix)
                    && r.identity.birth_year == filter.birth_year
                    && filter
                        .contact_digits
                        .as_ref()
                        .map_or(true, |contact| &r.identity.contact_digits == contact)
            })
            .cloned()
            .collect();
        Ok(matches)
    }
}

//! SQLite-backed [`StatementStore`] implementation.
//!
//! Metadata rows live in the `statements` table; blob content goes
//! through the configured [`Blobs`] backend. One row per filename, so a
//! re-upload of the same statement updates in place.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::blob::Blobs;
use crate::models::{Identity, NewStatement, StatementRecord};
use crate::store::{StatementFilter, StatementStore, StoreError};

/// SQLite implementation of the [`StatementStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    blobs: Blobs,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, blobs: Blobs) -> Self {
        Self { pool, blobs }
    }
}

fn record_time(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Escape LIKE wildcards so a stored name never acts as a pattern.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> StatementRecord {
    let created_at: i64 = row.get("created_at");
    StatementRecord {
        id: row.get("id"),
        file_name: row.get("file_name"),
        byte_size: row.get("byte_size"),
        created_at: record_time(created_at),
        identity: Identity {
            last_name: row.get("last_name"),
            birth_year: row.get("birth_year"),
            contact_digits: row.get("contact_digits"),
        },
        blob_key: row.get("blob_key"),
        blob_url: row.get("blob_url"),
    }
}

#[async_trait]
impl StatementStore for SqliteStore {
    async fn put_blob(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        overwrite: bool,
    ) -> Result<String, StoreError> {
        self.blobs.put(key, bytes, content_type, overwrite).await?;
        Ok(key.to_string())
    }

    fn public_url_for(&self, key: &str) -> String {
        self.blobs.public_url(key)
    }

    async fn insert_metadata(&self, new: NewStatement) -> Result<StatementRecord, StoreError> {
        // Single upsert statement: on conflict the update leaves id and
        // created_at alone, so RETURNING always reports the surviving row.
        // Concurrent uploads of the same filename therefore all get the
        // identity that is actually persisted.
        let (id, created_at): (String, i64) = sqlx::query_as(
            r#"
            INSERT INTO statements (id, file_name, byte_size, created_at,
                                    last_name, birth_year, contact_digits,
                                    blob_key, blob_url)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(file_name) DO UPDATE SET
                byte_size = excluded.byte_size,
                last_name = excluded.last_name,
                birth_year = excluded.birth_year,
                contact_digits = excluded.contact_digits,
                blob_key = excluded.blob_key,
                blob_url = excluded.blob_url
            RETURNING id, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&new.file_name)
        .bind(new.byte_size)
        .bind(Utc::now().timestamp())
        .bind(&new.identity.last_name)
        .bind(new.identity.birth_year)
        .bind(&new.identity.contact_digits)
        .bind(&new.blob_key)
        .bind(&new.blob_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(StatementRecord {
            id,
            file_name: new.file_name,
            byte_size: new.byte_size,
            created_at: record_time(created_at),
            identity: new.identity,
            blob_key: new.blob_key,
            blob_url: new.blob_url,
        })
    }

    async fn query_metadata(
        &self,
        filter: StatementFilter,
    ) -> Result<Vec<StatementRecord>, StoreError> {
        let prefix = format!("{}%", escape_like(&filter.last_name_prefix));

        // SQLite LIKE is ASCII case-insensitive, which is exactly the
        // prefix semantics callers expect.
        let rows = match &filter.contact_digits {
            Some(contact) => {
                sqlx::query(
                    r#"
                    SELECT id, file_name, byte_size, created_at,
                           last_name, birth_year, contact_digits, blob_key, blob_url
                    FROM statements
                    WHERE last_name LIKE ? ESCAPE '\'
                      AND birth_year = ?
                      AND contact_digits = ?
                    ORDER BY created_at DESC, id ASC
                    "#,
                )
                .bind(&prefix)
                .bind(filter.birth_year)
                .bind(contact)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, file_name, byte_size, created_at,
                           last_name, birth_year, contact_digits, blob_key, blob_url
                    FROM statements
                    WHERE last_name LIKE ? ESCAPE '\'
                      AND birth_year = ?
                    ORDER BY created_at DESC, id ASC
                    "#,
                )
                .bind(&prefix)
                .bind(filter.birth_year)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(row_to_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("Smith"), "Smith");
        assert_eq!(escape_like("Sm%th"), "Sm\\%th");
        assert_eq!(escape_like("Sm_th"), "Sm\\_th");
        assert_eq!(escape_like("S\\m"), "S\\\\m");
    }

    #[test]
    fn record_time_survives_bad_timestamps() {
        assert_eq!(record_time(0), DateTime::UNIX_EPOCH);
        assert_eq!(record_time(i64::MAX), DateTime::UNIX_EPOCH);
    }
}

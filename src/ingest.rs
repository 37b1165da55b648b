//! Batch ingestion orchestration.
//!
//! Coordinates one upload batch end to end: content-type filtering, the
//! authentication gate, identity parsing, chunked concurrent writes
//! through the store, and per-chunk progress. One bad candidate never
//! aborts the batch; every failure is captured next to the successes.

use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;

use crate::auth::AuthProvider;
use crate::identity::{self, IdentityPolicy, ParseRejection};
use crate::models::{NewStatement, StatementRecord, UploadCandidate};
use crate::progress::{BatchProgress, ProgressReporter};
use crate::store::{StatementStore, StoreError};

/// The only content type accepted into a batch.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Whole-batch failures. Everything per-candidate lands in
/// [`BatchReport::failed`] instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("authentication required before statements can be ingested")]
    AuthenticationRequired,
}

/// Why a single candidate failed.
#[derive(Debug, Error)]
pub enum UploadFailure {
    #[error(transparent)]
    Rejected(#[from] ParseRejection),
    #[error("storage write failed: {source}")]
    Storage {
        #[source]
        source: StoreError,
    },
}

/// One failed candidate with its structured reason.
#[derive(Debug)]
pub struct FailedUpload {
    pub file_name: String,
    pub reason: UploadFailure,
}

/// Outcome of one batch: successes and failures side by side, plus the
/// count of candidates excluded by the content-type filter.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<StatementRecord>,
    pub failed: Vec<FailedUpload>,
    pub skipped: usize,
}

impl BatchReport {
    /// Batch-level success means nothing failed. Retry is a caller
    /// decision driven by [`failed`](BatchReport::failed).
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives upload batches against an injected store and auth provider.
pub struct Ingestor {
    store: Arc<dyn StatementStore>,
    auth: Arc<dyn AuthProvider>,
    policy: IdentityPolicy,
    overwrite: bool,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn StatementStore>,
        auth: Arc<dyn AuthProvider>,
        policy: IdentityPolicy,
        overwrite: bool,
    ) -> Self {
        Self {
            store,
            auth,
            policy,
            overwrite,
        }
    }

    /// Ingest a batch of candidates.
    ///
    /// Candidates whose declared content type is not PDF are excluded up
    /// front and counted in [`BatchReport::skipped`], not reported as
    /// failures; a batch with nothing left after the filter returns empty
    /// lists without consulting auth or storage. An unauthenticated caller
    /// fails the whole batch with [`IngestError::AuthenticationRequired`]
    /// before any storage I/O.
    ///
    /// Accepted candidates are processed in chunks of `chunk_size`
    /// (clamped to at least 1): chunks run sequentially, candidates
    /// within a chunk run concurrently, and the chunk boundary is a
    /// barrier. After each chunk settles the reporter receives the
    /// cumulative [`BatchProgress`]; the total is fixed at batch start.
    pub async fn ingest(
        &self,
        candidates: Vec<UploadCandidate>,
        chunk_size: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchReport, IngestError> {
        let mut report = BatchReport::default();

        let (accepted, rejected): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|c| c.content_type == PDF_CONTENT_TYPE);
        report.skipped = rejected.len();

        // Nothing left after the type filter: report back without touching
        // auth or storage.
        if accepted.is_empty() {
            tracing::debug!(skipped = report.skipped, "no PDF candidates in batch");
            return Ok(report);
        }

        let session = self
            .auth
            .current_session()
            .ok_or(IngestError::AuthenticationRequired)?;
        tracing::debug!(
            subject = %session.subject,
            candidates = accepted.len(),
            "starting upload batch"
        );

        let total = accepted.len() as u64;
        let chunk_size = chunk_size.max(1);
        let mut done = 0u64;

        for chunk in accepted.chunks(chunk_size) {
            let settled = join_all(chunk.iter().map(|candidate| self.upload_one(candidate))).await;
            done = (done + chunk.len() as u64).min(total);

            for (candidate, outcome) in chunk.iter().zip(settled) {
                match outcome {
                    Ok(record) => report.succeeded.push(record),
                    Err(reason) => {
                        tracing::warn!(
                            file = %candidate.file_name,
                            error = %reason,
                            "statement upload failed"
                        );
                        report.failed.push(FailedUpload {
                            file_name: candidate.file_name.clone(),
                            reason,
                        });
                    }
                }
            }

            progress.report(BatchProgress {
                completed: done,
                total,
            });
        }

        tracing::debug!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped,
            "upload batch settled"
        );
        Ok(report)
    }

    async fn upload_one(
        &self,
        candidate: &UploadCandidate,
    ) -> Result<StatementRecord, UploadFailure> {
        let parsed = identity::parse_file_name(&candidate.file_name, &self.policy)?;

        let key = self
            .store
            .put_blob(
                &candidate.file_name,
                &candidate.bytes,
                PDF_CONTENT_TYPE,
                self.overwrite,
            )
            .await
            .map_err(|source| UploadFailure::Storage { source })?;
        let blob_url = self.store.public_url_for(&key);

        self.store
            .insert_metadata(NewStatement {
                file_name: candidate.file_name.clone(),
                byte_size: candidate.declared_size,
                identity: parsed,
                blob_key: key,
                blob_url: Some(blob_url),
            })
            .await
            .map_err(|source| UploadFailure::Storage { source })
    }
}

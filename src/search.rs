//! Statement retrieval queries.
//!
//! Validates patient-supplied criteria, normalizes them to the same
//! rules the ingestion parser applies, and queries the store. Matching
//! is a case-insensitive prefix on the last name, exact on the birth
//! year, and exact on the contact digits when they are supplied at all.
//! Result order is whatever the store returns; no results is an empty
//! vector, not an error.

use std::sync::Arc;

use thiserror::Error;

use crate::identity::IdentityPolicy;
use crate::models::{SearchCriteria, StatementRecord};
use crate::store::{StatementFilter, StatementStore, StoreError};

/// Why criteria were rejected or a query failed.
///
/// Validation variants are raised before any query executes.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("missing required field: {field}")]
    MissingRequiredField { field: &'static str },
    #[error("birth year must be exactly 4 digits, got '{value}'")]
    InvalidYearFormat { value: String },
    #[error("contact number must be exactly {expected} digits, got '{value}'")]
    InvalidContactFormat { value: String, expected: usize },
    #[error("statement query failed: {0}")]
    QueryFailed(#[source] StoreError),
}

/// Runs identity searches against an injected store.
pub struct Searcher {
    store: Arc<dyn StatementStore>,
    policy: IdentityPolicy,
}

impl Searcher {
    pub fn new(store: Arc<dyn StatementStore>, policy: IdentityPolicy) -> Self {
        Self { store, policy }
    }

    /// Validate the criteria and fetch matching statements.
    pub async fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<StatementRecord>, SearchError> {
        let filter = build_filter(criteria, &self.policy)?;
        self.store
            .query_metadata(filter)
            .await
            .map_err(SearchError::QueryFailed)
    }
}

/// Turn raw criteria into a store filter, or reject them.
///
/// Checks run in order: required fields, then the 4-digit year format,
/// then the contact format (only when contact digits were supplied).
/// Omitted contact digits mean the query does not filter on that field.
fn build_filter(
    criteria: &SearchCriteria,
    policy: &IdentityPolicy,
) -> Result<StatementFilter, SearchError> {
    if criteria.last_name.is_empty() {
        return Err(SearchError::MissingRequiredField { field: "last_name" });
    }
    if criteria.birth_year.is_empty() {
        return Err(SearchError::MissingRequiredField {
            field: "birth_year",
        });
    }
    if criteria.birth_year.len() != 4 || !criteria.birth_year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SearchError::InvalidYearFormat {
            value: criteria.birth_year.clone(),
        });
    }
    if let Some(contact) = &criteria.contact_digits {
        if contact.len() != policy.contact_digits || !contact.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SearchError::InvalidContactFormat {
                value: contact.clone(),
                expected: policy.contact_digits,
            });
        }
    }

    let birth_year: i32 = criteria
        .birth_year
        .parse()
        .map_err(|_| SearchError::InvalidYearFormat {
            value: criteria.birth_year.clone(),
        })?;

    Ok(StatementFilter {
        last_name_prefix: criteria.last_name.clone(),
        birth_year,
        contact_digits: criteria.contact_digits.clone(),
    })
}

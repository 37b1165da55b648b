//! # Statement Vault
//!
//! An ingestion and retrieval engine for patient billing statements.
//!
//! Statement Vault takes batches of PDF statement files whose names carry
//! the patient identity (`<lastname>_<birthyear>_<contact>.pdf`), validates
//! and parses each name, stores the file content in a blob backend, and
//! records the parsed identity in SQLite so statements can be found again
//! by the patient they belong to.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │ PDF batches │──▶│  Ingestor   │──▶│ Blob store  │
//! │ (filenames) │   │ parse+store │   │ local / S3  │
//! └─────────────┘   └──────┬──────┘   └─────────────┘
//!                          │
//!                          ▼
//!                   ┌─────────────┐   ┌─────────────┐
//!                   │   SQLite    │◀──│  Searcher   │
//!                   │  metadata   │   │ by identity │
//!                   └─────────────┘   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! stmt init                                # create database
//! stmt upload ./statements/                # upload a directory of PDFs
//! stmt upload a.pdf b.pdf --progress json  # explicit files, JSON progress
//! stmt search smith 1984                   # find statements by identity
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`identity`] | Filename grammar and identity parsing |
//! | [`ingest`] | Chunked concurrent upload batches |
//! | [`search`] | Identity prefix search |
//! | [`store`] | Storage port, in-memory and SQLite backends |
//! | [`blob`] | Local and S3-compatible blob transport |
//! | [`auth`] | Operator session check |
//! | [`progress`] | Batch progress reporting |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod auth;
pub mod blob;
pub mod config;
pub mod db;
pub mod identity;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod search;
pub mod store;

//! # Statement Vault CLI (`stmt`)
//!
//! The `stmt` binary is the operator interface for Statement Vault. It
//! provides commands for database initialization, batch statement upload,
//! and identity search.
//!
//! ## Usage
//!
//! ```bash
//! stmt --config ./config/stmt.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stmt init` | Create the SQLite database and run schema migrations |
//! | `stmt upload <path>...` | Upload PDF statements from files or directories |
//! | `stmt search <last-name> <birth-year>` | Find statements by patient identity |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! stmt init --config ./config/stmt.toml
//!
//! # Upload every statement in a directory
//! stmt upload ./statements/
//!
//! # Upload explicit files with JSON progress on stderr
//! stmt upload smith_1984_5550123456.pdf jones_1972_5550199887.pdf --progress json
//!
//! # Find statements for Smith, born 1984
//! stmt search smith 1984
//!
//! # Narrow by contact number, print JSON
//! stmt search smith 1984 --contact 5550123456 --json
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use statement_vault::auth::EnvAuth;
use statement_vault::blob::{Blobs, LocalBlobs, ObjectClient};
use statement_vault::config::{self, Config, StorageConfig};
use statement_vault::db;
use statement_vault::ingest::{BatchReport, Ingestor, PDF_CONTENT_TYPE};
use statement_vault::migrate;
use statement_vault::models::{SearchCriteria, StatementRecord, UploadCandidate};
use statement_vault::progress::ProgressMode;
use statement_vault::search::Searcher;
use statement_vault::store::sqlite::SqliteStore;

/// Statement Vault CLI.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/stmt.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "stmt",
    about = "Ingestion and retrieval for patient billing statements",
    version,
    long_about = "Statement Vault ingests batches of PDF billing statements named \
    <lastname>_<birthyear>_<contact>.pdf, stores the files in a local directory or an \
    S3-compatible bucket, and indexes the parsed identities in SQLite for prefix search."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/stmt.toml`. Database, identity, batching, and
    /// storage settings are read from this file.
    #[arg(long, global = true, default_value = "./config/stmt.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the statements table. This
    /// command is idempotent; running it multiple times is safe.
    Init,

    /// Upload PDF statements.
    ///
    /// Accepts files and directories; directories are walked recursively.
    /// Filenames must follow `<lastname>_<birthyear>_<contact>.pdf`.
    /// Non-PDF files are set aside before the batch starts; candidates
    /// that fail to parse or store are reported individually without
    /// aborting the rest of the batch.
    ///
    /// Requires an operator identity in the `STMT_OPERATOR` environment
    /// variable.
    Upload {
        /// Files or directories to upload.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Progress reporting on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,

        /// Override the batch chunk size from config.
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Find statements by patient identity.
    ///
    /// The last name matches case-insensitively as a prefix; the birth
    /// year must be the exact 4-digit year. Results print newest first.
    Search {
        /// Last name or prefix (case-insensitive).
        last_name: String,

        /// Birth year, exactly 4 digits.
        birth_year: String,

        /// Narrow to an exact contact number.
        #[arg(long)]
        contact: Option<String>,

        /// Print results as JSON instead of the human listing.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Upload {
            paths,
            progress,
            chunk_size,
        } => {
            let clean = run_upload(&cfg, &paths, progress.as_deref(), chunk_size).await?;
            if !clean {
                std::process::exit(1);
            }
        }
        Commands::Search {
            last_name,
            birth_year,
            contact,
            json,
        } => {
            run_search(&cfg, last_name, birth_year, contact, json).await?;
        }
    }

    Ok(())
}

/// Open the SQLite store with the configured blob backend. Applies the
/// schema on the way in so a fresh database works without `stmt init`.
async fn open_store(cfg: &Config) -> Result<SqliteStore> {
    let pool = db::connect(cfg).await?;
    migrate::apply(&pool).await?;
    let blobs = build_blobs(&cfg.storage)?;
    Ok(SqliteStore::new(pool, blobs))
}

fn build_blobs(storage: &StorageConfig) -> Result<Blobs> {
    if storage.is_bucket() {
        let client = ObjectClient::from_env(
            storage.bucket.clone(),
            storage.region.clone(),
            storage.endpoint_url.clone(),
            storage.public_base_url.clone(),
        )?;
        Ok(Blobs::Bucket(client))
    } else {
        Ok(Blobs::Local(LocalBlobs::new(storage.blob_dir.clone())))
    }
}

/// Collect upload candidates from the given files and directories.
///
/// Directories are walked recursively. The content type comes from the
/// file extension; non-PDF files are still passed along so the batch can
/// count them as skipped.
fn gather_candidates(paths: &[PathBuf]) -> Result<Vec<UploadCandidate>> {
    let mut candidates = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(false) {
                let entry = entry?;
                if entry.file_type().is_file() {
                    candidates.push(read_candidate(entry.path())?);
                }
            }
        } else {
            candidates.push(read_candidate(path)?);
        }
    }
    Ok(candidates)
}

fn read_candidate(path: &Path) -> Result<UploadCandidate> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = if file_name.to_ascii_lowercase().ends_with(".pdf") {
        PDF_CONTENT_TYPE.to_string()
    } else {
        "application/octet-stream".to_string()
    };
    let declared_size = bytes.len() as i64;

    Ok(UploadCandidate {
        file_name,
        bytes,
        declared_size,
        content_type,
    })
}

/// Run an upload batch. Returns `false` when any candidate failed, so the
/// caller can exit non-zero after the summary is printed.
async fn run_upload(
    cfg: &Config,
    paths: &[PathBuf],
    progress_flag: Option<&str>,
    chunk_size_flag: Option<usize>,
) -> Result<bool> {
    let candidates = gather_candidates(paths)?;
    if candidates.is_empty() {
        anyhow::bail!("No files found under the given paths.");
    }

    let mode = match progress_flag {
        None => ProgressMode::default_for_tty(),
        Some("off") => ProgressMode::Off,
        Some("human") => ProgressMode::Human,
        Some("json") => ProgressMode::Json,
        Some(other) => anyhow::bail!(
            "Unknown progress mode: '{}'. Must be off, human, or json.",
            other
        ),
    };
    let reporter = mode.reporter();

    let store = Arc::new(open_store(cfg).await?);
    let policy = cfg.identity_policy(Utc::now().year());
    let engine = Ingestor::new(store, Arc::new(EnvAuth), policy, cfg.storage.overwrite);

    let chunk_size = chunk_size_flag.unwrap_or(cfg.ingest.chunk_size);
    let report = engine
        .ingest(candidates, chunk_size, reporter.as_ref())
        .await?;

    print_report(&report);
    Ok(report.is_success())
}

fn print_report(report: &BatchReport) {
    let accepted = report.succeeded.len() + report.failed.len();
    if accepted == 0 {
        println!("Only PDF files are allowed.");
        return;
    }

    println!(
        "Uploaded {} of {} statement{}.",
        report.succeeded.len(),
        accepted,
        if accepted == 1 { "" } else { "s" }
    );
    if report.skipped > 0 {
        println!(
            "Skipped {} non-PDF file{}.",
            report.skipped,
            if report.skipped == 1 { "" } else { "s" }
        );
    }
    if !report.failed.is_empty() {
        println!("Failed {}:", report.failed.len());
        for failure in &report.failed {
            println!("  {}: {}", failure.file_name, failure.reason);
        }
    }
}

async fn run_search(
    cfg: &Config,
    last_name: String,
    birth_year: String,
    contact: Option<String>,
    json: bool,
) -> Result<()> {
    let store = Arc::new(open_store(cfg).await?);
    let policy = cfg.identity_policy(Utc::now().year());
    let searcher = Searcher::new(store, policy);

    let criteria = SearchCriteria {
        last_name,
        birth_year,
        contact_digits: contact,
    };
    let results = searcher.search(&criteria).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No statements found.");
        return Ok(());
    }

    println!(
        "Found {} statement{}:",
        results.len(),
        if results.len() == 1 { "" } else { "s" }
    );
    for record in &results {
        print_record(record);
    }
    Ok(())
}

fn print_record(record: &StatementRecord) {
    println!(
        "  {}  {} ({})  {}  {}",
        record.file_name,
        record.identity.last_name,
        record.identity.birth_year,
        human_size(record.byte_size),
        record.created_at.format("%Y-%m-%d"),
    );
    if let Some(ref url) = record.blob_url {
        println!("    {}", url);
    }
}

fn human_size(bytes: i64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GiB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MiB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::human_size;

    #[test]
    fn sizes_render_in_the_right_unit() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(1_572_864), "1.5 MiB");
        assert_eq!(human_size(1_073_741_824), "1.0 GiB");
        assert_eq!(human_size(5_368_709_120), "5.0 GiB");
    }
}

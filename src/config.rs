use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::identity::IdentityPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    #[serde(default = "default_contact_digits")]
    pub contact_digits: usize,
    #[serde(default = "default_min_birth_year")]
    pub min_birth_year: i32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            contact_digits: 10,
            min_birth_year: 1900,
        }
    }
}

fn default_contact_digits() -> usize {
    10
}
fn default_min_birth_year() -> i32 {
    1900
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { chunk_size: 50 }
    }
}

fn default_chunk_size() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
    #[serde(default = "default_blob_dir")]
    pub blob_dir: PathBuf,
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "local".to_string(),
            overwrite: true,
            blob_dir: PathBuf::from("./data/blobs"),
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            public_base_url: None,
        }
    }
}

fn default_backend() -> String {
    "local".to_string()
}
fn default_overwrite() -> bool {
    true
}
fn default_blob_dir() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_region() -> String {
    "us-east-1".to_string()
}

impl StorageConfig {
    pub fn is_bucket(&self) -> bool {
        self.backend == "bucket"
    }
}

impl Config {
    /// Filename policy for this deployment, anchored to the given year.
    pub fn identity_policy(&self, current_year: i32) -> IdentityPolicy {
        IdentityPolicy {
            contact_digits: self.identity.contact_digits,
            min_year: self.identity.min_birth_year,
            current_year,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate identity
    if config.identity.contact_digits == 0 {
        anyhow::bail!("identity.contact_digits must be > 0");
    }
    if config.identity.min_birth_year < 1 {
        anyhow::bail!("identity.min_birth_year must be >= 1");
    }

    // Validate ingest
    if config.ingest.chunk_size == 0 {
        anyhow::bail!("ingest.chunk_size must be > 0");
    }

    // Validate storage
    match config.storage.backend.as_str() {
        "local" | "bucket" => {}
        other => anyhow::bail!(
            "Unknown storage backend: '{}'. Must be local or bucket.",
            other
        ),
    }
    if config.storage.is_bucket() && config.storage.bucket.is_empty() {
        anyhow::bail!("storage.bucket must be set when backend is 'bucket'");
    }

    Ok(config)
}

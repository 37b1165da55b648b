//! Blob transport for the SQLite-backed store.
//!
//! Two backends: [`LocalBlobs`] keeps statement files under a local
//! directory (the default), and [`ObjectClient`] talks to an
//! S3-compatible bucket over the REST API with AWS Signature V4
//! authentication. Signing uses only pure-Rust dependencies (`hmac`,
//! `sha2`), no C libraries, so it builds everywhere. Custom endpoints
//! (MinIO, LocalStack) are supported and addressed path-style.
//!
//! # Environment Variables
//!
//! Bucket credentials are read from environment variables:
//! - `AWS_ACCESS_KEY_ID`: required
//! - `AWS_SECRET_ACCESS_KEY`: required
//! - `AWS_SESSION_TOKEN`: optional (for temporary credentials / IAM roles)

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::store::StoreError;

type HmacSha256 = Hmac<Sha256>;

/// Blob backend selection for the SQLite store.
pub enum Blobs {
    Local(LocalBlobs),
    Bucket(ObjectClient),
}

impl Blobs {
    /// Write a blob, honoring the overwrite policy.
    pub async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        match self {
            Blobs::Local(local) => local.put(key, bytes, overwrite),
            Blobs::Bucket(client) => {
                if !overwrite && client.exists(key).await? {
                    return Err(StoreError::BlobExists {
                        key: key.to_string(),
                    });
                }
                client.put(key, bytes, content_type).await
            }
        }
    }

    /// Retrieval URL for a stored key.
    pub fn public_url(&self, key: &str) -> String {
        match self {
            Blobs::Local(local) => local.url(key),
            Blobs::Bucket(client) => client.public_url(key),
        }
    }
}

/// Statement files under a local directory.
pub struct LocalBlobs {
    root: PathBuf,
}

impl LocalBlobs {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn put(&self, key: &str, bytes: &[u8], overwrite: bool) -> Result<(), StoreError> {
        let path = self.root.join(key);
        if !overwrite && path.exists() {
            return Err(StoreError::BlobExists {
                key: key.to_string(),
            });
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::BlobIo {
                key: key.to_string(),
                source,
            })?;
        }
        std::fs::write(&path, bytes).map_err(|source| StoreError::BlobIo {
            key: key.to_string(),
            source,
        })?;
        Ok(())
    }

    fn url(&self, key: &str) -> String {
        format!("file://{}", self.root.join(key).display())
    }
}

// ============ Bucket client ============

/// S3-compatible bucket client.
///
/// Uploads statement blobs with signed `PUT` requests and probes for
/// existing keys with signed `HEAD` requests. All requests are signed
/// with [AWS Signature Version 4](https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-auth-using-authorization-header.html).
pub struct ObjectClient {
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    public_base_url: Option<String>,
    creds: AwsCredentials,
    client: reqwest::Client,
}

impl ObjectClient {
    /// Build a client for the given bucket, reading credentials from the
    /// environment up front so a misconfigured run fails before any batch
    /// starts.
    pub fn from_env(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_base_url: Option<String>,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            bucket,
            region,
            endpoint_url,
            public_base_url,
            creds: AwsCredentials::from_env()?,
            client: reqwest::Client::new(),
        })
    }

    /// Upload a blob with a signed PUT.
    pub async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
        let (scheme, host) = self.scheme_and_host();
        let canonical_uri = self.canonical_uri(key);
        let url = format!("{}://{}{}", scheme, host, canonical_uri);

        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex_sha256(bytes);

        let mut headers = vec![
            ("content-type".to_string(), content_type.to_string()),
            ("host".to_string(), host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ref token) = self.creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let authorization =
            self.authorization("PUT", &canonical_uri, &headers, &payload_hash, &now);

        let mut request = self
            .client
            .put(&url)
            .header("Authorization", &authorization)
            .header("Content-Type", content_type)
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-date", &amz_date)
            .body(bytes.to_vec());
        if let Some(ref token) = self.creds.session_token {
            request = request.header("x-amz-security-token", token);
        }

        let resp = request
            .send()
            .await
            .map_err(|source| StoreError::BlobTransport {
                key: key.to_string(),
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::BlobStatus {
                key: key.to_string(),
                status,
                body: body.chars().take(500).collect(),
            });
        }
        Ok(())
    }

    /// Probe for an existing key with a signed HEAD.
    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let (scheme, host) = self.scheme_and_host();
        let canonical_uri = self.canonical_uri(key);
        let url = format!("{}://{}{}", scheme, host, canonical_uri);

        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex_sha256(b"");

        let mut headers = vec![
            ("host".to_string(), host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ref token) = self.creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let authorization =
            self.authorization("HEAD", &canonical_uri, &headers, &payload_hash, &now);

        let mut request = self
            .client
            .head(&url)
            .header("Authorization", &authorization)
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-date", &amz_date);
        if let Some(ref token) = self.creds.session_token {
            request = request.header("x-amz-security-token", token);
        }

        let resp = request
            .send()
            .await
            .map_err(|source| StoreError::BlobTransport {
                key: key.to_string(),
                source,
            })?;

        let status = resp.status();
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(StoreError::BlobStatus {
                key: key.to_string(),
                status: status.as_u16(),
                body: String::new(),
            })
        }
    }

    /// Public retrieval URL for a key.
    ///
    /// `public_base_url` wins when configured (CDN or storage proxy in
    /// front of the bucket); otherwise the bucket URL itself is returned.
    pub fn public_url(&self, key: &str) -> String {
        if let Some(ref base) = self.public_base_url {
            return format!("{}/{}", base.trim_end_matches('/'), encode_key(key));
        }
        let (scheme, host) = self.scheme_and_host();
        format!("{}://{}{}", scheme, host, self.canonical_uri(key))
    }

    /// Endpoint host for the bucket.
    ///
    /// A custom `endpoint_url` (MinIO, LocalStack) keeps its scheme;
    /// AWS proper uses the standard `<bucket>.s3.<region>.amazonaws.com`.
    fn scheme_and_host(&self) -> (&'static str, String) {
        match self.endpoint_url {
            Some(ref endpoint) => {
                let scheme = if endpoint.starts_with("http://") {
                    "http"
                } else {
                    "https"
                };
                let host = endpoint
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/')
                    .to_string();
                (scheme, host)
            }
            None => (
                "https",
                format!("{}.s3.{}.amazonaws.com", self.bucket, self.region),
            ),
        }
    }

    /// Request path: path-style (`/bucket/key`) for custom endpoints,
    /// virtual-hosted (`/key`) for AWS proper.
    fn canonical_uri(&self, key: &str) -> String {
        let encoded = encode_key(key);
        if self.endpoint_url.is_some() {
            format!("/{}/{}", self.bucket, encoded)
        } else {
            format!("/{}", encoded)
        }
    }

    fn authorization(
        &self,
        method: &str,
        canonical_uri: &str,
        headers: &[(String, String)],
        payload_hash: &str,
        now: &DateTime<Utc>,
    ) -> String {
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method, canonical_uri, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &self.creds.secret_access_key,
            &date_stamp,
            &self.region,
            "s3",
        );
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.creds.access_key_id, credential_scope, signed_headers, signature
        )
    }
}

// ============ Credentials ============

/// Static AWS credential set for request signing.
struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    /// Read the credential set from the standard AWS environment variables.
    /// The session token is optional; the other two are required.
    fn from_env() -> Result<Self, StoreError> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| StoreError::MissingCredentials("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| StoreError::MissingCredentials("AWS_SECRET_ACCESS_KEY"))?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

// ============ Signing primitives ============

/// Hex-encoded SHA-256 of the payload.
fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// HMAC-SHA256 round, the building block of SigV4 key derivation.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Hex form of [`hmac_sha256`], used for the final signature.
fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// SigV4 signing key: chained HMAC rounds over the date stamp, region,
/// service name, and the literal `aws4_request`, seeded with the secret
/// key prefixed by `AWS4`.
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode an object key, preserving path separators.
fn encode_key(key: &str) -> String {
    key.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// Percent-encode per RFC 3986, leaving only the unreserved set
/// (`A-Z a-z 0-9 - _ . ~`) untouched, as SigV4 canonical requests require.
fn uri_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

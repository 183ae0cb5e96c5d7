//! File Reference Resolver boundary and its HTTP adapter.
//!
//! The file service owns uploads and thumbnails; this core only asks two
//! questions of it: "what are the display URIs for this id" (best-effort
//! enrichment) and "do all of these ids exist" (payment-proof validation).

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bzr_schemas::FileMeta;
use reqwest::StatusCode;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FileLookupError {
    /// The service answered and the listed ids do not exist.
    #[error("file(s) not found: {}", .0.join(", "))]
    Missing(Vec<String>),
    /// Transport failure, unexpected status or undecodable body.
    #[error("file service unavailable")]
    Unavailable(#[source] anyhow::Error),
}

#[async_trait]
pub trait FileResolver: Send + Sync {
    async fn resolve(&self, file_id: Uuid) -> Result<FileMeta, FileLookupError>;

    /// `Ok(())` only if every id exists. An empty list is trivially valid.
    async fn validate_exist(&self, file_ids: &[Uuid]) -> Result<(), FileLookupError>;
}

// ---------------------------------------------------------------------------
// HTTP adapter
// ---------------------------------------------------------------------------

/// Talks to the file service over HTTP.
///
/// - `GET {base}/v1/file/{id}` → one [`FileMeta`], 404 when unknown.
/// - `GET {base}/v1/file?id=a,b,c` → the subset of [`FileMeta`] that exists.
#[derive(Debug, Clone)]
pub struct HttpFileResolver {
    base_url: String,
    http: reqwest::Client,
}

impl HttpFileResolver {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build file service http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl FileResolver for HttpFileResolver {
    async fn resolve(&self, file_id: Uuid) -> Result<FileMeta, FileLookupError> {
        let url = format!("{}/v1/file/{}", self.base_url, file_id);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FileLookupError::Unavailable(anyhow!(e).context("file lookup request failed")))?;

        match resp.status() {
            StatusCode::OK => resp
                .json::<FileMeta>()
                .await
                .map_err(|e| FileLookupError::Unavailable(anyhow!(e).context("file lookup decode failed"))),
            StatusCode::NOT_FOUND => Err(FileLookupError::Missing(vec![file_id.to_string()])),
            other => Err(FileLookupError::Unavailable(anyhow!(
                "file lookup returned unexpected status {other}"
            ))),
        }
    }

    async fn validate_exist(&self, file_ids: &[Uuid]) -> Result<(), FileLookupError> {
        if file_ids.is_empty() {
            return Ok(());
        }

        let joined = file_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/v1/file", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("id", joined.as_str())])
            .send()
            .await
            .map_err(|e| FileLookupError::Unavailable(anyhow!(e).context("file list request failed")))?;

        let found: Vec<FileMeta> = match resp.status() {
            StatusCode::OK => resp
                .json()
                .await
                .map_err(|e| FileLookupError::Unavailable(anyhow!(e).context("file list decode failed")))?,
            StatusCode::NOT_FOUND => Vec::new(),
            other => {
                return Err(FileLookupError::Unavailable(anyhow!(
                    "file list returned unexpected status {other}"
                )))
            }
        };

        let missing = missing_ids(file_ids, &found);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FileLookupError::Missing(missing))
        }
    }
}

/// Requested ids absent from `found`, in request order, without duplicates.
pub fn missing_ids(requested: &[Uuid], found: &[FileMeta]) -> Vec<String> {
    let present: BTreeSet<Uuid> = found.iter().map(|f| f.id).collect();
    let mut seen = BTreeSet::new();
    requested
        .iter()
        .filter(|id| !present.contains(id) && seen.insert(**id))
        .map(Uuid::to_string)
        .collect()
}

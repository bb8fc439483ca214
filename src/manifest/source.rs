use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::manifest::ComponentManifestMap;
use crate::schema::{self, SchemaValidationError};

/// Where a manifest should come from. An absent `source` means the locally
/// configured default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestContext {
    pub source: Option<String>,
}

impl ManifestContext {
    pub fn remote(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
        }
    }
}

/// The manifest could not be obtained at all.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid manifest source {source_url:?}: {reason}")]
    InvalidUrl { source_url: String, reason: String },
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Cannot read default manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No manifest source given and no default manifest configured")]
    NotConfigured,
}

/// Distinguishes "manifest doesn't exist" from "manifest is malformed".
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Schema(#[from] SchemaValidationError),
}

/// Retrieves a manifest body from a remote source.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// HTTP(S) GET via `reqwest`. No retries.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ManifestFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        Ok(body.to_vec())
    }
}

/// Produces a validated [`ComponentManifestMap`] per call. Nothing is cached.
pub struct ManifestResolver {
    fetcher: Arc<dyn ManifestFetcher>,
    default_manifest: Option<PathBuf>,
}

impl ManifestResolver {
    pub fn new(fetcher: Arc<dyn ManifestFetcher>, default_manifest: Option<PathBuf>) -> Self {
        Self {
            fetcher,
            default_manifest,
        }
    }

    pub async fn resolve(
        &self,
        context: &ManifestContext,
    ) -> Result<ComponentManifestMap, ResolveError> {
        let body = match &context.source {
            Some(source) => {
                let url = parse_source(source)?;
                tracing::debug!(%url, "fetching component manifest");
                self.fetcher.fetch(&url).await.inspect_err(|e| {
                    tracing::warn!(%url, error = %e, "manifest fetch failed");
                })?
            }
            None => self.read_default().await?,
        };

        let map = schema::validate_bytes(&body).inspect_err(|e| {
            tracing::warn!(source = ?context.source, error = %e, "manifest failed validation");
        })?;
        Ok(map)
    }

    async fn read_default(&self) -> Result<Vec<u8>, FetchError> {
        let path = self.default_manifest.as_ref().ok_or(FetchError::NotConfigured)?;
        tokio::fs::read(path).await.map_err(|source| FetchError::Io {
            path: path.clone(),
            source,
        })
    }
}

fn parse_source(source: &str) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        source_url: source.to_string(),
        reason,
    };

    let url = Url::parse(source).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

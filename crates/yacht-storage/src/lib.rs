//! Extractor HTTP client, local draft store and yacht persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;
use yacht_core::{ExtractorDoc, LocalRecord, UnknownField};

mod repository;

pub use repository::{
    storage_document, InMemoryYachtRepository, NewYacht, PgYachtRepository, RepositoryError,
    YachtRepository,
};

pub const CRATE_NAME: &str = "yacht-storage";

pub const DRAFT_FILE_NAME: &str = "devalk-form-data.json";

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

/// Thin wrapper over a configured `reqwest::Client`. One attempt per call.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        let resp = self.client.get(url).send().await?;
        Self::read_response(resp).await
    }

    pub async fn post_json<B>(&self, url: &str, body: &B) -> Result<FetchedResponse, FetchError>
    where
        B: Serialize + ?Sized,
    {
        let resp = self.client.post(url).json(body).send().await?;
        Self::read_response(resp).await
    }

    async fn read_response(resp: reqwest::Response) -> Result<FetchedResponse, FetchError> {
        let status = resp.status();
        let final_url = resp.url().to_string();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: final_url,
            });
        }
        let body = resp.bytes().await?.to_vec();
        Ok(FetchedResponse {
            status,
            final_url,
            body,
        })
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("extractor reported status `{status}`: {message}")]
    NotSuccess { status: String, message: String },
    #[error("extractor returned no data")]
    MissingData,
    #[error("malformed extractor document: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ExtractorResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<JsonValue>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExtractorRequest<'a> {
    url: &'a str,
}

/// Decode the extractor's `{ status, data }` envelope.
pub fn parse_extractor_response(body: &[u8]) -> Result<ExtractorDoc, ExtractError> {
    let envelope: ExtractorResponse = serde_json::from_slice(body)?;
    let status = envelope.status.unwrap_or_default();
    if status != "success" {
        let message = envelope
            .error
            .or(envelope.message)
            .unwrap_or_else(|| "no message".to_string());
        return Err(ExtractError::NotSuccess { status, message });
    }
    match envelope.data {
        Some(data @ JsonValue::Object(_)) => Ok(serde_json::from_value(data)?),
        Some(JsonValue::Null) | None => Err(ExtractError::MissingData),
        Some(other) => Err(ExtractError::Malformed(serde::de::Error::custom(format!(
            "expected an object, found {other}"
        )))),
    }
}

/// Client for the external extraction service.
#[derive(Debug, Clone)]
pub struct ExtractorClient {
    http: HttpFetcher,
    endpoint: String,
}

impl ExtractorClient {
    pub fn new(endpoint: impl Into<String>, http: HttpFetcher) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn http(&self) -> &HttpFetcher {
        &self.http
    }

    pub async fn extract(&self, url: &str) -> Result<ExtractorDoc, ExtractError> {
        let span = info_span!("extract", endpoint = %self.endpoint, url);
        async {
            let resp = self
                .http
                .post_json(&self.endpoint, &ExtractorRequest { url })
                .await?;
            let doc = parse_extractor_response(&resp.body)?;
            info!(
                sections = doc.present_sections().count(),
                bytes = resp.body.len(),
                "extractor document received"
            );
            Ok(doc)
        }
        .instrument(span)
        .await
    }
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("draft io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("draft file {path} is not a valid record: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("serializing draft: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error(transparent)]
    UnknownField(#[from] UnknownField),
}

#[derive(Debug, Clone)]
pub struct SavedDraft {
    pub path: PathBuf,
    pub content_hash: String,
    pub byte_size: usize,
    /// True when the file already held identical content and was left alone.
    pub unchanged: bool,
}

/// Record produced by [`DraftStore::update`], with whatever else the change
/// computed and the outcome of writing it.
#[derive(Debug)]
pub struct DraftUpdate<T> {
    pub record: LocalRecord,
    pub value: T,
    pub saved: Result<SavedDraft, DraftError>,
}

/// Single-file persistence for the in-progress form record.
///
/// Writes go through a temp file and an atomic rename so a crash never leaves
/// a half-written draft behind.
#[derive(Debug)]
pub struct DraftStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DraftStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(DRAFT_FILE_NAME)
    }

    pub async fn try_load(&self) -> Result<Option<LocalRecord>, DraftError> {
        let path = self.path();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(DraftError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| DraftError::Corrupt { path, source })
    }

    /// Stored draft, or `None` when missing or unreadable.
    pub async fn load(&self) -> Option<LocalRecord> {
        match self.try_load().await {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "ignoring unreadable draft");
                None
            }
        }
    }

    pub async fn save(&self, record: &LocalRecord) -> Result<SavedDraft, DraftError> {
        let _guard = self.write_lock.lock().await;
        self.write_locked(record).await
    }

    /// Update one field of the stored draft, starting from an empty record
    /// when there is none.
    pub async fn set_field(&self, field: &str, value: &str) -> Result<LocalRecord, DraftError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load().await.unwrap_or_default();
        record.set(field, value)?;
        self.write_locked(&record).await?;
        Ok(record)
    }

    /// Read-modify-write of the whole draft under the write lock. A missing or
    /// unreadable draft starts from an empty record. The changed record is
    /// returned even when writing it fails.
    pub async fn update<T>(
        &self,
        change: impl FnOnce(LocalRecord) -> (LocalRecord, T),
    ) -> DraftUpdate<T> {
        let _guard = self.write_lock.lock().await;
        let (record, value) = change(self.load().await.unwrap_or_default());
        let saved = self.write_locked(&record).await;
        DraftUpdate {
            record,
            value,
            saved,
        }
    }

    /// Remove the draft file. Returns whether one existed.
    pub async fn clear(&self) -> Result<bool, DraftError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path();
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "draft cleared");
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(DraftError::Io { path, source }),
        }
    }

    async fn write_locked(&self, record: &LocalRecord) -> Result<SavedDraft, DraftError> {
        let bytes = serde_json::to_vec_pretty(record).map_err(DraftError::Serialize)?;
        let content_hash = sha256_hex(&bytes);
        let path = self.path();

        if let Ok(existing) = fs::read(&path).await {
            if sha256_hex(&existing) == content_hash {
                return Ok(SavedDraft {
                    path,
                    content_hash,
                    byte_size: bytes.len(),
                    unchanged: true,
                });
            }
        }

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| DraftError::Io { path, source }
        };

        fs::create_dir_all(&self.root)
            .await
            .map_err(io_err(&self.root))?;

        let temp_path = self
            .root
            .join(format!(".{}.{}.tmp", Uuid::new_v4(), bytes.len()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .map_err(io_err(&temp_path))?;
        file.write_all(&bytes).await.map_err(io_err(&temp_path))?;
        file.flush().await.map_err(io_err(&temp_path))?;
        drop(file);

        if let Err(source) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(DraftError::Io { path, source });
        }

        Ok(SavedDraft {
            path,
            content_hash,
            byte_size: bytes.len(),
            unchanged: false,
        })
    }
}

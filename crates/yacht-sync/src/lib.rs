//! Orchestration: environment configuration, the URL-to-draft migration
//! pipeline, repository selection, the options cache and the debounced
//! browse session.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, info_span, warn, Instrument};
use yacht_adapters::{
    extract_equipment, extract_features, map_onto_with, score, AdapterError, Extractor,
    HtmlPageExtractor, MappingObserver, ServiceExtractor, TracingObserver,
};
use yacht_core::{sort_listings, LocalRecord, MigrationMetadata, SortOrder, YachtFilters, YachtListing};
use yacht_storage::{
    DraftStore, DraftUpdate, ExtractorClient, HttpClientConfig, HttpFetcher, InMemoryYachtRepository,
    PgYachtRepository, YachtRepository,
};

mod browse;
mod options;

pub use browse::{browse_lines, BrowseSession, Debouncer, SearchResults, DEFAULT_DEBOUNCE};
pub use options::{FilterOption, FilterOptions, OptionsCache, RegionOptions};

pub const CRATE_NAME: &str = "yacht-sync";

/// How listing URLs are turned into extractor documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractorMode {
    /// POST the URL to the extraction service.
    #[default]
    Service,
    /// Fetch the listing page and parse it locally.
    Html,
}

impl FromStr for ExtractorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service" => Ok(ExtractorMode::Service),
            "html" => Ok(ExtractorMode::Html),
            other => Err(format!("unknown extractor mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Postgres connection string. Without one, yachts are kept in memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub extractor_url: String,
    pub extractor_mode: ExtractorMode,
    pub drafts_dir: PathBuf,
    pub workspace_root: PathBuf,
    pub web_port: u16,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub options_ttl_secs: u64,
    pub filter_debounce_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: 5,
            extractor_url: "http://localhost:5000/webhook/v2/extract".to_string(),
            extractor_mode: ExtractorMode::Service,
            drafts_dir: PathBuf::from("./drafts"),
            workspace_root: PathBuf::from("."),
            web_port: 8000,
            http_timeout_secs: 20,
            user_agent: "yacht-migrate/0.1".to_string(),
            options_ttl_secs: 300,
            filter_debounce_ms: 750,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, falling back to the defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str, default: u64| {
            text(key).and_then(|v| v.parse().ok()).unwrap_or(default)
        };

        let extractor_mode = match text("YACHT_EXTRACTOR_MODE").map(|v| v.parse::<ExtractorMode>()) {
            Some(Ok(mode)) => mode,
            Some(Err(err)) => {
                warn!(%err, "falling back to the service extractor");
                ExtractorMode::Service
            }
            None => defaults.extractor_mode,
        };

        Self {
            database_url: text("DATABASE_URL"),
            db_max_connections: text("YACHT_DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.db_max_connections),
            extractor_url: text("YACHT_EXTRACTOR_URL").unwrap_or(defaults.extractor_url),
            extractor_mode,
            drafts_dir: text("YACHT_DRAFTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.drafts_dir),
            workspace_root: text("YACHT_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            web_port: text("YACHT_WEB_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.web_port),
            http_timeout_secs: number("YACHT_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
            user_agent: text("YACHT_USER_AGENT").unwrap_or(defaults.user_agent),
            options_ttl_secs: number("YACHT_OPTIONS_TTL_SECS", defaults.options_ttl_secs),
            filter_debounce_ms: number("YACHT_FILTER_DEBOUNCE_MS", defaults.filter_debounce_ms),
        }
    }

    pub fn options_path(&self) -> PathBuf {
        self.workspace_root.join("options.yaml")
    }

    pub fn listings_path(&self) -> PathBuf {
        self.workspace_root.join("data").join("listings.json")
    }

    pub fn options_ttl(&self) -> Duration {
        Duration::from_secs(self.options_ttl_secs)
    }

    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.filter_debounce_ms)
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: Some(self.user_agent.clone()),
        }
    }
}

pub fn build_extractor(config: &AppConfig) -> Result<Arc<dyn Extractor>> {
    let http = HttpFetcher::new(config.http_client_config()).context("building http client")?;
    let extractor: Arc<dyn Extractor> = match config.extractor_mode {
        ExtractorMode::Service => Arc::new(ServiceExtractor::new(ExtractorClient::new(
            config.extractor_url.clone(),
            http,
        ))),
        ExtractorMode::Html => Arc::new(HtmlPageExtractor::new(http)),
    };
    Ok(extractor)
}

/// Postgres when `DATABASE_URL` is set (migrations applied on connect),
/// otherwise an in-memory repository.
pub async fn connect_repository(config: &AppConfig) -> Result<Arc<dyn YachtRepository>> {
    match &config.database_url {
        Some(url) => {
            let repo = PgYachtRepository::connect(url, config.db_max_connections)
                .await
                .context("connecting to postgres")?;
            repo.run_migrations().await.context("running database migrations")?;
            info!("using postgres yacht repository");
            Ok(Arc::new(repo))
        }
        None => {
            warn!("DATABASE_URL not set; submitted yachts are kept in memory");
            Ok(Arc::new(InMemoryYachtRepository::new()))
        }
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Please provide a valid URL to migrate from.")]
    InvalidUrl,
    #[error(transparent)]
    Extract(#[from] AdapterError),
}

/// Result of one migration: the record now in the draft plus everything
/// shown alongside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    #[serde(rename = "data")]
    pub record: LocalRecord,
    pub metadata: MigrationMetadata,
    pub equipment: Vec<String>,
    pub features: Vec<String>,
}

/// URL → extractor → mapper → scorer → draft.
pub struct MigrationPipeline {
    extractor: Arc<dyn Extractor>,
    drafts: Arc<DraftStore>,
    observer: Arc<dyn MappingObserver>,
}

impl MigrationPipeline {
    pub fn new(extractor: Arc<dyn Extractor>, drafts: Arc<DraftStore>) -> Self {
        Self {
            extractor,
            drafts,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let extractor = build_extractor(config)?;
        let drafts = Arc::new(DraftStore::new(config.drafts_dir.clone()));
        Ok(Self::new(extractor, drafts))
    }

    pub fn with_observer(mut self, observer: Arc<dyn MappingObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    pub fn drafts(&self) -> &Arc<DraftStore> {
        &self.drafts
    }

    /// Extract `url`, map it over the current draft and store the result.
    ///
    /// Sections the extractor did not return keep their draft values. A draft
    /// that cannot be written is logged and the outcome is still returned.
    pub async fn migrate(&self, url: &str) -> Result<MigrationOutcome, MigrationError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(MigrationError::InvalidUrl);
        }

        let span = info_span!("migrate", url, extractor = self.extractor.name());
        async {
            let doc = self.extractor.extract(url).await?;
            let observer = self.observer.as_ref();
            let DraftUpdate {
                record,
                value: missing_core_fields,
                saved,
            } = self
                .drafts
                .update(|base| {
                    let mapped = map_onto_with(base, &doc, observer);
                    (mapped.record, mapped.missing_core_fields)
                })
                .await;
            if let Err(err) = saved {
                warn!(error = %err, "migrated record not written to the draft");
            }
            let score = score(&record);
            info!(
                confidence = score.confidence,
                completeness = score.completeness,
                warnings = score.warnings.len(),
                "migration complete"
            );

            Ok(MigrationOutcome {
                equipment: extract_equipment(&record),
                features: extract_features(&record),
                metadata: MigrationMetadata {
                    source_url: url.to_string(),
                    scraped_at: Utc::now(),
                    confidence: score.confidence,
                    data_completeness: score.completeness,
                    missing_core_fields,
                    warnings: score.warnings,
                },
                record,
            })
        }
        .instrument(span)
        .await
    }
}

pub async fn load_listings(path: &Path) -> Result<Vec<YachtListing>> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Body of a browse search: filters plus the sort key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    pub filters: YachtFilters,
    pub sort: SortOrder,
}

impl SearchQuery {
    pub fn run(&self, listings: &[YachtListing]) -> Vec<YachtListing> {
        let mut hits = yacht_core::filter_listings(&self.filters, listings);
        sort_listings(&mut hits, self.sort);
        hits
    }
}

//! Filter options for the browse and sell pages, read from `options.yaml`
//! and cached with a time-to-live.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionOptions {
    pub region: String,
    pub locations: Vec<FilterOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterOptions {
    pub version: u32,
    pub boat_types: Vec<FilterOption>,
    pub makes: Vec<FilterOption>,
    pub locations_by_region: Vec<RegionOptions>,
    pub conditions: Vec<FilterOption>,
    pub listing_types: Vec<FilterOption>,
    pub fuel_types: Vec<FilterOption>,
    pub hull_materials: Vec<FilterOption>,
    pub features: Vec<FilterOption>,
    pub deck: Vec<FilterOption>,
    pub cabin: Vec<FilterOption>,
    pub usage_styles: Vec<FilterOption>,
    pub price_values: Vec<u64>,
}

impl FilterOptions {
    pub async fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

#[derive(Debug)]
struct Cached {
    options: Arc<FilterOptions>,
    loaded_at: Instant,
}

/// Options loaded on first use and reloaded once older than the TTL.
///
/// A failed reload keeps serving the previous options for another TTL; a
/// failed first load is an error.
#[derive(Debug)]
pub struct OptionsCache {
    path: PathBuf,
    ttl: Duration,
    state: RwLock<Option<Cached>>,
}

impl OptionsCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
            state: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> Result<Arc<FilterOptions>> {
        if let Some(cached) = self.state.read().await.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(cached.options.clone());
            }
        }

        let mut state = self.state.write().await;
        if let Some(cached) = state.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(cached.options.clone());
            }
        }

        match FilterOptions::from_yaml_file(&self.path).await {
            Ok(options) => {
                info!(path = %self.path.display(), makes = options.makes.len(), "filter options loaded");
                let options = Arc::new(options);
                *state = Some(Cached {
                    options: options.clone(),
                    loaded_at: Instant::now(),
                });
                Ok(options)
            }
            Err(err) => match state.as_mut() {
                Some(stale) => {
                    warn!(error = %err, "reloading filter options failed; serving previous options");
                    stale.loaded_at = Instant::now();
                    Ok(stale.options.clone())
                }
                None => Err(err),
            },
        }
    }

    /// Drop the cached options so the next `get` reads the file again.
    pub async fn invalidate(&self) {
        self.state.write().await.take();
    }

    pub async fn is_cached(&self) -> bool {
        self.state.read().await.is_some()
    }
}

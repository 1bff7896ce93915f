//! HTTP surface of the De Valk migration service.

use std::fmt::Display;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use uuid::Uuid;
use yacht_adapters::{export_file_name, render_export, ExportFormat};
use yacht_core::{LocalRecord, YachtListing};
use yacht_storage::{DraftError, DraftStore, NewYacht, RepositoryError, YachtRepository};
use yacht_sync::{
    connect_repository, load_listings, AppConfig, MigrationError, MigrationPipeline, OptionsCache,
    SearchQuery,
};

pub const CRATE_NAME: &str = "yacht-web";

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn YachtRepository>,
    pub pipeline: Arc<MigrationPipeline>,
    pub drafts: Arc<DraftStore>,
    pub options: Arc<OptionsCache>,
    pub listings: Arc<Vec<YachtListing>>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn YachtRepository>,
        pipeline: Arc<MigrationPipeline>,
        options: Arc<OptionsCache>,
        listings: Arc<Vec<YachtListing>>,
    ) -> Self {
        Self {
            repository,
            drafts: pipeline.drafts().clone(),
            pipeline,
            options,
            listings,
        }
    }

    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let repository = connect_repository(config).await?;
        let pipeline = MigrationPipeline::from_config(config)?;
        let options = OptionsCache::new(config.options_path(), config.options_ttl());
        let listings = match load_listings(&config.listings_path()).await {
            Ok(listings) => listings,
            Err(err) => {
                warn!(error = %err, "browse listings unavailable; search returns nothing");
                Vec::new()
            }
        };
        info!(
            extractor = pipeline.extractor_name(),
            listings = listings.len(),
            drafts = %config.drafts_dir.display(),
            "app state ready"
        );
        Ok(Self::new(
            repository,
            Arc::new(pipeline),
            Arc::new(options),
            Arc::new(listings),
        ))
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route(
            "/api/save-devalk-yacht",
            post(save_yacht_handler).get(list_yachts_handler),
        )
        .route("/api/migrate", post(migrate_handler))
        .route(
            "/api/draft",
            get(get_draft_handler)
                .patch(patch_draft_handler)
                .delete(delete_draft_handler),
        )
        .route("/api/draft/export", get(export_draft_handler))
        .route("/api/yachts/search", post(search_handler))
        .route("/api/options", get(options_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config).await?;
    let listener = TcpListener::bind(("0.0.0.0", config.web_port))
        .await
        .with_context(|| format!("binding port {}", config.web_port))?;
    info!(port = config.web_port, "listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health_handler() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

async fn save_yacht_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid request body", "details": rejection.body_text() }),
            )
        }
    };
    let idempotency_key = match idempotency_key(&headers) {
        Ok(key) => key,
        Err(resp) => return resp,
    };

    let JsonValue::Object(fields) = body else {
        return bad_request("Model is required");
    };
    let source_url = fields
        .get("sourceUrl")
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);
    let record = LocalRecord::from_json_map(fields);
    if !record.is_filled("model") {
        return bad_request("Model is required");
    }

    let yacht = NewYacht {
        record,
        source_url,
        idempotency_key,
    };
    match state.repository.create(&yacht).await {
        Ok(created) => json_response(
            StatusCode::CREATED,
            json!({
                "success": true,
                "message": "De Valk yacht data saved successfully",
                "yacht": created,
            }),
        ),
        Err(RepositoryError::MissingModel) => bad_request("Model is required"),
        Err(err) => server_error("Failed to save yacht data", err),
    }
}

async fn list_yachts_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.repository.list_active().await {
        Ok(yachts) => Json(json!({
            "success": true,
            "count": yachts.len(),
            "yachts": yachts,
        }))
        .into_response(),
        Err(err) => server_error("Failed to fetch yachts", err),
    }
}

#[derive(Debug, Default, Deserialize)]
struct MigrateRequest {
    #[serde(default)]
    url: String,
}

async fn migrate_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<MigrateRequest>, JsonRejection>,
) -> Response {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    match state.pipeline.migrate(&request.url).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err @ MigrationError::InvalidUrl) => bad_request(err.to_string()),
        Err(MigrationError::Extract(err)) => {
            warn!(url = %request.url, error = %err, "migration failed");
            json_response(StatusCode::BAD_GATEWAY, json!({ "error": err.to_string() }))
        }
    }
}

async fn get_draft_handler(State(state): State<Arc<AppState>>) -> Response {
    let record = state.drafts.load().await.unwrap_or_default();
    Json(record).into_response()
}

#[derive(Debug, Deserialize)]
struct DraftPatch {
    field: String,
    #[serde(default)]
    value: String,
}

async fn patch_draft_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DraftPatch>, JsonRejection>,
) -> Response {
    let patch = match body {
        Ok(Json(patch)) => patch,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    match state.drafts.set_field(&patch.field, &patch.value).await {
        Ok(record) => Json(record).into_response(),
        Err(DraftError::UnknownField(err)) => bad_request(err.to_string()),
        Err(err) => server_error("Failed to save draft", err),
    }
}

async fn delete_draft_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.drafts.clear().await {
        Ok(cleared) => Json(json!({ "cleared": cleared })).into_response(),
        Err(err) => server_error("Failed to clear draft", err),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

async fn export_draft_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let format = match query.format.as_deref().map(str::parse::<ExportFormat>) {
        None => ExportFormat::default(),
        Some(Ok(format)) => format,
        Some(Err(err)) => return bad_request(err),
    };

    let record = state.drafts.load().await.unwrap_or_default();
    let body = match render_export(&record, format) {
        Ok(body) => body,
        Err(err) => return server_error("Failed to export draft", err),
    };
    let file_name = export_file_name(&record, Utc::now().date_naive(), format);

    let mut resp = body.into_response();
    let headers = resp.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    headers.insert(header::CONTENT_DISPOSITION, attachment(&file_name));
    resp
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SearchQuery>, JsonRejection>,
) -> Response {
    let query = match body {
        Ok(Json(query)) => query,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let yachts = query.run(&state.listings);
    Json(json!({ "count": yachts.len(), "yachts": yachts })).into_response()
}

async fn options_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.options.get().await {
        Ok(options) => Json(options.as_ref()).into_response(),
        Err(err) => server_error("Failed to load filter options", format!("{err:#}")),
    }
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<Uuid>, Response> {
    let Some(raw) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    raw.to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .map(Some)
        .ok_or_else(|| bad_request("Idempotency-Key must be a UUID"))
}

/// `attachment; filename="..."` with anything outside printable ASCII
/// replaced by `_`.
fn attachment(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .map(|c| if c == ' ' || (c.is_ascii_graphic() && c != '"') { c } else { '_' })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn json_response(status: StatusCode, body: JsonValue) -> Response {
    (status, Json(body)).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    json_response(StatusCode::BAD_REQUEST, json!({ "error": message.into() }))
}

fn server_error(message: &str, details: impl Display) -> Response {
    let details = details.to_string();
    error!(%details, "{message}");
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": message, "details": details }),
    )
}

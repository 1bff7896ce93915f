//! Persistence of submitted De Valk yacht records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;
use yacht_core::{CreatedYacht, LocalRecord, YachtSummary};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] MigrateError),

    #[error("model is required")]
    MissingModel,
}

/// A record submitted for persistence.
#[derive(Debug, Clone, Default)]
pub struct NewYacht {
    pub record: LocalRecord,
    pub source_url: Option<String>,
    /// Repeating a create with the same key returns the first row.
    pub idempotency_key: Option<Uuid>,
}

impl NewYacht {
    pub fn new(record: LocalRecord) -> Self {
        Self {
            record,
            ..Self::default()
        }
    }

    /// The record as every backend stores it: model required and trimmed.
    fn stored_record(&self) -> Result<LocalRecord, RepositoryError> {
        let model = self.record.value("model").trim();
        if model.is_empty() {
            return Err(RepositoryError::MissingModel);
        }
        let model = model.to_string();
        let mut record = self.record.clone();
        record
            .set("model", model)
            .map_err(|_| RepositoryError::MissingModel)?;
        Ok(record)
    }
}

#[async_trait]
pub trait YachtRepository: Send + Sync {
    async fn create(&self, yacht: &NewYacht) -> Result<CreatedYacht, RepositoryError>;
    /// Active yachts, newest first.
    async fn list_active(&self) -> Result<Vec<YachtSummary>, RepositoryError>;
}

/// JSON document stored for a record: every field, empty values as `null`.
pub fn storage_document(record: &LocalRecord) -> JsonValue {
    let map = record
        .iter()
        .map(|(name, value)| {
            let value = if value.is_empty() {
                JsonValue::Null
            } else {
                JsonValue::String(value.to_string())
            };
            (name.to_string(), value)
        })
        .collect::<JsonMap<_, _>>();
    JsonValue::Object(map)
}

fn non_empty(record: &LocalRecord, field: &str) -> Option<String> {
    let value = record.value(field);
    (!value.is_empty()).then(|| value.to_string())
}

#[derive(Clone)]
pub struct PgYachtRepository {
    pool: PgPool,
}

impl PgYachtRepository {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn find_by_idempotency_key(
        &self,
        key: Uuid,
    ) -> Result<Option<CreatedYacht>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, model, created_at
              FROM devalk_yachts
             WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(CreatedYacht {
                id: row.try_get("id")?,
                model: row.try_get("model")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl YachtRepository for PgYachtRepository {
    async fn create(&self, yacht: &NewYacht) -> Result<CreatedYacht, RepositoryError> {
        let record = &yacht.stored_record()?;
        let model = record.value("model");

        let row = sqlx::query(
            r#"
            INSERT INTO devalk_yachts (
                id, model, yacht_type, year_built, builder, asking_price,
                data, source_url, idempotency_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING id, model, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(model)
        .bind(non_empty(record, "yachtType"))
        .bind(non_empty(record, "yearBuilt"))
        .bind(non_empty(record, "builder"))
        .bind(non_empty(record, "askingPrice"))
        .bind(storage_document(record))
        .bind(yacht.source_url.as_deref().filter(|s| !s.is_empty()))
        .bind(yacht.idempotency_key)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let created = CreatedYacht {
                id: row.try_get("id")?,
                model: row.try_get("model")?,
                created_at: row.try_get("created_at")?,
            };
            info!(id = %created.id, model = %created.model, "yacht saved");
            return Ok(created);
        }

        // Only reachable through an idempotency key conflict.
        match yacht.idempotency_key {
            Some(key) => self
                .find_by_idempotency_key(key)
                .await?
                .ok_or(RepositoryError::Database(sqlx::Error::RowNotFound)),
            None => Err(RepositoryError::Database(sqlx::Error::RowNotFound)),
        }
    }

    async fn list_active(&self) -> Result<Vec<YachtSummary>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, model, yacht_type, year_built, builder, asking_price,
                   created_at, updated_at
              FROM devalk_yachts
             WHERE is_active
             ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(YachtSummary {
                id: row.try_get("id")?,
                model: row.try_get("model")?,
                yacht_type: row.try_get("yacht_type")?,
                year_built: row.try_get("year_built")?,
                builder: row.try_get("builder")?,
                asking_price: row.try_get("asking_price")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            });
        }
        Ok(out)
    }
}

#[derive(Debug, Clone)]
struct StoredYacht {
    id: Uuid,
    record: LocalRecord,
    idempotency_key: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoredYacht {
    fn summary(&self) -> YachtSummary {
        YachtSummary {
            id: self.id,
            model: self.record.value("model").to_string(),
            yacht_type: non_empty(&self.record, "yachtType"),
            year_built: non_empty(&self.record, "yearBuilt"),
            builder: non_empty(&self.record, "builder"),
            asking_price: non_empty(&self.record, "askingPrice"),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn created(&self) -> CreatedYacht {
        CreatedYacht {
            id: self.id,
            model: self.record.value("model").to_string(),
            created_at: self.created_at,
        }
    }
}

/// Process-local repository used without a database and in tests.
#[derive(Debug, Default)]
pub struct InMemoryYachtRepository {
    rows: RwLock<Vec<StoredYacht>>,
}

impl InMemoryYachtRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the active flag of a row; returns false for unknown ids.
    pub async fn set_active(&self, id: Uuid, active: bool) -> bool {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.is_active = active;
                row.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl YachtRepository for InMemoryYachtRepository {
    async fn create(&self, yacht: &NewYacht) -> Result<CreatedYacht, RepositoryError> {
        let record = yacht.stored_record()?;
        let mut rows = self.rows.write().await;

        if let Some(key) = yacht.idempotency_key {
            if let Some(existing) = rows.iter().find(|r| r.idempotency_key == Some(key)) {
                return Ok(existing.created());
            }
        }

        let now = Utc::now();
        let stored = StoredYacht {
            id: Uuid::new_v4(),
            record,
            idempotency_key: yacht.idempotency_key,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let created = stored.created();
        rows.push(stored);
        info!(id = %created.id, model = %created.model, "yacht saved in memory");
        Ok(created)
    }

    async fn list_active(&self) -> Result<Vec<YachtSummary>, RepositoryError> {
        let rows = self.rows.read().await;
        let mut out = rows
            .iter()
            .rev()
            .filter(|r| r.is_active)
            .map(StoredYacht::summary)
            .collect::<Vec<_>>();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model: &str) -> LocalRecord {
        let mut record = LocalRecord::new();
        record.set("model", model).unwrap();
        record.set("builder", "Najad").unwrap();
        record
    }

    #[test]
    fn storage_document_nulls_empty_fields() {
        let doc = storage_document(&record("Najad 460"));
        assert_eq!(doc["model"], "Najad 460");
        assert_eq!(doc["askingPrice"], JsonValue::Null);
        assert_eq!(doc.as_object().unwrap().len(), yacht_core::FIELD_COUNT);
    }

    #[tokio::test]
    async fn in_memory_create_requires_model() {
        let repo = InMemoryYachtRepository::new();
        let err = repo.create(&NewYacht::new(record("  "))).await.unwrap_err();
        assert!(matches!(err, RepositoryError::MissingModel));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn model_is_stored_trimmed() {
        let repo = InMemoryYachtRepository::new();
        let created = repo
            .create(&NewYacht::new(record("  Najad 460 \n")))
            .await
            .unwrap();
        assert_eq!(created.model, "Najad 460");
        assert_eq!(repo.list_active().await.unwrap()[0].model, "Najad 460");

        let stored = NewYacht::new(record(" Contest 42 ")).stored_record().unwrap();
        assert_eq!(stored.value("model"), "Contest 42");
        assert_eq!(storage_document(&stored)["model"], "Contest 42");
    }

    #[tokio::test]
    async fn in_memory_lists_active_newest_first() {
        let repo = InMemoryYachtRepository::new();
        let first = repo.create(&NewYacht::new(record("Najad 460"))).await.unwrap();
        let second = repo.create(&NewYacht::new(record("Najad 520"))).await.unwrap();

        let listed = repo.list_active().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[0].builder.as_deref(), Some("Najad"));
        assert_eq!(listed[0].asking_price, None);

        assert!(repo.set_active(first.id, false).await);
        let listed = repo.list_active().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].model, "Najad 520");
    }

    #[tokio::test]
    async fn idempotency_key_returns_first_row() {
        let repo = InMemoryYachtRepository::new();
        let key = Uuid::new_v4();
        let yacht = NewYacht {
            record: record("Najad 460"),
            source_url: Some("https://www.devalk.nl/en/yachtdetails/12345".into()),
            idempotency_key: Some(key),
        };
        let a = repo.create(&yacht).await.unwrap();
        let b = repo.create(&yacht).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(repo.len().await, 1);
    }
}

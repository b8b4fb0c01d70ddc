use chrono::{DateTime, Utc};
use seogen_core::error::AppError;
use seogen_core::models::{FieldUpdate, PageTarget};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

/// A stored SEO page row.
#[derive(Debug, Clone, PartialEq)]
pub struct SeoPage {
    pub id: Uuid,
    pub version_id: Uuid,
    pub host: String,
    pub path: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub json_ld: Option<serde_json::Value>,
    pub canonical: Option<String>,
    pub h1_selector: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored page-configuration version.
#[derive(Debug, Clone, PartialEq)]
pub struct SeoVersion {
    pub id: Uuid,
    pub host: String,
    pub name: String,
    pub is_active: bool,
    pub ai_generated: bool,
    pub ai_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Repository for SEO pages and versions in PostgreSQL.
#[derive(Clone)]
pub struct PageRepository {
    pool: Pool<Postgres>,
}

fn parse_id(kind: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::ValidationError(format!("invalid {kind} id '{raw}'")))
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::DatabaseError(e.to_string())
}

impl PageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a version for `host`. Returns the generated UUID.
    pub async fn create_version(&self, host: &str, name: &str) -> Result<Uuid, AppError> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO seo_page_versions (host, name)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(host)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.0)
    }

    /// Register a page path under a version. Returns the generated UUID.
    pub async fn insert_page(&self, version_id: Uuid, path: &str) -> Result<Uuid, AppError> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO seo_pages (version_id, host, path)
            SELECT id, host, $2 FROM seo_page_versions WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(version_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::DatabaseError(format!("version {version_id} not found")))?;

        Ok(row.0)
    }

    pub async fn get_version(&self, version_id: &str) -> Result<Option<SeoVersion>, AppError> {
        let id = parse_id("version", version_id)?;
        let row = sqlx::query_as::<_, VersionRow>(
            r#"
            SELECT id, host, name, is_active, ai_generated, ai_generated_at, created_at
            FROM seo_page_versions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Into::into))
    }

    pub async fn get_page(&self, page_id: &str) -> Result<Option<SeoPage>, AppError> {
        let id = parse_id("page", page_id)?;
        let row = sqlx::query_as::<_, PageRow>(
            r#"
            SELECT id, version_id, host, path, title, description, json_ld, canonical,
                   h1_selector, created_at, updated_at
            FROM seo_pages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Into::into))
    }

    /// Pages of a version in registration order, optionally filtered by id.
    pub async fn list_pages(
        &self,
        version_id: &str,
        page_ids: &[String],
    ) -> Result<Vec<PageTarget>, AppError> {
        let version = parse_id("version", version_id)?;
        let ids = page_ids
            .iter()
            .map(|id| parse_id("page", id))
            .collect::<Result<Vec<_>, _>>()?;

        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT id, path
            FROM seo_pages
            WHERE version_id = $1
              AND (cardinality($2::uuid[]) = 0 OR id = ANY($2))
            ORDER BY created_at, path
            "#,
        )
        .bind(version)
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(id, path)| PageTarget {
                id: id.to_string(),
                path,
            })
            .collect())
    }

    /// Write the present fields of `update`; absent fields keep their value.
    pub async fn update_fields(&self, page_id: &str, update: &FieldUpdate) -> Result<(), AppError> {
        let id = parse_id("page", page_id)?;
        let result = sqlx::query(
            r#"
            UPDATE seo_pages
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                json_ld = COALESCE($4, json_ld),
                canonical = COALESCE($5, canonical),
                h1_selector = COALESCE($6, h1_selector),
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.description)
        .bind(&update.json_ld)
        .bind(&update.canonical)
        .bind(&update.h1_selector)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(AppError::DatabaseError(format!("page {page_id} not found")));
        }
        Ok(())
    }

    /// Set `ai_generated` and stamp `ai_generated_at` on a version.
    pub async fn mark_generated(&self, version_id: &str) -> Result<(), AppError> {
        let id = parse_id("version", version_id)?;
        let result = sqlx::query(
            r#"
            UPDATE seo_page_versions
            SET ai_generated = TRUE, ai_generated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(AppError::DatabaseError(format!(
                "version {version_id} not found"
            )));
        }
        tracing::debug!(%version_id, "Version flagged as generated");
        Ok(())
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

// -- Internal row types for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct PageRow {
    id: Uuid,
    version_id: Uuid,
    host: String,
    path: String,
    title: Option<String>,
    description: Option<String>,
    json_ld: Option<serde_json::Value>,
    canonical: Option<String>,
    h1_selector: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PageRow> for SeoPage {
    fn from(row: PageRow) -> Self {
        SeoPage {
            id: row.id,
            version_id: row.version_id,
            host: row.host,
            path: row.path,
            title: row.title,
            description: row.description,
            json_ld: row.json_ld,
            canonical: row.canonical,
            h1_selector: row.h1_selector,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VersionRow {
    id: Uuid,
    host: String,
    name: String,
    is_active: bool,
    ai_generated: bool,
    ai_generated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<VersionRow> for SeoVersion {
    fn from(row: VersionRow) -> Self {
        SeoVersion {
            id: row.id,
            host: row.host,
            name: row.name,
            is_active: row.is_active,
            ai_generated: row.ai_generated,
            ai_generated_at: row.ai_generated_at,
            created_at: row.created_at,
        }
    }
}

// -- Trait implementation --

impl seogen_core::traits::PageStore for PageRepository {
    async fn list_pages_for_batch(
        &self,
        version_id: &str,
        page_ids: &[String],
    ) -> Result<Vec<PageTarget>, AppError> {
        PageRepository::list_pages(self, version_id, page_ids).await
    }

    async fn apply_field_updates(&self, page_id: &str, update: &FieldUpdate) -> Result<(), AppError> {
        PageRepository::update_fields(self, page_id, update).await
    }

    async fn mark_version_generated(&self, version_id: &str) -> Result<(), AppError> {
        PageRepository::mark_generated(self, version_id).await
    }
}

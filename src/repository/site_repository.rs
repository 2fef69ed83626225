use crate::error::{AppError, Result};
use crate::models::{SiteRecord, SiteUpdate, normalize_site_url};
use crate::repository::{DbPool, SiteStore};
use async_trait::async_trait;
use chrono::Utc;

const SITE_COLUMNS: &str =
    "id, owner_id, name, url, normalized_url, username, secret, created_at, updated_at";

/// SQLite-backed site store. Every query is filtered by `owner_id`.
#[derive(Clone)]
pub struct SiteRepository {
    pool: DbPool,
}

impl SiteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SiteStore for SiteRepository {
    async fn get(&self, owner_id: &str, id: &str) -> Result<Option<SiteRecord>> {
        let site = sqlx::query_as::<_, SiteRecord>(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE owner_id = ? AND id = ?"
        ))
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(site)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<SiteRecord>> {
        let sites = sqlx::query_as::<_, SiteRecord>(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE owner_id = ? ORDER BY created_at DESC, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sites)
    }

    async fn create(&self, site: &SiteRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO sites (id, owner_id, name, url, normalized_url, username, secret, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&site.id)
        .bind(&site.owner_id)
        .bind(&site.name)
        .bind(&site.url)
        .bind(&site.normalized_url)
        .bind(&site.username)
        .bind(&site.secret)
        .bind(site.created_at)
        .bind(site.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::SiteAlreadyExists(site.url.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_fields(
        &self,
        owner_id: &str,
        id: &str,
        update: &SiteUpdate,
    ) -> Result<SiteRecord> {
        let normalized_url = update.url.as_deref().map(normalize_site_url);
        let result = sqlx::query(
            r#"
            UPDATE sites
            SET name = COALESCE(?, name),
                url = COALESCE(?, url),
                normalized_url = COALESCE(?, normalized_url),
                username = COALESCE(?, username),
                secret = COALESCE(?, secret),
                updated_at = ?
            WHERE owner_id = ? AND id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.url)
        .bind(&normalized_url)
        .bind(&update.username)
        .bind(&update.secret)
        .bind(Utc::now().timestamp_millis())
        .bind(owner_id)
        .bind(id)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(AppError::SiteAlreadyExists(
                    update.url.clone().unwrap_or_default(),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        if result.rows_affected() == 0 {
            return Err(AppError::SiteNotFound(id.to_string()));
        }

        self.get(owner_id, id)
            .await?
            .ok_or_else(|| AppError::SiteNotFound(id.to_string()))
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM sites WHERE owner_id = ? AND id = ?")
            .bind(owner_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::SiteNotFound(id.to_string()));
        }

        Ok(())
    }
}

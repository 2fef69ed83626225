mod connection;
mod site_repository;
mod ticket_repository;

use crate::error::Result;
use crate::models::{SiteRecord, SiteUpdate};
use async_trait::async_trait;

pub use connection::establish_connection;
pub use site_repository::SiteRepository;
pub use ticket_repository::TicketRepository;

pub type DbPool = sqlx::SqlitePool;

/// Owner-scoped document store for site records.
#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn get(&self, owner_id: &str, id: &str) -> Result<Option<SiteRecord>>;

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<SiteRecord>>;

    async fn create(&self, site: &SiteRecord) -> Result<()>;

    /// Applies the non-`None` fields of `update` and returns the stored record.
    async fn update_fields(
        &self,
        owner_id: &str,
        id: &str,
        update: &SiteUpdate,
    ) -> Result<SiteRecord>;

    async fn delete(&self, owner_id: &str, id: &str) -> Result<()>;
}

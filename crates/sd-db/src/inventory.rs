//! Inventory repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sd_core::pagination::{Page, PaginationParams};
use sd_core::traits::{Entity, Id};
use sd_models::{HolderKind, Inventory, InventoryFilter, InventoryHistoryEntry, InventoryStatus};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::InventoryStore;
use crate::tools::map_unique;

const COLUMNS: &str = "id, name, inventory_number, serial, images, assigned_to, \
     assigned_to_model, assigned_at, tags, branch_id, department_id, status, qr_code_url, \
     history, lock_version, created_at, updated_at";

/// List filter; `$3` is a lowercased search term wrapped in `%`
const FILTER: &str = "($1::text IS NULL OR status = $1) \
     AND ($2::bigint IS NULL OR branch_id = $2) \
     AND ($3::text IS NULL OR LOWER(name) LIKE $3 OR LOWER(inventory_number) LIKE $3 \
          OR LOWER(COALESCE(serial, '')) LIKE $3)";

/// `LIKE` pattern for a search term, with its wildcards escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Inventory database entity
#[derive(Debug, Clone, FromRow)]
pub struct InventoryRow {
    pub id: i64,
    pub name: String,
    pub inventory_number: String,
    pub serial: Option<String>,
    pub images: Json<Vec<String>>,
    pub assigned_to: Option<i64>,
    pub assigned_to_model: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub tags: Vec<i64>,
    pub branch_id: Option<i64>,
    pub department_id: Option<i64>,
    pub status: String,
    pub qr_code_url: String,
    pub history: Json<Vec<InventoryHistoryEntry>>,
    pub lock_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn decode_error(message: String) -> RepositoryError {
    RepositoryError::Database(sqlx::Error::Decode(message.into()))
}

fn holder_model(kind: HolderKind) -> &'static str {
    match kind {
        HolderKind::User => "User",
        HolderKind::Employee => "Employee",
    }
}

impl TryFrom<InventoryRow> for Inventory {
    type Error = RepositoryError;

    fn try_from(row: InventoryRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<InventoryStatus>()
            .map_err(decode_error)?;
        let assigned_to_model = row
            .assigned_to_model
            .as_deref()
            .map(str::parse::<HolderKind>)
            .transpose()
            .map_err(decode_error)?;
        Ok(Inventory {
            id: row.id,
            name: row.name,
            inventory_number: row.inventory_number,
            serial: row.serial,
            images: row.images.0,
            assigned_to: row.assigned_to,
            assigned_to_model,
            assigned_at: row.assigned_at,
            tags: row.tags,
            branch_id: row.branch_id,
            department_id: row.department_id,
            status,
            qr_code_url: row.qr_code_url,
            history: row.history.0,
            lock_version: row.lock_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Inventory repository implementation
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn insert(&self, draft: Inventory) -> RepositoryResult<Inventory> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            INSERT INTO inventory (
                name, inventory_number, serial, images, assigned_to, assigned_to_model,
                assigned_at, tags, branch_id, department_id, status, qr_code_url, history,
                lock_version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 0, $14, $14)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&draft.name)
        .bind(&draft.inventory_number)
        .bind(&draft.serial)
        .bind(Json(&draft.images))
        .bind(draft.assigned_to)
        .bind(draft.assigned_to_model.map(holder_model))
        .bind(draft.assigned_at)
        .bind(&draft.tags)
        .bind(draft.branch_id)
        .bind(draft.department_id)
        .bind(draft.status.as_str())
        .bind(&draft.qr_code_url)
        .bind(Json(&draft.history))
        .bind(draft.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, |_| draft.inventory_number.clone()))?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Inventory>> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {COLUMNS} FROM inventory WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Inventory::try_from).transpose()
    }

    async fn find_by_number(&self, inventory_number: &str) -> RepositoryResult<Option<Inventory>> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {COLUMNS} FROM inventory WHERE inventory_number = $1"
        ))
        .bind(inventory_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Inventory::try_from).transpose()
    }

    async fn update(&self, inventory: &Inventory) -> RepositoryResult<Inventory> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            UPDATE inventory SET
                images = $1,
                assigned_to = $2,
                assigned_to_model = $3,
                assigned_at = $4,
                status = $5,
                history = $6,
                name = $9,
                serial = $10,
                tags = $11,
                branch_id = $12,
                department_id = $13,
                lock_version = lock_version + 1,
                updated_at = NOW()
            WHERE id = $7 AND lock_version = $8
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Json(&inventory.images))
        .bind(inventory.assigned_to)
        .bind(inventory.assigned_to_model.map(holder_model))
        .bind(inventory.assigned_at)
        .bind(inventory.status.as_str())
        .bind(Json(&inventory.history))
        .bind(inventory.id)
        .bind(inventory.lock_version)
        .bind(&inventory.name)
        .bind(&inventory.serial)
        .bind(&inventory.tags)
        .bind(inventory.branch_id)
        .bind(inventory.department_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(RepositoryError::stale(Inventory::TYPE_NAME, inventory.id)),
        }
    }

    async fn list(
        &self,
        filter: &InventoryFilter,
        pagination: PaginationParams,
    ) -> RepositoryResult<Page<Inventory>> {
        let p = pagination.normalized();
        let status = filter.status.map(|s| s.as_str());
        let search = filter.search_term().map(|term| like_pattern(&term));

        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {COLUMNS} FROM inventory WHERE {FILTER} ORDER BY id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(status)
        .bind(filter.branch_id)
        .bind(&search)
        .bind(p.limit)
        .bind(p.offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM inventory WHERE {FILTER}"
        ))
        .bind(status)
        .bind(filter.branch_id)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        let elements = rows
            .into_iter()
            .map(Inventory::try_from)
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok(Page::new(elements, total, p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("inv"), "%inv%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}

//! Tool repository
//!
//! Write-offs are conditional updates inside one transaction: a line only
//! applies while `quantity - written_off` still covers it, and the first
//! miss rolls back the whole batch.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sd_core::traits::{Entity, Id};
use sd_models::{NewTool, Tool, ToolHistoryEntry, ToolStatus, WriteOff};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::repository::{RepositoryError, RepositoryResult};
use crate::schema::unique_field;
use crate::store::{shortfall, ToolStore};

const COLUMNS: &str = "id, name, tool_number, serial, quantity, written_off, status, tags, \
     history, lock_version, created_at, updated_at";

/// Tool database entity
#[derive(Debug, Clone, FromRow)]
pub struct ToolRow {
    pub id: i64,
    pub name: String,
    pub tool_number: String,
    pub serial: Option<String>,
    pub quantity: i64,
    pub written_off: i64,
    pub status: String,
    pub tags: Vec<i64>,
    pub history: Json<Vec<ToolHistoryEntry>>,
    pub lock_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ToolRow> for Tool {
    type Error = RepositoryError;

    fn try_from(row: ToolRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ToolStatus>()
            .map_err(|e| RepositoryError::Database(sqlx::Error::Decode(e.into())))?;
        Ok(Tool {
            id: row.id,
            name: row.name,
            tool_number: row.tool_number,
            serial: row.serial,
            quantity: row.quantity,
            written_off: row.written_off,
            status,
            tags: row.tags,
            history: row.history.0,
            lock_version: row.lock_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_tools(rows: Vec<ToolRow>) -> RepositoryResult<Vec<Tool>> {
    rows.into_iter().map(Tool::try_from).collect()
}

/// Turn a unique violation into `Duplicate`, pass everything else through
pub(crate) fn map_unique(err: sqlx::Error, value: impl FnOnce(&'static str) -> String) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if let Some(field) = db.constraint().and_then(unique_field) {
            return RepositoryError::Duplicate {
                field,
                value: value(field),
            };
        }
    }
    RepositoryError::Database(err)
}

/// Tool repository implementation
pub struct PgToolStore {
    pool: PgPool,
}

impl PgToolStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain why a conditional write-off matched no row.
    ///
    /// `applied` is what earlier lines of the batch already took from the tool.
    async fn write_off_failure(
        tx: &mut Transaction<'_, Postgres>,
        line: &WriteOff,
        applied: i64,
    ) -> RepositoryResult<RepositoryError> {
        let row = sqlx::query_as::<_, ToolRow>(&format!(
            "SELECT {COLUMNS} FROM tools WHERE id = $1"
        ))
        .bind(line.tool)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(row) = row else {
            return Ok(RepositoryError::not_found(Tool::TYPE_NAME, line.tool));
        };
        let tool = Tool::try_from(row)?;
        if !tool.is_active() {
            return Ok(RepositoryError::Inactive(tool.name));
        }
        Ok(shortfall(&tool, applied, applied + line.quantity))
    }
}

#[async_trait]
impl ToolStore for PgToolStore {
    async fn insert(&self, new: NewTool) -> RepositoryResult<Tool> {
        let row = sqlx::query_as::<_, ToolRow>(&format!(
            r#"
            INSERT INTO tools (name, tool_number, serial, quantity, written_off, status, tags,
                               history, lock_version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, 'active', $5, '[]', 0, NOW(), NOW())
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.tool_number)
        .bind(&new.serial)
        .bind(new.quantity)
        .bind(&new.tags)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique(e, |field| match field {
                "name" => new.name.clone(),
                _ => new.tool_number.clone(),
            })
        })?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Tool>> {
        let row = sqlx::query_as::<_, ToolRow>(&format!(
            "SELECT {COLUMNS} FROM tools WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Tool::try_from).transpose()
    }

    async fn list(&self, status: Option<ToolStatus>) -> RepositoryResult<Vec<Tool>> {
        let rows = sqlx::query_as::<_, ToolRow>(&format!(
            "SELECT {COLUMNS} FROM tools WHERE ($1::text IS NULL OR status = $1) ORDER BY id"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        into_tools(rows)
    }

    async fn list_by_tag(&self, tag: Id) -> RepositoryResult<Vec<Tool>> {
        let rows = sqlx::query_as::<_, ToolRow>(&format!(
            "SELECT {COLUMNS} FROM tools WHERE $1 = ANY(tags) ORDER BY id"
        ))
        .bind(tag)
        .fetch_all(&self.pool)
        .await?;

        into_tools(rows)
    }

    async fn update(&self, tool: &Tool) -> RepositoryResult<Tool> {
        let row = sqlx::query_as::<_, ToolRow>(&format!(
            r#"
            UPDATE tools SET
                name = $1,
                serial = $2,
                quantity = $3,
                status = $4,
                tags = $5,
                history = $6,
                lock_version = lock_version + 1,
                updated_at = NOW()
            WHERE id = $7 AND lock_version = $8
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&tool.name)
        .bind(&tool.serial)
        .bind(tool.quantity)
        .bind(tool.status.as_str())
        .bind(&tool.tags)
        .bind(Json(&tool.history))
        .bind(tool.id)
        .bind(tool.lock_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique(e, |_| tool.name.clone()))?;

        match row {
            Some(row) => row.try_into(),
            None => Err(RepositoryError::stale(Tool::TYPE_NAME, tool.id)),
        }
    }

    async fn write_off(&self, batch: &[WriteOff]) -> RepositoryResult<Vec<Tool>> {
        let mut tx = self.pool.begin().await?;
        let mut touched = Vec::with_capacity(batch.len());
        let mut applied: HashMap<Id, i64> = HashMap::new();

        for line in batch {
            let row = sqlx::query_as::<_, ToolRow>(&format!(
                r#"
                UPDATE tools SET
                    written_off = written_off + $1,
                    history = history || $2,
                    lock_version = lock_version + 1,
                    updated_at = NOW()
                WHERE id = $3 AND status = 'active' AND quantity - written_off >= $1
                RETURNING {COLUMNS}
                "#
            ))
            .bind(line.quantity)
            .bind(Json(vec![&line.entry]))
            .bind(line.tool)
            .fetch_optional(&mut *tx)
            .await?;

            match row {
                Some(row) => {
                    *applied.entry(line.tool).or_default() += line.quantity;
                    touched.push(Tool::try_from(row)?);
                }
                None => {
                    let earlier = applied.get(&line.tool).copied().unwrap_or(0);
                    let err = Self::write_off_failure(&mut tx, line, earlier).await?;
                    tx.rollback().await?;
                    tracing::debug!(tool_id = line.tool, error = %err, "Write-off batch rolled back");
                    return Err(err);
                }
            }
        }

        tx.commit().await?;
        Ok(touched)
    }

    async fn restore(&self, batch: &[WriteOff]) -> RepositoryResult<Vec<Tool>> {
        let mut tx = self.pool.begin().await?;
        let mut touched = Vec::with_capacity(batch.len());

        for line in batch {
            let row = sqlx::query_as::<_, ToolRow>(&format!(
                r#"
                UPDATE tools SET
                    written_off = GREATEST(written_off - $1, 0),
                    history = history || $2,
                    lock_version = lock_version + 1,
                    updated_at = NOW()
                WHERE id = $3
                RETURNING {COLUMNS}
                "#
            ))
            .bind(line.quantity)
            .bind(Json(vec![&line.entry]))
            .bind(line.tool)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Tool::TYPE_NAME, line.tool))?;

            touched.push(Tool::try_from(row)?);
        }

        tx.commit().await?;
        Ok(touched)
    }
}

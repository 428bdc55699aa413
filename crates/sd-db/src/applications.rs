//! Application repository
//!
//! History, images and the completion report are stored as JSONB so the
//! audit trail keeps its field-for-field shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sd_core::pagination::{Page, PaginationParams};
use sd_core::traits::{Entity, Id};
use sd_models::{
    Application, ApplicationFilter, ApplicationHistoryEntry, ApplicationIndex, ApplicationStatus,
    CompletionReport, StatusCounts,
};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::repository::{RepositoryError, RepositoryResult};
use crate::schema::APPLICATION_INDEX_LOCK;
use crate::store::ApplicationStore;

const COLUMNS: &str = "id, app_index, status, user_id, branch_id, department_id, room, issue, \
     issue_comment, additional_comment, images, inventory_id, assigned_to, deadline, \
     completion_report, history, lock_version, created_at, updated_at";

/// Shared filter; every criterion is optional
const FILTER: &str = "($1::text IS NULL OR status = $1) \
     AND ($2::bigint IS NULL OR user_id = $2) \
     AND ($3::bigint IS NULL OR $3 = ANY(assigned_to)) \
     AND ($4::bigint IS NULL OR branch_id = $4) \
     AND ($5::bigint IS NULL OR department_id = $5)";

/// Application database entity
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRow {
    pub id: i64,
    pub app_index: String,
    pub status: String,
    pub user_id: i64,
    pub branch_id: i64,
    pub department_id: i64,
    pub room: String,
    pub issue: String,
    pub issue_comment: Option<String>,
    pub additional_comment: Option<String>,
    pub images: Json<Vec<String>>,
    pub inventory_id: Option<i64>,
    pub assigned_to: Vec<i64>,
    pub deadline: Option<DateTime<Utc>>,
    pub completion_report: Option<Json<CompletionReport>>,
    pub history: Json<Vec<ApplicationHistoryEntry>>,
    pub lock_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = RepositoryError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ApplicationStatus>()
            .map_err(|e| RepositoryError::Database(sqlx::Error::Decode(e.into())))?;
        Ok(Application {
            id: row.id,
            index: row.app_index,
            status,
            user_id: row.user_id,
            branch_id: row.branch_id,
            department_id: row.department_id,
            room: row.room,
            issue: row.issue,
            issue_comment: row.issue_comment,
            additional_comment: row.additional_comment,
            images: row.images.0,
            inventory_id: row.inventory_id,
            assigned_to: row.assigned_to,
            deadline: row.deadline,
            completion_report: row.completion_report.map(|r| r.0),
            history: row.history.0,
            lock_version: row.lock_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Application repository implementation
pub struct PgApplicationStore {
    pool: PgPool,
}

impl PgApplicationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM applications WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }
}

#[async_trait]
impl ApplicationStore for PgApplicationStore {
    async fn insert_with_next_index(
        &self,
        year: i32,
        draft: Application,
    ) -> RepositoryResult<Application> {
        let mut tx = self.pool.begin().await?;

        // Held until commit; serializes allocation across connections
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPLICATION_INDEX_LOCK)
            .execute(&mut *tx)
            .await?;

        let last = sqlx::query_scalar::<_, String>(
            "SELECT app_index FROM applications WHERE year = $1 ORDER BY number DESC LIMIT 1",
        )
        .bind(year)
        .fetch_optional(&mut *tx)
        .await?;

        let index = ApplicationIndex::next_after(last.as_deref(), year);

        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            INSERT INTO applications (
                app_index, year, number, status, user_id, branch_id, department_id,
                room, issue, issue_comment, additional_comment, images, inventory_id,
                assigned_to, deadline, completion_report, history, lock_version,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, 0,
                $18, $18
            )
            RETURNING {COLUMNS}
            "#
        ))
        .bind(index.to_string())
        .bind(index.year)
        .bind(index.number as i32)
        .bind(draft.status.as_str())
        .bind(draft.user_id)
        .bind(draft.branch_id)
        .bind(draft.department_id)
        .bind(&draft.room)
        .bind(&draft.issue)
        .bind(&draft.issue_comment)
        .bind(&draft.additional_comment)
        .bind(Json(&draft.images))
        .bind(draft.inventory_id)
        .bind(&draft.assigned_to)
        .bind(draft.deadline)
        .bind(draft.completion_report.as_ref().map(Json))
        .bind(Json(&draft.history))
        .bind(draft.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Application::try_from).transpose()
    }

    async fn update(&self, application: &Application) -> RepositoryResult<Application> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            UPDATE applications SET
                status = $1,
                assigned_to = $2,
                deadline = $3,
                completion_report = $4,
                history = $5,
                images = $6,
                branch_id = $9,
                department_id = $10,
                room = $11,
                issue = $12,
                issue_comment = $13,
                additional_comment = $14,
                inventory_id = $15,
                lock_version = lock_version + 1,
                updated_at = NOW()
            WHERE id = $7 AND lock_version = $8
            RETURNING {COLUMNS}
            "#
        ))
        .bind(application.status.as_str())
        .bind(&application.assigned_to)
        .bind(application.deadline)
        .bind(application.completion_report.as_ref().map(Json))
        .bind(Json(&application.history))
        .bind(Json(&application.images))
        .bind(application.id)
        .bind(application.lock_version)
        .bind(application.branch_id)
        .bind(application.department_id)
        .bind(&application.room)
        .bind(&application.issue)
        .bind(&application.issue_comment)
        .bind(&application.additional_comment)
        .bind(application.inventory_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return row.try_into();
        }
        if self.exists(application.id).await? {
            Err(RepositoryError::stale(Application::TYPE_NAME, application.id))
        } else {
            Err(RepositoryError::not_found(Application::TYPE_NAME, application.id))
        }
    }

    async fn list(
        &self,
        filter: &ApplicationFilter,
        pagination: PaginationParams,
    ) -> RepositoryResult<Page<Application>> {
        let p = pagination.normalized();
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {COLUMNS} FROM applications WHERE {FILTER} ORDER BY id DESC LIMIT $6 OFFSET $7"
        ))
        .bind(status)
        .bind(filter.user_id)
        .bind(filter.employee_id)
        .bind(filter.branch_id)
        .bind(filter.department_id)
        .bind(p.limit)
        .bind(p.offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM applications WHERE {FILTER}"
        ))
        .bind(status)
        .bind(filter.user_id)
        .bind(filter.employee_id)
        .bind(filter.branch_id)
        .bind(filter.department_id)
        .fetch_one(&self.pool)
        .await?;

        let elements = rows
            .into_iter()
            .map(Application::try_from)
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok(Page::new(elements, total, p))
    }

    async fn count_by_status(&self, filter: &ApplicationFilter) -> RepositoryResult<StatusCounts> {
        let rows = sqlx::query_as::<_, (String, i64)>(&format!(
            "SELECT status, COUNT(*) FROM applications WHERE {FILTER} GROUP BY status"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.user_id)
        .bind(filter.employee_id)
        .bind(filter.branch_id)
        .bind(filter.department_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match status.parse::<ApplicationStatus>() {
                Ok(status) => counts.add(status, count),
                Err(e) => tracing::warn!(error = %e, "Skipping unknown status in counts"),
            }
        }
        Ok(counts)
    }
}

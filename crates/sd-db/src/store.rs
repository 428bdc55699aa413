//! Store traits
//!
//! Updates are optimistic: the caller passes the record as it read it and
//! the store accepts the write only if the stored `lock_version` still
//! matches, returning the saved record with the version bumped.

use async_trait::async_trait;
use sd_core::pagination::{Page, PaginationParams};
use sd_core::traits::Id;
use sd_models::{
    Application, ApplicationFilter, Inventory, InventoryFilter, NewTool, StatusCounts, Tool,
    ToolStatus, WriteOff,
};

use crate::repository::{RepositoryError, RepositoryResult};

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Allocate the next `NNNNN-<year>` index and insert `draft` in one step
    async fn insert_with_next_index(
        &self,
        year: i32,
        draft: Application,
    ) -> RepositoryResult<Application>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Application>>;

    async fn update(&self, application: &Application) -> RepositoryResult<Application>;

    /// Newest first
    async fn list(
        &self,
        filter: &ApplicationFilter,
        pagination: PaginationParams,
    ) -> RepositoryResult<Page<Application>>;

    async fn count_by_status(&self, filter: &ApplicationFilter) -> RepositoryResult<StatusCounts>;
}

#[async_trait]
pub trait ToolStore: Send + Sync {
    /// Fails with `Duplicate` on a taken tool number or name
    async fn insert(&self, new: NewTool) -> RepositoryResult<Tool>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Tool>>;

    async fn list(&self, status: Option<ToolStatus>) -> RepositoryResult<Vec<Tool>>;

    async fn list_by_tag(&self, tag: Id) -> RepositoryResult<Vec<Tool>>;

    async fn update(&self, tool: &Tool) -> RepositoryResult<Tool>;

    /// Apply every deduction or none.
    ///
    /// Each line is checked against the tool's current `quantity - written_off`
    /// and active status at the moment of the write; the first failing line
    /// aborts the batch with nothing applied.
    async fn write_off(&self, batch: &[WriteOff]) -> RepositoryResult<Vec<Tool>>;

    /// Give back a previously applied batch, logging each entry
    async fn restore(&self, batch: &[WriteOff]) -> RepositoryResult<Vec<Tool>>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Fails with `Duplicate` on a taken inventory number
    async fn insert(&self, draft: Inventory) -> RepositoryResult<Inventory>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Inventory>>;

    async fn find_by_number(&self, inventory_number: &str) -> RepositoryResult<Option<Inventory>>;

    async fn update(&self, inventory: &Inventory) -> RepositoryResult<Inventory>;

    /// Newest first
    async fn list(
        &self,
        filter: &InventoryFilter,
        pagination: PaginationParams,
    ) -> RepositoryResult<Page<Inventory>>;
}

/// Stock shortfall of a write-off batch.
///
/// `requested` is the batch's running total for the tool and `applied` the
/// part of it already written off inside the batch, so both backends report
/// the stock as it stood before the batch.
pub(crate) fn shortfall(tool: &Tool, applied: i64, requested: i64) -> RepositoryError {
    RepositoryError::InsufficientStock {
        tool: tool.name.clone(),
        available: tool.available() + applied,
        requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_shortfall_reports_stock_before_the_batch() {
        let mut tool = Tool::from_new(
            1,
            NewTool {
                name: "Cable".into(),
                tool_number: "C-1".into(),
                serial: None,
                quantity: 5,
                tags: vec![],
            },
            Utc::now(),
        );
        // A first line of 3 went through, the second line of 3 did not
        tool.written_off = 3;
        let err = shortfall(&tool, 3, 6);
        assert_eq!(
            err.to_string(),
            "Not enough quantity for tool \"Cable\". Available: 5, Requested: 6"
        );
    }
}

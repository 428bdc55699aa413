//! Application workflow
//!
//! Lifecycle: `new → accepted → inProgress → completed | rejected`, with
//! `overdue` as a detour from `inProgress` and rejection open from every
//! non-terminal status.
//!
//! Each mutating operation runs under the application's entity lock:
//! load, check, append one history entry, save. Notifications go out only
//! after the save succeeded.

mod complete;
mod create;
mod transitions;
mod update;

use std::sync::Arc;

use sd_core::error::SdError;
use sd_core::pagination::{Page, PaginationParams};
use sd_core::result::SdResult;
use sd_core::traits::{Entity, Id};
use sd_db::ApplicationStore;
use sd_models::{
    ActorRef, Application, ApplicationFilter, ApplicationHistoryEntry, ApplicationStatus,
    StatusCounts,
};
use sd_notifications::Notifier;

use crate::clock::{Clock, SystemClock};
use crate::locks::EntityLocks;
use crate::tools::ToolStockLedger;

pub struct ApplicationWorkflow {
    store: Arc<dyn ApplicationStore>,
    tools: ToolStockLedger,
    notifier: Notifier,
    locks: EntityLocks,
    clock: Arc<dyn Clock>,
}

impl ApplicationWorkflow {
    pub fn new(store: Arc<dyn ApplicationStore>, tools: ToolStockLedger, notifier: Notifier) -> Self {
        Self {
            store,
            tools,
            notifier,
            locks: EntityLocks::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source for index years and timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn tools(&self) -> &ToolStockLedger {
        &self.tools
    }

    pub async fn find(&self, id: Id) -> SdResult<Application> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| SdError::not_found(Application::TYPE_NAME, id))
    }

    /// Newest first
    pub async fn list(
        &self,
        filter: &ApplicationFilter,
        pagination: PaginationParams,
    ) -> SdResult<Page<Application>> {
        Ok(self.store.list(filter, pagination.normalized()).await?)
    }

    /// Applications filed by `user_id`
    pub async fn find_by_user(
        &self,
        user_id: Id,
        pagination: PaginationParams,
    ) -> SdResult<Page<Application>> {
        self.list(&ApplicationFilter::for_user(user_id), pagination)
            .await
    }

    /// Applications `employee_id` is assigned to
    pub async fn find_by_employee(
        &self,
        employee_id: Id,
        pagination: PaginationParams,
    ) -> SdResult<Page<Application>> {
        self.list(&ApplicationFilter::for_employee(employee_id), pagination)
            .await
    }

    /// Count per status; a status filter in `filter` is ignored
    pub async fn count_by_status(&self, filter: &ApplicationFilter) -> SdResult<StatusCounts> {
        Ok(self.store.count_by_status(&filter.without_status()).await?)
    }

    fn entry(
        &self,
        status: ApplicationStatus,
        by: ActorRef,
        comment: impl Into<String>,
    ) -> ApplicationHistoryEntry {
        ApplicationHistoryEntry::new(status, by, comment).at(self.clock.now())
    }

    async fn save(&self, application: &Application) -> SdResult<Application> {
        Ok(self.store.update(application).await?)
    }
}

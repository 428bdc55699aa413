//! Warehouse tool stock
//!
//! All stock leaves through [`ToolStockLedger::consume`]: direct deductions,
//! application completions and inventory repairs share the same atomic
//! batch, so `quantity - written_off` never goes negative.

use std::sync::Arc;

use sd_contracts::base::Contract;
use sd_contracts::tools::{
    ensure_active, ensure_positive_quantity, CreateToolContract, UpdateToolContract,
};
use sd_core::error::SdError;
use sd_core::result::SdResult;
use sd_core::traits::{Entity, Id};
use sd_db::ToolStore;
use sd_models::{
    Actor, ActorRef, NewTool, Tool, ToolAction, ToolAvailability, ToolHistoryEntry, ToolStatus,
    ToolUpdate, UsedTool, WriteOff,
};
use tracing::instrument;

use crate::locks::EntityLocks;

/// Stock taken by one [`ToolStockLedger::consume`] call
#[derive(Debug, Clone, Default)]
pub struct Consumption {
    lines: Vec<UsedTool>,
    /// Tools as they were right after the write-off
    pub tools: Vec<Tool>,
}

impl Consumption {
    pub fn lines(&self) -> &[UsedTool] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Clone)]
pub struct ToolStockLedger {
    store: Arc<dyn ToolStore>,
    locks: Arc<EntityLocks>,
}

impl ToolStockLedger {
    pub fn new(store: Arc<dyn ToolStore>) -> Self {
        Self {
            store,
            locks: Arc::new(EntityLocks::new()),
        }
    }

    #[instrument(skip(self, new), fields(tool_number = %new.tool_number))]
    pub async fn create(&self, new: NewTool) -> SdResult<Tool> {
        CreateToolContract.validate(&new)?;
        let tool = self.store.insert(new).await?;
        tracing::info!(tool_id = tool.id, quantity = tool.quantity, "Tool created");
        Ok(tool)
    }

    pub async fn find(&self, id: Id) -> SdResult<Tool> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| SdError::not_found(Tool::TYPE_NAME, id))
    }

    pub async fn list(&self, status: Option<ToolStatus>) -> SdResult<Vec<Tool>> {
        Ok(self.store.list(status).await?)
    }

    pub async fn list_by_tag(&self, tag: Id) -> SdResult<Vec<Tool>> {
        Ok(self.store.list_by_tag(tag).await?)
    }

    /// Stock summary of every tool carrying `tag`
    pub async fn count_by_tag(&self, tag: Id) -> SdResult<Vec<ToolAvailability>> {
        let tools = self.store.list_by_tag(tag).await?;
        Ok(tools.iter().map(Tool::availability).collect())
    }

    pub async fn availability(&self, id: Id) -> SdResult<ToolAvailability> {
        Ok(self.find(id).await?.availability())
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, id: Id, update: ToolUpdate) -> SdResult<Tool> {
        let _guard = self.locks.lock(id).await;
        let mut tool = self.find(id).await?;
        UpdateToolContract::new(&tool).validate(&update)?;

        if let Some(name) = update.name {
            tool.name = name;
        }
        if let Some(serial) = update.serial {
            tool.serial = Some(serial);
        }
        if let Some(quantity) = update.quantity {
            tool.quantity = quantity;
        }
        if let Some(tags) = update.tags {
            tool.tags = tags;
        }

        let tool = self.store.update(&tool).await?;
        tracing::info!(tool_id = id, "Tool updated");
        Ok(tool)
    }

    /// Write off `quantity` of one tool
    #[instrument(skip(self, by, comment, reason), fields(actor = by.id()))]
    pub async fn deduct(
        &self,
        id: Id,
        quantity: i64,
        by: &Actor,
        comment: Option<String>,
        reason: Option<String>,
    ) -> SdResult<Tool> {
        let consumption = self
            .consume(&[UsedTool::new(id, quantity)], by.reference, comment, reason)
            .await?;
        consumption
            .tools
            .into_iter()
            .next()
            .ok_or_else(|| SdError::Internal(format!("write-off of tool {} returned nothing", id)))
    }

    /// Write off every line or none of them.
    ///
    /// Repeated lines for one tool are checked against its stock as a sum.
    /// Each tool gets one `writtenOff` history entry per line.
    #[instrument(skip_all, fields(lines = lines.len(), actor = by.id))]
    pub async fn consume(
        &self,
        lines: &[UsedTool],
        by: ActorRef,
        comment: Option<String>,
        reason: Option<String>,
    ) -> SdResult<Consumption> {
        if lines.is_empty() {
            return Ok(Consumption::default());
        }
        for line in lines {
            ensure_positive_quantity(line.quantity)?;
        }

        let batch: Vec<WriteOff> = lines
            .iter()
            .map(|line| WriteOff {
                tool: line.tool,
                quantity: line.quantity,
                entry: ToolHistoryEntry::written_off(line.quantity, by)
                    .with_comment(comment.clone())
                    .with_reason(reason.clone()),
            })
            .collect();

        let tools = self.store.write_off(&batch).await.map_err(|e| {
            tracing::debug!(error = %e, "Write-off rejected");
            SdError::from(e)
        })?;

        for tool in &tools {
            tracing::info!(
                tool_id = tool.id,
                written_off = tool.written_off,
                available = tool.available(),
                "Stock written off"
            );
        }
        Ok(Consumption {
            lines: lines.to_vec(),
            tools,
        })
    }

    /// Give back a consumption whose owning change could not be saved
    #[instrument(skip_all, fields(lines = consumption.lines.len()))]
    pub async fn revert(
        &self,
        consumption: &Consumption,
        by: ActorRef,
        comment: impl Into<String>,
    ) -> SdResult<()> {
        if consumption.is_empty() {
            return Ok(());
        }
        let comment = comment.into();
        let batch: Vec<WriteOff> = consumption
            .lines
            .iter()
            .map(|line| {
                let mut entry = ToolHistoryEntry::new(ToolAction::Restored, by)
                    .with_comment(Some(comment.clone()));
                entry.quantity = Some(line.quantity);
                WriteOff {
                    tool: line.tool,
                    quantity: line.quantity,
                    entry,
                }
            })
            .collect();

        self.store.restore(&batch).await?;
        tracing::warn!(comment = %comment, "Stock write-off reverted");
        Ok(())
    }

    /// Take a tool out of circulation; there is no way back
    #[instrument(skip(self, by, comment, reason), fields(actor = by.id()))]
    pub async fn deactivate(
        &self,
        id: Id,
        by: &Actor,
        comment: Option<String>,
        reason: Option<String>,
    ) -> SdResult<Tool> {
        let _guard = self.locks.lock(id).await;
        let mut tool = self.find(id).await?;
        ensure_active(&tool)?;

        tool.status = ToolStatus::Inactive;
        tool.record(
            ToolHistoryEntry::new(ToolAction::Deactivated, by.reference)
                .with_comment(comment)
                .with_reason(reason),
        );

        let tool = self.store.update(&tool).await?;
        tracing::info!(tool_id = id, "Tool deactivated");
        Ok(tool)
    }
}

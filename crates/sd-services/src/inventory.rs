//! Device holders and device status
//!
//! Devices are keyed by id and inventory number. Every change of holder or
//! status appends one history entry; status changes may also consume
//! warehouse stock through the [`ToolStockLedger`].

use std::sync::Arc;

use chrono::Utc;
use sd_contracts::base::Contract;
use sd_contracts::inventory::{
    ensure_new_holder, ensure_not_decommissioned, ensure_status_change, CreateInventoryContract,
    UpdateInventoryContract,
};
use sd_core::error::SdError;
use sd_core::pagination::{Page, PaginationParams};
use sd_core::result::SdResult;
use sd_core::traits::{Entity, Id};
use sd_db::InventoryStore;
use sd_models::{
    Actor, Holder, Inventory, InventoryAction, InventoryFilter, InventoryHistoryEntry,
    InventoryStatus, InventoryUpdate, NewInventory, UsedTool,
};
use tracing::instrument;

use crate::locks::EntityLocks;
use crate::tools::ToolStockLedger;

/// Status change params
///
/// # Example
/// ```ignore
/// let params = InventoryStatusParams::new(InventoryStatus::Repair)
///     .with_comment("Screen flickers")
///     .with_used_tools(vec![UsedTool::new(cable_id, 1)], Some("Replaced cable".into()));
/// ledger.change_status(id, &actor, params).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct InventoryStatusParams {
    /// `None` keeps the current status (stock-only entries)
    pub status: Option<InventoryStatus>,
    pub comment: Option<String>,
    pub reason: Option<String>,
    pub used_tools: Vec<UsedTool>,
    pub write_off_reason: Option<String>,
}

impl InventoryStatusParams {
    pub fn new(status: InventoryStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Consume stock without moving the device to another status
    pub fn deduction(used_tools: Vec<UsedTool>, write_off_reason: Option<String>) -> Self {
        Self {
            used_tools,
            write_off_reason,
            ..Self::default()
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_used_tools(
        mut self,
        used_tools: Vec<UsedTool>,
        write_off_reason: Option<String>,
    ) -> Self {
        self.used_tools = used_tools;
        self.write_off_reason = write_off_reason;
        self
    }
}

pub struct InventoryAssignmentLedger {
    store: Arc<dyn InventoryStore>,
    tools: ToolStockLedger,
    locks: EntityLocks,
    qr_base_url: String,
}

impl InventoryAssignmentLedger {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        tools: ToolStockLedger,
        qr_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tools,
            locks: EntityLocks::new(),
            qr_base_url: qr_base_url.into(),
        }
    }

    /// Link encoded in the device's QR label
    pub fn qr_code_url(&self, inventory_number: &str) -> String {
        format!(
            "{}/{}",
            self.qr_base_url.trim_end_matches('/'),
            inventory_number
        )
    }

    /// Register a device, handing it to `user_id` when one is given
    #[instrument(skip(self, new, images, by), fields(inventory_number = %new.inventory_number))]
    pub async fn create(
        &self,
        new: NewInventory,
        images: Vec<String>,
        by: &Actor,
    ) -> SdResult<Inventory> {
        CreateInventoryContract.validate(&new)?;

        let holder = new.user_id.map(Holder::user);
        let qr_code_url = self.qr_code_url(&new.inventory_number);
        let mut draft = Inventory::draft(new, images, qr_code_url);
        if let Some(holder) = holder {
            draft.set_holder(holder, Utc::now());
            draft.record(InventoryHistoryEntry::new(
                InventoryAction::Assigned,
                by.reference,
                "Initial assignment",
            ));
        }

        let inventory = self.store.insert(draft).await?;
        tracing::info!(inventory_id = inventory.id, "Inventory created");
        Ok(inventory)
    }

    pub async fn find(&self, id: Id) -> SdResult<Inventory> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| SdError::not_found(Inventory::TYPE_NAME, id))
    }

    pub async fn find_by_number(&self, inventory_number: &str) -> SdResult<Inventory> {
        self.store
            .find_by_number(inventory_number)
            .await?
            .ok_or_else(|| SdError::not_found(Inventory::TYPE_NAME, inventory_number))
    }

    /// Devices matching `filter`, newest first
    pub async fn list(
        &self,
        filter: &InventoryFilter,
        pagination: PaginationParams,
    ) -> SdResult<Page<Inventory>> {
        Ok(self.store.list(filter, pagination.normalized()).await?)
    }

    /// Edit the descriptive fields of a device.
    ///
    /// Non-empty `images` replace the stored photos.
    #[instrument(skip(self, update, images, by), fields(actor = by.id()))]
    pub async fn update(
        &self,
        id: Id,
        update: InventoryUpdate,
        images: Vec<String>,
        by: &Actor,
    ) -> SdResult<Inventory> {
        UpdateInventoryContract.validate(&update)?;
        if update.is_empty() && images.is_empty() {
            return Err(SdError::invalid_base("Nothing to update"));
        }

        let _guard = self.locks.lock(id).await;
        let mut inventory = self.find(id).await?;
        ensure_not_decommissioned(&inventory)?;

        inventory.apply(update, images);
        inventory.record(InventoryHistoryEntry::new(
            InventoryAction::Updated,
            by.reference,
            "Inventory updated",
        ));

        let inventory = self.store.update(&inventory).await?;
        tracing::info!(inventory_id = id, "Inventory updated");
        Ok(inventory)
    }

    /// Entries that record a repair or consumed stock
    pub async fn repair_history(&self, id: Id) -> SdResult<Vec<InventoryHistoryEntry>> {
        let inventory = self.find(id).await?;
        Ok(inventory
            .history
            .into_iter()
            .filter(InventoryHistoryEntry::is_repair)
            .collect())
    }

    #[instrument(skip(self, by, comment), fields(actor = by.id()))]
    pub async fn reassign(
        &self,
        id: Id,
        holder: Holder,
        by: &Actor,
        comment: Option<String>,
    ) -> SdResult<Inventory> {
        let _guard = self.locks.lock(id).await;
        let mut inventory = self.find(id).await?;
        ensure_new_holder(&inventory, holder)?;

        let comment = comment.unwrap_or_else(|| {
            format!("Assigned to {} {}", holder.as_actor().kind, holder.id)
        });
        inventory.set_holder(holder, Utc::now());
        inventory.record(InventoryHistoryEntry::new(
            InventoryAction::Assigned,
            by.reference,
            comment,
        ));

        let inventory = self.store.update(&inventory).await?;
        tracing::info!(inventory_id = id, holder = holder.id, "Inventory reassigned");
        Ok(inventory)
    }

    /// Move a device to a new status, optionally consuming stock for it.
    ///
    /// Stock is written off before the device is saved; if the save fails
    /// the write-off is reverted.
    #[instrument(skip(self, by, params), fields(actor = by.id(), status = ?params.status))]
    pub async fn change_status(
        &self,
        id: Id,
        by: &Actor,
        params: InventoryStatusParams,
    ) -> SdResult<Inventory> {
        let _guard = self.locks.lock(id).await;
        let mut inventory = self.find(id).await?;

        let previous = inventory.status;
        let next = params.status.unwrap_or(previous);
        let used_tools = UsedTool::merge(&params.used_tools);
        ensure_status_change(&inventory, next, !used_tools.is_empty())?;

        let consumption = self
            .tools
            .consume(
                &used_tools,
                by.reference,
                Some(format!("Used for inventory {}", inventory.inventory_number)),
                params.write_off_reason.clone(),
            )
            .await?;

        let action = if next == previous {
            InventoryAction::Repair
        } else {
            InventoryAction::for_status(previous, next)
        };
        let comment = params
            .comment
            .unwrap_or_else(|| format!("Status changed to {}", next));
        inventory.status = next;
        inventory.record(
            InventoryHistoryEntry::new(action, by.reference, comment)
                .with_reason(params.reason)
                .with_used_tools(used_tools, params.write_off_reason),
        );

        match self.store.update(&inventory).await {
            Ok(saved) => {
                tracing::info!(inventory_id = id, from = %previous, to = %next, "Inventory status changed");
                Ok(saved)
            }
            Err(e) => {
                let comment = format!("Inventory {} was not saved", inventory.inventory_number);
                if let Err(revert) = self.tools.revert(&consumption, by.reference, comment).await {
                    tracing::error!(inventory_id = id, error = %revert, "Failed to revert stock write-off");
                }
                Err(e.into())
            }
        }
    }

    /// Write off stock against a device without changing its status
    pub async fn deduct_tools(
        &self,
        id: Id,
        by: &Actor,
        used_tools: Vec<UsedTool>,
        write_off_reason: Option<String>,
        comment: Option<String>,
    ) -> SdResult<Inventory> {
        let mut params = InventoryStatusParams::deduction(used_tools, write_off_reason);
        params.comment = comment;
        self.change_status(id, by, params).await
    }

    /// Retire a device for good
    pub async fn decommission(
        &self,
        id: Id,
        by: &Actor,
        comment: Option<String>,
        reason: Option<String>,
    ) -> SdResult<Inventory> {
        let mut params = InventoryStatusParams::new(InventoryStatus::Inactive).with_reason(reason);
        params.comment = comment;
        self.change_status(id, by, params).await
    }
}

//! Inventory contracts

use sd_core::error::{SdError, ValidationErrors};
use sd_core::result::SdResult;
use sd_models::{Holder, Inventory, InventoryStatus, InventoryUpdate, NewInventory};

use crate::base::{validate_derived, validate_not_blank, Contract, ValidationResult};

#[derive(Debug, Default)]
pub struct CreateInventoryContract;

impl Contract<NewInventory> for CreateInventoryContract {
    fn validate(&self, input: &NewInventory) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_not_blank("name", &input.name, &mut errors);
        validate_not_blank("inventoryNumber", &input.inventory_number, &mut errors);
        if errors.is_empty() {
            validate_derived(input, &mut errors);
        }
        errors.into_result()
    }
}

#[derive(Debug, Default)]
pub struct UpdateInventoryContract;

impl Contract<InventoryUpdate> for UpdateInventoryContract {
    fn validate(&self, update: &InventoryUpdate) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &update.name {
            validate_not_blank("name", name, &mut errors);
        }
        if errors.is_empty() {
            validate_derived(update, &mut errors);
        }
        errors.into_result()
    }
}

/// Decommissioned devices take no further changes
pub fn ensure_not_decommissioned(inventory: &Inventory) -> SdResult<()> {
    if inventory.status == InventoryStatus::Inactive {
        return Err(SdError::invalid_transition(format!(
            "Inventory {} is decommissioned",
            inventory.inventory_number
        )));
    }
    Ok(())
}

pub fn ensure_new_holder(inventory: &Inventory, holder: Holder) -> SdResult<()> {
    if inventory.holder() == Some(holder) {
        return Err(SdError::invalid(
            "assignedTo",
            "is already the current holder",
        ));
    }
    Ok(())
}

/// A device keeps its status only when the entry records consumed stock
pub fn ensure_status_change(
    inventory: &Inventory,
    next: InventoryStatus,
    consumes_tools: bool,
) -> SdResult<()> {
    ensure_not_decommissioned(inventory)?;
    if inventory.status == next && !consumes_tools {
        return Err(SdError::invalid(
            "status",
            format!("is already {}", next),
        ));
    }
    Ok(())
}

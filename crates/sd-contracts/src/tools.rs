//! Tool contracts: provisioning input and stock sufficiency

use sd_core::error::{SdError, ValidationErrors};
use sd_core::result::SdResult;
use sd_models::{NewTool, Tool, ToolUpdate};

use crate::base::{validate_derived, validate_not_blank, Contract, ValidationResult};

#[derive(Debug, Default)]
pub struct CreateToolContract;

impl Contract<NewTool> for CreateToolContract {
    fn validate(&self, input: &NewTool) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_not_blank("name", &input.name, &mut errors);
        validate_not_blank("toolNumber", &input.tool_number, &mut errors);
        if input.quantity < 0 {
            errors.add("quantity", "must be greater than or equal to 0");
        }
        if errors.is_empty() {
            validate_derived(input, &mut errors);
        }
        errors.into_result()
    }
}

/// Update contract; the provisioned quantity may not drop below what is already consumed
pub struct UpdateToolContract<'a> {
    tool: &'a Tool,
}

impl<'a> UpdateToolContract<'a> {
    pub fn new(tool: &'a Tool) -> Self {
        Self { tool }
    }
}

impl<'a> Contract<ToolUpdate> for UpdateToolContract<'a> {
    fn validate(&self, update: &ToolUpdate) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &update.name {
            validate_not_blank("name", name, &mut errors);
        }
        if let Some(quantity) = update.quantity {
            if quantity < self.tool.written_off {
                errors.add(
                    "quantity",
                    format!(
                        "can't be less than the written off amount ({})",
                        self.tool.written_off
                    ),
                );
            }
        }
        if errors.is_empty() {
            validate_derived(update, &mut errors);
        }
        errors.into_result()
    }
}

/// Deductions are whole, positive amounts
pub fn ensure_positive_quantity(quantity: i64) -> SdResult<()> {
    if quantity <= 0 {
        return Err(SdError::invalid("quantity", "must be greater than 0"));
    }
    Ok(())
}

/// Check that `tool` can give out `quantity` right now
pub fn ensure_can_supply(tool: &Tool, quantity: i64) -> SdResult<()> {
    if !tool.is_active() {
        return Err(SdError::invalid_transition(format!(
            "Tool \"{}\" is inactive",
            tool.name
        )));
    }
    if !tool.can_supply(quantity) {
        return Err(SdError::InsufficientStock {
            tool: tool.name.clone(),
            available: tool.available(),
            requested: quantity,
        });
    }
    Ok(())
}

pub fn ensure_active(tool: &Tool) -> SdResult<()> {
    if tool.is_active() {
        Ok(())
    } else {
        Err(SdError::invalid_transition(format!(
            "Tool \"{}\" is already inactive",
            tool.name
        )))
    }
}

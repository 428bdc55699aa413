//! Update contract for the fields of a filed application

use sd_core::error::ValidationErrors;
use sd_models::ApplicationUpdate;

use crate::base::{validate_derived, validate_not_blank, Contract, ValidationResult};

#[derive(Debug, Default)]
pub struct UpdateApplicationContract;

impl Contract<ApplicationUpdate> for UpdateApplicationContract {
    fn validate(&self, update: &ApplicationUpdate) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        if update.is_empty() {
            errors.add_base("Nothing to update");
            return errors.into_result();
        }
        if let Some(room) = &update.room {
            validate_not_blank("room", room, &mut errors);
        }
        if let Some(issue) = &update.issue {
            validate_not_blank("issue", issue, &mut errors);
        }
        for (field, id) in [
            ("branch", update.branch_id),
            ("department", update.department_id),
            ("inventory", update.inventory_id),
        ] {
            if id.is_some_and(|id| id <= 0) {
                errors.add(field, "is invalid");
            }
        }
        if errors.is_empty() {
            validate_derived(update, &mut errors);
        }

        errors.into_result()
    }
}

//! Create contract for applications

use sd_core::error::ValidationErrors;
use sd_core::traits::Id;
use sd_models::NewApplication;

use crate::base::{validate_derived, validate_not_blank, Contract, ValidationResult};

/// Contract for filing a new application
#[derive(Debug, Default)]
pub struct CreateApplicationContract;

impl CreateApplicationContract {
    pub fn new() -> Self {
        Self
    }

    fn validate_reference(field: &str, id: Id, errors: &mut ValidationErrors) {
        if id <= 0 {
            errors.add(field, "can't be blank");
        }
    }
}

impl Contract<NewApplication> for CreateApplicationContract {
    fn validate(&self, input: &NewApplication) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        validate_not_blank("room", &input.room, &mut errors);
        validate_not_blank("issue", &input.issue, &mut errors);
        Self::validate_reference("branch", input.branch_id, &mut errors);
        Self::validate_reference("department", input.department_id, &mut errors);

        // Length limits only matter once the field is present at all
        if errors.is_empty() {
            validate_derived(input, &mut errors);
        }

        errors.into_result()
    }
}

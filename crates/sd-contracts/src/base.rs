//! Base contract system

use sd_core::error::ValidationErrors;
use validator::Validate;

/// Result of contract validation
pub type ValidationResult = Result<(), ValidationErrors>;

/// Base contract trait
pub trait Contract<T: ?Sized>: Send + Sync {
    /// Validate the entity
    fn validate(&self, entity: &T) -> ValidationResult;
}

/// Add a "can't be blank" error when `value` is empty after trimming
pub fn validate_not_blank(field: &str, value: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(field, "can't be blank");
    }
}

/// Same as [`validate_not_blank`] for optional values; absent counts as blank
pub fn validate_present(field: &str, value: Option<&str>, errors: &mut ValidationErrors) {
    validate_not_blank(field, value.unwrap_or_default(), errors);
}

/// Run the derived `validator` rules and fold them into `errors`
pub fn validate_derived<T: Validate>(input: &T, errors: &mut ValidationErrors) {
    if let Err(derived) = input.validate() {
        errors.merge(convert_validator_errors(&derived));
    }
}

/// Translate `validator` output into field messages
pub fn convert_validator_errors(derived: &validator::ValidationErrors) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for (field, field_errors) in derived.field_errors() {
        for error in field_errors {
            let message = match &error.message {
                Some(message) => message.to_string(),
                None => describe_code(&error.code).to_string(),
            };
            errors.add(field, message);
        }
    }
    errors
}

fn describe_code(code: &str) -> &'static str {
    match code {
        "length" => "has an invalid length",
        "range" => "is out of range",
        "email" => "is not a valid email",
        "url" => "is not a valid URL",
        _ => "is invalid",
    }
}

//! Contracts for assignment, status changes, deadline extension and completion

use chrono::{DateTime, Utc};
use sd_core::error::ValidationErrors;
use sd_core::traits::Id;
use sd_models::{ApplicationStatus, CompletionInput};

use crate::base::{validate_not_blank, validate_present, Contract, ValidationResult};

pub const REJECTION_REQUIRES_COMMENT: &str = "Rejection requires a comment (reason).";

#[derive(Debug, Clone, Copy)]
pub struct Assignment<'a> {
    pub employees: &'a [Id],
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct AssignmentContract;

impl<'a> Contract<Assignment<'a>> for AssignmentContract {
    fn validate(&self, assignment: &Assignment<'a>) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if assignment.employees.is_empty() {
            errors.add("employees", "must contain at least one employee");
        }
        if assignment.employees.iter().any(|id| *id <= 0) {
            errors.add("employees", "contains an invalid employee reference");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatusChange<'a> {
    pub to: ApplicationStatus,
    pub comment: Option<&'a str>,
}

/// Rejection must state its reason
#[derive(Debug, Default)]
pub struct StatusChangeContract;

impl<'a> Contract<StatusChange<'a>> for StatusChangeContract {
    fn validate(&self, change: &StatusChange<'a>) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        let blank = change.comment.map_or(true, |c| c.trim().is_empty());
        if change.to == ApplicationStatus::Rejected && blank {
            errors.add_base(REJECTION_REQUIRES_COMMENT);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeadlineExtension<'a> {
    pub deadline: DateTime<Utc>,
    pub reason: Option<&'a str>,
}

#[derive(Debug, Default)]
pub struct DeadlineExtensionContract;

impl<'a> Contract<DeadlineExtension<'a>> for DeadlineExtensionContract {
    fn validate(&self, extension: &DeadlineExtension<'a>) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_present("reason", extension.reason, &mut errors);
        errors.into_result()
    }
}

#[derive(Debug, Default)]
pub struct CompletionContract;

impl Contract<CompletionInput> for CompletionContract {
    fn validate(&self, input: &CompletionInput) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        validate_not_blank("workDone", &input.work_done, &mut errors);
        for line in &input.used_tools {
            if line.quantity <= 0 {
                errors.add(
                    "usedTools",
                    format!("quantity for tool {} must be greater than 0", line.tool),
                );
            }
        }
        errors.into_result()
    }
}

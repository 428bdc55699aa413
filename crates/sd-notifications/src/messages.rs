//! Chat message texts

use chrono::{DateTime, Utc};
use sd_models::{Actor, Application};

pub fn created(application: &Application) -> String {
    format!(
        "Application {} created with issue: {}.",
        application.index, application.issue
    )
}

pub fn assigned(application: &Application, employees: &[Actor]) -> String {
    format!(
        "Application {} assigned to {}",
        application.index,
        names(employees)
    )
}

pub fn status_changed(application: &Application, by: &Actor) -> String {
    format!(
        "Application {} status changed to {} by {}",
        application.index, application.status, by.name
    )
}

pub fn deadline_extended(application: &Application, by: &Actor, reason: &str) -> String {
    format!(
        "Application {} deadline extended by {}. Reason: {}",
        application.index, by.name, reason
    )
}

pub fn completed(application: &Application, by: &Actor) -> String {
    format!("Application {} completed by {}", application.index, by.name)
}

/// History comment recorded on assignment
pub fn assignment_comment(employees: &[Actor], deadline: DateTime<Utc>) -> String {
    format!(
        "Assigned to {}, deadline: {}",
        names(employees),
        deadline.to_rfc3339()
    )
}

pub fn names(actors: &[Actor]) -> String {
    actors
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

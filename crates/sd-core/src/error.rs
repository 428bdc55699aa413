//! Core error types for the service desk
//!
//! Every layer (stores, workflow services, HTTP handlers) speaks `SdError`.

use std::collections::BTreeMap;
use thiserror::Error;

/// Core error type for all service desk operations
#[derive(Error, Debug)]
pub enum SdError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A status-gated operation was attempted outside its required state
    #[error("{message}")]
    InvalidTransition { message: String },

    #[error("Validation failed: {}", .0.full_messages().join(", "))]
    Validation(#[from] ValidationErrors),

    #[error("Not enough quantity for tool \"{tool}\". Available: {available}, Requested: {requested}")]
    InsufficientStock {
        tool: String,
        available: i64,
        requested: i64,
    },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SdError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        SdError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        SdError::InvalidTransition {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        SdError::Conflict {
            message: message.into(),
        }
    }

    /// Single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        SdError::Validation(errors)
    }

    /// Validation failure not tied to a field
    pub fn invalid_base(message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add_base(message);
        SdError::Validation(errors)
    }

    /// Client-side input problems: missing fields and stock shortfalls
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SdError::Validation(_) | SdError::InsufficientStock { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SdError::NotFound { .. })
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, SdError::InvalidTransition { .. })
    }

    pub fn status_code(&self) -> u16 {
        match self {
            SdError::NotFound { .. } => 404,
            SdError::InvalidTransition { .. } | SdError::Conflict { .. } => 409,
            SdError::Validation(_) | SdError::InsufficientStock { .. } => 422,
            SdError::ExternalService { .. } => 502,
            SdError::Database(_) | SdError::Config(_) | SdError::Internal(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SdError::NotFound { .. } => "not_found",
            SdError::InvalidTransition { .. } => "invalid_transition",
            SdError::Validation(_) => "validation_failed",
            SdError::InsufficientStock { .. } => "insufficient_stock",
            SdError::Conflict { .. } => "conflict",
            SdError::Database(_) => "database_error",
            SdError::ExternalService { .. } => "external_service_error",
            SdError::Config(_) => "configuration_error",
            SdError::Internal(_) => "internal_error",
        }
    }
}

/// Validation errors collection
#[derive(Error, Debug, Default, Clone, PartialEq)]
#[error("Validation errors: {errors:?}")]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: BTreeMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// `Ok(())` when empty, otherwise the collected errors
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

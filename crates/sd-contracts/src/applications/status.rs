//! Application status gates

use sd_core::error::SdError;
use sd_core::result::SdResult;
use sd_models::ApplicationStatus;

/// Whether a plain status update may move `from` to `to`.
///
/// `completed` is only reachable through completion, which carries a report.
pub fn can_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;

    if from.is_terminal() {
        return false;
    }
    match to {
        New | Completed => false,
        Accepted => from == New,
        InProgress => matches!(from, Accepted | Overdue),
        Overdue => from == InProgress,
        Rejected => true,
    }
}

pub fn ensure_transition(from: ApplicationStatus, to: ApplicationStatus) -> SdResult<()> {
    if can_transition(from, to) {
        return Ok(());
    }
    if from.is_terminal() {
        return Err(terminal(from));
    }
    Err(SdError::invalid_transition(format!(
        "Cannot change application status from {} to {}",
        from, to
    )))
}

/// Deadline extension and completion both require work to be under way
pub fn ensure_in_progress(current: ApplicationStatus, operation: &str) -> SdResult<()> {
    if current == ApplicationStatus::InProgress {
        return Ok(());
    }
    Err(SdError::invalid_transition(format!(
        "{} is only allowed while the application is inProgress (current status: {})",
        operation, current
    )))
}

/// Assignment is open to new applications and re-assignment of accepted ones
pub fn ensure_assignable(current: ApplicationStatus) -> SdResult<()> {
    match current {
        ApplicationStatus::New | ApplicationStatus::Accepted => Ok(()),
        status if status.is_terminal() => Err(terminal(status)),
        status => Err(SdError::invalid_transition(format!(
            "Cannot assign an application in status {}",
            status
        ))),
    }
}

/// The filed fields stay editable until the application is closed
pub fn ensure_editable(current: ApplicationStatus) -> SdResult<()> {
    if current.is_terminal() {
        return Err(terminal(current));
    }
    Ok(())
}

fn terminal(status: ApplicationStatus) -> SdError {
    SdError::invalid_transition(format!("Application is already {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn test_forward_path() {
        assert!(can_transition(New, Accepted));
        assert!(can_transition(Accepted, InProgress));
        assert!(can_transition(InProgress, Overdue));
        assert!(can_transition(Overdue, InProgress));
    }

    #[test]
    fn test_rejection_from_any_open_status() {
        for from in [New, Accepted, InProgress, Overdue] {
            assert!(can_transition(from, Rejected), "{}", from);
        }
    }

    #[test]
    fn test_terminal_statuses_are_final() {
        for to in ApplicationStatus::ALL {
            assert!(!can_transition(Completed, to));
            assert!(!can_transition(Rejected, to));
        }
        let err = ensure_transition(Completed, InProgress).unwrap_err();
        assert_eq!(err.to_string(), "Application is already completed");
    }

    #[test]
    fn test_completed_only_through_completion() {
        assert!(!can_transition(InProgress, Completed));
        assert!(ensure_transition(InProgress, Completed)
            .unwrap_err()
            .is_invalid_transition());
    }

    #[test]
    fn test_skipping_steps_is_rejected() {
        assert!(!can_transition(New, InProgress));
        assert!(!can_transition(Accepted, Overdue));
        assert!(!can_transition(InProgress, New));
    }

    #[test]
    fn test_in_progress_gate() {
        assert!(ensure_in_progress(InProgress, "Deadline extension").is_ok());
        for status in [New, Accepted, Completed, Rejected, Overdue] {
            let err = ensure_in_progress(status, "Completion").unwrap_err();
            assert!(err.is_invalid_transition());
        }
    }

    #[test]
    fn test_assignable() {
        assert!(ensure_assignable(New).is_ok());
        assert!(ensure_assignable(Accepted).is_ok());
        assert!(ensure_assignable(InProgress).is_err());
        assert!(ensure_assignable(Rejected).is_err());
    }

    #[test]
    fn test_editable_until_closed() {
        for status in [New, Accepted, InProgress, Overdue] {
            assert!(ensure_editable(status).is_ok());
        }
        assert!(ensure_editable(Completed).unwrap_err().is_invalid_transition());
        assert!(ensure_editable(Rejected).is_err());
    }
}

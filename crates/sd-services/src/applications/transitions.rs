//! Assignment, status changes and deadline extension

use chrono::{DateTime, Utc};
use sd_contracts::applications::{
    ensure_assignable, ensure_in_progress, ensure_transition, Assignment, AssignmentContract,
    DeadlineExtension, DeadlineExtensionContract, StatusChange, StatusChangeContract,
};
use sd_contracts::base::Contract;
use sd_core::result::SdResult;
use sd_core::traits::Id;
use sd_models::{Actor, Application, ApplicationStatus};
use sd_notifications::messages;
use tracing::instrument;

use super::ApplicationWorkflow;

/// Keep the first occurrence of every employee id
fn distinct_employees(employees: Vec<Actor>) -> Vec<Actor> {
    let mut seen = Vec::with_capacity(employees.len());
    employees
        .into_iter()
        .filter(|e| {
            if seen.contains(&e.id()) {
                false
            } else {
                seen.push(e.id());
                true
            }
        })
        .collect()
}

impl ApplicationWorkflow {
    /// Hand the application to one or more employees with a deadline.
    ///
    /// Replaces any earlier assignment and moves the application to `accepted`.
    #[instrument(skip(self, employees, by), fields(actor = by.id(), employees = employees.len()))]
    pub async fn assign(
        &self,
        id: Id,
        employees: Vec<Actor>,
        deadline: DateTime<Utc>,
        by: &Actor,
    ) -> SdResult<Application> {
        let employees = distinct_employees(employees);
        let employee_ids: Vec<Id> = employees.iter().map(Actor::id).collect();
        AssignmentContract.validate(&Assignment {
            employees: &employee_ids,
            deadline,
        })?;

        let _guard = self.locks.lock(id).await;
        let mut application = self.find(id).await?;
        ensure_assignable(application.status)?;

        application.assigned_to = employee_ids;
        application.deadline = Some(deadline);
        application.record(self.entry(
            ApplicationStatus::Accepted,
            by.reference,
            messages::assignment_comment(&employees, deadline),
        ));

        let application = self.save(&application).await?;
        tracing::info!(
            application_id = id,
            assigned_to = ?application.assigned_to,
            "Application assigned"
        );
        self.notifier
            .application_assigned(&application, &employees)
            .await;
        Ok(application)
    }

    /// Move the application along its lifecycle.
    ///
    /// Rejection needs a non-blank comment. Without a comment the entry
    /// records who made the change.
    #[instrument(skip(self, by, comment), fields(actor = by.id(), status = %status))]
    pub async fn update_status(
        &self,
        id: Id,
        status: ApplicationStatus,
        by: &Actor,
        comment: Option<String>,
    ) -> SdResult<Application> {
        StatusChangeContract.validate(&StatusChange {
            to: status,
            comment: comment.as_deref(),
        })?;

        let _guard = self.locks.lock(id).await;
        let mut application = self.find(id).await?;
        ensure_transition(application.status, status)?;

        let previous = application.status;
        let comment = comment
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| format!("Status changed by {}", by.name));
        application.record(self.entry(status, by.reference, comment));

        let application = self.save(&application).await?;
        tracing::info!(
            application_id = id,
            from = %previous,
            to = %status,
            "Application status changed"
        );
        self.notifier.status_changed(&application, by).await;
        Ok(application)
    }

    /// Move the deadline of an application that is being worked on
    #[instrument(skip(self, reason, by), fields(actor = by.id()))]
    pub async fn extend_deadline(
        &self,
        id: Id,
        deadline: DateTime<Utc>,
        reason: Option<String>,
        by: &Actor,
    ) -> SdResult<Application> {
        let _guard = self.locks.lock(id).await;
        let mut application = self.find(id).await?;
        ensure_in_progress(application.status, "Deadline extension")?;
        DeadlineExtensionContract.validate(&DeadlineExtension {
            deadline,
            reason: reason.as_deref(),
        })?;
        let reason = reason.unwrap_or_default();

        let previous = application
            .deadline
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "none".to_string());
        application.deadline = Some(deadline);
        application.record(self.entry(
            ApplicationStatus::InProgress,
            by.reference,
            format!(
                "Deadline extended from {} to {}. Reason: {}",
                previous,
                deadline.to_rfc3339(),
                reason
            ),
        ));

        let application = self.save(&application).await?;
        tracing::info!(application_id = id, deadline = %deadline, "Deadline extended");
        self.notifier
            .deadline_extended(&application, by, &reason)
            .await;
        Ok(application)
    }
}

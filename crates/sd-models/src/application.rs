//! Application (ticket) model
//!
//! An application is filed by a user against a branch, department and room,
//! then assigned to one or more employees and driven through its lifecycle.
//! `history` is append-only and its last entry always carries the current
//! status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::actor::{ActorKind, ActorRef};
use crate::tool::UsedTool;
use crate::{Entity, Id, Identifiable, Lockable, Timestamped};

/// Application status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationStatus {
    #[default]
    New,
    Accepted,
    InProgress,
    Completed,
    Rejected,
    Overdue,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        Self::New,
        Self::Accepted,
        Self::InProgress,
        Self::Completed,
        Self::Rejected,
        Self::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Accepted => "accepted",
            Self::InProgress => "inProgress",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Overdue => "overdue",
        }
    }

    /// No operation leads out of a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown application status: {}", s))
    }
}

/// One entry of an application's audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationHistoryEntry {
    pub status: ApplicationStatus,
    pub changed_by: Id,
    pub changed_by_model: ActorKind,
    pub changed_at: DateTime<Utc>,
    pub comment: String,
}

impl ApplicationHistoryEntry {
    pub fn new(status: ApplicationStatus, by: ActorRef, comment: impl Into<String>) -> Self {
        Self {
            status,
            changed_by: by.id,
            changed_by_model: by.kind,
            changed_at: Utc::now(),
            comment: comment.into(),
        }
    }

    /// Stamp the entry with `at` instead of the current time
    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.changed_at = at;
        self
    }

    pub fn changed_by(&self) -> ActorRef {
        ActorRef {
            kind: self.changed_by_model,
            id: self.changed_by,
        }
    }
}

/// Report attached when an application is completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub work_done: String,
    pub used_tools: Vec<UsedTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_tools: Option<String>,
    pub images: Vec<String>,
    pub completed_at: DateTime<Utc>,
    pub completed_by: Id,
    pub completed_by_model: ActorKind,
}

/// Application entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Id,
    /// `NNNNN-YYYY`, assigned by the store on insert
    pub index: String,
    pub status: ApplicationStatus,
    pub user_id: Id,
    pub branch_id: Id,
    pub department_id: Id,
    pub room: String,
    pub issue: String,
    pub issue_comment: Option<String>,
    pub additional_comment: Option<String>,
    pub images: Vec<String>,
    pub inventory_id: Option<Id>,
    pub assigned_to: Vec<Id>,
    pub deadline: Option<DateTime<Utc>>,
    pub completion_report: Option<CompletionReport>,
    pub history: Vec<ApplicationHistoryEntry>,
    pub lock_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Unsaved application in `new` status with its creation entry.
    ///
    /// `id` and `index` stay unset until the store allocates them.
    pub fn draft(new: NewApplication, filed_by: ActorRef, images: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            index: String::new(),
            status: ApplicationStatus::New,
            user_id: filed_by.id,
            branch_id: new.branch_id,
            department_id: new.department_id,
            room: new.room,
            issue: new.issue,
            issue_comment: new.issue_comment,
            additional_comment: new.additional_comment,
            images,
            inventory_id: new.inventory_id,
            assigned_to: Vec::new(),
            deadline: None,
            completion_report: None,
            history: vec![ApplicationHistoryEntry::new(
                ApplicationStatus::New,
                filed_by,
                "Application created",
            )],
            lock_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Date the draft and its creation entry at `at`
    pub fn filed_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self.updated_at = at;
        for entry in &mut self.history {
            entry.changed_at = at;
        }
        self
    }

    /// Append a history entry and move to its status
    pub fn record(&mut self, entry: ApplicationHistoryEntry) {
        self.status = entry.status;
        self.history.push(entry);
    }

    /// Overwrite the filed fields present in `update`
    pub fn apply(&mut self, update: ApplicationUpdate) {
        if let Some(branch_id) = update.branch_id {
            self.branch_id = branch_id;
        }
        if let Some(department_id) = update.department_id {
            self.department_id = department_id;
        }
        if let Some(room) = update.room {
            self.room = room;
        }
        if let Some(issue) = update.issue {
            self.issue = issue;
        }
        if let Some(comment) = update.issue_comment {
            self.issue_comment = Some(comment);
        }
        if let Some(comment) = update.additional_comment {
            self.additional_comment = Some(comment);
        }
        if let Some(inventory_id) = update.inventory_id {
            self.inventory_id = Some(inventory_id);
        }
    }

    pub fn last_entry(&self) -> Option<&ApplicationHistoryEntry> {
        self.history.last()
    }

    pub fn is_assigned_to(&self, employee_id: Id) -> bool {
        self.assigned_to.contains(&employee_id)
    }
}

impl Identifiable for Application {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for Application {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Lockable for Application {
    fn lock_version(&self) -> i32 {
        self.lock_version
    }
}

impl Entity for Application {
    const TABLE_NAME: &'static str = "applications";
    const TYPE_NAME: &'static str = "Application";
}

/// Input for filing an application
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub branch_id: Id,
    pub department_id: Id,

    #[validate(length(min = 1, max = 255))]
    pub room: String,

    #[validate(length(min = 1, max = 5000))]
    pub issue: String,

    pub issue_comment: Option<String>,
    pub additional_comment: Option<String>,
    pub inventory_id: Option<Id>,
}

/// Edit of the fields supplied when filing; `None` keeps the current value
#[derive(Debug, Clone, Default, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationUpdate {
    pub branch_id: Option<Id>,
    pub department_id: Option<Id>,

    #[validate(length(min = 1, max = 255))]
    pub room: Option<String>,

    #[validate(length(min = 1, max = 5000))]
    pub issue: Option<String>,

    pub issue_comment: Option<String>,
    pub additional_comment: Option<String>,
    pub inventory_id: Option<Id>,
}

impl ApplicationUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Completion request: what was done and which warehouse stock it consumed
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionInput {
    pub work_done: String,
    #[serde(default)]
    pub used_tools: Vec<UsedTool>,
    pub other_tools: Option<String>,
}

/// Filter for listing and counting applications
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub user_id: Option<Id>,
    pub employee_id: Option<Id>,
    pub branch_id: Option<Id>,
    pub department_id: Option<Id>,
}

impl ApplicationFilter {
    pub fn for_user(user_id: Id) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn for_employee(employee_id: Id) -> Self {
        Self {
            employee_id: Some(employee_id),
            ..Default::default()
        }
    }

    /// The same filter without its status criterion
    pub fn without_status(&self) -> Self {
        Self {
            status: None,
            ..self.clone()
        }
    }

    pub fn matches(&self, application: &Application) -> bool {
        self.status.map_or(true, |s| application.status == s)
            && self.user_id.map_or(true, |u| application.user_id == u)
            && self
                .employee_id
                .map_or(true, |e| application.is_assigned_to(e))
            && self.branch_id.map_or(true, |b| application.branch_id == b)
            && self
                .department_id
                .map_or(true, |d| application.department_id == d)
    }
}

/// Number of applications per status, zero-filled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub new: i64,
    pub accepted: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub rejected: i64,
    pub overdue: i64,
    pub total: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: ApplicationStatus, count: i64) {
        *self.slot(status) += count;
        self.total += count;
    }

    pub fn get(&self, status: ApplicationStatus) -> i64 {
        match status {
            ApplicationStatus::New => self.new,
            ApplicationStatus::Accepted => self.accepted,
            ApplicationStatus::InProgress => self.in_progress,
            ApplicationStatus::Completed => self.completed,
            ApplicationStatus::Rejected => self.rejected,
            ApplicationStatus::Overdue => self.overdue,
        }
    }

    fn slot(&mut self, status: ApplicationStatus) -> &mut i64 {
        match status {
            ApplicationStatus::New => &mut self.new,
            ApplicationStatus::Accepted => &mut self.accepted,
            ApplicationStatus::InProgress => &mut self.in_progress,
            ApplicationStatus::Completed => &mut self.completed,
            ApplicationStatus::Rejected => &mut self.rejected,
            ApplicationStatus::Overdue => &mut self.overdue,
        }
    }
}

impl FromIterator<ApplicationStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = ApplicationStatus>>(iter: I) -> Self {
        let mut counts = StatusCounts::default();
        for status in iter {
            counts.add(status, 1);
        }
        counts
    }
}

//! Warehouse tool model
//!
//! A tool type tracked by quantity. `quantity` is everything ever
//! provisioned, `written_off` everything consumed; the difference is what
//! can still be handed out and must never go negative.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::actor::{ActorKind, ActorRef};
use crate::{Entity, Id, Identifiable, Lockable, Timestamped};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    #[default]
    Active,
    Inactive,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown tool status: {}", other)),
        }
    }
}

/// What a tool history entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolAction {
    /// Stock consumed (direct deduction, application completion, repair)
    WrittenOff,
    /// Compensation of a write-off that could not be committed
    Restored,
    Deactivated,
}

/// Entry in a tool's append-only ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolHistoryEntry {
    pub action: ToolAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    pub by: Id,
    pub by_model: ActorKind,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ToolHistoryEntry {
    pub fn new(action: ToolAction, by: ActorRef) -> Self {
        Self {
            action,
            quantity: None,
            by: by.id,
            by_model: by.kind,
            at: Utc::now(),
            comment: None,
            reason: None,
        }
    }

    pub fn written_off(quantity: i64, by: ActorRef) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::new(ToolAction::WrittenOff, by)
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }
}

/// One line of consumed stock: `{tool, quantity}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedTool {
    pub tool: Id,
    pub quantity: i64,
}

impl UsedTool {
    pub fn new(tool: Id, quantity: i64) -> Self {
        Self { tool, quantity }
    }

    /// Merge repeated lines for the same tool, keeping first-seen order
    pub fn merge(lines: &[UsedTool]) -> Vec<UsedTool> {
        let mut order = Vec::new();
        let mut totals: BTreeMap<Id, i64> = BTreeMap::new();
        for line in lines {
            let total = totals.entry(line.tool).or_insert_with(|| {
                order.push(line.tool);
                0
            });
            *total += line.quantity;
        }
        order
            .into_iter()
            .map(|tool| UsedTool::new(tool, totals[&tool]))
            .collect()
    }
}

/// A single deduction inside an atomic write-off batch
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOff {
    pub tool: Id,
    pub quantity: i64,
    pub entry: ToolHistoryEntry,
}

/// Warehouse tool entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: Id,
    pub name: String,
    pub tool_number: String,
    pub serial: Option<String>,
    pub quantity: i64,
    pub written_off: i64,
    pub status: ToolStatus,
    pub tags: Vec<Id>,
    pub history: Vec<ToolHistoryEntry>,
    pub lock_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tool {
    pub fn from_new(id: Id, new: NewTool, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            tool_number: new.tool_number,
            serial: new.serial,
            quantity: new.quantity,
            written_off: 0,
            status: ToolStatus::Active,
            tags: new.tags,
            history: Vec::new(),
            lock_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Remaining stock, never negative
    pub fn available(&self) -> i64 {
        (self.quantity - self.written_off).max(0)
    }

    pub fn can_supply(&self, quantity: i64) -> bool {
        quantity <= self.available()
    }

    pub fn is_active(&self) -> bool {
        self.status == ToolStatus::Active
    }

    pub fn availability(&self) -> ToolAvailability {
        ToolAvailability {
            tool_id: self.id,
            name: self.name.clone(),
            tool_number: self.tool_number.clone(),
            total: self.quantity,
            written_off: self.written_off,
            available: self.available(),
        }
    }

    /// Apply a validated deduction and log it
    pub fn apply_write_off(&mut self, quantity: i64, entry: ToolHistoryEntry) {
        self.written_off += quantity;
        self.history.push(entry);
    }

    pub fn record(&mut self, entry: ToolHistoryEntry) {
        self.history.push(entry);
    }
}

impl Identifiable for Tool {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for Tool {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Lockable for Tool {
    fn lock_version(&self) -> i32 {
        self.lock_version
    }
}

impl Entity for Tool {
    const TABLE_NAME: &'static str = "tools";
    const TYPE_NAME: &'static str = "Tool";
}

/// Stock summary for one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAvailability {
    pub tool_id: Id,
    pub name: String,
    pub tool_number: String,
    pub total: i64,
    pub written_off: i64,
    pub available: i64,
}

/// Input for provisioning a new tool
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTool {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(length(min = 1, max = 64))]
    pub tool_number: String,

    pub serial: Option<String>,

    #[validate(range(min = 0))]
    pub quantity: i64,

    #[serde(default)]
    pub tags: Vec<Id>,
}

/// Partial update for a tool's descriptive fields and provisioned quantity
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ToolUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub serial: Option<String>,
    #[validate(range(min = 0))]
    pub quantity: Option<i64>,
    pub tags: Option<Vec<Id>>,
}

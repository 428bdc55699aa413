//! Inventory (device) model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::actor::{ActorKind, ActorRef};
use crate::tool::UsedTool;
use crate::{Entity, Id, Identifiable, Lockable, Timestamped};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InventoryStatus {
    #[default]
    Active,
    Repair,
    Broken,
    Inactive,
}

impl InventoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Repair => "repair",
            Self::Broken => "broken",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "repair" => Ok(Self::Repair),
            "broken" => Ok(Self::Broken),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown inventory status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryAction {
    Assigned,
    Repair,
    Returned,
    Broken,
    Active,
    Inactive,
    /// Descriptive fields or photos edited
    Updated,
}

impl InventoryAction {
    /// History action for a move from `previous` to `next`.
    ///
    /// Coming back to `active` out of repair or broken is a return.
    pub fn for_status(previous: InventoryStatus, next: InventoryStatus) -> Self {
        match (previous, next) {
            (InventoryStatus::Repair | InventoryStatus::Broken, InventoryStatus::Active) => {
                Self::Returned
            }
            (_, InventoryStatus::Active) => Self::Active,
            (_, InventoryStatus::Repair) => Self::Repair,
            (_, InventoryStatus::Broken) => Self::Broken,
            (_, InventoryStatus::Inactive) => Self::Inactive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Repair => "repair",
            Self::Returned => "returned",
            Self::Broken => "broken",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Updated => "updated",
        }
    }
}

impl fmt::Display for InventoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may hold a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HolderKind {
    User,
    Employee,
}

impl From<HolderKind> for ActorKind {
    fn from(kind: HolderKind) -> Self {
        match kind {
            HolderKind::User => ActorKind::User,
            HolderKind::Employee => ActorKind::Employee,
        }
    }
}

impl FromStr for HolderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "employee" => Ok(Self::Employee),
            other => Err(format!("unknown holder kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub kind: HolderKind,
    pub id: Id,
}

impl Holder {
    pub fn user(id: Id) -> Self {
        Self {
            kind: HolderKind::User,
            id,
        }
    }

    pub fn employee(id: Id) -> Self {
        Self {
            kind: HolderKind::Employee,
            id,
        }
    }

    pub fn as_actor(&self) -> ActorRef {
        ActorRef {
            kind: self.kind.into(),
            id: self.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryHistoryEntry {
    pub action: InventoryAction,
    pub by: Id,
    pub by_model: ActorKind,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_tools: Vec<UsedTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_off_reason: Option<String>,
}

impl InventoryHistoryEntry {
    pub fn new(action: InventoryAction, by: ActorRef, comment: impl Into<String>) -> Self {
        Self {
            action,
            by: by.id,
            by_model: by.kind,
            at: Utc::now(),
            comment: Some(comment.into()),
            reason: None,
            used_tools: Vec::new(),
            write_off_reason: None,
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_used_tools(mut self, used_tools: Vec<UsedTool>, reason: Option<String>) -> Self {
        self.used_tools = used_tools;
        self.write_off_reason = reason;
        self
    }

    /// Repairs, and any other entry that consumed warehouse stock
    pub fn is_repair(&self) -> bool {
        self.action == InventoryAction::Repair || !self.used_tools.is_empty()
    }
}

/// Inventory entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: Id,
    pub name: String,
    pub inventory_number: String,
    pub serial: Option<String>,
    pub images: Vec<String>,
    pub assigned_to: Option<Id>,
    pub assigned_to_model: Option<HolderKind>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub tags: Vec<Id>,
    pub branch_id: Option<Id>,
    pub department_id: Option<Id>,
    pub status: InventoryStatus,
    pub qr_code_url: String,
    pub history: Vec<InventoryHistoryEntry>,
    pub lock_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inventory {
    pub fn draft(new: NewInventory, images: Vec<String>, qr_code_url: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: new.name,
            inventory_number: new.inventory_number,
            serial: new.serial,
            images,
            assigned_to: None,
            assigned_to_model: None,
            assigned_at: None,
            tags: new.tags,
            branch_id: new.branch_id,
            department_id: new.department_id,
            status: InventoryStatus::Active,
            qr_code_url,
            history: Vec::new(),
            lock_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn holder(&self) -> Option<Holder> {
        match (self.assigned_to_model, self.assigned_to) {
            (Some(kind), Some(id)) => Some(Holder { kind, id }),
            _ => None,
        }
    }

    pub fn set_holder(&mut self, holder: Holder, at: DateTime<Utc>) {
        self.assigned_to = Some(holder.id);
        self.assigned_to_model = Some(holder.kind);
        self.assigned_at = Some(at);
    }

    pub fn record(&mut self, entry: InventoryHistoryEntry) {
        self.history.push(entry);
    }
}

impl Identifiable for Inventory {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for Inventory {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Lockable for Inventory {
    fn lock_version(&self) -> i32 {
        self.lock_version
    }
}

impl Entity for Inventory {
    const TABLE_NAME: &'static str = "inventory";
    const TYPE_NAME: &'static str = "Inventory";
}

/// Input for registering a device
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewInventory {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(length(min = 1, max = 64))]
    pub inventory_number: String,

    pub serial: Option<String>,

    /// Initial holder (a user); absent leaves the device unassigned
    pub user_id: Option<Id>,

    pub branch_id: Option<Id>,
    pub department_id: Option<Id>,

    #[serde(default)]
    pub tags: Vec<Id>,
}

/// Edit of a device's descriptive fields.
///
/// Holder and status have their own operations. `None` keeps the current
/// value; new photos replace the old ones.
#[derive(Debug, Clone, Default, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub serial: Option<String>,
    pub branch_id: Option<Id>,
    pub department_id: Option<Id>,
    pub tags: Option<Vec<Id>>,
}

impl InventoryUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Inventory {
    /// Overwrite the fields present in `update`; non-empty `images` replace the photos
    pub fn apply(&mut self, update: InventoryUpdate, images: Vec<String>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(serial) = update.serial {
            self.serial = Some(serial);
        }
        if let Some(branch_id) = update.branch_id {
            self.branch_id = Some(branch_id);
        }
        if let Some(department_id) = update.department_id {
            self.department_id = Some(department_id);
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if !images.is_empty() {
            self.images = images;
        }
    }
}

/// Filter for listing devices
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryFilter {
    pub status: Option<InventoryStatus>,
    pub branch_id: Option<Id>,
    /// Case-insensitive match on name, inventory number or serial
    pub search: Option<String>,
}

impl InventoryFilter {
    /// Trimmed, lowercased search term; blank means no search
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, inventory: &Inventory) -> bool {
        let found = self.search_term().map_or(true, |term| {
            inventory.name.to_lowercase().contains(&term)
                || inventory.inventory_number.to_lowercase().contains(&term)
                || inventory
                    .serial
                    .as_deref()
                    .is_some_and(|s| s.to_lowercase().contains(&term))
        });
        found
            && self.status.map_or(true, |s| inventory.status == s)
            && self
                .branch_id
                .map_or(true, |b| inventory.branch_id == Some(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_for_status() {
        use InventoryStatus::*;
        assert_eq!(InventoryAction::for_status(Active, Repair), InventoryAction::Repair);
        assert_eq!(InventoryAction::for_status(Repair, Active), InventoryAction::Returned);
        assert_eq!(InventoryAction::for_status(Inactive, Active), InventoryAction::Active);
        assert_eq!(InventoryAction::for_status(Active, Inactive), InventoryAction::Inactive);
    }

    #[test]
    fn test_holder_roundtrip_through_fields() {
        let mut inv = Inventory::draft(
            NewInventory {
                name: "Laptop".into(),
                inventory_number: "INV-1".into(),
                serial: None,
                user_id: None,
                branch_id: None,
                department_id: None,
                tags: vec![],
            },
            vec![],
            "/inventory/qr/INV-1".into(),
        );
        assert!(inv.holder().is_none());
        inv.set_holder(Holder::employee(3), Utc::now());
        assert_eq!(inv.holder(), Some(Holder::employee(3)));
        assert_eq!(inv.holder().map(|h| h.as_actor()), Some(ActorRef::employee(3)));
    }

    fn laptop() -> Inventory {
        Inventory::draft(
            NewInventory {
                name: "Laptop Lenovo".into(),
                inventory_number: "INV-7".into(),
                serial: Some("PF-3X9".into()),
                user_id: None,
                branch_id: Some(2),
                department_id: None,
                tags: vec![1],
            },
            vec!["/uploads/old.jpg".into()],
            "/inventory/qr/INV-7".into(),
        )
    }

    #[test]
    fn test_filter_search_and_branch() {
        let inv = laptop();
        let search = |term: &str| InventoryFilter {
            search: Some(term.into()),
            ..Default::default()
        };
        assert!(search("lenovo").matches(&inv));
        assert!(search(" inv-7 ").matches(&inv));
        assert!(search("pf-3").matches(&inv));
        assert!(search("   ").matches(&inv));
        assert!(!search("dell").matches(&inv));

        let filter = InventoryFilter {
            branch_id: Some(3),
            ..Default::default()
        };
        assert!(!filter.matches(&inv));
        let filter = InventoryFilter {
            status: Some(InventoryStatus::Active),
            branch_id: Some(2),
            search: None,
        };
        assert!(filter.matches(&inv));
    }

    #[test]
    fn test_apply_update() {
        let mut inv = laptop();
        inv.apply(
            InventoryUpdate {
                name: Some("Laptop Dell".into()),
                tags: Some(vec![]),
                ..Default::default()
            },
            vec![],
        );
        assert_eq!(inv.name, "Laptop Dell");
        assert!(inv.tags.is_empty());
        assert_eq!(inv.images, vec!["/uploads/old.jpg".to_string()]);

        inv.apply(InventoryUpdate::default(), vec!["/uploads/new.jpg".into()]);
        assert_eq!(inv.images, vec!["/uploads/new.jpg".to_string()]);
        assert_eq!(inv.serial.as_deref(), Some("PF-3X9"));
    }

    #[test]
    fn test_history_entry_shape() {
        let entry = InventoryHistoryEntry::new(
            InventoryAction::Repair,
            ActorRef::employee(2),
            "Status changed to repair",
        )
        .with_used_tools(vec![UsedTool::new(5, 1)], Some("per request".into()));
        assert!(entry.is_repair());

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "repair");
        assert_eq!(json["usedTools"][0]["tool"], 5);
        assert_eq!(json["writeOffReason"], "per request");
    }
}

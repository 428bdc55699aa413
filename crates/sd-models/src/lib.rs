//! # sd-models
//!
//! Domain records for the service desk.
//!
//! Applications, warehouse tools and inventory devices, each carrying an
//! append-only history. Records reference each other by id only.

pub use sd_core::traits::{Entity, Id, Identifiable, Lockable, Timestamped};

pub mod actor;
pub mod application;
pub mod index;
pub mod inventory;
pub mod tool;

pub use actor::{Actor, ActorKind, ActorRef};
pub use application::{
    Application, ApplicationFilter, ApplicationHistoryEntry, ApplicationStatus, ApplicationUpdate,
    CompletionInput, CompletionReport, NewApplication, StatusCounts,
};
pub use index::ApplicationIndex;
pub use inventory::{
    Holder, HolderKind, Inventory, InventoryAction, InventoryFilter, InventoryHistoryEntry,
    InventoryStatus, InventoryUpdate, NewInventory,
};
pub use tool::{
    NewTool, Tool, ToolAction, ToolAvailability, ToolHistoryEntry, ToolStatus, ToolUpdate,
    UsedTool, WriteOff,
};

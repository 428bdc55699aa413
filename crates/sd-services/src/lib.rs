//! # sd-services
//!
//! Business operations for the service desk.
//!
//! Every mutating operation checks its contract, commits the change through
//! the store, and only then hands side effects to the [`Notifier`].
//!
//! [`Notifier`]: sd_notifications::Notifier

pub mod applications;
pub mod clock;
pub mod inventory;
pub mod locks;
pub mod tools;

pub use applications::ApplicationWorkflow;
pub use clock::{Clock, FixedClock, SystemClock};
pub use inventory::{InventoryAssignmentLedger, InventoryStatusParams};
pub use locks::{EntityGuard, EntityLocks};
pub use tools::{Consumption, ToolStockLedger};

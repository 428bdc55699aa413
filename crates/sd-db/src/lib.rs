//! # sd-db
//!
//! Persistence for the service desk.
//!
//! - Store traits the workflow services depend on
//! - In-memory stores (tests, and servers started without a database)
//! - PostgreSQL stores using SQLx, with history kept as JSONB
//!
//! ## Example
//!
//! ```ignore
//! use sd_db::{Database, PgApplicationStore};
//!
//! let db = Database::connect(&config.database).await?;
//! db.ensure_schema().await?;
//! let applications = PgApplicationStore::new(db.pool().clone());
//! ```

pub mod applications;
pub mod inventory;
pub mod memory;
pub mod pool;
pub mod repository;
pub mod schema;
pub mod store;
pub mod tools;

pub use applications::PgApplicationStore;
pub use inventory::PgInventoryStore;
pub use memory::{MemoryApplicationStore, MemoryInventoryStore, MemoryToolStore};
pub use pool::{Database, PoolStats};
pub use repository::{RepositoryError, RepositoryResult};
pub use store::{ApplicationStore, InventoryStore, ToolStore};
pub use tools::PgToolStore;

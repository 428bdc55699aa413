//! Wiring of stores, notifications and services from configuration

use std::sync::Arc;

use sd_api::AppState;
use sd_attachments::{LocalStorage, UploadPolicy};
use sd_core::config::AppConfig;
use sd_db::{
    ApplicationStore, Database, InventoryStore, MemoryApplicationStore, MemoryInventoryStore,
    MemoryToolStore, PgApplicationStore, PgInventoryStore, PgToolStore, ToolStore,
};
use sd_notifications::{BroadcastHub, DisabledSink, NotificationSink, Notifier, TelegramSink};
use sd_services::{ApplicationWorkflow, InventoryAssignmentLedger, ToolStockLedger};
use tracing::{info, warn};

pub struct Stores {
    pub applications: Arc<dyn ApplicationStore>,
    pub tools: Arc<dyn ToolStore>,
    pub inventory: Arc<dyn InventoryStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            applications: Arc::new(MemoryApplicationStore::new()),
            tools: Arc::new(MemoryToolStore::new()),
            inventory: Arc::new(MemoryInventoryStore::new()),
        }
    }

    pub fn postgres(db: &Database) -> Self {
        Self {
            applications: Arc::new(PgApplicationStore::new(db.pool().clone())),
            tools: Arc::new(PgToolStore::new(db.pool().clone())),
            inventory: Arc::new(PgInventoryStore::new(db.pool().clone())),
        }
    }
}

/// Connect and prepare the database, or `None` to run on in-memory stores
pub async fn connect_database(config: &AppConfig) -> Option<Database> {
    let db = match Database::connect(&config.database).await {
        None => {
            warn!("No database configured, running on in-memory stores");
            return None;
        }
        Some(Err(e)) => {
            warn!(error = %e, "Failed to connect to database, running on in-memory stores");
            return None;
        }
        Some(Ok(db)) => db,
    };

    if let Err(e) = db.ensure_schema().await {
        warn!(error = %e, "Failed to prepare schema, running on in-memory stores");
        return None;
    }
    info!("Connected to database");
    Some(db)
}

fn notification_sink(config: &AppConfig) -> Arc<dyn NotificationSink> {
    match TelegramSink::from_config(&config.telegram) {
        Some(Ok(sink)) => {
            info!("Telegram notifications enabled");
            Arc::new(sink)
        }
        Some(Err(e)) => {
            warn!(error = %e, "Telegram client could not be built, notifications disabled");
            Arc::new(DisabledSink)
        }
        None => {
            info!("Telegram notifications disabled");
            Arc::new(DisabledSink)
        }
    }
}

/// Build the API state on top of the given stores
pub fn app_state(config: &AppConfig, stores: Stores, hub: BroadcastHub) -> AppState {
    let notifier = Notifier::new(
        notification_sink(config),
        config.telegram.valid_chat_id().map(str::to_string),
        Arc::new(hub),
    );

    let tools = ToolStockLedger::new(stores.tools);
    let applications = ApplicationWorkflow::new(stores.applications, tools.clone(), notifier);
    let inventory = InventoryAssignmentLedger::new(
        stores.inventory,
        tools,
        config.storage.qr_base_url.clone(),
    );
    let storage = Arc::new(LocalStorage::new(
        &config.storage.local_path,
        config.storage.public_base_url.clone(),
    ));

    AppState::new(
        applications,
        inventory,
        storage,
        UploadPolicy::from_config(&config.storage),
    )
}

//! In-memory stores
//!
//! Every operation runs under the table's write or read lock, so index
//! allocation and batch write-offs are atomic within the process.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sd_core::pagination::{Page, PaginationParams};
use sd_core::traits::{Entity, Id};
use sd_models::{
    Application, ApplicationFilter, ApplicationIndex, Inventory, InventoryFilter, NewTool,
    StatusCounts, Tool, ToolStatus, WriteOff,
};
use tokio::sync::RwLock;

use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::{shortfall, ApplicationStore, InventoryStore, ToolStore};

struct Table<T> {
    rows: BTreeMap<Id, T>,
    next_id: Id,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> Id {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Newest first
    fn newest_first(&self) -> impl Iterator<Item = &T> {
        self.rows.values().rev()
    }
}

/// Optimistic write of `record` over the stored row with the same id
fn save<T: Entity + Clone>(
    table: &mut Table<T>,
    record: &T,
    bump: impl FnOnce(&mut T),
) -> RepositoryResult<T> {
    let stored = table
        .rows
        .get_mut(&record.id())
        .ok_or_else(|| RepositoryError::not_found(T::TYPE_NAME, record.id()))?;
    if stored.lock_version() != record.lock_version() {
        return Err(RepositoryError::stale(T::TYPE_NAME, record.id()));
    }
    let mut saved = record.clone();
    bump(&mut saved);
    *stored = saved.clone();
    Ok(saved)
}

#[derive(Default)]
pub struct MemoryApplicationStore {
    table: RwLock<Table<Application>>,
}

impl MemoryApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicationStore for MemoryApplicationStore {
    async fn insert_with_next_index(
        &self,
        year: i32,
        mut draft: Application,
    ) -> RepositoryResult<Application> {
        let mut table = self.table.write().await;
        let suffix = ApplicationIndex::year_suffix(year);
        let last = table
            .newest_first()
            .find(|a| a.index.ends_with(&suffix))
            .map(|a| a.index.clone());

        draft.id = table.allocate_id();
        draft.index = ApplicationIndex::next_after(last.as_deref(), year).to_string();
        draft.lock_version = 0;
        table.rows.insert(draft.id, draft.clone());
        Ok(draft)
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Application>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn update(&self, application: &Application) -> RepositoryResult<Application> {
        let mut table = self.table.write().await;
        save(&mut table, application, |a| {
            a.lock_version += 1;
            a.updated_at = Utc::now();
        })
    }

    async fn list(
        &self,
        filter: &ApplicationFilter,
        pagination: PaginationParams,
    ) -> RepositoryResult<Page<Application>> {
        let table = self.table.read().await;
        let matching: Vec<&Application> =
            table.newest_first().filter(|a| filter.matches(a)).collect();
        let total = matching.len() as i64;
        let elements = pagination.apply(matching.into_iter().cloned());
        Ok(Page::new(elements, total, pagination))
    }

    async fn count_by_status(&self, filter: &ApplicationFilter) -> RepositoryResult<StatusCounts> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|a| filter.matches(a))
            .map(|a| a.status)
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryToolStore {
    table: RwLock<Table<Tool>>,
}

impl MemoryToolStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ToolStore for MemoryToolStore {
    async fn insert(&self, new: NewTool) -> RepositoryResult<Tool> {
        let mut table = self.table.write().await;
        if let Some(existing) = table.rows.values().find(|t| t.tool_number == new.tool_number) {
            return Err(RepositoryError::Duplicate {
                field: "toolNumber",
                value: existing.tool_number.clone(),
            });
        }
        if let Some(existing) = table.rows.values().find(|t| t.name == new.name) {
            return Err(RepositoryError::Duplicate {
                field: "name",
                value: existing.name.clone(),
            });
        }
        let id = table.allocate_id();
        let tool = Tool::from_new(id, new, Utc::now());
        table.rows.insert(id, tool.clone());
        Ok(tool)
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Tool>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn list(&self, status: Option<ToolStatus>) -> RepositoryResult<Vec<Tool>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect())
    }

    async fn list_by_tag(&self, tag: Id) -> RepositoryResult<Vec<Tool>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|t| t.tags.contains(&tag))
            .cloned()
            .collect())
    }

    async fn update(&self, tool: &Tool) -> RepositoryResult<Tool> {
        let mut table = self.table.write().await;
        if table
            .rows
            .values()
            .any(|t| t.id != tool.id && t.name == tool.name)
        {
            return Err(RepositoryError::Duplicate {
                field: "name",
                value: tool.name.clone(),
            });
        }
        save(&mut table, tool, |t| {
            t.lock_version += 1;
            t.updated_at = Utc::now();
        })
    }

    async fn write_off(&self, batch: &[WriteOff]) -> RepositoryResult<Vec<Tool>> {
        let mut table = self.table.write().await;

        // Validate the whole batch before touching any row
        let mut requested: HashMap<Id, i64> = HashMap::new();
        for line in batch {
            let tool = table
                .rows
                .get(&line.tool)
                .ok_or_else(|| RepositoryError::not_found(Tool::TYPE_NAME, line.tool))?;
            if !tool.is_active() {
                return Err(RepositoryError::Inactive(tool.name.clone()));
            }
            let total = requested.entry(line.tool).or_default();
            *total += line.quantity;
            if !tool.can_supply(*total) {
                return Err(shortfall(tool, 0, *total));
            }
        }

        let now = Utc::now();
        let mut touched = Vec::with_capacity(batch.len());
        for line in batch {
            if let Some(tool) = table.rows.get_mut(&line.tool) {
                tool.apply_write_off(line.quantity, line.entry.clone());
                tool.lock_version += 1;
                tool.updated_at = now;
                touched.push(tool.clone());
            }
        }
        Ok(touched)
    }

    async fn restore(&self, batch: &[WriteOff]) -> RepositoryResult<Vec<Tool>> {
        let mut table = self.table.write().await;
        let now = Utc::now();
        let mut touched = Vec::with_capacity(batch.len());
        for line in batch {
            let tool = table
                .rows
                .get_mut(&line.tool)
                .ok_or_else(|| RepositoryError::not_found(Tool::TYPE_NAME, line.tool))?;
            tool.written_off = (tool.written_off - line.quantity).max(0);
            tool.record(line.entry.clone());
            tool.lock_version += 1;
            tool.updated_at = now;
            touched.push(tool.clone());
        }
        Ok(touched)
    }
}

#[derive(Default)]
pub struct MemoryInventoryStore {
    table: RwLock<Table<Inventory>>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn insert(&self, mut draft: Inventory) -> RepositoryResult<Inventory> {
        let mut table = self.table.write().await;
        if table
            .rows
            .values()
            .any(|i| i.inventory_number == draft.inventory_number)
        {
            return Err(RepositoryError::Duplicate {
                field: "inventoryNumber",
                value: draft.inventory_number,
            });
        }
        draft.id = table.allocate_id();
        draft.lock_version = 0;
        table.rows.insert(draft.id, draft.clone());
        Ok(draft)
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Inventory>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_number(&self, inventory_number: &str) -> RepositoryResult<Option<Inventory>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|i| i.inventory_number == inventory_number)
            .cloned())
    }

    async fn update(&self, inventory: &Inventory) -> RepositoryResult<Inventory> {
        let mut table = self.table.write().await;
        save(&mut table, inventory, |i| {
            i.lock_version += 1;
            i.updated_at = Utc::now();
        })
    }

    async fn list(
        &self,
        filter: &InventoryFilter,
        pagination: PaginationParams,
    ) -> RepositoryResult<Page<Inventory>> {
        let table = self.table.read().await;
        let matching: Vec<&Inventory> =
            table.newest_first().filter(|i| filter.matches(i)).collect();
        let total = matching.len() as i64;
        let elements = pagination.apply(matching.into_iter().cloned());
        Ok(Page::new(elements, total, pagination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_models::{ActorRef, NewApplication, NewInventory, ToolHistoryEntry};

    fn draft() -> Application {
        Application::draft(
            NewApplication {
                branch_id: 1,
                department_id: 1,
                room: "1".into(),
                issue: "Leak".into(),
                issue_comment: None,
                additional_comment: None,
                inventory_id: None,
            },
            ActorRef::user(1),
            vec![],
        )
    }

    fn new_tool(name: &str, number: &str, quantity: i64) -> NewTool {
        NewTool {
            name: name.into(),
            tool_number: number.into(),
            serial: None,
            quantity,
            tags: vec![7],
        }
    }

    fn line(tool: Id, quantity: i64) -> WriteOff {
        WriteOff {
            tool,
            quantity,
            entry: ToolHistoryEntry::written_off(quantity, ActorRef::employee(2)),
        }
    }

    #[tokio::test]
    async fn test_index_sequence_per_year() {
        let store = MemoryApplicationStore::new();
        let a = store.insert_with_next_index(2026, draft()).await.unwrap();
        let b = store.insert_with_next_index(2026, draft()).await.unwrap();
        let c = store.insert_with_next_index(2027, draft()).await.unwrap();
        let d = store.insert_with_next_index(2027, draft()).await.unwrap();

        assert_eq!(a.index, "00001-2026");
        assert_eq!(b.index, "00002-2026");
        assert_eq!(c.index, "00001-2027");
        assert_eq!(d.index, "00002-2027");
    }

    #[tokio::test]
    async fn test_concurrent_inserts_get_distinct_indexes() {
        let store = std::sync::Arc::new(MemoryApplicationStore::new());
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert_with_next_index(2026, draft()).await })
            })
            .collect();

        let mut indexes = Vec::new();
        for handle in handles {
            indexes.push(handle.await.unwrap().unwrap().index);
        }
        indexes.sort();
        indexes.dedup();
        assert_eq!(indexes.len(), 20);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let store = MemoryApplicationStore::new();
        let app = store.insert_with_next_index(2026, draft()).await.unwrap();

        let saved = store.update(&app).await.unwrap();
        assert_eq!(saved.lock_version, 1);

        let err = store.update(&app).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_tool_rejected() {
        let store = MemoryToolStore::new();
        store.insert(new_tool("Drill", "D-1", 1)).await.unwrap();

        let err = store.insert(new_tool("Saw", "D-1", 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate { field: "toolNumber", .. }));
        let err = store.insert(new_tool("Drill", "D-2", 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate { field: "name", .. }));
    }

    #[tokio::test]
    async fn test_write_off_is_all_or_nothing() {
        let store = MemoryToolStore::new();
        let a = store.insert(new_tool("Cable", "C-1", 5)).await.unwrap();
        let b = store.insert(new_tool("Plug", "P-1", 1)).await.unwrap();

        let err = store
            .write_off(&[line(a.id, 2), line(b.id, 3)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InsufficientStock { available: 1, requested: 3, .. }
        ));

        let a = store.find_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(a.written_off, 0);
        assert!(a.history.is_empty());
    }

    #[tokio::test]
    async fn test_write_off_sums_repeated_lines() {
        let store = MemoryToolStore::new();
        let a = store.insert(new_tool("Cable", "C-1", 5)).await.unwrap();

        let err = store
            .write_off(&[line(a.id, 3), line(a.id, 3)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InsufficientStock { available: 5, requested: 6, .. }
        ));

        let touched = store.write_off(&[line(a.id, 2), line(a.id, 3)]).await.unwrap();
        assert_eq!(touched.last().map(|t| t.written_off), Some(5));
    }

    #[tokio::test]
    async fn test_restore_reverses_write_off() {
        let store = MemoryToolStore::new();
        let a = store.insert(new_tool("Cable", "C-1", 5)).await.unwrap();
        store.write_off(&[line(a.id, 4)]).await.unwrap();
        store.restore(&[line(a.id, 4)]).await.unwrap();

        let a = store.find_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(a.written_off, 0);
        assert_eq!(a.history.len(), 2);
    }

    #[tokio::test]
    async fn test_list_by_tag() {
        let store = MemoryToolStore::new();
        store.insert(new_tool("Cable", "C-1", 5)).await.unwrap();
        assert_eq!(store.list_by_tag(7).await.unwrap().len(), 1);
        assert!(store.list_by_tag(8).await.unwrap().is_empty());
    }

    fn device(name: &str, number: &str, branch_id: Option<Id>) -> Inventory {
        Inventory::draft(
            NewInventory {
                name: name.into(),
                inventory_number: number.into(),
                serial: None,
                user_id: None,
                branch_id,
                department_id: None,
                tags: vec![],
            },
            vec![],
            format!("/inventory/qr/{}", number),
        )
    }

    #[tokio::test]
    async fn test_inventory_list_filters_and_pages() {
        let store = MemoryInventoryStore::new();
        store.insert(device("Printer HP", "INV-1", Some(1))).await.unwrap();
        store.insert(device("Printer Canon", "INV-2", Some(2))).await.unwrap();
        store.insert(device("Router", "INV-3", Some(1))).await.unwrap();

        let filter = InventoryFilter {
            search: Some("printer".into()),
            ..Default::default()
        };
        let page = store.list(&filter, PaginationParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.elements[0].inventory_number, "INV-2");

        let filter = InventoryFilter {
            branch_id: Some(1),
            ..Default::default()
        };
        let page = store.list(&filter, PaginationParams::new(1, 1)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.elements.len(), 1);
        assert_eq!(page.elements[0].inventory_number, "INV-1");
    }
}

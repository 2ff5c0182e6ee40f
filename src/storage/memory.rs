use super::{Store, Table};
use crate::core::{Attributes, NestError, RecordId, Result, Value};
use crate::transaction::{Change, TransactionId, TransactionManager, TransactionStats};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{Level, event};

#[derive(Debug, Default)]
struct StoreState {
    tables: HashMap<String, Table>,
    transactions: TransactionManager,
    failing_tables: HashSet<String>,
}

impl StoreState {
    fn table_mut(&mut self, name: &str) -> &mut Table {
        self.tables
            .entry(name.to_string())
            .or_insert_with(|| Table::new(name))
    }

    fn check_fault(&self, table: &str) -> Result<()> {
        if self.failing_tables.contains(table) {
            return Err(NestError::Persistence(format!(
                "Injected write fault on table '{}'",
                table
            )));
        }
        Ok(())
    }

    /// Checked before a write touches a table, so a write under a closed
    /// transaction changes nothing.
    fn check_writable(&self, txn: Option<TransactionId>, table: &str) -> Result<()> {
        if let Some(txn_id) = txn {
            self.transactions.ensure_active(txn_id)?;
        }
        self.check_fault(table)
    }

    fn record(&mut self, txn: Option<TransactionId>, change: Change) -> Result<()> {
        match txn {
            Some(txn_id) => self.transactions.record_change(txn_id, change),
            None => Ok(()),
        }
    }

    fn undo(&mut self, change: Change) {
        event!(Level::TRACE, table = change.table_name(), id = %change.record_id(), "undo");
        match change {
            Change::InsertRow { table, id, .. } => {
                self.table_mut(&table).delete(id);
            }
            Change::UpdateRow { table, id, old_row }
            | Change::DeleteRow { table, id, old_row } => {
                self.table_mut(&table).restore(id, old_row);
            }
        }
    }
}

/// In-memory `Store`
///
/// Writes are applied immediately and logged against their transaction;
/// rollback replays the log backwards. Tables spring into existence on
/// first write.
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Make every write to `table` fail until `clear_faults` is called
    pub async fn fail_writes_to(&self, table: &str) {
        let mut state = self.state.write().await;
        state.failing_tables.insert(table.to_string());
    }

    pub async fn clear_faults(&self) {
        let mut state = self.state.write().await;
        state.failing_tables.clear();
    }

    /// Rows of a table in id order
    pub async fn rows(&self, table: &str) -> Vec<(RecordId, Attributes)> {
        let state = self.state.read().await;
        state
            .tables
            .get(table)
            .map(Table::scan_all)
            .unwrap_or_default()
    }

    pub async fn transaction_stats(&self) -> TransactionStats {
        self.state.read().await.transactions.stats()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<TransactionId> {
        let mut state = self.state.write().await;
        let txn_id = state.transactions.begin();
        event!(Level::TRACE, txn = %txn_id, "begin");
        Ok(txn_id)
    }

    async fn commit(&self, txn: TransactionId) -> Result<()> {
        let mut state = self.state.write().await;
        state.transactions.commit(txn)?;
        event!(Level::TRACE, txn = %txn, "commit");
        Ok(())
    }

    async fn rollback(&self, txn: TransactionId) -> Result<()> {
        let mut state = self.state.write().await;
        let undo = state.transactions.rollback(txn)?;
        event!(Level::DEBUG, txn = %txn, changes = undo.len(), "rollback");
        for change in undo {
            state.undo(change);
        }
        Ok(())
    }

    async fn savepoint(&self, txn: TransactionId) -> Result<usize> {
        let state = self.state.read().await;
        state.transactions.savepoint(txn)
    }

    async fn rollback_to(&self, txn: TransactionId, mark: usize) -> Result<()> {
        let mut state = self.state.write().await;
        let undo = state.transactions.rollback_to(txn, mark)?;
        event!(Level::DEBUG, txn = %txn, mark, changes = undo.len(), "rollback to savepoint");
        for change in undo {
            state.undo(change);
        }
        Ok(())
    }

    async fn insert(
        &self,
        txn: Option<TransactionId>,
        table: &str,
        row: Attributes,
    ) -> Result<RecordId> {
        let mut state = self.state.write().await;
        state.check_writable(txn, table)?;
        let id = state.table_mut(table).insert(row.clone());
        state.record(
            txn,
            Change::InsertRow {
                table: table.to_string(),
                id,
                row,
            },
        )?;
        Ok(id)
    }

    async fn update(
        &self,
        txn: Option<TransactionId>,
        table: &str,
        id: RecordId,
        row: Attributes,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_writable(txn, table)?;
        let old_row = state.table_mut(table).update(id, row)?;
        state.record(
            txn,
            Change::UpdateRow {
                table: table.to_string(),
                id,
                old_row,
            },
        )
    }

    async fn delete(&self, txn: Option<TransactionId>, table: &str, id: RecordId) -> Result<bool> {
        let mut state = self.state.write().await;
        state.check_writable(txn, table)?;
        let Some(old_row) = state.table_mut(table).delete(id) else {
            return Ok(false);
        };
        state.record(
            txn,
            Change::DeleteRow {
                table: table.to_string(),
                id,
                old_row,
            },
        )?;
        Ok(true)
    }

    async fn find(&self, table: &str, id: RecordId) -> Result<Option<Attributes>> {
        let state = self.state.read().await;
        Ok(state.tables.get(table).and_then(|t| t.get(id).cloned()))
    }

    async fn find_by(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(RecordId, Attributes)>> {
        let state = self.state.read().await;
        Ok(state
            .tables
            .get(table)
            .map(|t| t.scan_by(field, value))
            .unwrap_or_default())
    }

    async fn count(&self, table: &str) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state.tables.get(table).map_or(0, Table::row_count))
    }
}

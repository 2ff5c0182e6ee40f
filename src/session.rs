use crate::core::{Attributes, NestError, RecordId, Result, Value};
use crate::storage::{MemoryStore, Store};
use crate::transaction::TransactionId;
use std::sync::Arc;

/// A store handle bound to an optional open transaction
///
/// Every read and write of one save attempt goes through the same session,
/// so they share one transaction.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn Store>,
    transaction_id: Option<TransactionId>,
}

impl Session {
    /// Creates a session over a shared store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            transaction_id: None,
        }
    }

    /// Creates a session over a fresh, private in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    /// Creates a clone of this session associated with a specific transaction ID.
    pub fn with_transaction_id(&self, transaction_id: TransactionId) -> Self {
        Self {
            store: self.store.clone(),
            transaction_id: Some(transaction_id),
        }
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction_id.is_some()
    }

    /// Savepoint in the open transaction
    pub async fn savepoint(&self) -> Result<usize> {
        let txn = self.open_transaction()?;
        self.store.savepoint(txn).await
    }

    /// Undo this transaction's writes made after `mark`
    pub async fn rollback_to(&self, mark: usize) -> Result<()> {
        let txn = self.open_transaction()?;
        self.store.rollback_to(txn, mark).await
    }

    fn open_transaction(&self) -> Result<TransactionId> {
        self.transaction_id
            .ok_or_else(|| NestError::Transaction("Session has no open transaction".to_string()))
    }

    pub async fn insert(&self, table: &str, row: Attributes) -> Result<RecordId> {
        self.store.insert(self.transaction_id, table, row).await
    }

    pub async fn update(&self, table: &str, id: RecordId, row: Attributes) -> Result<()> {
        self.store.update(self.transaction_id, table, id, row).await
    }

    pub async fn delete(&self, table: &str, id: RecordId) -> Result<bool> {
        self.store.delete(self.transaction_id, table, id).await
    }

    pub async fn find(&self, table: &str, id: RecordId) -> Result<Option<Attributes>> {
        self.store.find(table, id).await
    }

    pub async fn find_by(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(RecordId, Attributes)>> {
        self.store.find_by(table, field, value).await
    }

    pub async fn count(&self, table: &str) -> Result<usize> {
        self.store.count(table).await
    }

    /// Executes a closure within a transaction scope.
    ///
    /// If the closure returns `Ok`, the transaction is committed.
    /// If it returns `Err`, the transaction is rolled back and the error returned.
    pub async fn with_transaction<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let transaction_id = self.store.begin().await?;
        let tx_session = self.with_transaction_id(transaction_id);

        match op(tx_session).await {
            Ok(value) => {
                if let Err(err) = self.store.commit(transaction_id).await {
                    let _ = self.store.rollback(transaction_id).await;
                    return Err(err);
                }
                Ok(value)
            }
            Err(err) => {
                self.store.rollback(transaction_id).await?;
                Err(err)
            }
        }
    }
}

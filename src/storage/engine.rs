use crate::core::{Attributes, RecordId, Result, Value};
use crate::transaction::TransactionId;
use async_trait::async_trait;

/// Storage engine trait - the persistence layer the engine is written against
///
/// Single-record writes plus transactional scoping. A write made with
/// `Some(txn)` must be undone by `rollback(txn)`; a write made with `None`
/// is committed on its own.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> Result<TransactionId>;

    /// Make every write of the transaction permanent
    async fn commit(&self, txn: TransactionId) -> Result<()>;

    /// Undo every write of the transaction
    async fn rollback(&self, txn: TransactionId) -> Result<()>;

    /// Mark the current end of the transaction's undo log
    async fn savepoint(&self, txn: TransactionId) -> Result<usize>;

    /// Undo the writes made after `mark`, leaving the transaction open
    async fn rollback_to(&self, txn: TransactionId, mark: usize) -> Result<()>;

    /// Insert a row and assign its identity
    async fn insert(
        &self,
        txn: Option<TransactionId>,
        table: &str,
        row: Attributes,
    ) -> Result<RecordId>;

    /// Overwrite an existing row
    async fn update(
        &self,
        txn: Option<TransactionId>,
        table: &str,
        id: RecordId,
        row: Attributes,
    ) -> Result<()>;

    /// Remove a row, returning whether it existed
    async fn delete(&self, txn: Option<TransactionId>, table: &str, id: RecordId) -> Result<bool>;

    /// Fetch one row
    async fn find(&self, table: &str, id: RecordId) -> Result<Option<Attributes>>;

    /// Fetch every row whose `field` equals `value`, in id order
    async fn find_by(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(RecordId, Attributes)>>;

    /// Number of rows in a table; unknown tables are empty
    async fn count(&self, table: &str) -> Result<usize>;
}

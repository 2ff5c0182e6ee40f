// ============================================================================
// Transaction State Management
// ============================================================================
//
// State Pattern for the transaction lifecycle: Active -> Committed/Aborted.
// A transaction owns the undo log of every write made under it.
//
// ============================================================================

use super::Change;
use crate::core::{NestError, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global transaction ID counter
static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Generate a new unique transaction ID
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// Transaction state following the State Pattern
///
/// State transitions:
/// ```text
/// Active ──commit──> Committed
///   │
///   └──rollback──> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can execute operations
    Active,

    /// Transaction has been successfully committed
    Committed,

    /// Transaction has been aborted/rolled back
    Aborted,
}

impl TransactionState {
    /// Check if transaction can execute operations
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }

    /// Check if transaction is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::Aborted
        )
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Active => write!(f, "ACTIVE"),
            TransactionState::Committed => write!(f, "COMMITTED"),
            TransactionState::Aborted => write!(f, "ABORTED"),
        }
    }
}

#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
    /// Undo log, oldest first
    changes: Vec<Change>,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            changes: Vec::new(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    /// Record a change in this transaction
    ///
    /// # Errors
    /// Returns error if transaction is not active
    pub fn record_change(&mut self, change: Change) -> Result<()> {
        if !self.state.is_active() {
            return Err(NestError::Transaction(format!(
                "Cannot record change: transaction {} is {}",
                self.id, self.state
            )));
        }

        self.changes.push(change);
        Ok(())
    }

    /// Mark transaction as committed, discarding the undo log
    ///
    /// # Errors
    /// Returns error if transaction is not active
    pub fn commit(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(NestError::Transaction(format!(
                "Cannot commit: transaction {} is already {}",
                self.id, self.state
            )));
        }

        self.changes.clear();
        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Position in the undo log a later `rollback_to` can return to
    pub fn savepoint(&self) -> Result<usize> {
        if !self.state.is_active() {
            return Err(NestError::Transaction(format!(
                "Cannot take savepoint: transaction {} is {}",
                self.id, self.state
            )));
        }
        Ok(self.changes.len())
    }

    /// Hand back the changes recorded after `mark`, newest first. The
    /// transaction stays active.
    pub fn rollback_to(&mut self, mark: usize) -> Result<Vec<Change>> {
        if !self.state.is_active() {
            return Err(NestError::Transaction(format!(
                "Cannot rollback to savepoint: transaction {} is {}",
                self.id, self.state
            )));
        }
        if mark > self.changes.len() {
            return Err(NestError::Transaction(format!(
                "Savepoint {} is past the end of transaction {}",
                mark, self.id
            )));
        }

        let mut undo = self.changes.split_off(mark);
        undo.reverse();
        Ok(undo)
    }

    /// Mark transaction as aborted and hand back the undo log, newest first
    ///
    /// # Errors
    /// Returns error if transaction is not active
    pub fn rollback(&mut self) -> Result<Vec<Change>> {
        if !self.state.is_active() {
            return Err(NestError::Transaction(format!(
                "Cannot rollback: transaction {} is already {}",
                self.id, self.state
            )));
        }

        let mut undo = std::mem::take(&mut self.changes);
        undo.reverse();
        self.state = TransactionState::Aborted;
        Ok(undo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attributes, RecordId};

    fn insert(id: i64) -> Change {
        Change::InsertRow {
            table: "tasks".to_string(),
            id: RecordId(id),
            row: Attributes::new(),
        }
    }

    #[test]
    fn test_transaction_id_generation() {
        let id1 = TransactionId::new();
        let id2 = TransactionId::new();
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn test_transaction_lifecycle() {
        let mut txn = Transaction::new(TransactionId::new());

        assert_eq!(txn.state(), TransactionState::Active);
        assert!(txn.state().is_active());
        assert!(!txn.state().is_terminal());

        txn.commit().unwrap();
        assert_eq!(txn.state(), TransactionState::Committed);
        assert!(txn.state().is_terminal());
        assert!(txn.commit().is_err());
    }

    #[test]
    fn test_rollback_returns_changes_newest_first() {
        let mut txn = Transaction::new(TransactionId::new());
        txn.record_change(insert(1)).unwrap();
        txn.record_change(insert(2)).unwrap();

        let undo = txn.rollback().unwrap();
        let ids: Vec<_> = undo.iter().map(Change::record_id).collect();
        assert_eq!(ids, vec![RecordId(2), RecordId(1)]);
        assert_eq!(txn.change_count(), 0);
        assert_eq!(txn.state(), TransactionState::Aborted);
    }

    #[test]
    fn test_rollback_to_savepoint_keeps_earlier_changes() {
        let mut txn = Transaction::new(TransactionId::new());
        txn.record_change(insert(1)).unwrap();
        let mark = txn.savepoint().unwrap();
        txn.record_change(insert(2)).unwrap();
        txn.record_change(insert(3)).unwrap();

        let undo = txn.rollback_to(mark).unwrap();
        let ids: Vec<_> = undo.iter().map(Change::record_id).collect();
        assert_eq!(ids, vec![RecordId(3), RecordId(2)]);
        assert_eq!(txn.change_count(), 1);
        assert!(txn.state().is_active());
        assert!(txn.rollback_to(5).is_err());
    }

    #[test]
    fn test_cannot_record_change_after_commit() {
        let mut txn = Transaction::new(TransactionId::new());
        txn.commit().unwrap();
        assert!(txn.record_change(insert(1)).is_err());
    }
}

// ============================================================================
// Transaction Manager
// ============================================================================

use super::{Change, Transaction, TransactionId};
use crate::core::{NestError, Result};
use std::collections::HashMap;

/// Bookkeeping for open transactions
///
/// Lives behind the store's lock, so it needs no synchronization of its own.
#[derive(Debug, Default)]
pub struct TransactionManager {
    transactions: HashMap<TransactionId, Transaction>,
    committed: u64,
    aborted: u64,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> TransactionId {
        let transaction_id = TransactionId::new();
        self.transactions
            .insert(transaction_id, Transaction::new(transaction_id));
        transaction_id
    }

    pub fn record_change(&mut self, txn_id: TransactionId, change: Change) -> Result<()> {
        self.active_mut(txn_id)?.record_change(change)
    }

    pub fn commit(&mut self, txn_id: TransactionId) -> Result<()> {
        self.active_mut(txn_id)?.commit()?;
        self.transactions.remove(&txn_id);
        self.committed += 1;
        Ok(())
    }

    /// Aborts the transaction and returns its undo log, newest change first
    pub fn rollback(&mut self, txn_id: TransactionId) -> Result<Vec<Change>> {
        let undo = self.active_mut(txn_id)?.rollback()?;
        self.transactions.remove(&txn_id);
        self.aborted += 1;
        Ok(undo)
    }

    pub fn is_active(&self, txn_id: TransactionId) -> bool {
        self.transactions
            .get(&txn_id)
            .is_some_and(|txn| txn.state().is_active())
    }

    pub fn savepoint(&self, txn_id: TransactionId) -> Result<usize> {
        self.transactions
            .get(&txn_id)
            .ok_or_else(|| NestError::Transaction(format!("Transaction {} not found", txn_id)))?
            .savepoint()
    }

    /// Undo log back to `mark`, newest change first; the transaction stays open
    pub fn rollback_to(&mut self, txn_id: TransactionId, mark: usize) -> Result<Vec<Change>> {
        self.active_mut(txn_id)?.rollback_to(mark)
    }

    /// Fails unless `txn_id` names an open transaction
    pub fn ensure_active(&self, txn_id: TransactionId) -> Result<()> {
        if self.is_active(txn_id) {
            Ok(())
        } else {
            Err(NestError::Transaction(format!(
                "Transaction {} is not active",
                txn_id
            )))
        }
    }

    pub fn stats(&self) -> TransactionStats {
        TransactionStats {
            active: self.transactions.len(),
            committed: self.committed,
            aborted: self.aborted,
        }
    }

    fn active_mut(&mut self, txn_id: TransactionId) -> Result<&mut Transaction> {
        self.transactions
            .get_mut(&txn_id)
            .ok_or_else(|| NestError::Transaction(format!("Transaction {} not found", txn_id)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionStats {
    pub active: usize,
    pub committed: u64,
    pub aborted: u64,
}

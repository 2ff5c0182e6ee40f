// ============================================================================
// Transaction Management Module
// ============================================================================
//
// Atomic scoping for the in-memory store.
//
// Design Patterns Used:
// - State Pattern: Transaction state management (Active, Committed, Aborted)
// - Command Pattern: Reversible writes replayed on rollback
//
// ============================================================================

pub mod change;
pub mod manager;
pub mod state;

pub use change::Change;
pub use manager::{TransactionManager, TransactionStats};
pub use state::{Transaction, TransactionId, TransactionState};

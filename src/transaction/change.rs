// ============================================================================
// Transaction Change Tracking
// ============================================================================
//
// Command Pattern for reversible writes. Writes land in the store eagerly;
// each one leaves a Change behind so a rollback can replay the inverse.
//
// ============================================================================

use crate::core::{Attributes, RecordId};

/// A single reversible write recorded by a transaction
#[derive(Debug, Clone)]
pub enum Change {
    /// A row was inserted
    InsertRow {
        table: String,
        id: RecordId,
        row: Attributes,
    },

    /// An existing row was overwritten
    UpdateRow {
        table: String,
        id: RecordId,
        old_row: Attributes,
    },

    /// An existing row was removed
    DeleteRow {
        table: String,
        id: RecordId,
        old_row: Attributes,
    },
}

impl Change {
    /// Get the table name affected by this change
    pub fn table_name(&self) -> &str {
        match self {
            Change::InsertRow { table, .. } => table,
            Change::UpdateRow { table, .. } => table,
            Change::DeleteRow { table, .. } => table,
        }
    }

    /// Get the record affected by this change
    pub fn record_id(&self) -> RecordId {
        match self {
            Change::InsertRow { id, .. } => *id,
            Change::UpdateRow { id, .. } => *id,
            Change::DeleteRow { id, .. } => *id,
        }
    }
}

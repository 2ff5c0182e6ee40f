use crate::core::{Attributes, NestError, RecordId, Result, Value};
use std::collections::BTreeMap;

/// Rows of one table, keyed by identity
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    rows: BTreeMap<RecordId, Attributes>,
    next_row_id: i64,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
            next_row_id: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert(&mut self, row: Attributes) -> RecordId {
        let id = RecordId(self.next_row_id);
        self.next_row_id += 1;
        self.rows.insert(id, row);
        id
    }

    /// Puts a row back under a known id (used when undoing a delete)
    pub fn restore(&mut self, id: RecordId, row: Attributes) {
        self.rows.insert(id, row);
    }

    /// Returns the previous row image
    pub fn update(&mut self, id: RecordId, row: Attributes) -> Result<Attributes> {
        match self.rows.get_mut(&id) {
            Some(existing) => Ok(std::mem::replace(existing, row)),
            None => Err(NestError::RecordNotFound {
                table: self.name.clone(),
                id: id.as_i64(),
            }),
        }
    }

    pub fn delete(&mut self, id: RecordId) -> Option<Attributes> {
        self.rows.remove(&id)
    }

    pub fn get(&self, id: RecordId) -> Option<&Attributes> {
        self.rows.get(&id)
    }

    pub fn scan_by(&self, field: &str, value: &Value) -> Vec<(RecordId, Attributes)> {
        self.rows
            .iter()
            .filter(|(_, row)| row.get(field) == Some(value))
            .map(|(id, row)| (*id, row.clone()))
            .collect()
    }

    pub fn scan_all(&self) -> Vec<(RecordId, Attributes)> {
        self.rows
            .iter()
            .map(|(id, row)| (*id, row.clone()))
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

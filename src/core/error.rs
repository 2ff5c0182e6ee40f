use crate::nested::Errors;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NestError {
    #[error("No '{association}' child with id {key} is associated with this record")]
    LookupFailure { association: String, key: String },

    #[error("Key '{key}' for '{association}' is neither a record id nor a new-record marker")]
    MalformedKey { association: String, key: String },

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Validation failed: {}", .0.full_messages().join(", "))]
    RecordInvalid(Errors),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Record {id} not found in '{table}'")]
    RecordNotFound { table: String, id: i64 },

    #[error("Model '{model}' has no association named '{association}'")]
    UnknownAssociation { model: String, association: String },

    #[error("Model '{model}' has no attribute named '{attribute}'")]
    UnknownAttribute { model: String, attribute: String },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl NestError {
    /// User-recoverable: redisplay the form with the aggregated errors.
    pub fn is_validation(&self) -> bool {
        matches!(self, NestError::RecordInvalid(_))
    }

    /// Structural input problems that point at forged or stale identities.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            NestError::LookupFailure { .. } | NestError::MalformedKey { .. }
        )
    }

    pub(crate) fn lookup(association: &str, key: impl ToString) -> Self {
        NestError::LookupFailure {
            association: association.to_string(),
            key: key.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NestError>;

impl<T> From<std::sync::PoisonError<T>> for NestError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for NestError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidParams(err.to_string())
    }
}

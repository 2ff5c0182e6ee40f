// ============================================================================
// Nested Params Library
// ============================================================================

pub mod config;
pub mod core;
pub mod demo;
pub mod entity;
pub mod form;
pub mod nested;
pub mod params;
pub mod schema;
pub mod session;
pub mod storage;
pub mod transaction;

// Re-export main types for convenience
pub use config::NestedParamsConfig;
pub use core::{Attributes, DataType, NestError, RecordId, Result, Value};
pub use entity::{Entity, Record};
pub use form::FieldNamer;
pub use nested::{
    Association, AutosaveCoordinator, ChildCollection, ChildReconciler, Errors, HasOne,
    ReconciliationPlan, SaveGuard, SaveOutcome, SaveState, ValidationAggregator,
};
pub use params::{
    AssociationInput, AttributeSet, DirectValue, IncomingCollection, NestedKey, ParamValue, Params,
};
pub use schema::{AssociationSchema, Cardinality, ChildCollectionSpec, ModelSchema};
pub use session::Session;
pub use storage::{MemoryStore, Store};
pub use transaction::{TransactionId, TransactionManager};

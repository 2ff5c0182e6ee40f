// ============================================================================
// Nested Attributes & Autosave Engine
// ============================================================================
//
// ChildReconciler      - submitted attributes -> create/update/destroy
// ValidationAggregator - child errors re-labelled onto the owner
// AutosaveCoordinator  - children persisted after the owner row
// SaveGuard            - the whole graph saved in one transaction
//
// Everything here is generic over `Entity`; `Record` is the one shipped
// implementation.
//
// ============================================================================

pub mod autosave;
pub mod collection;
pub mod errors;
pub mod guard;
pub mod reconciler;
pub mod validation;

pub use autosave::AutosaveCoordinator;
pub use collection::{Association, ChildCollection, HasOne};
pub use errors::Errors;
pub use guard::{SaveGuard, SaveOutcome, SaveState};
pub use reconciler::{ChildReconciler, ReconciliationPlan};
pub use validation::ValidationAggregator;

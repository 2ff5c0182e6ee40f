//! Atomic save of an owner and everything it autosaves.

use crate::core::{NestError, Result};
use crate::entity::Entity;
use crate::session::Session;
use log::warn;
use std::fmt;
use tracing::{Instrument, Level, event, info_span};

/// Lifecycle of one save attempt
///
/// ```text
/// Idle ──> Validating ──> Invalid
///               │
///               └──> Persisting ──> Committed
///                          │
///                          └──> RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Validating,
    Invalid,
    Persisting,
    Committed,
    RolledBack,
}

impl SaveState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SaveState::Invalid | SaveState::Committed | SaveState::RolledBack
        )
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveState::Idle => write!(f, "IDLE"),
            SaveState::Validating => write!(f, "VALIDATING"),
            SaveState::Invalid => write!(f, "INVALID"),
            SaveState::Persisting => write!(f, "PERSISTING"),
            SaveState::Committed => write!(f, "COMMITTED"),
            SaveState::RolledBack => write!(f, "ROLLED_BACK"),
        }
    }
}

/// Terminal state of an attempt plus the fault that ended it, if any.
#[derive(Debug)]
pub struct SaveOutcome {
    pub state: SaveState,
    pub error: Option<NestError>,
}

impl SaveOutcome {
    pub fn is_committed(&self) -> bool {
        self.state == SaveState::Committed
    }

    pub fn into_result(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Replaces a plain save with validate -> persist owner and children in one
/// transaction -> commit, or roll everything back.
///
/// When the session already has an open transaction the save joins it behind
/// a savepoint. A failed save undoes its own writes back to that savepoint and
/// the outer scope still decides about commit.
pub struct SaveGuard<'a> {
    session: &'a Session,
}

impl<'a> SaveGuard<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Non-strict save. Faults are rolled back and reported as `false`.
    pub async fn save<E: Entity>(&self, entity: &mut E, run_validations: bool) -> bool {
        let outcome = self.attempt(entity, run_validations).await;
        if let Some(err) = &outcome.error
            && outcome.state == SaveState::RolledBack
        {
            warn!("save rolled back: {}", err);
        }
        outcome.is_committed()
    }

    /// Strict save: validations always run and the fault is returned after
    /// rollback (`RecordInvalid` for validation failures).
    pub async fn save_strict<E: Entity>(&self, entity: &mut E) -> Result<()> {
        self.attempt(entity, true).await.into_result()
    }

    pub async fn attempt<E: Entity>(&self, entity: &mut E, run_validations: bool) -> SaveOutcome {
        let span = info_span!(
            "save",
            entity = std::any::type_name::<E>(),
            new_record = entity.is_new_record(),
            run_validations
        );
        self.run(entity, run_validations).instrument(span).await
    }

    async fn run<E: Entity>(&self, entity: &mut E, run_validations: bool) -> SaveOutcome {
        let mut state = SaveState::Idle;

        if run_validations {
            state = transition(state, SaveState::Validating);
            if !entity.validate() {
                let state = transition(state, SaveState::Invalid);
                return SaveOutcome {
                    state,
                    error: Some(NestError::RecordInvalid(entity.errors().clone())),
                };
            }
        }

        state = transition(state, SaveState::Persisting);
        let snapshot = entity.clone();
        let result = self.persist(entity).await;

        match result {
            Ok(()) => SaveOutcome {
                state: transition(state, SaveState::Committed),
                error: None,
            },
            Err(err) => {
                *entity = snapshot;
                event!(Level::DEBUG, error = %err, "restored pre-save state");
                SaveOutcome {
                    state: transition(state, SaveState::RolledBack),
                    error: Some(err),
                }
            }
        }
    }

    async fn persist<E: Entity>(&self, entity: &mut E) -> Result<()> {
        if self.session.in_transaction() {
            let mark = self.session.savepoint().await?;
            return match entity.save(self.session).await {
                Ok(()) => Ok(()),
                Err(err) => {
                    self.session.rollback_to(mark).await?;
                    Err(err)
                }
            };
        }
        self.session
            .with_transaction(|tx| async move { entity.save(&tx).await })
            .await
    }
}

fn transition(from: SaveState, to: SaveState) -> SaveState {
    event!(Level::TRACE, %from, %to, "save state");
    to
}

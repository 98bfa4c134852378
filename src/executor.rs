//! Sequential application of a [`Plan`].
use crate::migration::{MigrationDirection, MigrationError, MigrationErrorKind, Plan, UnitKey};
use crate::store::VersionStore;

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};


#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorState {
    Idle,
    Running,
    Completed,
    Failed,
}


/// Cooperative stop request, honoured between units only.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}


/// Summary of a completed run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Run {
    pub direction: MigrationDirection,
    pub start_version: i64,
    pub applied_version: i64,
    pub applied: Vec<UnitKey>,
}


pub struct Executor<'s, S: VersionStore + ?Sized> {
    store: &'s mut S,
    cancel: CancelSignal,
    state: ExecutorState,
}

impl<'s, S: VersionStore + ?Sized> Executor<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Executor { store, cancel: CancelSignal::new(), state: ExecutorState::Idle }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Apply every unit of `plan` in order, saving the cursor after each one.
    ///
    /// Stops at the first failing unit. The cursor is never moved past a unit
    /// that failed, and nothing already applied is undone. Going up, the cursor
    /// becomes the version of the unit just applied. Going down, it becomes the
    /// highest version still applied: the next unit's version, or the plan's
    /// target once the last unit is undone.
    pub async fn run(&mut self, plan: &Plan) -> Result<Run, MigrationError> {
        self.state = ExecutorState::Running;
        let result = self.apply(plan).await;
        self.state = match result {
            Ok(_) => ExecutorState::Completed,
            Err(_) => ExecutorState::Failed,
        };
        result
    }

    async fn apply(&mut self, plan: &Plan) -> Result<Run, MigrationError> {
        let direction = plan.direction();
        let units = plan.units();
        let mut run = Run {
            direction,
            start_version: plan.from_version(),
            applied_version: plan.from_version(),
            applied: Vec::with_capacity(units.len()),
        };

        for (index, unit) in units.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!("Cancellation requested; stopping before '{}'", unit.name());
                return Err(MigrationError::new(MigrationErrorKind::Cancelled {
                    applied_version: run.applied_version,
                }));
            }

            tracing::info!("{} '{}'...", direction.verb(), unit.name());
            if let Err(source) = unit.apply().await {
                tracing::error!("'{}' failed: {source:#}", unit.name());
                return Err(MigrationError::new(MigrationErrorKind::UnitExecution {
                    unit: unit.key().clone(),
                    applied_version: run.applied_version,
                    source,
                }));
            }

            let cursor = match direction {
                MigrationDirection::Up => unit.version(),
                MigrationDirection::Down => units
                    .get(index + 1)
                    .map_or(plan.to_version(), |next| next.version()),
            };
            self.store.set_current_version(cursor).await.map_err(|source| {
                MigrationError::new(MigrationErrorKind::CursorWrite {
                    unit: unit.key().clone(),
                    applied_version: run.applied_version,
                    source,
                })
            })?;
            tracing::debug!("Cursor advanced to version {cursor}");

            run.applied_version = cursor;
            run.applied.push(unit.key().clone());
        }

        Ok(run)
    }
}

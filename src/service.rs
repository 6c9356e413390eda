//! # Service: Stage Write Orchestration
//!
//! Sequences the validator, the duration calculator and the store for each
//! caller-facing operation:
//!
//! | Operation | Pipeline |
//! |-----------|----------|
//! | `create` | validate (all fields) → calculate → insert → read back |
//! | `patch` | validate (present fields) → calculate → update → read back |
//! | `delete` | set status to `DELETED` → read back |
//! | `list_all`, `get_by_id` | read |
//!
//! A validation failure aborts the operation before anything is calculated or
//! written. Delete never validates or calculates.
//!
//! ## Patch duration basis
//!
//! With [`DurationBasis::Patch`] the calculator only sees dates carried by the
//! patch itself, so a patch that supplies one date persists a null duration.
//! With [`DurationBasis::Merged`] the stored stage is read first and the patch
//! is laid over it, keeping duration consistent with the stored dates.

use tracing::{error, info, warn};

use crate::stage::{
    calculate, validate, CalculationError, NewStage, Schedule, StagePatch, StagePayload,
    StageRecord, StageStatus, ValidationError,
};
use crate::store::StageStore;

/// Which dates a patch's duration recalculation may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DurationBasis {
    /// Only dates present in the patch.
    #[default]
    Patch,
    /// Stored dates overlaid with the patch.
    Merged,
}

#[derive(Debug)]
pub enum StageError {
    /// Caller input broke a field rule. Surfaced verbatim.
    Validation(ValidationError),
    NotFound(i64),
    /// A validated stage still failed calculation: a defect, not bad input.
    Internal(CalculationError),
    Storage(anyhow::Error),
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageError::Validation(e) => write!(f, "{}", e),
            StageError::NotFound(id) => write!(f, "construction stage {} not found", id),
            StageError::Internal(e) => write!(f, "internal error: {}", e),
            StageError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StageError::Validation(e) => Some(e),
            StageError::Internal(e) => Some(e),
            StageError::Storage(e) => Some(&**e),
            StageError::NotFound(_) => None,
        }
    }
}

impl From<ValidationError> for StageError {
    fn from(e: ValidationError) -> Self {
        StageError::Validation(e)
    }
}

impl From<anyhow::Error> for StageError {
    fn from(e: anyhow::Error) -> Self {
        StageError::Storage(e)
    }
}

fn recalculate(schedule: Schedule) -> Result<Schedule, StageError> {
    calculate(schedule).map_err(|e| {
        error!(error = %e, "duration calculation reached an invalid schedule");
        StageError::Internal(e)
    })
}

/// Validate and calculate a create payload without touching storage.
///
/// Absent fields count as null and a missing status starts at `NEW`.
pub fn prepare_create(payload: StagePayload) -> Result<NewStage, StageError> {
    let mut patch = validate(&payload.for_create())?;
    patch.set_schedule(recalculate(patch.schedule())?);
    Ok(patch.into_new_stage())
}

pub struct StageService<S> {
    store: S,
    basis: DurationBasis,
}

impl<S: StageStore> StageService<S> {
    pub fn new(store: S) -> Self {
        StageService {
            store,
            basis: DurationBasis::default(),
        }
    }

    pub fn with_duration_basis(mut self, basis: DurationBasis) -> Self {
        self.basis = basis;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn duration_basis(&self) -> DurationBasis {
        self.basis
    }

    pub async fn list_all(&self) -> Result<Vec<StageRecord>, StageError> {
        Ok(self.store.fetch_all().await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<StageRecord, StageError> {
        self.store
            .fetch_by_id(id)
            .await?
            .ok_or(StageError::NotFound(id))
    }

    pub async fn create(&self, payload: StagePayload) -> Result<StageRecord, StageError> {
        let stage = prepare_create(payload).inspect_err(log_rejection)?;
        let id = self.store.insert(&stage).await?;
        info!(id, name = %stage.name, duration = ?stage.duration, "construction stage created");
        self.get_by_id(id).await
    }

    pub async fn patch(&self, id: i64, payload: StagePayload) -> Result<StageRecord, StageError> {
        let mut patch = validate(&payload)
            .map_err(StageError::from)
            .inspect_err(log_rejection)?;

        if patch.touches_schedule() {
            let schedule = match self.basis {
                DurationBasis::Patch => patch.schedule(),
                DurationBasis::Merged => {
                    let stored = self.get_by_id(id).await?;
                    merged_schedule(&patch, &stored).inspect_err(log_rejection)?
                }
            };
            patch.set_schedule(recalculate(schedule)?);
        }

        if !self.store.update_by_id(id, &patch).await? {
            return Err(StageError::NotFound(id));
        }
        info!(id, duration = ?patch.duration, "construction stage patched");
        self.get_by_id(id).await
    }

    /// Soft delete: only the status changes.
    pub async fn delete(&self, id: i64) -> Result<StageRecord, StageError> {
        if !self.store.set_status(id, StageStatus::Deleted).await? {
            return Err(StageError::NotFound(id));
        }
        info!(id, "construction stage deleted");
        self.get_by_id(id).await
    }
}

/// Lay the patch over the stored stage and re-check date ordering.
fn merged_schedule(patch: &StagePatch, stored: &StageRecord) -> Result<Schedule, StageError> {
    let schedule = patch.schedule_over(stored);
    if let (Some(start), Some(end)) = (schedule.start_date, schedule.end_date) {
        if end < start {
            return Err(ValidationError::end_before_start().into());
        }
    }
    Ok(schedule)
}

fn log_rejection(err: &StageError) {
    if let StageError::Validation(e) = err {
        warn!(field = %e.field, message = %e.message, "construction stage rejected");
    }
}

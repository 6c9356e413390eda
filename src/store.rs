//! # Store: Stage Storage Collaborator
//!
//! [`StageStore`] is the only way the service touches persistence. It deals in
//! fully formed values: the service hands it validated, calculated stages and
//! reads back [`StageRecord`]s. Any failure is an opaque `anyhow::Error` that
//! the service passes through without interpretation.
//!
//! Two implementations exist: [`crate::db::Database`] (PostgreSQL) and
//! [`MemoryStore`], an in-process map used for local runs and tests.

use anyhow::Result;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::stage::{NewStage, StagePatch, StageRecord, StageStatus};

pub trait StageStore: Send + Sync + 'static {
    /// All stages, ordered by id.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<StageRecord>>> + Send;

    fn fetch_by_id(&self, id: i64) -> impl Future<Output = Result<Option<StageRecord>>> + Send;

    /// Persist a new stage and return its generated id.
    fn insert(&self, stage: &NewStage) -> impl Future<Output = Result<i64>> + Send;

    /// Write the fields present in `patch`. Returns false if no stage has `id`.
    fn update_by_id(&self, id: i64, patch: &StagePatch)
        -> impl Future<Output = Result<bool>> + Send;

    /// Overwrite only the status. Returns false if no stage has `id`.
    fn set_status(&self, id: i64, status: StageStatus) -> impl Future<Output = Result<bool>> + Send;

    /// Cheap connectivity probe for readiness checks.
    fn health_check(&self) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    stages: BTreeMap<i64, StageRecord>,
}

/// Mutex-guarded in-memory store. Ids start at 1 and are never reused.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StageStore for MemoryStore {
    async fn fetch_all(&self) -> Result<Vec<StageRecord>> {
        Ok(self.lock().stages.values().cloned().collect())
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<StageRecord>> {
        Ok(self.lock().stages.get(&id).cloned())
    }

    async fn insert(&self, stage: &NewStage) -> Result<i64> {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state
            .stages
            .insert(id, StageRecord::from_new(id, stage.clone()));
        Ok(id)
    }

    async fn update_by_id(&self, id: i64, patch: &StagePatch) -> Result<bool> {
        let mut state = self.lock();
        match state.stages.get_mut(&id) {
            Some(record) => {
                record.apply(patch);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_status(&self, id: i64, status: StageStatus) -> Result<bool> {
        let mut state = self.lock();
        match state.stages.get_mut(&id) {
            Some(record) => {
                record.status = Some(status);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

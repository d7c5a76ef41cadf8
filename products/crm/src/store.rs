//! The board's view of the backing store.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::{deal::DealRecord, stage::Stage};

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum StoreError {
    #[error("deal {0} not found")]
    NotFound(Uuid),
    #[error("stage update rejected: {0}")]
    Rejected(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<DbErr> for StoreError {
    fn from(value: DbErr) -> Self {
        StoreError::Database(value.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            StoreError::Decode(value.to_string())
        } else {
            StoreError::Transport(value.to_string())
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DealStore: Send + Sync {
    /// Every deal, with company and contact names resolved.
    async fn fetch_all(&self) -> StoreResult<Vec<DealRecord>>;

    /// Persist a single deal's stage. Either fully applied or not at all.
    async fn update_stage(&self, id: Uuid, stage: Stage) -> StoreResult<()>;
}

#[async_trait]
impl<T: DealStore + ?Sized> DealStore for Arc<T> {
    async fn fetch_all(&self) -> StoreResult<Vec<DealRecord>> {
        (**self).fetch_all().await
    }

    async fn update_stage(&self, id: Uuid, stage: Stage) -> StoreResult<()> {
        (**self).update_stage(id, stage).await
    }
}

/// A stage write as seen by [`MemoryDealStore`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StageWrite {
    pub id: Uuid,
    pub stage: Stage,
    pub accepted: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<DealRecord>,
    fail_fetches: bool,
    fail_updates: bool,
    rejected_ids: HashSet<Uuid>,
    writes: Vec<StageWrite>,
}

/// In-process store with switchable failures.
#[derive(Debug, Default)]
pub struct MemoryDealStore {
    state: Mutex<MemoryState>,
}

impl MemoryDealStore {
    pub fn new(records: Vec<DealRecord>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                records,
                ..MemoryState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.lock().fail_fetches = fail;
    }

    pub fn fail_updates(&self, fail: bool) {
        self.lock().fail_updates = fail;
    }

    /// Refuse stage writes for one deal only.
    pub fn reject_updates_for(&self, id: Uuid) {
        self.lock().rejected_ids.insert(id);
    }

    pub fn writes(&self) -> Vec<StageWrite> {
        self.lock().writes.clone()
    }

    pub fn records(&self) -> Vec<DealRecord> {
        self.lock().records.clone()
    }
}

#[async_trait]
impl DealStore for MemoryDealStore {
    async fn fetch_all(&self) -> StoreResult<Vec<DealRecord>> {
        let state = self.lock();
        if state.fail_fetches {
            return Err(StoreError::Transport("deal list unavailable".into()));
        }
        Ok(state.records.clone())
    }

    async fn update_stage(&self, id: Uuid, stage: Stage) -> StoreResult<()> {
        let mut state = self.lock();
        let refused = state.fail_updates || state.rejected_ids.contains(&id);
        let position = state.records.iter().position(|record| record.id == id);
        let accepted = !refused && position.is_some();
        state.writes.push(StageWrite {
            id,
            stage,
            accepted,
        });
        if refused {
            return Err(StoreError::Rejected(format!("write refused for deal {id}")));
        }
        let index = position.ok_or(StoreError::NotFound(id))?;
        state.records[index].stage = stage.key().to_string();
        Ok(())
    }
}

//! In-process store

use std::sync::{Mutex, MutexGuard};

use tracing::instrument;

use crate::domain::{ManualId, ManualSnapshot, PolicyId, SectionId};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::tables::StoreData;
use crate::infrastructure::traits::{DocumentStore, Transaction};

/// Store keeping every manual in memory. Commits are serialized by a mutex.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: Mutex<StoreData>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: StoreData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, StoreData>> {
        self.data.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl DocumentStore for InMemoryStore {
    fn load(&self, manual_id: ManualId) -> StoreResult<ManualSnapshot> {
        Ok(self.lock()?.load(manual_id))
    }

    #[instrument(level = "debug", skip(self, tx), fields(manual = %tx.manual_id, writes = tx.writes.len()))]
    fn commit(&self, tx: Transaction) -> StoreResult<u64> {
        let mut data = self.lock()?;
        let manual = data.prepare(&tx)?;
        let version = manual.version;
        data.install(manual);
        Ok(version)
    }

    fn allocate_id(&self) -> StoreResult<u64> {
        Ok(self.lock()?.allocate_id())
    }

    fn locate_section(&self, id: SectionId) -> StoreResult<Option<ManualId>> {
        Ok(self.lock()?.locate_section(id))
    }

    fn locate_policy(&self, id: PolicyId) -> StoreResult<Option<ManualId>> {
        Ok(self.lock()?.locate_policy(id))
    }

    fn manuals(&self) -> StoreResult<Vec<ManualId>> {
        Ok(self.lock()?.manuals.keys().copied().collect())
    }
}

//! JSON file store
//!
//! The whole store lives in one JSON document. Every commit rewrites it through
//! a temporary file in the same directory that is then renamed over the
//! original, so readers see either the old or the new state.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::domain::{ManualId, ManualSnapshot, PolicyId, SectionId};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::tables::StoreData;
use crate::infrastructure::traits::{DocumentStore, Transaction};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store.
    #[instrument(level = "debug")]
    pub fn open(path: &Path) -> StoreResult<Self> {
        let data = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| StoreError::io(format!("read store {}", path.display()), e))?;
            if content.trim().is_empty() {
                StoreData::default()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            debug!("no store at {}, starting empty", path.display());
            StoreData::default()
        };
        Ok(Self {
            path: path.to_path_buf(),
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, StoreData>> {
        self.data.lock().map_err(|_| StoreError::Poisoned)
    }

    fn persist(&self, data: &StoreData) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| StoreError::io(format!("create {}", dir.display()), e))?;

        let json = serde_json::to_string_pretty(data)?;
        let mut tmp = NamedTempFile::new_in(&dir)
            .map_err(|e| StoreError::io(format!("create temp file in {}", dir.display()), e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| StoreError::io("write temp store file", e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io("sync temp store file", e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(format!("replace {}", self.path.display()), e.error))?;
        Ok(())
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self, manual_id: ManualId) -> StoreResult<ManualSnapshot> {
        Ok(self.lock()?.load(manual_id))
    }

    #[instrument(level = "debug", skip(self, tx), fields(manual = %tx.manual_id, writes = tx.writes.len()))]
    fn commit(&self, tx: Transaction) -> StoreResult<u64> {
        let mut data = self.lock()?;
        let manual = data.prepare(&tx)?;
        let version = manual.version;

        let mut next = data.clone();
        next.install(manual);
        self.persist(&next)?;
        *data = next;
        Ok(version)
    }

    fn allocate_id(&self) -> StoreResult<u64> {
        let mut data = self.lock()?;
        let mut next = data.clone();
        let id = next.allocate_id();
        self.persist(&next)?;
        *data = next;
        Ok(id)
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

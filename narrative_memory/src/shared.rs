//! Thread-safe handle around a single store.
//!
//! Every operation holds the lock for its whole duration, since `recall`
//! both reads and writes.

use std::sync::{Arc, Mutex};

use crate::config::MemoryConfig;
use crate::context::{ContextAssembler, MemoryContext};
use crate::error::{MemoryError, Result};
use crate::memory::{MemoryId, MemoryNode, NewMemory};
use crate::snapshot::MemorySnapshot;
use crate::store::{ImportReport, MemoryStats, MemoryStore, RecallQuery, RecalledMemory};

/// Cloneable handle; clones share the same store.
#[derive(Debug, Clone)]
pub struct SharedMemoryStore {
    inner: Arc<Mutex<MemoryStore>>,
}

impl SharedMemoryStore {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn from_config(config: MemoryConfig) -> Result<Self> {
        Ok(Self::new(MemoryStore::new(config)?))
    }

    /// Run `f` with exclusive access to the store.
    pub fn with_store<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut MemoryStore) -> T,
    {
        let mut store = self
            .inner
            .lock()
            .map_err(|e| MemoryError::LockPoisoned(format!("Failed to lock memory store: {}", e)))?;
        Ok(f(&mut store))
    }

    pub fn add(&self, request: NewMemory) -> Result<MemoryId> {
        self.with_store(|store| store.add(request))?
    }

    pub fn get(&self, id: MemoryId) -> Result<Option<MemoryNode>> {
        self.with_store(|store| store.get(id).cloned())
    }

    pub fn recall(&self, query: &RecallQuery, limit: usize) -> Result<Vec<RecalledMemory>> {
        self.with_store(|store| store.recall(query, limit))
    }

    pub fn forget(&self, threshold: f32) -> Result<Vec<MemoryId>> {
        self.with_store(|store| store.forget(threshold))
    }

    pub fn link_causal(&self, cause: MemoryId, effect: MemoryId) -> Result<bool> {
        self.with_store(|store| store.link_causal(cause, effect))
    }

    pub fn stats(&self) -> Result<MemoryStats> {
        self.with_store(|store| store.stats())
    }

    pub fn export(&self) -> Result<MemorySnapshot> {
        self.with_store(|store| store.export())
    }

    pub fn import(&self, snapshot: &MemorySnapshot) -> Result<ImportReport> {
        self.with_store(|store| store.import(snapshot))?
    }

    pub fn assemble_context(
        &self,
        assembler: &ContextAssembler,
        query: &RecallQuery,
    ) -> Result<MemoryContext> {
        self.with_store(|store| assembler.assemble(store, query))
    }

    pub fn len(&self) -> Result<usize> {
        self.with_store(|store| store.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.with_store(|store| store.is_empty())
    }
}

impl Default for SharedMemoryStore {
    fn default() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl From<MemoryStore> for SharedMemoryStore {
    fn from(store: MemoryStore) -> Self {
        Self::new(store)
    }
}

//! Memoized table loading
//!
//! Each matrix file is parsed at most once per cache; later loads of the same
//! file hand out the same shared table. Tables are immutable, so sharing them
//! across simulation runs needs no further synchronization.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use metrosim_core::{MetroError, Result};
use tracing::debug;

use crate::table::TransitionTable;

/// Cache of loaded transition tables, keyed by canonical path
#[derive(Debug, Default)]
pub struct TableCache {
    tables: Mutex<HashMap<PathBuf, Arc<TransitionTable>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache, created on first use
    pub fn global() -> &'static TableCache {
        static CACHE: OnceLock<TableCache> = OnceLock::new();
        CACHE.get_or_init(TableCache::new)
    }

    /// Load a table, parsing the file only if this cache has not seen it
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<TransitionTable>> {
        let path = path.as_ref();
        let key = path.canonicalize().map_err(|e| MetroError::io(path, e))?;

        if let Some(table) = self.lock().get(&key) {
            debug!(path = %key.display(), "Transition table cache hit");
            return Ok(Arc::clone(table));
        }

        // Parse outside the lock; a concurrent loader of the same file wins the insert
        let table = Arc::new(TransitionTable::load(&key)?);
        let mut tables = self.lock();
        Ok(Arc::clone(tables.entry(key).or_insert(table)))
    }

    /// Number of cached tables
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every cached table (outstanding `Arc`s stay valid)
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<TransitionTable>>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

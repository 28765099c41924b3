//! In-memory registry backend.
//!
//! The reference behavior: three hash maps behind a single `RwLock`. A
//! `create` takes the write lock once and updates all three maps before
//! releasing it, so no reader ever sees a half-inserted record. Readers share
//! the lock and never block each other.
//!
//! Volatile. Everything is gone when the process exits.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::time::Duration;

use super::{ContentRecord, ContentRecordRegistry, NewContentRecord, RegistryError, RegistryResult};
use crate::identity::Address;

/// Default wait for the registry lock before giving up.
/// Critical sections are a few map operations; hitting this means a bug.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Indexes {
    by_id: HashMap<String, ContentRecord>,
    by_address: HashMap<String, Vec<String>>,
    by_owner: HashMap<Address, Vec<String>>,
}

impl Indexes {
    fn resolve(&self, ids: Option<&Vec<String>>) -> Vec<ContentRecord> {
        ids.map(|ids| {
            ids.iter()
                .filter_map(|id| {
                    let record = self.by_id.get(id);
                    debug_assert!(record.is_some(), "index entry {id} has no record");
                    record.cloned()
                })
                .collect()
        })
        .unwrap_or_default()
    }
}

/// Process-local registry.
#[derive(Debug)]
pub struct InMemoryRegistry {
    indexes: RwLock<Indexes>,
    lock_timeout: Duration,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self {
            indexes: RwLock::default(),
            lock_timeout: LOCK_TIMEOUT,
        }
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override [`LOCK_TIMEOUT`].
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    fn read(&self) -> RegistryResult<RwLockReadGuard<'_, Indexes>> {
        self.indexes
            .try_read_for(self.lock_timeout)
            .ok_or(RegistryError::LockTimeout(self.lock_timeout))
    }

    fn write(&self) -> RegistryResult<RwLockWriteGuard<'_, Indexes>> {
        self.indexes
            .try_write_for(self.lock_timeout)
            .ok_or(RegistryError::LockTimeout(self.lock_timeout))
    }
}

impl ContentRecordRegistry for InMemoryRegistry {
    fn create(&self, new: NewContentRecord) -> RegistryResult<ContentRecord> {
        let record = new.into_record();

        let mut idx = self.write()?;

        debug_assert!(!idx.by_id.contains_key(&record.id), "duplicate record id");
        idx.by_address
            .entry(record.content_address.clone())
            .or_default()
            .push(record.id.clone());
        idx.by_owner
            .entry(record.owner_identity)
            .or_default()
            .push(record.id.clone());
        idx.by_id.insert(record.id.clone(), record.clone());

        Ok(record)
    }

    fn find_by_id(&self, id: &str) -> RegistryResult<Option<ContentRecord>> {
        let idx = self.read()?;
        Ok(idx.by_id.get(id).cloned())
    }

    fn find_by_content_address(&self, content_address: &str) -> RegistryResult<Option<ContentRecord>> {
        let idx = self.read()?;
        Ok(idx
            .by_address
            .get(content_address)
            .and_then(|ids| ids.first())
            .and_then(|id| idx.by_id.get(id))
            .cloned())
    }

    fn list_by_content_address(&self, content_address: &str) -> RegistryResult<Vec<ContentRecord>> {
        let idx = self.read()?;
        Ok(idx.resolve(idx.by_address.get(content_address)))
    }

    fn list_by_owner(&self, owner: &str) -> RegistryResult<Vec<ContentRecord>> {
        let Ok(owner) = Address::parse(owner) else {
            return Ok(Vec::new());
        };
        let idx = self.read()?;
        Ok(idx.resolve(idx.by_owner.get(&owner)))
    }

    fn len(&self) -> RegistryResult<usize> {
        Ok(self.read()?.by_id.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

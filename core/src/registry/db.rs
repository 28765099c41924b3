//! # SledRegistry — Persistent Record Store
//!
//! The registry contract on top of sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree         | Key                                 | Value                    |
//! |--------------|-------------------------------------|--------------------------|
//! | `records`    | record id (UTF-8)                   | `bincode(ContentRecord)` |
//! | `by_address` | content address, `0x00`, seq (8B BE) | record id                |
//! | `by_owner`   | owner (20B), seq (8B BE)            | record id                |
//!
//! `seq` comes from sled's monotonic id generator, so a prefix scan over an
//! index returns records in creation order. The `0x00` separator keeps
//! `bafyab` from matching a scan for `bafya`; content addresses are
//! alphanumeric and never contain it.
//!
//! ## Atomicity
//!
//! A `create` writes the record and both index entries in one multi-tree
//! sled transaction. Either all three land or none do.
//!
//! `Tree::len` walks the whole tree, so the record count is read once at
//! open and then kept in memory, bumped after each committed create.

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{ContentRecord, ContentRecordRegistry, NewContentRecord, RegistryError, RegistryResult};
use crate::identity::Address;

/// Persistent registry backed by sled.
///
/// Cheap to clone; clones share the same database handle and record count.
#[derive(Debug, Clone)]
pub struct SledRegistry {
    db: Db,
    records: Tree,
    by_address: Tree,
    by_owner: Tree,
    count: Arc<AtomicUsize>,
}

impl SledRegistry {
    /// Open or create a registry at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> RegistryResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A registry that lives in a temporary directory and is removed on drop.
    pub fn open_temporary() -> RegistryResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> RegistryResult<Self> {
        let records = db.open_tree("records")?;
        let by_address = db.open_tree("by_address")?;
        let by_owner = db.open_tree("by_owner")?;
        let count = Arc::new(AtomicUsize::new(records.len()));

        Ok(Self {
            db,
            records,
            by_address,
            by_owner,
            count,
        })
    }

    /// Look up the record an index entry points at. A dangling entry is
    /// logged and skipped; creates never leave one behind, so seeing it
    /// means the trees were edited outside this type.
    fn resolve(&self, id: &[u8]) -> RegistryResult<Option<ContentRecord>> {
        match self.records.get(id)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => {
                tracing::error!(
                    id = %String::from_utf8_lossy(id),
                    "index entry points at a missing record"
                );
                Ok(None)
            }
        }
    }

    /// Records behind every index entry under `prefix`, in key order.
    fn scan_index<'a>(
        &'a self,
        index: &Tree,
        prefix: &[u8],
    ) -> impl Iterator<Item = RegistryResult<ContentRecord>> + 'a {
        index
            .scan_prefix(prefix)
            .filter_map(move |entry| match entry {
                Ok((_key, id)) => self.resolve(&id).transpose(),
                Err(e) => Some(Err(e.into())),
            })
    }
}

impl ContentRecordRegistry for SledRegistry {
    fn create(&self, new: NewContentRecord) -> RegistryResult<ContentRecord> {
        debug_assert!(!new.content_address.as_bytes().contains(&0));

        let record = new.into_record();
        let seq = self.db.generate_id()?;
        let value = encode(&record)?;
        let address_key = address_key(&record.content_address, seq);
        let owner_key = owner_key(&record.owner_identity, seq);
        let id = record.id.as_bytes();

        (&self.records, &self.by_address, &self.by_owner)
            .transaction(|(records, by_address, by_owner)| {
                records.insert(id, value.as_slice())?;
                by_address.insert(address_key.as_slice(), id)?;
                by_owner.insert(owner_key.as_slice(), id)?;
                Ok::<_, ConflictableTransactionError<()>>(())
            })
            .map_err(|e| match e {
                TransactionError::Storage(e) => RegistryError::Sled(e),
                TransactionError::Abort(()) => {
                    RegistryError::Serialization("record transaction aborted".into())
                }
            })?;

        self.count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(id = %record.id, seq, "record persisted");
        Ok(record)
    }

    fn find_by_id(&self, id: &str) -> RegistryResult<Option<ContentRecord>> {
        match self.records.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn find_by_content_address(&self, content_address: &str) -> RegistryResult<Option<ContentRecord>> {
        self.scan_index(&self.by_address, &address_prefix(content_address))
            .next()
            .transpose()
    }

    fn list_by_content_address(&self, content_address: &str) -> RegistryResult<Vec<ContentRecord>> {
        self.scan_index(&self.by_address, &address_prefix(content_address))
            .collect()
    }

    fn list_by_owner(&self, owner: &str) -> RegistryResult<Vec<ContentRecord>> {
        match Address::parse(owner) {
            Ok(owner) => self.scan_index(&self.by_owner, owner.as_bytes()).collect(),
            Err(_) => Ok(Vec::new()),
        }
    }

    fn len(&self) -> RegistryResult<usize> {
        Ok(self.count.load(Ordering::Relaxed))
    }

    /// Blocks until every created record is durable on disk.
    fn flush(&self) -> RegistryResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sled"
    }
}

// ---------------------------------------------------------------------------
// Keys & Encoding
// ---------------------------------------------------------------------------

fn address_prefix(content_address: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(content_address.len() + 1);
    key.extend_from_slice(content_address.as_bytes());
    key.push(0);
    key
}

fn address_key(content_address: &str, seq: u64) -> Vec<u8> {
    let mut key = address_prefix(content_address);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn owner_key(owner: &Address, seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(20 + 8);
    key.extend_from_slice(owner.as_bytes());
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn encode(record: &ContentRecord) -> RegistryResult<Vec<u8>> {
    bincode::serialize(record).map_err(|e| RegistryError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> RegistryResult<ContentRecord> {
    bincode::deserialize(bytes).map_err(|e| RegistryError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

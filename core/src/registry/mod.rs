//! # Content Record Registry
//!
//! Who recorded what. A [`ContentRecord`] ties a content address (an IPFS
//! CID the client already uploaded) to the wallet that proved ownership of
//! it, along with the signed message that proved it.
//!
//! ## Indexes
//!
//! ```text
//! by id              id              -> record
//! by content address content_address -> [id, ...]   (insertion order)
//! by owner           owner address   -> [id, ...]   (insertion order)
//! ```
//!
//! All three are updated together on `create` and are never observed out of
//! sync by readers. Content addresses are not unique: the same CID can be
//! recorded by many wallets, and by the same wallet twice.
//!
//! ## Backends
//!
//! ```text
//! memory.rs — InMemoryRegistry: one RwLock over all three indexes
//! db.rs     — SledRegistry: three sled trees, one transaction per create
//! ```
//!
//! Records are append-only: no update, no delete.

pub mod db;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::gateway_url;
use crate::identity::Address;

pub use db::SledRegistry;
pub use memory::InMemoryRegistry;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors from a registry backend.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("registry lock not acquired within {0:?}")]
    LockTimeout(std::time::Duration),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A wallet's claim on a piece of content-addressed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    /// Opaque unique id: `<owner>-<uuid>`.
    pub id: String,
    /// Human label chosen by the uploader (usually the project name).
    pub display_name: String,
    /// CID of the uploaded payload.
    pub content_address: String,
    /// Recovered signer. Always the lowercase canonical address.
    pub owner_identity: Address,
    /// The message that was signed, kept as an audit trail.
    pub proof_message: String,
    /// The signature over `proof_message`.
    pub proof_signature: String,
    /// Number of files (or other units) in the upload.
    pub unit_count: u64,
    pub created_at: DateTime<Utc>,
}

impl ContentRecord {
    /// Public gateway URL for the recorded content.
    pub fn gateway_url(&self) -> String {
        gateway_url(&self.content_address)
    }

    pub fn is_owned_by(&self, identity: &Address) -> bool {
        self.owner_identity == *identity
    }
}

/// Everything `create` needs from the caller. The registry assigns id and
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContentRecord {
    pub display_name: String,
    pub content_address: String,
    pub owner_identity: Address,
    pub proof_message: String,
    pub proof_signature: String,
    pub unit_count: u64,
}

impl NewContentRecord {
    /// Stamp this draft with a fresh id and the current time.
    fn into_record(self) -> ContentRecord {
        ContentRecord {
            id: new_record_id(&self.owner_identity),
            display_name: self.display_name,
            content_address: self.content_address,
            owner_identity: self.owner_identity,
            proof_message: self.proof_message,
            proof_signature: self.proof_signature,
            unit_count: self.unit_count,
            created_at: Utc::now(),
        }
    }
}

/// `<owner>-<random suffix>`. The owner prefix keeps ids readable in logs;
/// the v4 UUID keeps them unique even for simultaneous creates.
fn new_record_id(owner: &Address) -> String {
    format!("{}-{}", owner, Uuid::new_v4().simple())
}

// ---------------------------------------------------------------------------
// Registry Contract
// ---------------------------------------------------------------------------

/// The storage contract every registry backend satisfies.
///
/// Implementations must make a created record visible in all three indexes
/// at once: a reader that finds it by id must also find it by content
/// address and by owner, and vice versa.
pub trait ContentRecordRegistry: Send + Sync {
    /// Insert a new record. Always succeeds for well-formed input unless the
    /// backend itself fails.
    fn create(&self, new: NewContentRecord) -> RegistryResult<ContentRecord>;

    fn find_by_id(&self, id: &str) -> RegistryResult<Option<ContentRecord>>;

    /// The earliest record for `content_address`, if any.
    ///
    /// With duplicates present this is only one of several valid answers;
    /// use [`list_by_content_address`](Self::list_by_content_address) when
    /// all of them matter.
    fn find_by_content_address(&self, content_address: &str) -> RegistryResult<Option<ContentRecord>> {
        Ok(self
            .list_by_content_address(content_address)?
            .into_iter()
            .next())
    }

    /// Every record for `content_address`, oldest first.
    fn list_by_content_address(&self, content_address: &str) -> RegistryResult<Vec<ContentRecord>>;

    /// Every record owned by `owner`, oldest first. Matching is
    /// case-insensitive; a string that is not an address owns nothing.
    fn list_by_owner(&self, owner: &str) -> RegistryResult<Vec<ContentRecord>>;

    /// Total number of records. Fails like any other read when the
    /// backend cannot be reached in time.
    fn len(&self) -> RegistryResult<usize>;

    fn is_empty(&self) -> RegistryResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Make all created records durable. No-op for volatile backends.
    fn flush(&self) -> RegistryResult<()> {
        Ok(())
    }

    /// Backend name for status output and logs.
    fn backend(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Shared contract tests
// ---------------------------------------------------------------------------

/// Behavior every backend must share. Each backend's test module runs these
/// against a fresh instance.
#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    pub fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    pub fn draft(owner: Address, cid: &str) -> NewContentRecord {
        NewContentRecord {
            display_name: format!("project-{cid}"),
            content_address: cid.to_string(),
            owner_identity: owner,
            proof_message: "msg".into(),
            proof_signature: "0xsig".into(),
            unit_count: 3,
        }
    }

    pub fn create_then_find_by_every_index(reg: &dyn ContentRecordRegistry) {
        let rec = reg.create(draft(addr(0xaa), "bafyone")).unwrap();

        assert!(rec.id.starts_with(&addr(0xaa).to_string()));
        assert_eq!(reg.find_by_id(&rec.id).unwrap(), Some(rec.clone()));
        assert_eq!(
            reg.find_by_content_address("bafyone").unwrap(),
            Some(rec.clone())
        );
        assert_eq!(reg.list_by_owner(&addr(0xaa).to_string()).unwrap(), vec![rec]);
        assert_eq!(reg.len().unwrap(), 1);
    }

    pub fn missing_lookups_are_empty(reg: &dyn ContentRecordRegistry) {
        assert!(reg.is_empty().unwrap());
        assert_eq!(reg.find_by_id("nope").unwrap(), None);
        assert_eq!(reg.find_by_content_address("bafynothing").unwrap(), None);
        assert!(reg.list_by_content_address("bafynothing").unwrap().is_empty());
        assert!(reg.list_by_owner(&addr(1).to_string()).unwrap().is_empty());
        assert!(reg.list_by_owner("not-an-address").unwrap().is_empty());
    }

    pub fn duplicates_keep_insertion_order(reg: &dyn ContentRecordRegistry) {
        let first = reg.create(draft(addr(0x01), "bafydup")).unwrap();
        let second = reg.create(draft(addr(0x02), "bafydup")).unwrap();
        let third = reg.create(draft(addr(0x01), "bafydup")).unwrap();

        assert_ne!(first.id, third.id);
        assert_eq!(
            reg.find_by_content_address("bafydup").unwrap().unwrap().id,
            first.id
        );
        let ids: Vec<_> = reg
            .list_by_content_address("bafydup")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![first.id.clone(), second.id, third.id.clone()]);

        let owned: Vec<_> = reg
            .list_by_owner(&addr(0x01).to_string())
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(owned, vec![first.id, third.id]);
    }

    pub fn owner_lookup_ignores_case(reg: &dyn ContentRecordRegistry) {
        let owner: Address = "0xABCDEFabcdefABCDEFabcdefABCDEFabcdefABCD".parse().unwrap();
        reg.create(draft(owner, "bafycase")).unwrap();

        assert_eq!(
            reg.list_by_owner("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd")
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            reg.list_by_owner("0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD")
                .unwrap()
                .len(),
            1
        );
    }

    pub fn concurrent_creates_lose_nothing(reg: Arc<dyn ContentRecordRegistry>) {
        const THREADS: u8 = 8;
        const PER_THREAD: usize = 25;

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|i| {
                            // Owners alternate so each owner gets K = 4 * 25 records.
                            let owner = addr(t % 2);
                            reg.create(draft(owner, &format!("bafy{t}x{i}")))
                                .unwrap()
                                .id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = THREADS as usize * PER_THREAD;

        assert_eq!(ids.len(), total);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), total);
        for id in &ids {
            assert!(reg.find_by_id(id).unwrap().is_some(), "lost {id}");
        }
        assert_eq!(reg.len().unwrap(), total);

        for owner in [addr(0), addr(1)] {
            let owned = reg.list_by_owner(&owner.to_string()).unwrap();
            assert_eq!(owned.len(), total / 2);
            let unique: HashSet<_> = owned.iter().map(|r| r.id.clone()).collect();
            assert_eq!(unique.len(), owned.len());
        }
    }
}

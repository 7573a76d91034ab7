//! Store abstraction and delta-record keyspace
//!
//! [`StateStore`] is the narrow surface this component requires from the
//! external transactional store. Every implementation represents one unit of
//! work inside an ambient transaction supplied by the caller; this layer
//! manages no transactions and performs no retries.
//!
//! [`DeltaStore`] is a thin wrapper scoped to the delta-record keyspace: it
//! owns the composite index layout and the backup-key derivation, so the
//! aggregation and compaction layers never touch raw keys directly.

use crate::error::{Error, Result};
use crate::keys;
use crate::types::Operation;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Composite index shared by every delta record key.
///
/// All information needed for aggregation lives in the key itself; the
/// stored payload is a single sentinel byte. This is what lets prefix scans
/// serve reads without a secondary index.
pub const DELTA_INDEX: &str = "variable~subkey~op~value~uid";

/// Sentinel payload stored under every delta key.
pub const DELTA_SENTINEL: [u8; 1] = [0x00];

/// One item yielded by a [`Scan`].
pub type ScanItem = Result<(Vec<u8>, Vec<u8>)>;

/// Forward-only, single-pass cursor over a key range.
///
/// The cursor is released when the scan is dropped; [`Scan::close`] exists
/// for early exits where the release should be explicit in the source.
pub struct Scan<'a> {
    inner: Box<dyn Iterator<Item = ScanItem> + 'a>,
}

impl<'a> Scan<'a> {
    /// Wrap an iterator of key/value results.
    pub fn new(inner: impl Iterator<Item = ScanItem> + 'a) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Release the cursor before exhaustion.
    pub fn close(self) {}
}

impl Iterator for Scan<'_> {
    type Item = ScanItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl std::fmt::Debug for Scan<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scan").finish_non_exhaustive()
    }
}

/// Capabilities required from the external transactional store.
///
/// All calls execute inside the caller's ambient transaction; atomicity of a
/// public operation is whatever that transaction provides.
pub trait StateStore {
    /// Write a key/value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Read a key; `None` when absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Lazy forward scan over all keys starting with `prefix`, in ascending
    /// key order. Restartable only by issuing a new scan.
    fn scan_prefix<'a>(&'a self, prefix: &[u8]) -> Result<Scan<'a>>;

    /// Identifier unique per unit of work across all concurrent writers.
    ///
    /// Used as the final field of every delta key, which is what lets
    /// disjoint inserts commit without ever colliding on a write.
    fn unique_id(&self) -> String;
}

/// One decoded delta record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaRecord {
    /// Top-level grouping of the counter
    pub namespace: String,
    /// Counter instance within the namespace
    pub sub_key: String,
    /// Signed update operation
    pub operation: Operation,
    /// Delta value exactly as written
    pub value_text: String,
    /// Writer-unique suffix that made this key collision-free
    pub unique_id: String,
}

impl DeltaRecord {
    /// Decode a delta record from its composite key.
    pub fn decode(key: &[u8]) -> Result<Self> {
        let (object_type, attrs) = keys::decode_composite(key)?;
        if object_type != DELTA_INDEX || attrs.len() != 5 {
            return Err(Error::Key(format!(
                "unexpected delta key layout: {object_type} with {} attributes",
                attrs.len()
            )));
        }
        let mut attrs = attrs.into_iter();
        // Field order mirrors the index name: namespace, sub-key, op, value, uid
        let namespace = attrs.next().unwrap_or_default();
        let sub_key = attrs.next().unwrap_or_default();
        let operation = attrs.next().unwrap_or_default().parse::<Operation>()?;
        let value_text = attrs.next().unwrap_or_default();
        let unique_id = attrs.next().unwrap_or_default();

        Ok(Self {
            namespace,
            sub_key,
            operation,
            value_text,
            unique_id,
        })
    }

    /// Parse the stored value text.
    pub fn value(&self) -> Result<f64> {
        self.value_text
            .parse::<f64>()
            .map_err(|e| Error::ValueParse(format!("{}: {e}", self.value_text)))
    }
}

/// Thin wrapper over a [`StateStore`], scoped to the delta keyspace.
#[derive(Debug)]
pub struct DeltaStore<'a, S: StateStore> {
    store: &'a S,
}

impl<'a, S: StateStore> DeltaStore<'a, S> {
    /// Scope a store handle to the delta keyspace.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Write one new delta record, keyed with the store's unique ID.
    ///
    /// Delta keys are write-once, so no read-before-write is needed.
    pub fn insert_delta(
        &self,
        namespace: &str,
        sub_key: &str,
        operation: Operation,
        value_text: &str,
    ) -> Result<()> {
        let uid = self.store.unique_id();
        let key = keys::encode_composite(
            DELTA_INDEX,
            &[namespace, sub_key, operation.as_str(), value_text, &uid],
        )?;
        self.store
            .put(&key, &DELTA_SENTINEL)
            .map_err(|e| Error::storage_for(namespace, Some(sub_key), e))?;

        tracing::debug!(namespace, sub_key, %operation, value = value_text, "delta recorded");
        Ok(())
    }

    /// Scan all delta records for a namespace, or for one exact pair when
    /// `sub_key` is given.
    pub fn scan(&self, namespace: &str, sub_key: Option<&str>) -> Result<Scan<'a>> {
        let prefix = match sub_key {
            Some(sub) => keys::encode_composite(DELTA_INDEX, &[namespace, sub])?,
            None => keys::encode_composite(DELTA_INDEX, &[namespace])?,
        };
        self.store
            .scan_prefix(&prefix)
            .map_err(|e| Error::storage_for(namespace, sub_key, e))
    }

    /// Delete one delta record by key.
    pub fn delete_key(&self, key: &[u8]) -> Result<()> {
        self.store.delete(key)
    }

    /// Derived key holding the transient pre-prune aggregate.
    pub fn backup_key(namespace: &str, sub_key: &str) -> Vec<u8> {
        format!("{namespace}_{sub_key}_PRUNE_BACKUP").into_bytes()
    }

    /// Persist the pre-prune aggregate to the backup key.
    pub fn put_backup(&self, namespace: &str, sub_key: &str, value: f64) -> Result<()> {
        let key = Self::backup_key(namespace, sub_key);
        self.store
            .put(&key, format!("{value}").as_bytes())
            .map_err(|e| Error::storage_for(namespace, Some(sub_key), e))
    }

    /// Read the backup record, if one exists.
    pub fn read_backup(&self, namespace: &str, sub_key: &str) -> Result<Option<f64>> {
        let key = Self::backup_key(namespace, sub_key);
        match self.store.get(&key)? {
            None => Ok(None),
            Some(raw) => {
                let text = String::from_utf8(raw)
                    .map_err(|e| Error::Storage(format!("corrupt backup record: {e}")))?;
                let value = text
                    .parse::<f64>()
                    .map_err(|e| Error::ValueParse(format!("{text}: {e}")))?;
                Ok(Some(value))
            }
        }
    }

    /// Remove the backup record.
    pub fn delete_backup(&self, namespace: &str, sub_key: &str) -> Result<()> {
        self.store.delete(&Self::backup_key(namespace, sub_key))
    }
}

/// Ordered in-memory state store.
///
/// Useful for embedding and tests; each call is its own unit of work, so
/// unique IDs are freshly generated UUIDv7 values. Scans snapshot the
/// matching range at open, which keeps the cursor stable while the caller
/// deletes records mid-scan.
#[derive(Debug, Default)]
pub struct MemStore {
    cells: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of live records, across all keyspaces.
    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }
}

impl StateStore for MemStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.cells.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.cells.read().get(key).cloned())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.cells.write().remove(key);
        Ok(())
    }

    fn scan_prefix<'a>(&'a self, prefix: &[u8]) -> Result<Scan<'a>> {
        let cells = self.cells.read();
        let items: Vec<ScanItem> = cells
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| Ok((k.clone(), v.clone())))
            .collect();
        Ok(Scan::new(items.into_iter()))
    }

    fn unique_id(&self) -> String {
        uuid::Uuid::now_v7().simple().to_string()
    }
}

//! RocksDB-backed state store
//!
//! [`RocksStore`] wraps an optimistic-transaction RocksDB instance: the same
//! validate-at-commit concurrency model the delta-ledger design assumes of
//! its external store. [`RocksStore::begin`] opens one unit of work; the
//! resulting [`RocksTxn`] implements [`StateStore`] and commits or rolls
//! back explicitly. Concurrent transactions that touch overlapping keys are
//! rejected at commit time, while inserts on disjoint delta keys commit
//! independently.

use crate::config::Config;
use crate::error::Result;
use crate::store::{Scan, StateStore};
use rocksdb::{Direction, IteratorMode, OptimisticTransactionDB, Options, Transaction};
use uuid::Uuid;

/// RocksDB store with optimistic concurrency control.
pub struct RocksStore {
    db: OptimisticTransactionDB,
}

impl RocksStore {
    /// Open or create the database under `config.data_dir`.
    pub fn open(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let db = OptimisticTransactionDB::open(&opts, &config.data_dir)?;

        tracing::info!(path = ?config.data_dir, "opened RocksDB state store");
        Ok(Self { db })
    }

    /// Begin one unit of work.
    pub fn begin(&self) -> RocksTxn<'_> {
        RocksTxn {
            txn: self.db.transaction(),
            txn_id: Uuid::now_v7().simple().to_string(),
        }
    }
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore").finish_non_exhaustive()
    }
}

/// One ambient transaction over a [`RocksStore`].
pub struct RocksTxn<'db> {
    txn: Transaction<'db, OptimisticTransactionDB>,
    txn_id: String,
}

impl RocksTxn<'_> {
    /// Transaction identifier; also the unique key suffix for inserts made
    /// in this unit of work.
    pub fn id(&self) -> &str {
        &self.txn_id
    }

    /// Commit all writes. Fails if a concurrent transaction touched an
    /// overlapping key first.
    pub fn commit(self) -> Result<()> {
        self.txn.commit()?;
        Ok(())
    }

    /// Discard all writes.
    pub fn rollback(self) -> Result<()> {
        self.txn.rollback()?;
        Ok(())
    }
}

impl std::fmt::Debug for RocksTxn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksTxn")
            .field("txn_id", &self.txn_id)
            .finish_non_exhaustive()
    }
}

impl StateStore for RocksTxn<'_> {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.txn.put(key, value)?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.txn.get(key)?)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.txn.delete(key)?;
        Ok(())
    }

    fn scan_prefix<'a>(&'a self, prefix: &[u8]) -> Result<Scan<'a>> {
        let bound = prefix.to_vec();
        let iter = self
            .txn
            .iterator(IteratorMode::From(&bound, Direction::Forward));

        // The raw iterator runs to the end of the keyspace; cut it off at
        // the first key outside the prefix.
        let items = iter
            .map(|entry| {
                entry
                    .map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(crate::Error::from)
            })
            .take_while(move |item| match item {
                Ok((key, _)) => key.starts_with(&bound),
                Err(_) => true,
            });

        Ok(Scan::new(items))
    }

    fn unique_id(&self) -> String {
        self.txn_id.clone()
    }
}

//! High-throughput delta ledger
//!
//! An accounting primitive for transactional, ordered key-value stores with
//! optimistic write validation. Instead of updating one hot row, every
//! update to a logical counter is written as an independent, uniquely-keyed
//! delta record; reads fold the live deltas into an aggregate, and periodic
//! pruning compacts the delta set back down to one record per variable.
//!
//! # Architecture
//!
//! - **Conflict avoidance**: concurrent inserts write disjoint keys, so the
//!   store never observes a write-write conflict between them
//! - **Lazy aggregation**: the value of a variable is the fold of its delta
//!   records, computed at read time
//! - **Two-tier compaction**: a cheap single-pass prune with a documented
//!   loss window, and a crash-tolerant three-phase prune that stages the
//!   aggregate in a backup record first
//!
//! # Invariants
//!
//! - Compaction never changes a variable's logical value, only its record
//!   count
//! - Delta keys are write-once; insert never reads before writing
//! - After a successful prune, exactly one delta record remains per pruned
//!   sub-key

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod aggregate;
pub mod compact;
pub mod config;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod rocks;
pub mod service;
pub mod store;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use rocks::{RocksStore, RocksTxn};
pub use service::{Response, VariableService};
pub use store::{DeltaRecord, DeltaStore, MemStore, Scan, StateStore};
pub use types::{AggregateTable, Operation, PruneType};

//! Two-tier compaction
//!
//! Pruning replaces many delta records with one equivalent record per
//! sub-key. Two protocols are offered with different safety/performance
//! trade-offs:
//!
//! - **Fast** folds and deletes in a single pass, then writes the
//!   replacement rows. A stop between those phases loses the value for any
//!   sub-key whose rows are already gone. This is the documented contract of
//!   fast pruning, not a defect to work around.
//! - **Safe** stages the aggregate in a backup record before touching any
//!   delta row, so the last-known-correct value survives a stop at any
//!   point. Recovery from an orphaned backup is a manual operational action;
//!   [`pending_backup`] exposes the record for inspection but nothing here
//!   restores it automatically.
//!
//! Namespace-wide pruning runs the chosen protocol once per distinct sub-key
//! discovered in the scan.

use crate::aggregate;
use crate::error::{Error, Result};
use crate::store::{DeltaRecord, DeltaStore, StateStore};
use crate::types::{AggregateTable, Operation, PruneType};
use std::fmt;

/// Phase labels used in logs and failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrunePhase {
    /// Fast prune: folding and deleting rows in one pass
    Scanning,
    /// Fast prune: writing replacement rows
    Finalizing,
    /// Safe prune: persisting the aggregate to the backup key
    Backup,
    /// Safe prune: deleting the original rows
    Delete,
    /// Safe prune: writing the replacement row and dropping the backup
    Finalize,
}

impl fmt::Display for PrunePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PrunePhase::Scanning => "scanning",
            PrunePhase::Finalizing => "finalizing",
            PrunePhase::Backup => "backup",
            PrunePhase::Delete => "delete",
            PrunePhase::Finalize => "finalize",
        };
        write!(f, "{label}")
    }
}

/// Result of a prune pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PruneOutcome {
    /// Pre-prune aggregate per sub-key, in ascending sub-key order
    pub totals: AggregateTable,
    /// Number of delta records that were compacted away
    pub records: usize,
}

/// Run the selected prune protocol over a namespace or one exact pair.
pub fn prune<S: StateStore>(
    store: &S,
    namespace: &str,
    sub_key: Option<&str>,
    prune_type: PruneType,
) -> Result<PruneOutcome> {
    match prune_type {
        PruneType::Fast => prune_fast(store, namespace, sub_key),
        PruneType::Safe => prune_safe(store, namespace, sub_key),
    }
}

/// Single-pass destructive prune.
///
/// Scanning folds each record into a per-sub-key accumulator and deletes it
/// immediately; Finalizing then writes one `Add` record per sub-key. Rows
/// deleted before a Finalizing failure are unrecoverable, which is surfaced
/// as [`Error::PartialPrune`].
fn prune_fast<S: StateStore>(
    store: &S,
    namespace: &str,
    sub_key: Option<&str>,
) -> Result<PruneOutcome> {
    let deltas = DeltaStore::new(store);

    let mut totals = AggregateTable::new();
    let mut records = 0usize;
    {
        let scan = deltas.scan(namespace, sub_key)?;
        for item in scan {
            let (key, _) = item?;
            let record = DeltaRecord::decode(&key)?;
            let value = record.value()?;
            let acc = totals.entry(record.sub_key).or_insert(0.0);
            *acc = record.operation.apply(*acc, value);
            deltas
                .delete_key(&key)
                .map_err(|e| Error::storage_for(namespace, sub_key, e))?;
            records += 1;
        }
    }

    if records == 0 {
        return Err(Error::not_found(namespace, sub_key));
    }
    tracing::debug!(
        namespace,
        ?sub_key,
        records,
        phase = %PrunePhase::Scanning,
        "delta rows folded and deleted"
    );

    for (sub, value) in &totals {
        deltas
            .insert_delta(namespace, sub, Operation::Add, &format!("{value}"))
            .map_err(|e| Error::PartialPrune {
                namespace: namespace.to_string(),
                sub_key: sub.clone(),
                value: *value,
                message: e.to_string(),
            })?;
    }

    tracing::info!(
        namespace,
        ?sub_key,
        records,
        groups = totals.len(),
        phase = %PrunePhase::Finalizing,
        "fast prune complete"
    );
    Ok(PruneOutcome { totals, records })
}

/// Crash-tolerant three-phase prune, run per sub-key.
///
/// If execution stops after Backup but before Finalize completes, the backup
/// key still holds the last-known-correct aggregate for manual recovery.
fn prune_safe<S: StateStore>(
    store: &S,
    namespace: &str,
    sub_key: Option<&str>,
) -> Result<PruneOutcome> {
    let deltas = DeltaStore::new(store);

    // Non-destructive aggregate first; NotFound propagates when the
    // namespace or pair never existed.
    let totals = aggregate::fold_all(store, namespace, sub_key)?;

    let mut records = 0usize;
    for (sub, value) in &totals {
        deltas.put_backup(namespace, sub, *value)?;
        tracing::debug!(namespace, sub_key = %sub, value, phase = %PrunePhase::Backup, "aggregate backed up");

        {
            let scan = deltas.scan(namespace, Some(sub.as_str()))?;
            for item in scan {
                let (key, _) = item?;
                deltas
                    .delete_key(&key)
                    .map_err(|e| Error::storage_for(namespace, Some(sub.as_str()), e))?;
                records += 1;
            }
        }

        deltas
            .insert_delta(namespace, sub, Operation::Add, &format!("{value}"))
            .map_err(|e| {
                Error::Storage(format!(
                    "{namespace}/{sub}: could not write replacement row after pruning, \
                     backup retained at {namespace}_{sub}_PRUNE_BACKUP: {e}"
                ))
            })?;
        deltas.delete_backup(namespace, sub)?;
        tracing::debug!(namespace, sub_key = %sub, phase = %PrunePhase::Finalize, "replacement row written");
    }

    tracing::info!(
        namespace,
        ?sub_key,
        records,
        groups = totals.len(),
        "safe prune complete"
    );
    Ok(PruneOutcome { totals, records })
}

/// Aggregate held by an orphaned prune backup, if one exists.
///
/// A backup left behind by an interrupted safe prune is never restored
/// automatically; this accessor lets operators inspect it before discarding
/// the half-finished prune by hand.
pub fn pending_backup<S: StateStore>(
    store: &S,
    namespace: &str,
    sub_key: &str,
) -> Result<Option<f64>> {
    DeltaStore::new(store).read_backup(namespace, sub_key)
}

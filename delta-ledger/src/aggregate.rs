//! Delta aggregation
//!
//! The logical value of a variable is the fold of its live delta records in
//! ascending key order. Add and Sub commute over the reals, so the result is
//! order-independent up to floating-point rounding; callers comparing
//! aggregates across prunes should use a tolerance.

use crate::error::{Error, Result};
use crate::store::{DeltaRecord, DeltaStore, StateStore};
use crate::types::AggregateTable;

/// Aggregate value of one exact (namespace, sub-key) pair.
///
/// Fails with `NotFound` when the pair has no live delta records.
pub fn fold_one<S: StateStore>(store: &S, namespace: &str, sub_key: &str) -> Result<f64> {
    let totals = fold_all(store, namespace, Some(sub_key))?;
    totals
        .get(sub_key)
        .copied()
        .ok_or_else(|| Error::not_found(namespace, Some(sub_key)))
}

/// Aggregate every sub-key under a namespace, or one exact pair when
/// `sub_key` is given.
///
/// Records are grouped by the sub-key decoded from each composite key and
/// folded with an accumulator seeded at zero. Fails with `NotFound` when the
/// scan yields no records at all.
pub fn fold_all<S: StateStore>(
    store: &S,
    namespace: &str,
    sub_key: Option<&str>,
) -> Result<AggregateTable> {
    let deltas = DeltaStore::new(store);
    let scan = deltas.scan(namespace, sub_key)?;

    let mut totals = AggregateTable::new();
    let mut records = 0usize;
    for item in scan {
        let (key, _) = item?;
        let record = DeltaRecord::decode(&key)?;
        let value = record.value()?;
        let acc = totals.entry(record.sub_key).or_insert(0.0);
        *acc = record.operation.apply(*acc, value);
        records += 1;
    }

    if records == 0 {
        return Err(Error::not_found(namespace, sub_key));
    }

    tracing::debug!(namespace, ?sub_key, records, groups = totals.len(), "deltas folded");
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use crate::types::Operation;

    fn seed(store: &MemStore, sub_key: &str, deltas: &[(Operation, &str)]) {
        let delta_store = DeltaStore::new(store);
        for (op, value) in deltas {
            delta_store
                .insert_delta("Merchant", sub_key, *op, value)
                .unwrap();
        }
    }

    #[test]
    fn test_fold_one_sums_deltas() {
        let store = MemStore::new();
        seed(
            &store,
            "1234567890",
            &[(Operation::Add, "100"), (Operation::Sub, "99")],
        );

        let value = fold_one(&store, "Merchant", "1234567890").unwrap();
        assert!((value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fold_one_missing_is_not_found() {
        let store = MemStore::new();
        assert!(matches!(
            fold_one(&store, "ahihi", "123"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_fold_all_groups_by_sub_key() {
        let store = MemStore::new();
        seed(&store, "A", &[(Operation::Add, "10"), (Operation::Add, "5")]);
        seed(&store, "B", &[(Operation::Sub, "3")]);

        let totals = fold_all(&store, "Merchant", None).unwrap();
        assert_eq!(totals.len(), 2);
        assert!((totals["A"] - 15.0).abs() < 1e-9);
        assert!((totals["B"] + 3.0).abs() < 1e-9);

        // Ordered output: sub-keys ascending
        let keys: Vec<&String> = totals.keys().collect();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[test]
    fn test_fold_all_empty_namespace_is_not_found() {
        let store = MemStore::new();
        assert!(matches!(
            fold_all(&store, "Merchant", None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_fold_does_not_cross_namespaces() {
        let store = MemStore::new();
        seed(&store, "A", &[(Operation::Add, "10")]);
        let other = DeltaStore::new(&store);
        other
            .insert_delta("User", "A", Operation::Add, "999")
            .unwrap();

        let totals = fold_all(&store, "Merchant", None).unwrap();
        assert_eq!(totals.len(), 1);
        assert!((totals["A"] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_idempotent_read() {
        let store = MemStore::new();
        seed(&store, "A", &[(Operation::Add, "1.25"), (Operation::Sub, "0.75")]);

        let first = fold_one(&store, "Merchant", "A").unwrap();
        let second = fold_one(&store, "Merchant", "A").unwrap();
        assert_eq!(first, second);
    }
}

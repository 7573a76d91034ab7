//! Property-based tests for delta-ledger invariants
//!
//! - Fold correctness: Get returns the signed sum of all inserted deltas
//! - Compaction neutrality: pruning never changes a variable's value
//! - Key codec: encode/decode round-trips and prefixes stay contiguous
//!
//! Aggregates are floats folded in key order, which embeds the unique ID
//! rather than insertion order; comparisons therefore use a tolerance.

use delta_ledger::{
    aggregate, compact, keys, DeltaStore, MemStore, Operation, PruneType, VariableService,
};
use proptest::prelude::*;

const EPSILON: f64 = 1e-6;

/// Strategy for one signed delta: operation plus a value in cents.
fn delta_strategy() -> impl Strategy<Value = (Operation, u32)> {
    (
        prop_oneof![Just(Operation::Add), Just(Operation::Sub)],
        0u32..1_000_000,
    )
}

/// Strategy for NUL-free identity fields.
fn field_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.-]{1,16}"
}

fn cents_to_text(cents: u32) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

fn signed_sum(deltas: &[(Operation, u32)]) -> f64 {
    deltas.iter().fold(0.0, |acc, (op, cents)| {
        op.apply(acc, f64::from(*cents) / 100.0)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: Get returns the signed sum of every inserted delta.
    #[test]
    fn prop_fold_matches_signed_sum(deltas in prop::collection::vec(delta_strategy(), 1..40)) {
        let store = MemStore::new();
        let delta_store = DeltaStore::new(&store);

        for (op, cents) in &deltas {
            delta_store
                .insert_delta("Merchant", "1", *op, &cents_to_text(*cents))
                .unwrap();
        }

        let value = aggregate::fold_one(&store, "Merchant", "1").unwrap();
        prop_assert!((value - signed_sum(&deltas)).abs() < EPSILON);
    }

    /// Property: safe prune preserves the aggregate and leaves one record.
    #[test]
    fn prop_safe_prune_preserves_value(deltas in prop::collection::vec(delta_strategy(), 1..40)) {
        let store = MemStore::new();
        let delta_store = DeltaStore::new(&store);

        for (op, cents) in &deltas {
            delta_store
                .insert_delta("Merchant", "1", *op, &cents_to_text(*cents))
                .unwrap();
        }

        let before = aggregate::fold_one(&store, "Merchant", "1").unwrap();
        let outcome = compact::prune(&store, "Merchant", Some("1"), PruneType::Safe).unwrap();
        prop_assert_eq!(outcome.records, deltas.len());

        let after = aggregate::fold_one(&store, "Merchant", "1").unwrap();
        prop_assert!((before - after).abs() < EPSILON);

        let remaining = delta_store.scan("Merchant", Some("1")).unwrap().count();
        prop_assert_eq!(remaining, 1);
        prop_assert_eq!(compact::pending_backup(&store, "Merchant", "1").unwrap(), None);
    }

    /// Property: fast prune compacts to one record with the same value.
    #[test]
    fn prop_fast_prune_preserves_value(deltas in prop::collection::vec(delta_strategy(), 1..40)) {
        let store = MemStore::new();
        let delta_store = DeltaStore::new(&store);

        for (op, cents) in &deltas {
            delta_store
                .insert_delta("Merchant", "1", *op, &cents_to_text(*cents))
                .unwrap();
        }

        let before = aggregate::fold_one(&store, "Merchant", "1").unwrap();
        compact::prune(&store, "Merchant", Some("1"), PruneType::Fast).unwrap();
        let after = aggregate::fold_one(&store, "Merchant", "1").unwrap();

        prop_assert!((before - after).abs() < EPSILON);
        let remaining = delta_store.scan("Merchant", Some("1")).unwrap().count();
        prop_assert_eq!(remaining, 1);
    }

    /// Property: repeated prunes are stable; a second prune of a compacted
    /// variable still yields the same value.
    #[test]
    fn prop_prune_idempotent_on_value(deltas in prop::collection::vec(delta_strategy(), 1..20)) {
        let store = MemStore::new();
        let delta_store = DeltaStore::new(&store);

        for (op, cents) in &deltas {
            delta_store
                .insert_delta("Merchant", "1", *op, &cents_to_text(*cents))
                .unwrap();
        }

        compact::prune(&store, "Merchant", Some("1"), PruneType::Safe).unwrap();
        let first = aggregate::fold_one(&store, "Merchant", "1").unwrap();
        compact::prune(&store, "Merchant", Some("1"), PruneType::Safe).unwrap();
        let second = aggregate::fold_one(&store, "Merchant", "1").unwrap();

        prop_assert!((first - second).abs() < EPSILON);
    }

    /// Property: namespace-wide aggregation matches per-pair aggregation.
    #[test]
    fn prop_namespace_get_matches_per_pair(
        deltas_a in prop::collection::vec(delta_strategy(), 1..20),
        deltas_b in prop::collection::vec(delta_strategy(), 1..20),
    ) {
        let store = MemStore::new();
        let delta_store = DeltaStore::new(&store);

        for (op, cents) in &deltas_a {
            delta_store.insert_delta("Merchant", "A", *op, &cents_to_text(*cents)).unwrap();
        }
        for (op, cents) in &deltas_b {
            delta_store.insert_delta("Merchant", "B", *op, &cents_to_text(*cents)).unwrap();
        }

        let table = aggregate::fold_all(&store, "Merchant", None).unwrap();
        prop_assert_eq!(table.len(), 2);
        prop_assert!((table["A"] - aggregate::fold_one(&store, "Merchant", "A").unwrap()).abs() < EPSILON);
        prop_assert!((table["B"] - aggregate::fold_one(&store, "Merchant", "B").unwrap()).abs() < EPSILON);
    }

    /// Property: composite keys round-trip exactly.
    #[test]
    fn prop_composite_key_round_trip(
        object_type in field_strategy(),
        attrs in prop::collection::vec(field_strategy(), 0..6),
    ) {
        let refs: Vec<&str> = attrs.iter().map(String::as_str).collect();
        let key = keys::encode_composite(&object_type, &refs).unwrap();
        let (decoded_type, decoded_attrs) = keys::decode_composite(&key).unwrap();
        prop_assert_eq!(decoded_type, object_type);
        prop_assert_eq!(decoded_attrs, attrs);
    }

    /// Property: an N-field encoding is a byte prefix of every extension.
    #[test]
    fn prop_composite_prefix_contiguity(
        object_type in field_strategy(),
        attrs in prop::collection::vec(field_strategy(), 1..6),
        cut in 0usize..5,
    ) {
        let cut = cut.min(attrs.len());
        let refs: Vec<&str> = attrs.iter().map(String::as_str).collect();
        let full = keys::encode_composite(&object_type, &refs).unwrap();
        let prefix = keys::encode_composite(&object_type, &refs[..cut]).unwrap();
        prop_assert!(full.starts_with(&prefix));
    }

    /// Property: insert validation failures never write anything.
    #[test]
    fn prop_invalid_value_writes_nothing(value in "[a-z]{1,8}") {
        // Alphabetic text never parses as a number
        prop_assume!(value.parse::<f64>().is_err());

        let store = MemStore::new();
        let service = VariableService::new();
        let args = vec![
            "User".to_string(),
            "2".to_string(),
            value,
            "OP_ADD".to_string(),
        ];
        prop_assert!(service.insert(&store, &args).is_err());
        prop_assert!(store.is_empty());
    }
}

//! Public operation surface
//!
//! [`VariableService`] exposes the four named operations the dispatch layer
//! routes to: `insert`, `get`, `prune`, `delete`. Each takes a flat ordered
//! list of text arguments, validates it fully before any store mutation, and
//! returns a typed [`Response`].
//!
//! The service is stateless: the store handle (one unit of work inside the
//! caller's ambient transaction) is passed in per call, never held.

use crate::aggregate;
use crate::compact;
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::store::{DeltaStore, StateStore};
use crate::types::{AggregateTable, Operation, PruneType};

/// Payload returned by a public operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// No payload (insert)
    None,
    /// Scalar aggregate for one (namespace, sub-key) pair
    Scalar(f64),
    /// Ordered sub-key → aggregate table
    Table(AggregateTable),
    /// Deletion acknowledgement
    Deleted(bool),
}

impl Response {
    /// Serialize to the text envelope consumed by the dispatch layer.
    ///
    /// Scalars and booleans render as plain text; tables as a JSON object
    /// with sub-keys in ascending order.
    pub fn to_text(&self) -> Result<String> {
        match self {
            Response::None => Ok(String::new()),
            Response::Scalar(value) => Ok(format!("{value}")),
            Response::Table(table) => Ok(serde_json::to_string(table)?),
            Response::Deleted(ok) => Ok(ok.to_string()),
        }
    }
}

/// The public operation surface over a delta-ledger store.
///
/// Holds no mutable domain state; safe to construct per call or reuse.
#[derive(Debug, Clone, Default)]
pub struct VariableService {
    metrics: Metrics,
}

impl VariableService {
    /// Create a service with a fresh metrics registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service recording into the given metrics collector.
    pub fn with_metrics(metrics: Metrics) -> Self {
        Self { metrics }
    }

    /// Operation metrics recorded by this service.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Record a new delta for a variable.
    ///
    /// Arguments: namespace, sub-key, value text, operation. The value must
    /// parse as a number and the operation must be `OP_ADD` or `OP_SUB`;
    /// validation failures are raised before anything is written. On success
    /// exactly one new delta record exists and no payload is returned.
    pub fn insert<S: StateStore>(&self, store: &S, args: &[String]) -> Result<Response> {
        if args.len() != 4 {
            return Err(Error::ArgumentCount {
                expected: "4",
                got: args.len(),
            });
        }
        let (namespace, sub_key, value_text, op_text) = (&args[0], &args[1], &args[2], &args[3]);

        value_text
            .parse::<f64>()
            .map_err(|e| Error::ValueParse(format!("{value_text}: {e}")))?;
        let operation: Operation = op_text.parse()?;

        DeltaStore::new(store).insert_delta(namespace, sub_key, operation, value_text)?;
        self.metrics.record_insert();
        Ok(Response::None)
    }

    /// Read the aggregate value of a variable.
    ///
    /// With two arguments returns the scalar for that exact pair; with one,
    /// an ordered table covering every sub-key under the namespace. Fails
    /// with `NotFound` when nothing was ever inserted.
    pub fn get<S: StateStore>(&self, store: &S, args: &[String]) -> Result<Response> {
        let response = match args.len() {
            1 => Response::Table(aggregate::fold_all(store, &args[0], None)?),
            2 => Response::Scalar(aggregate::fold_one(store, &args[0], &args[1])?),
            got => {
                return Err(Error::ArgumentCount {
                    expected: "1 or 2",
                    got,
                })
            }
        };
        self.metrics.record_get();
        Ok(response)
    }

    /// Compact a variable's delta set down to one record per sub-key.
    ///
    /// Arguments: namespace, optional sub-key, prune type (`PRUNE_FAST` or
    /// `PRUNE_SAFE`, always last). Returns the pre-prune aggregate table.
    pub fn prune<S: StateStore>(&self, store: &S, args: &[String]) -> Result<Response> {
        let (namespace, sub_key, type_text) = match args.len() {
            2 => (&args[0], None, &args[1]),
            3 => (&args[0], Some(args[1].as_str()), &args[2]),
            got => {
                return Err(Error::ArgumentCount {
                    expected: "2 or 3",
                    got,
                })
            }
        };
        let prune_type: PruneType = type_text.parse()?;

        let outcome = compact::prune(store, namespace, sub_key, prune_type)?;
        self.metrics.record_prune(outcome.records);
        Ok(Response::Table(outcome.totals))
    }

    /// Delete every delta record for an exact (namespace, sub-key) pair,
    /// with no replacement.
    pub fn delete<S: StateStore>(&self, store: &S, args: &[String]) -> Result<Response> {
        if args.len() != 2 {
            return Err(Error::ArgumentCount {
                expected: "2",
                got: args.len(),
            });
        }
        let (namespace, sub_key) = (&args[0], &args[1]);

        let deltas = DeltaStore::new(store);
        let mut records = 0usize;
        {
            let scan = deltas.scan(namespace, Some(sub_key.as_str()))?;
            for item in scan {
                let (key, _) = item?;
                deltas
                    .delete_key(&key)
                    .map_err(|e| Error::storage_for(namespace, Some(sub_key.as_str()), e))?;
                records += 1;
            }
        }
        if records == 0 {
            return Err(Error::not_found(namespace, Some(sub_key.as_str())));
        }

        tracing::info!(namespace = %namespace, sub_key = %sub_key, records, "variable deleted");
        self.metrics.record_delete();
        Ok(Response::Deleted(true))
    }
}

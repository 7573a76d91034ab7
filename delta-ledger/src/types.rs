//! Core types for the delta ledger
//!
//! Operations and prune types are closed enums: unknown textual input is a
//! construction-time error, never a runtime default branch.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Ordered SubKey → aggregate mapping, as returned by namespace-wide reads.
///
/// A `BTreeMap` keeps sub-keys ascending so serialized output and test
/// assertions are deterministic.
pub type AggregateTable = BTreeMap<String, f64>;

/// Signed update applied by a single delta record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Add the delta value to the accumulator
    Add,
    /// Subtract the delta value from the accumulator
    Sub,
}

impl Operation {
    /// Wire spelling stored inside the composite key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "OP_ADD",
            Operation::Sub => "OP_SUB",
        }
    }

    /// Fold one delta value into a running accumulator.
    pub fn apply(&self, acc: f64, value: f64) -> f64 {
        match self {
            Operation::Add => acc + value,
            Operation::Sub => acc - value,
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OP_ADD" => Ok(Operation::Add),
            "OP_SUB" => Ok(Operation::Sub),
            other => Err(Error::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compaction protocol selector.
///
/// `Fast` is a single destructive pass with a documented loss window between
/// its two phases. `Safe` is the crash-tolerant three-phase protocol that
/// stages the aggregate in a backup record first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruneType {
    /// Single-pass fold-and-delete; cheap but lossy on mid-pass failure
    Fast,
    /// Backup → Delete → Finalize; value survives a stop at any point
    Safe,
}

impl PruneType {
    /// Wire spelling accepted by the prune operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PruneType::Fast => "PRUNE_FAST",
            PruneType::Safe => "PRUNE_SAFE",
        }
    }
}

impl FromStr for PruneType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRUNE_FAST" => Ok(PruneType::Fast),
            "PRUNE_SAFE" => Ok(PruneType::Safe),
            other => Err(Error::UnsupportedPruneType(other.to_string())),
        }
    }
}

impl fmt::Display for PruneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

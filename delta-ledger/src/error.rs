//! Error types for the delta ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Delta ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Wrong number of text arguments for a public operation
    #[error("incorrect number of arguments: expected {expected}, got {got}")]
    ArgumentCount {
        /// Expected argument count, e.g. "4" or "1 or 2"
        expected: &'static str,
        /// Number of arguments actually supplied
        got: usize,
    },

    /// Value text did not parse as a number
    #[error("provided value was not a number: {0}")]
    ValueParse(String),

    /// Operation outside the supported set
    #[error("operation {0} is unrecognized")]
    UnknownOperation(String),

    /// Prune type outside the supported set
    #[error("prune type {0} is not supported")]
    UnsupportedPruneType(String),

    /// No delta records exist for the requested identity
    #[error("no variable named {0} exists")]
    NotFound(String),

    /// Underlying store error
    #[error("storage error: {0}")]
    Storage(String),

    /// Fast-prune finalize failed after deletions were already issued.
    ///
    /// The store has been mutated in a way this component cannot roll back:
    /// the delta rows are gone and the replacement row was not written. The
    /// aggregate that should have been persisted is carried in `value`.
    #[error(
        "partial prune failure for {namespace}/{sub_key}: rows deleted but final value {value} could not be written: {message}"
    )]
    PartialPrune {
        /// Namespace of the variable being pruned
        namespace: String,
        /// Sub-key of the variable being pruned
        sub_key: String,
        /// Aggregate value that was lost
        value: f64,
        /// Underlying store failure
        message: String,
    },

    /// Malformed composite key
    #[error("invalid composite key: {0}")]
    Key(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// NotFound for a (namespace, optional sub-key) identity.
    pub fn not_found(namespace: &str, sub_key: Option<&str>) -> Self {
        match sub_key {
            Some(sub) => Error::NotFound(format!("{namespace}/{sub}")),
            None => Error::NotFound(namespace.to_string()),
        }
    }

    /// Storage failure wrapped with the identity that was being processed.
    pub fn storage_for(namespace: &str, sub_key: Option<&str>, message: impl std::fmt::Display) -> Self {
        match sub_key {
            Some(sub) => Error::Storage(format!("{namespace}/{sub}: {message}")),
            None => Error::Storage(format!("{namespace}: {message}")),
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_identity() {
        let err = Error::not_found("Merchant", Some("1234567890"));
        assert_eq!(err.to_string(), "no variable named Merchant/1234567890 exists");

        let err = Error::not_found("Merchant", None);
        assert_eq!(err.to_string(), "no variable named Merchant exists");
    }

    #[test]
    fn test_partial_prune_message_carries_value() {
        let err = Error::PartialPrune {
            namespace: "Merchant".to_string(),
            sub_key: "1".to_string(),
            value: 42.5,
            message: "store unreachable".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("42.5"));
        assert!(text.contains("Merchant/1"));
    }
}

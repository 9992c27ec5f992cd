//! Error types for cloudq
//!
//! This module defines the main error type used throughout cloudq. The four
//! operational kinds mirror where a failure originates: the query itself
//! (`Query`), the provider's resource metadata model (`Schema`), the cloud
//! provider API (`Provider`), or the local SQLite storage (`Storage`). All of
//! them bubble unwrapped to the query engine's caller; none are retried.

use thiserror::Error;

/// Result type alias for cloudq operations
pub type Result<T> = std::result::Result<T, CloudqError>;

/// Main error type for cloudq
#[derive(Error, Debug)]
pub enum CloudqError {
    /// Bad table/collection reference, SQL rejected by SQLite, or malformed
    /// input to the JSON accessor.
    #[error("Query error: {0}")]
    Query(String),

    /// Resource metadata model introspection failure (provider-model
    /// mismatch, not recoverable locally).
    #[error("Schema error: {0}")]
    Schema(String),

    /// Network/auth/throttling failure from the cloud provider SDK.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Local storage failure: file I/O, disk full, locked database.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Startup/configuration problem (missing region, bad data dir).
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CloudqError {
    /// Create a query error from a message.
    pub fn query(msg: impl Into<String>) -> Self {
        CloudqError::Query(msg.into())
    }

    /// Create the canonical "unknown collection" query error.
    ///
    /// # Example
    ///
    /// ```
    /// use cloudq::CloudqError;
    ///
    /// let err = CloudqError::unknown_collection("ec2", "flying_saucers");
    /// assert!(err.to_string().contains("flying_saucers"));
    /// ```
    pub fn unknown_collection(resource: &str, collection: &str) -> Self {
        CloudqError::Query(format!(
            "unknown collection `{}` of resource `{}`",
            collection, resource
        ))
    }

    /// Create a schema error from a message.
    pub fn schema(msg: impl Into<String>) -> Self {
        CloudqError::Schema(msg.into())
    }

    /// Create a provider error tagged with the failing operation.
    pub fn provider(operation: &str, detail: impl Into<String>) -> Self {
        CloudqError::Provider(format!("{}: {}", operation, detail.into()))
    }

    /// Create a storage error tagged with the failing operation.
    pub fn storage(operation: &str, detail: impl Into<String>) -> Self {
        CloudqError::Storage(format!("{}: {}", operation, detail.into()))
    }

    /// Create a configuration error from a message.
    pub fn config(msg: impl Into<String>) -> Self {
        CloudqError::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_collection_names_both_parts() {
        let err = CloudqError::unknown_collection("ec2", "instancez");
        let msg = err.to_string();
        assert!(msg.contains("ec2"));
        assert!(msg.contains("instancez"));
    }

    #[test]
    fn test_operation_prefixes() {
        let err = CloudqError::storage("attach", "disk full");
        assert_eq!(err.to_string(), "Storage error: attach: disk full");

        let err = CloudqError::provider("describe_instances", "throttled");
        assert_eq!(
            err.to_string(),
            "Provider error: describe_instances: throttled"
        );
    }
}

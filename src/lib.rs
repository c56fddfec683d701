//! # graph-cache-repo
//!
//! A read-through/write-invalidate caching and composition layer that sits
//! between a network-service API and a labelled property graph store.
//!
//! The crate exposes node/relation CRUD and three composite graph queries —
//! keyword/property search, bounded neighbourhood expansion (`GetNetwork`),
//! and shortest-path discovery (`GetPath`) — over a two-tier cache: an
//! approximate-membership filter gating a byte store, backed by a graph
//! database accessed through the [`dal::GraphDal`] contract.
//!
//! ## Layout
//!
//! - [`cache`] — cache-key derivation, the byte store abstraction, and the
//!   admission filter.
//! - [`dal`] — the graph database access contract and an in-process
//!   reference implementation.
//! - [`models`] — domain entities (`Node`, `Relation`, ...).
//! - [`mapper`] — conversion between storage records and domain entities.
//! - [`repository`] — the entity repository and composite query engine that
//!   tie the above together.
//! - [`config`] — runtime configuration.
//! - [`observability`] — logging and metrics setup.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cache;
pub mod config;
pub mod dal;
pub mod mapper;
pub mod models;
pub mod observability;
pub mod repository;

pub use config::RepositoryConfig;
pub use models::graph::{Node, NodeRelations, NodeType, Path, Relation, RelationType, Subgraph};
pub use repository::Repository;

/// Error type for graph-cache-repo operations.
///
/// Uses `thiserror` for automatic `Display` and `std::error::Error`
/// implementations. The [`Error::is_not_found`] predicate is the single
/// supported way to tell "absent" apart from "failed" across the cache and
/// DAL layers — see the module docs on [`repository`].
#[derive(Debug, ThisError)]
pub enum Error {
    /// The requested entity or composite result does not exist.
    ///
    /// Raised by the DAL's not-found sentinel, by a byte-store `NilMarker`
    /// read, by a byte-store miss translated at the repository boundary, or
    /// by `GetPath` finding no route within `maxDepth`.
    #[error("not found: {0}")]
    NotFound(String),

    /// A depth parameter was outside its configured bound.
    #[error("invalid depth: {0}")]
    InvalidDepth(String),

    /// A caller-supplied parameter was invalid and rejected before any I/O.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A DAL record's labels resolved to no known `NodeType`/`RelationType`.
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// The byte store failed. The caller should fall back to the DAL as
    /// though this were a cache miss; this variant exists so the failure is
    /// still observable in logs and metrics.
    #[error("store '{operation}' failed: {cause}")]
    StoreFailure {
        /// The store operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The graph DAL failed. Always fails the operation.
    #[error("dal operation '{operation}' failed: {cause}")]
    DalFailure {
        /// The DAL operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A cached payload failed to decode. The entry is deleted and the
    /// request re-executes as a miss.
    #[error("corrupted cache entry at {key}: {cause}")]
    Corruption {
        /// The cache key whose payload failed to decode.
        key: String,
        /// The underlying decode error.
        cause: String,
    },
}

impl Error {
    /// Returns true iff this error represents a "logically absent" outcome
    /// rather than an operational failure.
    ///
    /// This is the Error Classifier: the single supported way to distinguish
    /// "absent" from "failed" across the byte store, DAL, and composite
    /// query layers. Callers MUST use this predicate rather than matching on
    /// individual variants, since new not-found-shaped variants may be added.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias for graph-cache-repo operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_not_found_true_only_for_not_found_variant() {
        assert!(Error::NotFound("n1".to_string()).is_not_found());
        assert!(!Error::InvalidDepth("depth".to_string()).is_not_found());
        assert!(
            !Error::DalFailure {
                operation: "get_node".to_string(),
                cause: "timeout".to_string(),
            }
            .is_not_found()
        );
    }

    #[test]
    fn error_display_includes_operation_context() {
        let err = Error::StoreFailure {
            operation: "get".to_string(),
            cause: "connection reset".to_string(),
        };
        assert_eq!(err.to_string(), "store 'get' failed: connection reset");
    }
}

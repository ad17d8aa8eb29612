//! Error handling for the block clustering engine.
//!
//! This module provides the error type shared by every pipeline stage,
//! together with context information and a small extension trait for
//! attaching that context to foreign errors.
//!
//! Only malformed input records are recoverable (they can be skipped and
//! counted). Every other variant is fatal for the stage that raised it and
//! carries enough detail (offending cell, block ids, stage) to reproduce it.

use thiserror::Error;
use std::fmt;

/// Main error type for the clustering engine.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// An input row lacks a required field or carries an unparseable one.
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// 1-based line number in the source table (header is line 1).
        line: usize,
        /// What was wrong with the row.
        reason: String,
    },

    /// The distance matrix violates a structural invariant.
    #[error("Invalid distance matrix at ({row}, {col}): {reason}")]
    InvalidDistanceMatrix {
        /// Row index of the offending cell.
        row: usize,
        /// Column index of the offending cell.
        col: usize,
        /// Which invariant was violated.
        reason: String,
    },

    /// A pairwise score could not be used as a distance.
    #[error("Invalid score {score} for pair ({left}, {right})")]
    InvalidScore {
        /// First block of the pair.
        left: String,
        /// Second block of the pair.
        right: String,
        /// The rejected score.
        score: f64,
    },

    /// Silhouette coefficients are undefined for the given assignment.
    #[error("Silhouette undefined: {0}")]
    UndefinedSilhouette(String),

    /// A block id was referenced that the matrix or assignment does not know.
    #[error("Unknown block: {0}")]
    UnknownBlock(String),

    /// Two inputs that must describe the same blocks disagree.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Invalid configuration values.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to file I/O, such as file not found or permission denied.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialisation failures.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Fallback for other errors that don't fit into the above categories.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ClusterError {
    /// Whether the pipeline may continue after excluding the offending input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ClusterError::MalformedRecord { .. })
    }
}

/// Result type alias for the clustering engine.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Context information for errors.
///
/// Records the pipeline stage and operation in which an error surfaced.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Stage where the error occurred (e.g., "distance_matrix").
    pub component: String,

    /// Operation being performed (e.g., "read_input").
    pub operation: String,

    /// Additional context details, such as a file path or block pair.
    pub details: Option<String>,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "In {} while {}", self.component, self.operation)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorExt<T> {
    /// Add context to an error.
    ///
    /// `ClusterError`s keep their variant (the context is logged);
    /// any other error is folded into a `ClusterError` whose message
    /// carries the context.
    fn with_context(self, context: ErrorContext) -> ClusterResult<T>;

    /// Add simple context (component and operation only) to an error.
    fn with_simple_context(self, component: &str, operation: &str) -> ClusterResult<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ErrorExt<T> for Result<T, E> {
    fn with_context(self, context: ErrorContext) -> ClusterResult<T> {
        self.map_err(|e| {
            let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(e);
            match boxed.downcast::<ClusterError>() {
                Ok(cluster_err) => {
                    log::debug!("{}: {}", context, cluster_err);
                    *cluster_err
                }
                Err(other) => match other.downcast::<std::io::Error>() {
                    Ok(io_err) => ClusterError::Io(std::io::Error::new(
                        io_err.kind(),
                        format!("{}: {}", context, io_err),
                    )),
                    Err(other) => ClusterError::Unknown(format!("{}: {}", context, other)),
                },
            }
        })
    }

    fn with_simple_context(self, component: &str, operation: &str) -> ClusterResult<T> {
        self.with_context(ErrorContext {
            component: component.to_string(),
            operation: operation.to_string(),
            details: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        let context = ErrorContext {
            component: "clustering".to_string(),
            operation: "validate".to_string(),
            details: Some("4 blocks".to_string()),
        };
        assert_eq!(context.to_string(), "In clustering while validate (4 blocks)");
    }

    #[test]
    fn test_io_error_keeps_kind() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing.csv",
        ));
        let err = result.with_simple_context("input", "read_table").unwrap_err();
        match err {
            ClusterError::Io(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
                assert!(e.to_string().contains("In input while read_table"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cluster_error_passes_through() {
        let result: Result<(), ClusterError> = Err(ClusterError::UndefinedSilhouette(
            "single cluster".to_string(),
        ));
        let err = result.with_simple_context("silhouette", "evaluate").unwrap_err();
        assert!(matches!(err, ClusterError::UndefinedSilhouette(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_malformed_is_recoverable() {
        let err = ClusterError::MalformedRecord { line: 3, reason: "missing Type".to_string() };
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "Malformed record at line 3: missing Type");
    }
}

//! Error types for cfpb-cluster
//!
//! Recoverable conditions (missing cache, knee not found, empty labels,
//! non-convergence) are handled in place and logged. Everything here aborts
//! the run.

use crate::models::PipelineState;
use thiserror::Error;

/// Clustering pipeline error
#[derive(Debug, Error)]
pub enum ClusterError {
    /// No complaint survived loading and filtering
    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    /// Vectorizer found no terms to cluster on
    #[error("Empty vocabulary: no terms remain after normalization ({documents} documents)")]
    EmptyVocabulary { documents: usize },

    /// Requested cluster count cannot be satisfied
    #[error("Invalid cluster count k={k} for {documents} documents")]
    InvalidClusterCount { k: usize, documents: usize },

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Pipeline state machine violation
    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition {
        from: PipelineState,
        to: PipelineState,
    },

    /// Malformed or unreadable table
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Complaint API failure
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Label provider could not produce a label
    #[error("Label provider error: {0}")]
    LabelProvider(String),

    /// cfpb-common error
    #[error("Common error: {0}")]
    Common(#[from] cfpb_common::Error),
}

/// Result type for pipeline operations
pub type ClusterResult<T> = Result<T, ClusterError>;

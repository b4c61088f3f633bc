//! cfpb-cluster library interface
//!
//! Groups consumer complaint narratives into an automatically chosen number
//! of clusters and names each cluster:
//!
//! raw table → [`text`] normalization (cached by [`services::lemma_cache`])
//! → TF-IDF → k selection → k-means → summaries → labels → output table
//!
//! The [`fetcher`] builds the raw table from the public complaint API.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod services;
pub mod table;
pub mod text;
pub mod workflow;

pub use crate::config::ClusterConfig;
pub use crate::error::{ClusterError, ClusterResult};
pub use crate::workflow::{ClusterAnalysis, Pipeline, PipelineOutcome};

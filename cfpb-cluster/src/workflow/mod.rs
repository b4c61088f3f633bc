//! Clustering workflow
//!
//! The pipeline moves a batch forward through
//! [`PipelineState`](crate::models::PipelineState) one stage at a time.

pub mod pipeline;

pub use pipeline::{ClusterAnalysis, Pipeline, PipelineOutcome};

//! Data models for the clustering pipeline

pub mod complaint;
pub mod pipeline_run;

pub use complaint::{ComplaintRecord, LabeledComplaint, NormalizedDocument};
pub use pipeline_run::{PipelineRun, PipelineState, StateTransition};

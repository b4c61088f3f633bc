//! Configuration for cfpb-cluster
//!
//! One TOML file drives every command. All sections are optional; a missing
//! file or section falls back to the built-in defaults below, which match the
//! reference analysis (1000 features, k in 2..=10, seed 1, 10 restarts).

use crate::error::{ClusterError, ClusterResult};
use cfpb_common::config::{LoggingConfig, RootFolderResolver};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete cfpb-cluster configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Folder holding input, cache and output tables
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Data file names, relative to the root folder unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub input: PathBuf,
    pub lemma_cache: PathBuf,
    pub output: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("complaints.csv"),
            lemma_cache: PathBuf::from("complaints_lemmatized_cache.csv"),
            output: PathBuf::from("complaints_labeled.csv"),
        }
    }
}

/// Resolved absolute locations of the data files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub root: PathBuf,
    pub input: PathBuf,
    pub lemma_cache: PathBuf,
    pub output: PathBuf,
}

impl DataPaths {
    /// Join the configured file names onto `root`
    pub fn new(root: &Path, files: &FilesConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            input: root.join(&files.input),
            lemma_cache: root.join(&files.lemma_cache),
            output: root.join(&files.output),
        }
    }
}

/// Clustering pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Vocabulary cap for the vectorizer
    pub max_features: usize,
    /// Smallest candidate cluster count (inclusive, >= 2)
    pub k_min: usize,
    /// Largest candidate cluster count (inclusive)
    pub k_max: usize,
    /// Cluster count used when no knee is found
    pub default_k: usize,
    /// Seed for every k-means run
    pub seed: u64,
    /// Restarts per k-means run
    pub n_init: usize,
    /// Lloyd iteration cap per restart
    pub max_iter: usize,
    /// Relative centroid-shift tolerance for convergence
    pub tolerance: f64,
    /// Knee detector sensitivity
    pub knee_sensitivity: f64,
    /// Anchor the cost curve with the single-cluster inertia during knee detection
    pub include_baseline: bool,
    /// Keywords reported per cluster
    pub top_terms: usize,
    /// Example narratives reported per cluster
    pub examples_per_group: usize,
    /// Keep only narratives shorter than the batch mean length
    pub short_form_only: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_features: 1000,
            k_min: 2,
            k_max: 10,
            default_k: 5,
            seed: 1,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            knee_sensitivity: 1.0,
            include_baseline: true,
            top_terms: 10,
            examples_per_group: 2,
            short_form_only: true,
        }
    }
}

impl PipelineConfig {
    /// Check value ranges
    pub fn validate(&self) -> ClusterResult<()> {
        if self.k_min < 2 {
            return Err(ClusterError::InvalidConfig(format!(
                "k_min must be >= 2 (got {})",
                self.k_min
            )));
        }
        if self.k_max < self.k_min {
            return Err(ClusterError::InvalidConfig(format!(
                "k_max ({}) must be >= k_min ({})",
                self.k_max, self.k_min
            )));
        }
        if self.default_k == 0 {
            return Err(ClusterError::InvalidConfig("default_k must be >= 1".to_string()));
        }
        if self.max_features == 0 {
            return Err(ClusterError::InvalidConfig("max_features must be >= 1".to_string()));
        }
        if self.n_init == 0 || self.max_iter == 0 {
            return Err(ClusterError::InvalidConfig(
                "n_init and max_iter must be >= 1".to_string(),
            ));
        }
        if !(self.tolerance >= 0.0) || !(self.knee_sensitivity >= 0.0) {
            return Err(ClusterError::InvalidConfig(
                "tolerance and knee_sensitivity must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Candidate cluster counts, ascending
    pub fn k_range(&self) -> std::ops::RangeInclusive<usize> {
        self.k_min..=self.k_max
    }
}

/// Complaint API fetch parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    pub company: String,
    /// Calendar year fetched month by month
    pub year: i32,
    pub page_size: usize,
    pub requests_per_second: u32,
    /// Back-off when a 429 response carries no usable Retry-After header
    pub default_retry_after_secs: u64,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.consumerfinance.gov/data-research/consumer-complaints/search/api/v1/"
                .to_string(),
            company: "JPMORGAN CHASE & CO.".to_string(),
            year: 2025,
            page_size: 500,
            requests_per_second: 1,
            default_retry_after_secs: 30,
            timeout_secs: 30,
        }
    }
}

impl ClusterConfig {
    /// Resolve the data file locations, honoring a CLI root folder override
    pub fn data_paths(&self, cli_root: Option<PathBuf>) -> DataPaths {
        let root = RootFolderResolver::new()
            .with_cli_arg(cli_root)
            .with_toml_value(self.root_folder.clone())
            .resolve();
        DataPaths::new(&root, &self.files)
    }
}

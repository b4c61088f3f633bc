//! Pipeline orchestrator
//!
//! Runs a complaint batch through every stage and records progress in a
//! [`PipelineRun`].
//!
//! # Phases
//! - **Analysis**: load or normalize, vectorize, select k, cluster, summarize.
//!   Produces a [`ClusterAnalysis`] and touches no output file (the lemma
//!   cache aside).
//! - **Labeling**: one name per cluster from a [`LabelProvider`].
//! - **Persistence**: the labeled table, written once and atomically.
//!
//! Any error moves the run to FAILED and nothing is persisted.
//!
//! # Example
//! ```rust,ignore
//! let mut pipeline = Pipeline::new(config.pipeline.clone(), paths);
//! let outcome = pipeline.run(&mut KeywordLabelProvider::default())?;
//! ```

use crate::config::{DataPaths, PipelineConfig};
use crate::error::{ClusterError, ClusterResult};
use crate::models::{LabeledComplaint, NormalizedDocument, PipelineRun, PipelineState};
use crate::services::labeling::collect_labels;
use crate::services::{
    CacheStatus, ClusterModel, ClusterSummary, FittedVectorizer, KMeans, KSelection, KSelector,
    LabelMap, LabelProvider, LemmaCache, SparseVector, Summarizer, TfidfVectorizer,
};
use crate::table;
use crate::text::{NormalizationStats, Normalizer};
use std::path::PathBuf;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Everything the analysis phase learned about a batch
#[derive(Debug, Clone)]
pub struct ClusterAnalysis {
    pub documents: Vec<NormalizedDocument>,
    pub cache_status: CacheStatus,
    /// Present when documents were normalized in this run
    pub normalization: Option<NormalizationStats>,
    pub vectorizer: FittedVectorizer,
    pub vectors: Vec<SparseVector>,
    pub selection: KSelection,
    /// Cluster count actually used (operator override or selected)
    pub k: usize,
    pub model: ClusterModel,
    pub summaries: Vec<ClusterSummary>,
}

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub analysis: ClusterAnalysis,
    pub labels: LabelMap,
    pub output: PathBuf,
    pub rows_written: usize,
}

/// Clustering pipeline
pub struct Pipeline {
    config: PipelineConfig,
    paths: DataPaths,
    use_cache: bool,
    k_override: Option<usize>,
    run: PipelineRun,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, paths: DataPaths) -> Self {
        Self {
            config,
            paths,
            use_cache: true,
            k_override: None,
            run: PipelineRun::new(),
        }
    }

    /// Enable or bypass the lemma cache lookup (the cache is still refreshed)
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Cluster with `k` instead of the selected count
    pub fn with_k_override(mut self, k: Option<usize>) -> Self {
        self.k_override = k;
        self
    }

    /// Run record, including the state history
    pub fn run_record(&self) -> &PipelineRun {
        &self.run
    }

    pub fn state(&self) -> PipelineState {
        self.run.state
    }

    /// Analysis phase: RAW through SUMMARIZED
    pub fn analyze(&mut self) -> ClusterResult<ClusterAnalysis> {
        let result = self.analyze_inner();
        self.record_failure(result)
    }

    /// Labeling phase: SUMMARIZED to LABELED
    pub fn label(
        &mut self,
        analysis: &ClusterAnalysis,
        provider: &mut dyn LabelProvider,
    ) -> ClusterResult<LabelMap> {
        let result = self.label_inner(analysis, provider);
        self.record_failure(result)
    }

    /// Persistence phase: LABELED to PERSISTED
    ///
    /// Returns the number of rows written.
    pub fn persist(&mut self, analysis: &ClusterAnalysis, labels: &LabelMap) -> ClusterResult<usize> {
        let result = self.persist_inner(analysis, labels);
        self.record_failure(result)
    }

    /// All three phases
    pub fn run(&mut self, provider: &mut dyn LabelProvider) -> ClusterResult<PipelineOutcome> {
        let analysis = self.analyze()?;
        let labels = self.label(&analysis, provider)?;
        let rows_written = self.persist(&analysis, &labels)?;
        Ok(PipelineOutcome {
            run_id: self.run.run_id,
            analysis,
            labels,
            output: self.paths.output.clone(),
            rows_written,
        })
    }

    fn record_failure<T>(&mut self, result: ClusterResult<T>) -> ClusterResult<T> {
        if let Err(e) = &result {
            error!(run_id = %self.run.run_id, state = ?self.run.state, error = %e, "Pipeline run failed");
            self.run.fail();
        }
        result
    }

    fn analyze_inner(&mut self) -> ClusterResult<ClusterAnalysis> {
        self.config.validate()?;
        info!(run_id = %self.run.run_id, input = %self.paths.input.display(), "Starting clustering run");

        let (documents, cache_status, normalization) = self.load_documents()?;
        if documents.is_empty() {
            return Err(ClusterError::EmptyCorpus(format!(
                "no complaint narratives retained from {}",
                self.paths.input.display()
            )));
        }
        self.run.transition_to(PipelineState::CachedOrNormalized)?;

        let corpus: Vec<&str> = documents.iter().map(|d| d.lemmatized_text.as_str()).collect();
        let vectorizer = TfidfVectorizer::new(self.config.max_features).fit(&corpus)?;
        let vectors = vectorizer.transform_batch(&corpus);
        self.run.transition_to(PipelineState::Vectorized)?;

        let selection = KSelector::new(self.config.clone()).select(&vectors, vectorizer.dimension())?;
        let k = match self.k_override {
            Some(k) => {
                info!(k, selected = selection.optimal_k, "Using operator cluster count");
                k
            }
            None => selection.optimal_k,
        };
        self.run.transition_to(PipelineState::KSelected)?;

        let model = KMeans::new(k)
            .with_seed(self.config.seed)
            .with_n_init(self.config.n_init)
            .with_max_iter(self.config.max_iter)
            .with_tolerance(self.config.tolerance)
            .fit(&vectors, vectorizer.dimension())?;
        info!(k, inertia = model.inertia, sizes = ?model.cluster_sizes(), "Clustered complaints");
        self.run.transition_to(PipelineState::Clustered)?;

        let summaries = Summarizer::new(self.config.top_terms, self.config.examples_per_group)
            .summarize(&model, &vectorizer, &documents);
        self.run.transition_to(PipelineState::Summarized)?;

        Ok(ClusterAnalysis {
            documents,
            cache_status,
            normalization,
            vectorizer,
            vectors,
            selection,
            k,
            model,
            summaries,
        })
    }

    fn load_documents(
        &self,
    ) -> ClusterResult<(Vec<NormalizedDocument>, CacheStatus, Option<NormalizationStats>)> {
        let normalizer = Normalizer::new(self.config.short_form_only);
        let cache = LemmaCache::new(&self.paths.lemma_cache, normalizer.settings());
        let status = if self.use_cache {
            match cache.load(&self.paths.input) {
                (status, Some(documents)) => return Ok((documents, status, None)),
                (status, None) => status,
            }
        } else {
            info!("Lemma cache bypassed");
            CacheStatus::Bypassed
        };

        let records = table::read_complaints(&self.paths.input)?;
        let (documents, stats) = normalizer.normalize_batch(&records);
        if let Err(e) = cache.store(&self.paths.input, &documents) {
            warn!(error = %e, cache = %cache.path().display(), "Could not write lemma cache");
        }
        Ok((documents, status, Some(stats)))
    }

    fn label_inner(
        &mut self,
        analysis: &ClusterAnalysis,
        provider: &mut dyn LabelProvider,
    ) -> ClusterResult<LabelMap> {
        if self.run.state != PipelineState::Summarized {
            return Err(ClusterError::InvalidStateTransition {
                from: self.run.state,
                to: PipelineState::Labeled,
            });
        }
        let labels = collect_labels(provider, &analysis.summaries)?;
        self.run.transition_to(PipelineState::Labeled)?;
        Ok(labels)
    }

    fn persist_inner(&mut self, analysis: &ClusterAnalysis, labels: &LabelMap) -> ClusterResult<usize> {
        if self.run.state != PipelineState::Labeled {
            return Err(ClusterError::InvalidStateTransition {
                from: self.run.state,
                to: PipelineState::Persisted,
            });
        }
        let rows: Vec<LabeledComplaint> = analysis
            .documents
            .iter()
            .zip(&analysis.model.labels)
            .map(|(doc, &group_id)| LabeledComplaint::from_document(doc, group_id, &labels.get(group_id)))
            .collect();

        table::write_labeled(&self.paths.output, &rows)?;
        self.run.transition_to(PipelineState::Persisted)?;
        info!(output = %self.paths.output.display(), rows = rows.len(), "Wrote labeled complaints");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilesConfig;
    use crate::services::KeywordLabelProvider;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, narratives: &[&str]) -> DataPaths {
        let paths = DataPaths::new(dir.path(), &FilesConfig::default());
        let mut content = String::from("complaint_what_happened,state\n");
        for n in narratives {
            content.push_str(&format!("\"{n}\",NY\n"));
        }
        std::fs::write(&paths.input, content).unwrap();
        paths
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            k_min: 2,
            k_max: 3,
            default_k: 2,
            short_form_only: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_corpus_fails_run() {
        let dir = TempDir::new().unwrap();
        let paths = write_input(&dir, &[]);
        let mut pipeline = Pipeline::new(small_config(), paths.clone());

        let result = pipeline.analyze();
        assert!(matches!(result, Err(ClusterError::EmptyCorpus(_))));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(!paths.output.exists());
    }

    #[test]
    fn test_stop_words_only_is_empty_vocabulary() {
        let dir = TempDir::new().unwrap();
        let paths = write_input(&dir, &["it was the", "they were there", "I am"]);
        let mut pipeline = Pipeline::new(small_config(), paths);

        let result = pipeline.analyze();
        assert!(matches!(result, Err(ClusterError::EmptyVocabulary { documents: 3 })));
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }

    #[test]
    fn test_invalid_config_fails_before_loading() {
        let dir = TempDir::new().unwrap();
        let paths = write_input(&dir, &["late fee"]);
        let config = PipelineConfig {
            k_min: 1,
            ..small_config()
        };
        let mut pipeline = Pipeline::new(config, paths.clone());

        assert!(matches!(pipeline.analyze(), Err(ClusterError::InvalidConfig(_))));
        assert!(!paths.lemma_cache.exists());
    }

    #[test]
    fn test_label_before_analyze_rejected() {
        let dir = TempDir::new().unwrap();
        let paths = write_input(&dir, &["late fee charge", "card fraud", "late payment fee", "fraud zelle"]);
        let mut other = Pipeline::new(small_config(), paths.clone());
        let analysis = other.analyze().unwrap();

        let mut fresh = Pipeline::new(small_config(), paths);
        let result = fresh.label(&analysis, &mut KeywordLabelProvider::default());
        assert!(matches!(result, Err(ClusterError::InvalidStateTransition { .. })));
        assert_eq!(fresh.state(), PipelineState::Failed);
    }

    #[test]
    fn test_k_override_applied() {
        let dir = TempDir::new().unwrap();
        let paths = write_input(
            &dir,
            &["late fee charge", "card fraud", "late payment fee", "fraud zelle", "fee again"],
        );
        let mut pipeline = Pipeline::new(small_config(), paths).with_k_override(Some(3));
        let outcome = pipeline.run(&mut KeywordLabelProvider::default()).unwrap();

        assert_eq!(outcome.analysis.k, 3);
        assert_eq!(outcome.analysis.summaries.len(), 3);
        assert_eq!(outcome.rows_written, 5);
        assert_eq!(pipeline.state(), PipelineState::Persisted);
        assert_eq!(pipeline.run_record().history.len(), 7);
    }
}

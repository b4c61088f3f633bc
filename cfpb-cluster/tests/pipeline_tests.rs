//! Integration tests for the clustering pipeline
//!
//! Covers:
//! - Two clearly separated complaint themes end to end
//! - Lemma cache reuse gives the same result as recomputation
//! - Determinism for a fixed seed
//! - Output completeness and label fallback
//! - Vocabulary cap and the below-mean length filter
//! - Default cluster count when no knee exists

use cfpb_cluster::config::{DataPaths, FilesConfig, PipelineConfig};
use cfpb_cluster::models::{LabeledComplaint, PipelineState};
use cfpb_cluster::services::{
    CacheStatus, FileLabelProvider, KSelector, KeywordLabelProvider, SparseVector,
    TerminalLabelProvider,
};
use cfpb_cluster::workflow::{Pipeline, PipelineOutcome};
use std::collections::HashSet;
use std::io::Cursor;
use tempfile::TempDir;

const LATE_FEES: &[&str] = &[
    "late fee charged on XX/XX/XXXX payment",
    "late fee on my payment",
    "charged late fee again",
    "late fee on statement",
    "waive late fee please",
    "late fee payment charge",
    "late fee charged twice",
    "late fee after payment",
    "refund late fee",
    "late payment fee charged",
];

const FRAUD: &[&str] = &[
    "fraud unauthorized transaction",
    "unauthorized card fraud",
    "fraud on card unauthorized",
    "unauthorized transfer fraud",
    "fraud claim unauthorized charge",
    "unauthorized zelle fraud",
    "card fraud unauthorized purchase",
    "fraud unauthorized debit",
    "unauthorized transaction fraud claim",
    "fraud reported unauthorized",
];

fn two_theme_corpus() -> Vec<&'static str> {
    LATE_FEES.iter().chain(FRAUD).copied().collect()
}

/// Write a raw complaint table into `dir` and return the data paths
fn write_input(dir: &TempDir, narratives: &[&str]) -> DataPaths {
    let paths = DataPaths::new(dir.path(), &FilesConfig::default());
    let mut content = String::from("complaint_what_happened,date_sent_to_company,submitted_via,state\n");
    for (i, narrative) in narratives.iter().enumerate() {
        content.push_str(&format!("\"{narrative}\",2025-01-{:02},Web,NY\n", i % 28 + 1));
    }
    std::fs::write(&paths.input, content).unwrap();
    paths
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        k_min: 2,
        k_max: 6,
        short_form_only: false,
        ..Default::default()
    }
}

fn read_output(outcome: &PipelineOutcome) -> Vec<LabeledComplaint> {
    let mut reader = csv::Reader::from_path(&outcome.output).unwrap();
    reader.deserialize().map(|row| row.unwrap()).collect()
}

#[test]
fn test_two_themes_split_into_two_groups() {
    // Given: 10 late-fee complaints and 10 fraud complaints
    let dir = TempDir::new().unwrap();
    let paths = write_input(&dir, &two_theme_corpus());

    // When: the full pipeline runs with automatic labels
    let mut pipeline = Pipeline::new(test_config(), paths);
    let outcome = pipeline.run(&mut KeywordLabelProvider::default()).unwrap();
    let analysis = &outcome.analysis;

    // Then: two groups of ten, one per theme
    assert_eq!(analysis.selection.optimal_k, 2);
    assert!(analysis.selection.detected);
    assert_eq!(analysis.k, 2);
    assert_eq!(analysis.model.cluster_sizes(), vec![10, 10]);

    let late_group = analysis.model.labels[0];
    assert!(analysis.model.labels[..10].iter().all(|&g| g == late_group));
    assert!(analysis.model.labels[10..].iter().all(|&g| g != late_group));

    // And: each group's leading keywords name its theme
    let late_keywords: HashSet<&str> = analysis.summaries[late_group].keywords[..2]
        .iter()
        .map(String::as_str)
        .collect();
    let fraud_keywords: HashSet<&str> = analysis.summaries[1 - late_group].keywords[..2]
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(late_keywords, HashSet::from(["late", "fee"]));
    assert_eq!(fraud_keywords, HashSet::from(["fraud", "unauthorized"]));

    // And: the masked date never reaches the output text
    assert_eq!(analysis.documents[0].clean_text, "late fee charged on payment");
    assert_eq!(pipeline.state(), PipelineState::Persisted);
}

#[test]
fn test_cached_run_matches_fresh_run() {
    // Given: a first run that creates the lemma cache
    let dir = TempDir::new().unwrap();
    let paths = write_input(&dir, &two_theme_corpus());
    let first = Pipeline::new(test_config(), paths.clone())
        .run(&mut KeywordLabelProvider::default())
        .unwrap();
    assert_eq!(first.analysis.cache_status, CacheStatus::Missing);
    assert!(paths.lemma_cache.exists());

    // When: the pipeline runs again on the same input
    let second = Pipeline::new(test_config(), paths.clone())
        .run(&mut KeywordLabelProvider::default())
        .unwrap();

    // Then: the cache is used and nothing changes
    assert_eq!(second.analysis.cache_status, CacheStatus::Hit);
    assert!(second.analysis.normalization.is_none());
    assert_eq!(first.analysis.documents, second.analysis.documents);
    assert_eq!(first.analysis.model.labels, second.analysis.model.labels);
    assert_eq!(first.analysis.model.inertia, second.analysis.model.inertia);
}

#[test]
fn test_bypassed_cache_recomputes_same_documents() {
    // Given: an existing cache
    let dir = TempDir::new().unwrap();
    let paths = write_input(&dir, &two_theme_corpus());
    let cached = Pipeline::new(test_config(), paths.clone()).analyze().unwrap();

    // When: the cache is bypassed
    let fresh = Pipeline::new(test_config(), paths)
        .with_cache(false)
        .analyze()
        .unwrap();

    // Then: normalization runs again with identical output
    assert_eq!(fresh.cache_status, CacheStatus::Bypassed);
    assert!(fresh.normalization.is_some());
    assert_eq!(cached.documents, fresh.documents);
}

#[test]
fn test_changed_input_invalidates_cache() {
    // Given: a cache built from the two-theme corpus
    let dir = TempDir::new().unwrap();
    let paths = write_input(&dir, &two_theme_corpus());
    Pipeline::new(test_config(), paths.clone()).analyze().unwrap();

    // When: the input table is replaced
    let mut changed = two_theme_corpus();
    changed.push("late fee on another statement");
    write_input(&dir, &changed);
    let analysis = Pipeline::new(test_config(), paths).analyze().unwrap();

    // Then: the cache is stale and the new row is included
    assert_eq!(analysis.cache_status, CacheStatus::Stale);
    assert_eq!(analysis.documents.len(), 21);
}

#[test]
fn test_runs_are_deterministic() {
    // Given: the same input in two separate folders
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let corpus = two_theme_corpus();

    // When: both are clustered with the same seed
    let first = Pipeline::new(test_config(), write_input(&first_dir, &corpus))
        .analyze()
        .unwrap();
    let second = Pipeline::new(test_config(), write_input(&second_dir, &corpus))
        .analyze()
        .unwrap();

    // Then: assignments, inertia and the cost curve are identical
    assert_eq!(first.model.labels, second.model.labels);
    assert_eq!(first.model.inertia, second.model.inertia);
    assert_eq!(first.selection.curve, second.selection.curve);
}

#[test]
fn test_every_document_written_once_with_label() {
    // Given: labels from a file that names only group 0
    let dir = TempDir::new().unwrap();
    let paths = write_input(&dir, &two_theme_corpus());
    let mut provider = FileLabelProvider::from_toml("[labels]\n0 = \"First theme\"\n").unwrap();

    // When: the pipeline runs
    let outcome = Pipeline::new(test_config(), paths)
        .run(&mut provider)
        .unwrap();
    let rows = read_output(&outcome);

    // Then: one row per retained document, in input order
    assert_eq!(outcome.rows_written, 20);
    assert_eq!(rows.len(), 20);
    for (row, doc) in rows.iter().zip(&outcome.analysis.documents) {
        assert_eq!(row.narrative, doc.narrative);
        assert_eq!(row.state.as_deref(), Some("NY"));
        assert!(row.group_id < outcome.analysis.k);
        assert!(!row.group_name.is_empty());
    }

    // And: the unnamed group falls back to its id
    for row in &rows {
        let expected = if row.group_id == 0 { "First theme" } else { "group_1" };
        assert_eq!(row.group_name, expected);
    }
}

#[test]
fn test_terminal_labels_are_trimmed() {
    // Given: an operator typing one padded label and one blank line
    let dir = TempDir::new().unwrap();
    let paths = write_input(&dir, &two_theme_corpus());
    let mut shown = Vec::new();
    let mut provider = TerminalLabelProvider::new(Cursor::new("  Late fees  \n\n"), &mut shown);

    // When: the pipeline runs with k fixed at 2
    let outcome = Pipeline::new(test_config(), paths)
        .with_k_override(Some(2))
        .run(&mut provider)
        .unwrap();

    // Then: labels are trimmed and the blank one falls back
    assert_eq!(outcome.labels.get(0), "Late fees");
    assert_eq!(outcome.labels.get(1), "group_1");
    let prompt = String::from_utf8(shown).unwrap();
    assert!(prompt.contains("Label for group 0: "));
    assert!(prompt.contains("Label for group 1: "));
}

#[test]
fn test_vocabulary_cap_bounds_every_vector() {
    // Given: a vocabulary cap well below the corpus vocabulary
    let dir = TempDir::new().unwrap();
    let paths = write_input(&dir, &two_theme_corpus());
    let config = PipelineConfig {
        max_features: 5,
        ..test_config()
    };

    // When: the batch is analyzed
    let analysis = Pipeline::new(config, paths).analyze().unwrap();

    // Then: no vector has more non-zeros than the cap
    assert_eq!(analysis.vectorizer.dimension(), 5);
    assert!(analysis.vectors.iter().all(|v| v.nnz() <= 5));
    assert!(analysis.vectorizer.position("fee").is_some());
    assert!(analysis.vectorizer.position("fraud").is_some());
}

#[test]
fn test_short_form_filter_drops_long_narratives() {
    // Given: short complaints plus two long ones above the mean length
    let dir = TempDir::new().unwrap();
    let long_one = "late fee ".repeat(40);
    let long_two = "fraud unauthorized ".repeat(40);
    let mut corpus = two_theme_corpus();
    corpus.push(long_one.trim());
    corpus.push(long_two.trim());
    let paths = write_input(&dir, &corpus);
    let config = PipelineConfig {
        short_form_only: true,
        ..test_config()
    };

    // When: the batch is analyzed
    let analysis = Pipeline::new(config, paths).analyze().unwrap();

    // Then: only the short complaints remain
    let stats = analysis.normalization.unwrap();
    assert_eq!(stats.total_records, 22);
    assert_eq!(stats.retained, 20);
    assert_eq!(analysis.documents.len(), 20);
    assert!(analysis.documents.iter().all(|d| d.narrative.len() < 50));
}

#[test]
fn test_linear_cost_curve_uses_default_k() {
    // Given: six mutually orthogonal rows, whose inertia falls by exactly
    // one per extra cluster (n - k for any partition without empty groups)
    let data: Vec<SparseVector> = (0..6)
        .map(|i| SparseVector::from_pairs(vec![(i, 1.0)]))
        .collect();
    let config = PipelineConfig {
        k_min: 2,
        k_max: 3,
        ..Default::default()
    };

    // When: the selector builds the curve and looks for a knee
    let selection = KSelector::new(config).select(&data, 6).unwrap();

    // Then: the curve is a straight line, so the default is used
    let baseline = selection.baseline_inertia.unwrap();
    assert!((baseline - 5.0).abs() < 1e-9);
    assert!((selection.curve[0].inertia - 4.0).abs() < 1e-9);
    assert!((selection.curve[1].inertia - 3.0).abs() < 1e-9);
    assert!(!selection.detected);
    assert_eq!(selection.optimal_k, 5);
}

#[test]
fn test_tiny_batch_falls_back_within_document_count() {
    // Given: two complaints and the default configuration (k 2..10, default 5)
    let dir = TempDir::new().unwrap();
    let paths = write_input(&dir, &["late fee charged", "card fraud reported"]);
    let config = PipelineConfig {
        short_form_only: false,
        ..Default::default()
    };

    // When: the full pipeline runs
    let outcome = Pipeline::new(config, paths)
        .run(&mut KeywordLabelProvider::default())
        .unwrap();

    // Then: no knee is found and the fallback is capped at two groups
    assert!(!outcome.analysis.selection.detected);
    assert_eq!(outcome.analysis.k, 2);
    assert_eq!(outcome.rows_written, 2);
}

#[test]
fn test_toggling_length_filter_invalidates_cache() {
    // Given: a cache built with the length filter off, over a batch with one long complaint
    let dir = TempDir::new().unwrap();
    let long = "late fee ".repeat(40);
    let mut corpus = two_theme_corpus();
    corpus.push(long.trim());
    let paths = write_input(&dir, &corpus);
    let unfiltered = Pipeline::new(test_config(), paths.clone()).analyze().unwrap();
    assert_eq!(unfiltered.documents.len(), 21);

    // When: the filter is switched on
    let config = PipelineConfig {
        short_form_only: true,
        ..test_config()
    };
    let cached = Pipeline::new(config.clone(), paths.clone()).analyze().unwrap();
    let fresh = Pipeline::new(config, paths)
        .with_cache(false)
        .analyze()
        .unwrap();

    // Then: the cache is not reused and both runs drop the long complaint
    assert_eq!(cached.cache_status, CacheStatus::Stale);
    assert_eq!(cached.documents.len(), 20);
    assert_eq!(cached.documents, fresh.documents);
}

//! TF-IDF featurization
//!
//! Weighting follows the conventional defaults: tokens are runs of two or
//! more word characters (lower-cased), term frequency is the raw count,
//! `idf = ln((1 + n) / (1 + df)) + 1` and every row is L2-normalized.
//!
//! The vocabulary is capped at `max_features` terms, keeping the terms with
//! the highest total count across the corpus (ties broken alphabetically).
//! Vector positions follow the alphabetical order of the kept terms.

use crate::error::{ClusterError, ClusterResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    TOKEN_RE.find_iter(text).map(|m| m.as_str().to_lowercase())
}

/// Sparse row with strictly increasing indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseVector {
    /// Build from (index, value) pairs; zero values are dropped
    pub fn from_pairs(mut pairs: Vec<(usize, f64)>) -> Self {
        pairs.sort_by_key(|&(i, _)| i);
        let (indices, values) = pairs.into_iter().filter(|&(_, v)| v != 0.0).unzip();
        Self { indices, values }
    }

    /// Number of non-zero entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Value at `index` (zero if absent)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn squared_norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    /// Dot product with a dense vector
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.iter().map(|(i, v)| v * dense[i]).sum()
    }

    /// `dense += scale * self`
    pub fn add_to_dense(&self, dense: &mut [f64], scale: f64) {
        for (i, v) in self.iter() {
            dense[i] += scale * v;
        }
    }
}

/// Unfitted TF-IDF configuration
#[derive(Debug, Clone, Copy)]
pub struct TfidfVectorizer {
    max_features: usize,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self { max_features }
    }

    /// Learn vocabulary and idf weights from `corpus`
    ///
    /// # Errors
    /// `EmptyVocabulary` when no document contains a single token.
    pub fn fit<S: AsRef<str>>(&self, corpus: &[S]) -> ClusterResult<FittedVectorizer> {
        let n_documents = corpus.len();

        let mut term_counts: HashMap<String, usize> = HashMap::new();
        for doc in corpus {
            for token in tokenize(doc.as_ref()) {
                *term_counts.entry(token).or_insert(0) += 1;
            }
        }

        if term_counts.is_empty() {
            return Err(ClusterError::EmptyVocabulary {
                documents: n_documents,
            });
        }

        let total_terms = term_counts.len();
        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.max_features);

        let mut vocabulary: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        vocabulary.sort();
        let index: HashMap<String, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();

        let mut document_frequency = vec![0usize; vocabulary.len()];
        for doc in corpus {
            let mut seen: Vec<usize> = tokenize(doc.as_ref())
                .filter_map(|t| index.get(&t).copied())
                .collect();
            seen.sort_unstable();
            seen.dedup();
            for i in seen {
                document_frequency[i] += 1;
            }
        }

        let n = n_documents as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        info!(
            documents = n_documents,
            distinct_terms = total_terms,
            features = vocabulary.len(),
            "Fitted TF-IDF vectorizer"
        );

        Ok(FittedVectorizer {
            vocabulary,
            index,
            idf,
        })
    }
}

/// Vocabulary and idf weights learned from one corpus
///
/// Every vector produced by the same instance shares dimensionality and
/// term-to-position mapping.
#[derive(Debug, Clone)]
pub struct FittedVectorizer {
    vocabulary: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl FittedVectorizer {
    /// Terms by vector position
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// Term at vector position `index`
    pub fn term(&self, index: usize) -> Option<&str> {
        self.vocabulary.get(index).map(String::as_str)
    }

    /// Vector position of `term`
    pub fn position(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Featurize one document; out-of-vocabulary or empty text yields zero
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokenize(text) {
            if let Some(&i) = self.index.get(&token) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }

        let weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(i, tf)| (i, tf * self.idf[i]))
            .collect();
        let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return SparseVector::default();
        }
        SparseVector::from_pairs(weighted.into_iter().map(|(i, w)| (i, w / norm)).collect())
    }

    /// Featurize a batch, preserving order
    pub fn transform_batch<S: AsRef<str>>(&self, corpus: &[S]) -> Vec<SparseVector> {
        let vectors: Vec<SparseVector> = corpus.iter().map(|d| self.transform(d.as_ref())).collect();
        let zero_rows = vectors.iter().filter(|v| v.is_zero()).count();
        debug!(rows = vectors.len(), zero_rows, "Transformed corpus");
        vectors
    }
}

//! Per-cluster characterization: top centroid terms and example narratives

use super::kmeans::ClusterModel;
use super::vectorizer::FittedVectorizer;
use crate::models::NormalizedDocument;
use serde::Serialize;

/// What an operator sees before naming a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub group_id: usize,
    /// Documents assigned to the group
    pub size: usize,
    /// Terms by descending centroid weight
    pub keywords: Vec<String>,
    /// Original narratives, in corpus order
    pub examples: Vec<String>,
}

/// Summary builder
#[derive(Debug, Clone, Copy)]
pub struct Summarizer {
    top_terms: usize,
    examples_per_group: usize,
}

impl Summarizer {
    pub fn new(top_terms: usize, examples_per_group: usize) -> Self {
        Self {
            top_terms,
            examples_per_group,
        }
    }

    /// One summary per group id in `0..k`, in id order
    ///
    /// Only terms with positive centroid weight are listed; equal weights
    /// keep vocabulary order.
    pub fn summarize(
        &self,
        model: &ClusterModel,
        vectorizer: &FittedVectorizer,
        documents: &[NormalizedDocument],
    ) -> Vec<ClusterSummary> {
        let sizes = model.cluster_sizes();
        (0..model.k)
            .map(|group_id| {
                let centroid = &model.centroids[group_id];
                let mut ranked: Vec<(usize, f64)> = centroid
                    .iter()
                    .copied()
                    .enumerate()
                    .filter(|&(_, w)| w > 0.0)
                    .collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

                let keywords = ranked
                    .into_iter()
                    .take(self.top_terms)
                    .filter_map(|(i, _)| vectorizer.term(i).map(str::to_string))
                    .collect();

                let examples = documents
                    .iter()
                    .zip(&model.labels)
                    .filter(|(_, label)| **label == group_id)
                    .take(self.examples_per_group)
                    .map(|(doc, _)| doc.narrative.clone())
                    .collect();

                ClusterSummary {
                    group_id,
                    size: sizes[group_id],
                    keywords,
                    examples,
                }
            })
            .collect()
    }
}

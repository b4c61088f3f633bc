//! Cluster-count selection by the elbow of the inertia curve
//!
//! Each candidate k is fitted independently with an RNG derived from
//! `(seed, k)`. The resulting cost curve goes to the knee detector. When
//! the baseline is enabled, the single-cluster inertia (total scatter) is
//! prepended at k = 1 for detection only, so an elbow at the first
//! candidate can still be recognized. No knee means `default_k`, capped at
//! the number of documents.

use super::kmeans::{total_scatter, KMeans};
use super::knee::{find_knee, CurvePoint};
use super::vectorizer::SparseVector;
use crate::config::PipelineConfig;
use crate::error::{ClusterError, ClusterResult};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Inertia for one candidate cluster count
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostPoint {
    pub k: usize,
    pub inertia: f64,
}

/// Outcome of cluster-count selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KSelection {
    pub optimal_k: usize,
    /// Cost per candidate k, ascending in k
    pub curve: Vec<CostPoint>,
    /// Single-cluster inertia, when used to anchor detection
    pub baseline_inertia: Option<f64>,
    /// False when `optimal_k` is the configured default
    pub detected: bool,
}

/// Cluster-count selector
#[derive(Debug, Clone)]
pub struct KSelector {
    config: PipelineConfig,
}

impl KSelector {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Build the cost curve over the candidate range and pick k
    ///
    /// Candidates above the number of documents are skipped, and the
    /// default used when no knee is found is capped at the document count.
    ///
    /// # Errors
    /// `InvalidClusterCount` when even `k_min` exceeds the document count.
    pub fn select(&self, data: &[SparseVector], dimension: usize) -> ClusterResult<KSelection> {
        let n = data.len();
        let config = &self.config;
        if config.k_min > n {
            return Err(ClusterError::InvalidClusterCount {
                k: config.k_min,
                documents: n,
            });
        }
        let k_max = config.k_max.min(n);
        if k_max < config.k_max {
            warn!(
                k_max = config.k_max,
                documents = n,
                "Fewer documents than candidate clusters, truncating range"
            );
        }

        let mut curve = Vec::with_capacity(k_max + 1 - config.k_min);
        for k in config.k_min..=k_max {
            let model = KMeans::new(k)
                .with_seed(config.seed)
                .with_n_init(config.n_init)
                .with_max_iter(config.max_iter)
                .with_tolerance(config.tolerance)
                .fit(data, dimension)?;
            debug!(k, inertia = model.inertia, "Cost curve point");
            curve.push(CostPoint {
                k,
                inertia: model.inertia,
            });
        }

        let baseline_inertia = config
            .include_baseline
            .then(|| total_scatter(data, dimension));
        let (optimal_k, detected) = match detect_k(&curve, baseline_inertia, config.knee_sensitivity) {
            Some(k) => (k.clamp(config.k_min, k_max), true),
            None => {
                warn!(
                    default_k = config.default_k,
                    "No knee found in cost curve, falling back to default cluster count"
                );
                let fallback = config.default_k.min(n);
                if fallback < config.default_k {
                    warn!(
                        default_k = config.default_k,
                        documents = n,
                        "Default cluster count exceeds document count, capping"
                    );
                }
                (fallback, false)
            }
        };

        info!(optimal_k, detected, candidates = curve.len(), "Selected cluster count");
        Ok(KSelection {
            optimal_k,
            curve,
            baseline_inertia,
            detected,
        })
    }
}

/// Knee of the cost curve as a cluster count
pub fn detect_k(curve: &[CostPoint], baseline: Option<f64>, sensitivity: f64) -> Option<usize> {
    let mut points: Vec<CurvePoint> = Vec::with_capacity(curve.len() + 1);
    let mut ks: Vec<usize> = Vec::with_capacity(curve.len() + 1);
    if let (Some(inertia), Some(first)) = (baseline, curve.first()) {
        if first.k > 1 {
            points.push(CurvePoint::new(1.0, inertia));
            ks.push(1);
        }
    }
    for point in curve {
        points.push(CurvePoint::new(point.k as f64, point.inertia));
        ks.push(point.k);
    }
    find_knee(&points, sensitivity).map(|i| ks[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost_curve(start_k: usize, inertias: &[f64]) -> Vec<CostPoint> {
        inertias
            .iter()
            .enumerate()
            .map(|(i, &inertia)| CostPoint {
                k: start_k + i,
                inertia,
            })
            .collect()
    }

    #[test]
    fn test_baseline_exposes_knee_at_first_candidate() {
        let curve = cost_curve(2, &[6.0, 5.0, 4.2, 3.5, 2.9]);
        assert_eq!(detect_k(&curve, None, 1.0), None);
        assert_eq!(detect_k(&curve, Some(13.0), 1.0), Some(2));
    }

    #[test]
    fn test_linear_curve_has_no_knee() {
        let curve = cost_curve(2, &[9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(detect_k(&curve, None, 1.0), None);
    }

    #[test]
    fn test_short_curve_falls_back_to_default() {
        let data: Vec<SparseVector> = (1..=12)
            .map(|i| SparseVector::from_pairs(vec![(0, i as f64)]))
            .collect();
        let config = PipelineConfig {
            include_baseline: false,
            k_min: 2,
            k_max: 3,
            ..Default::default()
        };
        let selection = KSelector::new(config).select(&data, 1).unwrap();
        // Two points cannot carry an interior knee
        assert!(!selection.detected);
        assert_eq!(selection.optimal_k, 5);
        assert_eq!(selection.curve.len(), 2);
        assert!(selection.baseline_inertia.is_none());
    }

    #[test]
    fn test_two_groups_select_two() {
        let mut data = Vec::new();
        for i in 0..6 {
            let jitter = i as f64 * 0.01;
            data.push(SparseVector::from_pairs(vec![(0, 1.0 - jitter), (1, jitter)]));
            data.push(SparseVector::from_pairs(vec![(2, 1.0 - jitter), (3, jitter)]));
        }
        let config = PipelineConfig {
            k_min: 2,
            k_max: 6,
            ..Default::default()
        };
        let selection = KSelector::new(config).select(&data, 4).unwrap();
        assert_eq!(selection.optimal_k, 2);
        assert!(selection.detected);
        assert_eq!(
            selection.curve.iter().map(|p| p.k).collect::<Vec<_>>(),
            vec![2, 3, 4, 5, 6]
        );
    }

    #[test]
    fn test_range_truncated_to_document_count() {
        let data: Vec<SparseVector> = (0..3)
            .map(|i| SparseVector::from_pairs(vec![(i, 1.0)]))
            .collect();
        let selection = KSelector::new(PipelineConfig::default()).select(&data, 3).unwrap();
        assert_eq!(selection.curve.last().map(|p| p.k), Some(3));
    }

    #[test]
    fn test_default_capped_at_document_count() {
        let data = vec![
            SparseVector::from_pairs(vec![(0, 1.0)]),
            SparseVector::from_pairs(vec![(1, 1.0)]),
        ];
        let selection = KSelector::new(PipelineConfig::default()).select(&data, 2).unwrap();
        assert!(!selection.detected);
        assert_eq!(selection.optimal_k, 2);
        assert_eq!(selection.curve.len(), 1);
    }

    #[test]
    fn test_too_few_documents_is_error() {
        let data = vec![SparseVector::from_pairs(vec![(0, 1.0)])];
        let result = KSelector::new(PipelineConfig::default()).select(&data, 1);
        assert!(matches!(
            result,
            Err(ClusterError::InvalidClusterCount { k: 2, documents: 1 })
        ));
    }
}

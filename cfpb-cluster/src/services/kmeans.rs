//! K-means clustering over sparse TF-IDF rows
//!
//! Greedy k-means++ seeding followed by Lloyd iterations, repeated
//! `n_init` times; the restart with the lowest inertia wins. Every random
//! draw comes from one RNG seeded from `(seed, k)`, so a fit depends only
//! on the data, the seed and k.
//!
//! Convergence uses a tolerance relative to the data: iteration stops once
//! the summed squared centroid shift falls to `tolerance` times the mean
//! per-feature variance.

use super::vectorizer::SparseVector;
use crate::error::{ClusterError, ClusterResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// Derive the RNG seed for one cluster count
pub fn seed_for_k(seed: u64, k: usize) -> u64 {
    seed ^ (k as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Fitted partition
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterModel {
    pub k: usize,
    /// Group id per input row, in `0..k`
    pub labels: Vec<usize>,
    /// Dense centroid per group
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    pub converged: bool,
    /// Lloyd iterations of the winning restart
    pub iterations: usize,
}

impl ClusterModel {
    /// Rows per group, indexed by group id
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }

    /// Group ids with no rows
    pub fn empty_clusters(&self) -> Vec<usize> {
        self.cluster_sizes()
            .iter()
            .enumerate()
            .filter(|(_, size)| **size == 0)
            .map(|(id, _)| id)
            .collect()
    }
}

/// K-means parameters
#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    k: usize,
    n_init: usize,
    max_iter: usize,
    tolerance: f64,
    seed: u64,
}

impl KMeans {
    /// Defaults: 10 restarts, 300 iterations, tolerance 1e-4, seed 1
    pub fn new(k: usize) -> Self {
        Self {
            k,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 1,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Partition `data` (rows of width `dimension`) into k groups
    ///
    /// # Errors
    /// `InvalidClusterCount` when k is 0 or exceeds the number of rows.
    pub fn fit(&self, data: &[SparseVector], dimension: usize) -> ClusterResult<ClusterModel> {
        let n = data.len();
        if self.k == 0 || self.k > n {
            return Err(ClusterError::InvalidClusterCount {
                k: self.k,
                documents: n,
            });
        }

        let norms: Vec<f64> = data.iter().map(SparseVector::squared_norm).collect();
        let tol = self.tolerance * mean_variance(data, dimension);
        let mut rng = StdRng::seed_from_u64(seed_for_k(self.seed, self.k));

        let mut best: Option<ClusterModel> = None;
        for restart in 0..self.n_init {
            let model = self.fit_once(data, &norms, dimension, tol, &mut rng);
            debug!(
                k = self.k,
                restart,
                inertia = model.inertia,
                iterations = model.iterations,
                converged = model.converged,
                "K-means restart finished"
            );
            if best.as_ref().map_or(true, |b| model.inertia < b.inertia) {
                best = Some(model);
            }
        }

        let best = best.ok_or_else(|| ClusterError::InvalidConfig("n_init must be >= 1".into()))?;
        if !best.converged {
            debug!(k = self.k, max_iter = self.max_iter, "K-means did not converge, using best restart");
        }
        let empty = best.empty_clusters();
        if !empty.is_empty() {
            warn!(k = self.k, empty_groups = ?empty, "K-means produced empty clusters");
        }
        Ok(best)
    }

    fn fit_once(
        &self,
        data: &[SparseVector],
        norms: &[f64],
        dimension: usize,
        tol: f64,
        rng: &mut StdRng,
    ) -> ClusterModel {
        let mut centroids = kmeans_plus_plus(data, norms, dimension, self.k, rng);
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.max_iter {
            iterations += 1;
            let (labels, _) = assign(data, norms, &centroids);
            let updated = update_centroids(data, &labels, &centroids, dimension);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_distance_dense(old, new))
                .sum();
            centroids = updated;
            if shift <= tol {
                converged = true;
                break;
            }
        }

        let (labels, inertia) = assign(data, norms, &centroids);
        ClusterModel {
            k: self.k,
            labels,
            centroids,
            inertia,
            converged,
            iterations,
        }
    }
}

/// Sum of squared distances to the global mean (the single-cluster inertia)
pub fn total_scatter(data: &[SparseVector], dimension: usize) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut mean = vec![0.0; dimension];
    for row in data {
        row.add_to_dense(&mut mean, 1.0 / data.len() as f64);
    }
    let mean_norm: f64 = mean.iter().map(|v| v * v).sum();
    data.iter()
        .map(|row| squared_distance(row, row.squared_norm(), &mean, mean_norm))
        .sum()
}

fn mean_variance(data: &[SparseVector], dimension: usize) -> f64 {
    if data.is_empty() || dimension == 0 {
        return 0.0;
    }
    total_scatter(data, dimension) / (data.len() * dimension) as f64
}

fn squared_distance(row: &SparseVector, row_norm: f64, centroid: &[f64], centroid_norm: f64) -> f64 {
    (row_norm - 2.0 * row.dot_dense(centroid) + centroid_norm).max(0.0)
}

fn squared_distance_dense(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn dense_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

fn to_dense(row: &SparseVector, dimension: usize) -> Vec<f64> {
    let mut dense = vec![0.0; dimension];
    row.add_to_dense(&mut dense, 1.0);
    dense
}

/// Nearest centroid per row (lowest id wins ties) and total inertia
fn assign(data: &[SparseVector], norms: &[f64], centroids: &[Vec<f64>]) -> (Vec<usize>, f64) {
    let centroid_norms: Vec<f64> = centroids.iter().map(|c| dense_norm(c)).collect();
    let mut inertia = 0.0;
    let labels = data
        .iter()
        .zip(norms)
        .map(|(row, &norm)| {
            let mut best = (0, f64::INFINITY);
            for (id, (centroid, &c_norm)) in centroids.iter().zip(&centroid_norms).enumerate() {
                let d = squared_distance(row, norm, centroid, c_norm);
                if d < best.1 {
                    best = (id, d);
                }
            }
            inertia += best.1;
            best.0
        })
        .collect();
    (labels, inertia)
}

/// Mean of each group; an empty group keeps its previous centroid
fn update_centroids(
    data: &[SparseVector],
    labels: &[usize],
    previous: &[Vec<f64>],
    dimension: usize,
) -> Vec<Vec<f64>> {
    let k = previous.len();
    let mut sums = vec![vec![0.0; dimension]; k];
    let mut counts = vec![0usize; k];
    for (row, &label) in data.iter().zip(labels) {
        row.add_to_dense(&mut sums[label], 1.0);
        counts[label] += 1;
    }

    sums.into_iter()
        .zip(counts)
        .enumerate()
        .map(|(id, (mut sum, count))| {
            if count == 0 {
                debug!(group = id, "Empty cluster during iteration, keeping previous centroid");
                return previous[id].clone();
            }
            let scale = 1.0 / count as f64;
            sum.iter_mut().for_each(|v| *v *= scale);
            sum
        })
        .collect()
}

/// Greedy k-means++: each new center is the best of `2 + ln k` candidates
/// sampled proportionally to squared distance from the chosen centers
fn kmeans_plus_plus(
    data: &[SparseVector],
    norms: &[f64],
    dimension: usize,
    k: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f64>> {
    let n = data.len();
    let n_trials = 2 + (k as f64).ln().floor() as usize;

    let first = rng.gen_range(0..n);
    let mut centers = vec![to_dense(&data[first], dimension)];
    let first_norm = dense_norm(&centers[0]);
    let mut closest: Vec<f64> = data
        .iter()
        .zip(norms)
        .map(|(row, &norm)| squared_distance(row, norm, &centers[0], first_norm))
        .collect();

    while centers.len() < k {
        let potential: f64 = closest.iter().sum();

        let mut best: Option<(usize, f64, Vec<f64>)> = None;
        for _ in 0..n_trials {
            let candidate = if potential > 0.0 {
                sample_weighted(&closest, potential, rng)
            } else {
                rng.gen_range(0..n)
            };
            let center = to_dense(&data[candidate], dimension);
            let center_norm = dense_norm(&center);
            let distances: Vec<f64> = data
                .iter()
                .zip(norms)
                .zip(&closest)
                .map(|((row, &norm), &current)| {
                    current.min(squared_distance(row, norm, &center, center_norm))
                })
                .collect();
            let candidate_potential: f64 = distances.iter().sum();
            if best.as_ref().map_or(true, |b| candidate_potential < b.1) {
                best = Some((candidate, candidate_potential, distances));
            }
        }

        // n_trials >= 2, so a candidate was always evaluated
        if let Some((candidate, _, distances)) = best {
            centers.push(to_dense(&data[candidate], dimension));
            closest = distances;
        }
    }

    centers
}

fn sample_weighted(weights: &[f64], total: f64, rng: &mut StdRng) -> usize {
    let target = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > target {
            return i;
        }
    }
    // Rounding left target at the very top: take the last weighted row
    weights.iter().rposition(|&w| w > 0.0).unwrap_or(weights.len() - 1)
}

//! Knee detection on convex, decreasing cost curves
//!
//! Both axes are scaled to [0, 1] and the y axis is flipped, so the curve
//! rises from (0, 0) to (1, 1). The difference curve `D = y' - x` measures
//! how far each point bows away from the chord. A local maximum of `D` is
//! a knee candidate with threshold `D_max - sensitivity * mean(Δx)`; it is
//! confirmed when a later difference falls below that threshold before a
//! local minimum resets it. The first confirmed candidate wins.

use serde::{Deserialize, Serialize};

/// One (x, y) sample of a cost curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: f64,
    pub y: f64,
}

impl CurvePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Find the knee of a convex decreasing curve sampled at increasing x
///
/// Returns the index of the knee point, or `None` when the curve has fewer
/// than three points, is flat in either axis, or shows no confirmed knee
/// (a straight line, for example).
pub fn find_knee(points: &[CurvePoint], sensitivity: f64) -> Option<usize> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let (x_min, x_max) = bounds(points.iter().map(|p| p.x))?;
    let (y_min, y_max) = bounds(points.iter().map(|p| p.y))?;
    if x_max - x_min <= f64::EPSILON || y_max - y_min <= f64::EPSILON {
        return None;
    }

    let x_norm: Vec<f64> = points.iter().map(|p| (p.x - x_min) / (x_max - x_min)).collect();
    let difference: Vec<f64> = points
        .iter()
        .zip(&x_norm)
        .map(|(p, &x)| (1.0 - (p.y - y_min) / (y_max - y_min)) - x)
        .collect();

    let maxima: Vec<usize> = (1..n - 1)
        .filter(|&i| difference[i] > difference[i - 1] && difference[i] > difference[i + 1])
        .collect();
    let minima: Vec<usize> = (1..n - 1)
        .filter(|&i| difference[i] < difference[i - 1] && difference[i] < difference[i + 1])
        .collect();
    let first_max = *maxima.first()?;

    let mean_step = x_norm.windows(2).map(|w| w[1] - w[0]).sum::<f64>() / (n - 1) as f64;
    let step_allowance = sensitivity * mean_step.abs();

    let mut threshold = 0.0;
    let mut candidate: Option<usize> = None;
    for i in first_max..n - 1 {
        if maxima.contains(&i) {
            threshold = difference[i] - step_allowance;
            candidate = Some(i);
        }
        if minima.contains(&i) {
            threshold = 0.0;
        }
        if difference[i + 1] < threshold {
            return candidate;
        }
    }
    None
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

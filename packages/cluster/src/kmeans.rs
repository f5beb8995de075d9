//! Seeded K-Means with k-means++ initialization and restarts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ClusterError;

/// K-Means settings.
#[derive(Debug, Clone)]
pub struct KmeansParams {
    pub k: usize,
    pub restarts: usize,
    pub max_iterations: usize,
    /// Convergence threshold on the total squared center shift.
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for KmeansParams {
    fn default() -> Self {
        Self {
            k: 4,
            restarts: 20,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// Best partition found over all restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct KmeansResult {
    /// Cluster index per input row.
    pub labels: Vec<usize>,
    pub centers: Vec<Vec<f64>>,
    /// Sum of squared distances to assigned centers.
    pub inertia: f64,
    /// Rows per cluster.
    pub sizes: Vec<usize>,
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Nearest center and its squared distance; ties go to the lower index.
fn nearest(point: &[f64], centers: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (k, center) in centers.iter().enumerate() {
        let dist = squared_distance(point, center);
        if dist < best.1 {
            best = (k, dist);
        }
    }
    best
}

/// Partitions `points` into `params.k` clusters.
///
/// Every restart draws its initial centers from one generator seeded with
/// `params.seed`, so identical input and parameters always give identical
/// output. The restart with the lowest inertia wins; earlier restarts win
/// ties.
///
/// # Errors
///
/// Returns [`ClusterError::InsufficientRows`] if there are fewer points
/// than clusters, and [`ClusterError::InvalidParams`] if `k` or `restarts`
/// is 0.
pub fn kmeans(points: &[Vec<f64>], params: &KmeansParams) -> Result<KmeansResult, ClusterError> {
    if params.k == 0 || params.restarts == 0 {
        return Err(ClusterError::InvalidParams {
            message: "clusters and restarts must both be at least 1".to_string(),
        });
    }
    if points.len() < params.k {
        return Err(ClusterError::InsufficientRows {
            rows: points.len(),
            clusters: params.k,
        });
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<KmeansResult> = None;

    for restart in 0..params.restarts {
        let initial = initialize(points, params.k, &mut rng);
        let result = lloyd(points, initial, params);
        log::debug!("Restart {restart}: inertia {:.6}", result.inertia);
        if best.as_ref().is_none_or(|b| result.inertia < b.inertia) {
            best = Some(result);
        }
    }

    best.ok_or_else(|| ClusterError::InvalidParams {
        message: "no restart produced a partition".to_string(),
    })
}

/// k-means++ seeding.
fn initialize(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.random_range(0..points.len())].clone());

    while centers.len() < k {
        let weights: Vec<f64> = points.iter().map(|p| nearest(p, &centers).1).collect();
        let total: f64 = weights.iter().sum();

        let index = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            weights
                .iter()
                .position(|w| {
                    cumulative += w;
                    cumulative > target
                })
                .unwrap_or(points.len() - 1)
        } else {
            rng.random_range(0..points.len())
        };
        centers.push(points[index].clone());
    }

    centers
}

/// Lloyd iterations from `centers` until the shift drops below tolerance.
#[allow(clippy::cast_precision_loss)]
fn lloyd(points: &[Vec<f64>], mut centers: Vec<Vec<f64>>, params: &KmeansParams) -> KmeansResult {
    let width = points.first().map_or(0, Vec::len);
    let mut labels = vec![0; points.len()];

    for _ in 0..params.max_iterations {
        for (label, point) in labels.iter_mut().zip(points) {
            *label = nearest(point, &centers).0;
        }

        let mut sums = vec![vec![0.0; width]; centers.len()];
        let mut counts = vec![0_usize; centers.len()];
        for (point, &label) in points.iter().zip(&labels) {
            counts[label] += 1;
            for (s, x) in sums[label].iter_mut().zip(point) {
                *s += x;
            }
        }

        let mut shift = 0.0;
        for ((center, sum), &count) in centers.iter_mut().zip(sums).zip(&counts) {
            // Empty clusters keep their previous center.
            if count == 0 {
                continue;
            }
            let updated: Vec<f64> = sum.iter().map(|s| s / count as f64).collect();
            shift += squared_distance(center, &updated);
            *center = updated;
        }

        if shift <= params.tolerance {
            break;
        }
    }

    let mut inertia = 0.0;
    let mut sizes = vec![0; centers.len()];
    for (label, point) in labels.iter_mut().zip(points) {
        let (k, dist) = nearest(point, &centers);
        *label = k;
        sizes[k] += 1;
        inertia += dist;
    }

    KmeansResult {
        labels,
        centers,
        inertia,
        sizes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        let mut points = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)] {
            for (dx, dy) in [(0.1, 0.2), (-0.2, 0.1), (0.0, -0.1), (0.15, -0.15)] {
                points.push(vec![cx + dx, cy + dy]);
            }
        }
        points
    }

    fn params(k: usize) -> KmeansParams {
        KmeansParams {
            k,
            ..KmeansParams::default()
        }
    }

    #[test]
    fn separates_well_spaced_blobs() {
        let points = blobs();
        let result = kmeans(&points, &params(3)).unwrap();

        for labels in result.labels.chunks(4) {
            assert!(labels.iter().all(|&l| l == labels[0]));
        }
        assert_ne!(result.labels[0], result.labels[4]);
        assert_ne!(result.labels[4], result.labels[8]);
        assert_ne!(result.labels[0], result.labels[8]);
        assert_eq!(result.sizes, vec![4, 4, 4]);
        assert!(result.inertia < 1.0);
    }

    #[test]
    fn same_seed_gives_identical_output() {
        let points = blobs();
        let a = kmeans(&points, &params(4)).unwrap();
        let b = kmeans(&points, &params(4)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_points_do_not_break_seeding() {
        let points = vec![vec![1.0, 1.0]; 5];
        let result = kmeans(&points, &params(2)).unwrap();
        assert!(result.inertia.abs() < f64::EPSILON);
        assert_eq!(result.labels.len(), 5);
    }

    #[test]
    fn too_few_rows_is_an_error() {
        let points = vec![vec![0.0], vec![1.0]];
        assert!(matches!(
            kmeans(&points, &params(4)),
            Err(ClusterError::InsufficientRows {
                rows: 2,
                clusters: 4
            })
        ));
    }
}

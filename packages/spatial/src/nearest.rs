//! Nearest-neighbor distances over planar points.
//!
//! Equivalent to a k=2 nearest-neighbor query where the first hit is the
//! query point itself: each point gets the distance to the closest *other*
//! point. Coincident points are distinct points at distance 0.

use rstar::RTree;

/// Distance from each point to its nearest other point, in input units.
///
/// Returns `None` for every point when fewer than two points are given.
#[must_use]
pub fn nearest_neighbor_distances(points: &[[f64; 2]]) -> Vec<Option<f64>> {
    if points.len() < 2 {
        return vec![None; points.len()];
    }

    let tree = RTree::bulk_load(points.to_vec());

    points
        .iter()
        .map(|p| {
            // The query point itself is the first hit.
            tree.nearest_neighbor_iter_with_distance_2(p)
                .nth(1)
                .map(|(_, distance_2)| distance_2.sqrt())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_point_has_no_neighbor() {
        assert_eq!(nearest_neighbor_distances(&[[0.0, 0.0]]), vec![None]);
        assert!(nearest_neighbor_distances(&[]).is_empty());
    }

    #[test]
    fn finds_closest_other_point() {
        let points = [[0.0, 0.0], [3.0, 4.0], [100.0, 0.0]];
        let d = nearest_neighbor_distances(&points);
        assert!((d[0].unwrap() - 5.0).abs() < 1e-12);
        assert!((d[1].unwrap() - 5.0).abs() < 1e-12);
        assert!((d[2].unwrap() - 97.0_f64.hypot(4.0)).abs() < 1e-9);
    }

    #[test]
    fn coincident_points_are_zero_apart() {
        let points = [[1.0, 1.0], [1.0, 1.0], [50.0, 50.0]];
        let d = nearest_neighbor_distances(&points);
        assert_eq!(d[0], Some(0.0));
        assert_eq!(d[1], Some(0.0));
    }

    #[test]
    fn matches_brute_force_on_a_scattered_layout() {
        let points: Vec<[f64; 2]> = (0..60)
            .map(|i| {
                let t = f64::from(i);
                [(t * 37.0) % 101.0, (t * t * 13.0) % 89.0]
            })
            .collect();

        let fast = nearest_neighbor_distances(&points);
        for (i, p) in points.iter().enumerate() {
            let brute = points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, q)| (q[0] - p[0]).hypot(q[1] - p[1]))
                .fold(f64::INFINITY, f64::min);
            assert!((fast[i].unwrap() - brute).abs() < 1e-9);
        }
    }

    #[test]
    fn tight_cluster_with_distant_outlier() {
        let mut points: Vec<[f64; 2]> = (0..200)
            .map(|i| {
                let t = f64::from(i);
                [(t * 0.37) % 1.0, (t * 0.61) % 1.0]
            })
            .collect();
        points.push([1.0e6, 1.0e6]);

        let d = nearest_neighbor_distances(&points);
        let outlier = d[200].unwrap();
        assert!((outlier - 1.0e6_f64.hypot(1.0e6)).abs() < 2.0);
        for (i, p) in points[..200].iter().enumerate() {
            let brute = points[..200]
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, q)| (q[0] - p[0]).hypot(q[1] - p[1]))
                .fold(f64::INFINITY, f64::min);
            assert!((d[i].unwrap() - brute).abs() < 1e-9);
        }
    }
}

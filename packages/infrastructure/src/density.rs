//! Nearest-neighbor infrastructure density per neighborhood.
//!
//! For each analysis year the active facilities are projected into metres,
//! each gets the distance to its nearest other active facility citywide,
//! and the distances and counts are summarized per neighborhood.

use std::collections::{BTreeMap, BTreeSet};

use emci_infrastructure_models::{DensityMode, Facility, NeighborhoodDensity};
use emci_neighborhood::NeighborhoodSet;
use emci_spatial::nearest_neighbor_distances;
use emci_table::stats::{finite_or_zero, mean};

/// Distinct activation years, ascending.
#[must_use]
pub fn activation_years(facilities: &[Facility]) -> Vec<i32> {
    facilities
        .iter()
        .map(Facility::year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Computes density rows for every neighborhood and year.
///
/// In [`DensityMode::Cumulative`] a year sees the facilities activated on
/// or before it; in [`DensityMode::Snapshot`] every year sees the whole
/// dataset and gets identical figures.
#[must_use]
pub fn compute_density(
    facilities: &[Facility],
    neighborhoods: &NeighborhoodSet,
    years: &[i32],
    mode: DensityMode,
) -> Vec<NeighborhoodDensity> {
    let years: BTreeSet<i32> = years.iter().copied().collect();
    let mut out = Vec::with_capacity(years.len() * neighborhoods.len());

    match mode {
        DensityMode::Cumulative => {
            for &year in &years {
                let active: Vec<&Facility> =
                    facilities.iter().filter(|f| f.year() <= year).collect();
                log::info!("{year}: {} active facilities", active.len());
                out.extend(density_for(&active, neighborhoods, year));
            }
        }
        DensityMode::Snapshot => {
            let active: Vec<&Facility> = facilities.iter().collect();
            log::info!("Snapshot of {} facilities", active.len());
            let snapshot = density_for(&active, neighborhoods, 0);
            for &year in &years {
                out.extend(snapshot.iter().cloned().map(|mut row| {
                    row.year = year;
                    row
                }));
            }
        }
    }

    out
}

/// Density rows for one active facility set.
fn density_for(
    active: &[&Facility],
    neighborhoods: &NeighborhoodSet,
    year: i32,
) -> Vec<NeighborhoodDensity> {
    let projected: Vec<_> = active
        .iter()
        .map(|f| neighborhoods.project(f.longitude, f.latitude))
        .collect();
    let points: Vec<[f64; 2]> = projected.iter().map(|p| [p.x(), p.y()]).collect();

    let distances = nearest_neighbor_distances(&points);
    let defined: Vec<f64> = distances.iter().flatten().copied().collect();
    let city_avg = mean(&defined);

    let mut by_name: BTreeMap<&str, (u64, Vec<f64>)> = BTreeMap::new();
    let mut unmatched = 0_usize;
    for (point, distance) in projected.iter().zip(&distances) {
        match neighborhoods.locate_projected(*point) {
            Some(n) => {
                let entry = by_name.entry(n.name.as_str()).or_default();
                entry.0 += 1;
                entry.1.extend(distance);
            }
            None => unmatched += 1,
        }
    }
    if unmatched > 0 {
        log::debug!("{unmatched} facilities fall outside every neighborhood");
    }

    neighborhoods
        .neighborhoods()
        .iter()
        .map(|n| {
            let (node_count, dists) = by_name
                .get(n.name.as_str())
                .map_or((0, &[][..]), |(c, d)| (*c, d.as_slice()));
            density_row(&n.name, year, node_count, n.area_km2, mean(dists), city_avg)
        })
        .collect()
}

/// Assembles one row, substituting 0 wherever a ratio is undefined.
#[allow(clippy::cast_precision_loss)]
fn density_row(
    name: &str,
    year: i32,
    node_count: u64,
    area_km2: f64,
    avg_nearest: Option<f64>,
    city_avg: Option<f64>,
) -> NeighborhoodDensity {
    let avg_nearest_dist_m = avg_nearest.map_or(0.0, finite_or_zero);
    let node_density_per_km2 = finite_or_zero(node_count as f64 / area_km2);

    let eci = match (node_count, city_avg) {
        (0, _) | (_, None) => 0.0,
        (_, Some(city)) => finite_or_zero(node_density_per_km2 / (avg_nearest_dist_m / city)),
    };
    let eci_log = if node_count > 0 { (eci + 1.0).log10() } else { 0.0 };

    NeighborhoodDensity {
        name: name.to_string(),
        year,
        node_count,
        area_km2,
        avg_nearest_dist_m,
        node_density_per_km2,
        city_avg_dist_m: city_avg.map_or(0.0, finite_or_zero),
        eci,
        eci_log,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use emci_neighborhood_models::NormalizedBoundary;
    use emci_spatial::Projection;
    use geo::{MultiPolygon, polygon};

    fn square(name: &str, x0: f64) -> NormalizedBoundary {
        NormalizedBoundary {
            name: name.to_string(),
            geometry: MultiPolygon(vec![polygon![
                (x: x0, y: 0.0),
                (x: x0 + 1000.0, y: 0.0),
                (x: x0 + 1000.0, y: 1000.0),
                (x: x0, y: 1000.0),
                (x: x0, y: 0.0),
            ]]),
        }
    }

    fn neighborhoods() -> NeighborhoodSet {
        NeighborhoodSet::from_boundaries(
            vec![square("West", 0.0), square("East", 1000.0)],
            &Projection::Identity,
        )
        .unwrap()
    }

    fn facility(x: f64, y: f64, year: i32) -> Facility {
        Facility {
            site_id: format!("{x}-{y}"),
            longitude: x,
            latitude: y,
            activated: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            borough: None,
        }
    }

    fn row<'a>(rows: &'a [NeighborhoodDensity], name: &str, year: i32) -> &'a NeighborhoodDensity {
        rows.iter().find(|r| r.name == name && r.year == year).unwrap()
    }

    #[test]
    fn empty_neighborhood_has_zero_eci() {
        let facilities = [facility(100.0, 100.0, 2016), facility(100.0, 400.0, 2016)];
        let rows = compute_density(&facilities, &neighborhoods(), &[2016], DensityMode::Cumulative);

        let east = row(&rows, "East", 2016);
        assert_eq!(east.node_count, 0);
        assert!(east.eci.abs() < f64::EPSILON);
        assert!(east.eci_log.abs() < f64::EPSILON);
        assert!(east.avg_nearest_dist_m.abs() < f64::EPSILON);
    }

    #[test]
    fn eci_scales_density_by_relative_spacing() {
        // West: two points 300 m apart. East: two points 100 m apart.
        let facilities = [
            facility(100.0, 100.0, 2016),
            facility(100.0, 400.0, 2016),
            facility(1500.0, 100.0, 2016),
            facility(1500.0, 200.0, 2016),
        ];
        let rows = compute_density(&facilities, &neighborhoods(), &[2016], DensityMode::Cumulative);

        let west = row(&rows, "West", 2016);
        let east = row(&rows, "East", 2016);
        assert!((west.area_km2 - 1.0).abs() < 1e-9);
        assert!((west.avg_nearest_dist_m - 300.0).abs() < 1e-9);
        assert!((east.avg_nearest_dist_m - 100.0).abs() < 1e-9);
        assert!((west.city_avg_dist_m - 200.0).abs() < 1e-9);
        // density 2 / (300 / 200)
        assert!((west.eci - 2.0 / 1.5).abs() < 1e-9);
        assert!((east.eci - 4.0).abs() < 1e-9);
        assert!((east.eci_log - 5.0_f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn cumulative_mode_grows_with_activation_year() {
        let facilities = [
            facility(100.0, 100.0, 2016),
            facility(100.0, 400.0, 2017),
            facility(400.0, 400.0, 2018),
        ];
        let rows = compute_density(
            &facilities,
            &neighborhoods(),
            &[2016, 2017, 2018],
            DensityMode::Cumulative,
        );

        assert_eq!(row(&rows, "West", 2016).node_count, 1);
        assert_eq!(row(&rows, "West", 2017).node_count, 2);
        assert_eq!(row(&rows, "West", 2018).node_count, 3);
        // A single active point has no neighbor.
        assert!(row(&rows, "West", 2016).eci.abs() < f64::EPSILON);
        assert!(row(&rows, "West", 2017).eci > 0.0);
    }

    #[test]
    fn snapshot_mode_repeats_full_dataset() {
        let facilities = [facility(100.0, 100.0, 2016), facility(100.0, 400.0, 2019)];
        let rows = compute_density(
            &facilities,
            &neighborhoods(),
            &[2016, 2017],
            DensityMode::Snapshot,
        );

        assert_eq!(rows.len(), 4);
        assert_eq!(row(&rows, "West", 2016).node_count, 2);
        assert!((row(&rows, "West", 2016).eci - row(&rows, "West", 2017).eci).abs() < 1e-12);
    }

    #[test]
    fn coincident_points_do_not_produce_nan() {
        let facilities = [facility(100.0, 100.0, 2016), facility(100.0, 100.0, 2016)];
        let rows = compute_density(&facilities, &neighborhoods(), &[2016], DensityMode::Cumulative);

        for r in &rows {
            assert!(r.eci.is_finite() && r.eci_log.is_finite());
        }
        assert!(row(&rows, "West", 2016).eci.abs() < f64::EPSILON);
    }
}

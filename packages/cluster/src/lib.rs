#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Neighborhood clustering on one year of the composite table.
//!
//! Features are mean-imputed, Yeo-Johnson transformed and z-scored before
//! a seeded K-Means partition. Independently, each row is named by a
//! quantile rule. Centers are reported in original feature units.

pub mod kmeans;
pub mod naming;
pub mod power;
pub mod scale;

use std::collections::BTreeMap;

use emci_cluster_models::{
    ClusterAssignment, ClusterCenter, ClusterLabel, ClusterParams, FEATURE_COUNT, FeatureRow,
    LabelSummary,
};
use emci_composite_models::{CompositeRecord, RecordKind};
use emci_table::stats::mean;
use strum::IntoEnumIterator;
use thiserror::Error;

pub use kmeans::{KmeansParams, KmeansResult, kmeans};
pub use naming::{NamingThresholds, name_row};
pub use power::PowerTransform;
pub use scale::StandardScaler;

/// Errors that can occur while clustering.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The composite table has no observed rows.
    #[error("Composite table has no observed rows")]
    NoObservedRows,

    /// The requested reference year has no observed rows.
    #[error("No observed composite rows for year {year}")]
    NoRowsForYear {
        /// Requested year.
        year: i32,
    },

    /// Fewer neighborhoods than clusters.
    #[error("Cannot form {clusters} clusters from {rows} rows")]
    InsufficientRows {
        /// Rows available.
        rows: usize,
        /// Clusters requested.
        clusters: usize,
    },

    /// Clustering parameters are unusable.
    #[error("Invalid clustering parameters: {message}")]
    InvalidParams {
        /// What is wrong.
        message: String,
    },
}

/// Everything produced by one clustering run.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// Year that was clustered.
    pub year: i32,
    /// One row per neighborhood, in input order.
    pub assignments: Vec<ClusterAssignment>,
    pub centers: Vec<ClusterCenter>,
    /// Per-label means, for labels that occur.
    pub labels: Vec<LabelSummary>,
    /// Rows per `(cluster, label)` pair.
    pub crosstab: BTreeMap<(usize, ClusterLabel), u64>,
}

/// Picks the year to cluster: `requested` if given, else the latest
/// observed year.
///
/// # Errors
///
/// Returns [`ClusterError`] if the table has no observed rows or none in
/// the requested year.
pub fn reference_year(
    records: &[CompositeRecord],
    requested: Option<i32>,
) -> Result<i32, ClusterError> {
    let observed = || records.iter().filter(|r| r.kind == RecordKind::Observed);
    match requested {
        Some(year) if observed().any(|r| r.year == year) => Ok(year),
        Some(year) => Err(ClusterError::NoRowsForYear { year }),
        None => observed()
            .map(|r| r.year)
            .max()
            .ok_or(ClusterError::NoObservedRows),
    }
}

/// Observed rows of `year` as feature rows, with non-finite values replaced
/// by the column mean of the finite ones.
#[must_use]
pub fn feature_table(records: &[CompositeRecord], year: i32) -> Vec<(String, FeatureRow)> {
    let rows: Vec<(String, [f64; FEATURE_COUNT])> = records
        .iter()
        .filter(|r| r.kind == RecordKind::Observed && r.year == year)
        .map(|r| (r.name.clone(), [r.update_index, r.eci, r.d, r.ecs, r.emci]))
        .collect();

    let fill: Vec<f64> = (0..FEATURE_COUNT)
        .map(|j| {
            let finite: Vec<f64> = rows.iter().map(|r| r.1[j]).filter(|v| v.is_finite()).collect();
            mean(&finite).unwrap_or(0.0)
        })
        .collect();

    rows.into_iter()
        .map(|(name, mut values)| {
            for (v, f) in values.iter_mut().zip(&fill) {
                if !v.is_finite() {
                    *v = *f;
                }
            }
            (name, FeatureRow::from_array(values))
        })
        .collect()
}

/// Clusters and names the neighborhoods of the reference year.
///
/// # Errors
///
/// Returns [`ClusterError`] if no year can be selected, the parameters are
/// invalid, or there are fewer neighborhoods than clusters.
pub fn cluster_neighborhoods(
    records: &[CompositeRecord],
    params: &ClusterParams,
) -> Result<ClusterOutcome, ClusterError> {
    let year = reference_year(records, params.reference_year)?;
    let table = feature_table(records, year);
    log::info!("Clustering {} neighborhoods for {year}", table.len());

    let raw: Vec<Vec<f64>> = table.iter().map(|(_, f)| f.to_array().to_vec()).collect();
    let power = PowerTransform::fit(&raw);
    log::debug!("Yeo-Johnson lambdas: {:?}", power.lambdas());
    let transformed = power.transform(&raw);
    let scaler = StandardScaler::fit(&transformed);
    let scaled = scaler.transform(&transformed);

    let result = kmeans(
        &scaled,
        &KmeansParams {
            k: params.clusters,
            restarts: params.restarts,
            max_iterations: params.max_iterations,
            tolerance: params.tolerance,
            seed: params.seed,
        },
    )?;
    log::info!("K-Means inertia {:.4}", result.inertia);

    let features: Vec<FeatureRow> = table.iter().map(|(_, f)| *f).collect();
    let thresholds =
        NamingThresholds::from_rows(&features).ok_or(ClusterError::NoRowsForYear { year })?;

    let assignments: Vec<ClusterAssignment> = table
        .iter()
        .zip(&result.labels)
        .map(|((name, f), &cluster)| ClusterAssignment {
            name: name.clone(),
            year,
            update_index: f.update_index,
            eci: f.eci,
            d: f.d,
            ecs: f.ecs,
            emci: f.emci,
            cluster,
            label: name_row(f, &thresholds),
        })
        .collect();

    let centers = result
        .centers
        .iter()
        .zip(&result.sizes)
        .enumerate()
        .map(|(cluster, (center, &size))| {
            let original = power.inverse(&scaler.inverse(center));
            let mut values = [0.0; FEATURE_COUNT];
            values.copy_from_slice(&original);
            if values.iter().any(|v| !v.is_finite()) {
                log::warn!("Cluster {cluster} center falls outside the transform's range");
            }
            let f = FeatureRow::from_array(values);
            ClusterCenter {
                cluster,
                size: size as u64,
                update_index: f.update_index,
                eci: f.eci,
                d: f.d,
                ecs: f.ecs,
                emci: f.emci,
            }
        })
        .collect();

    let mut crosstab = BTreeMap::new();
    for a in &assignments {
        *crosstab.entry((a.cluster, a.label)).or_insert(0) += 1;
    }

    Ok(ClusterOutcome {
        year,
        labels: summarize_labels(&assignments),
        assignments,
        centers,
        crosstab,
    })
}

/// Mean features and counts per label, in label order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize_labels(assignments: &[ClusterAssignment]) -> Vec<LabelSummary> {
    ClusterLabel::iter()
        .filter_map(|label| {
            let rows: Vec<[f64; FEATURE_COUNT]> = assignments
                .iter()
                .filter(|a| a.label == label)
                .map(|a| a.features().to_array())
                .collect();
            if rows.is_empty() {
                return None;
            }
            let n = rows.len() as f64;
            let mut sums = [0.0; FEATURE_COUNT];
            for row in &rows {
                for (s, v) in sums.iter_mut().zip(row) {
                    *s += v;
                }
            }
            let f = FeatureRow::from_array(sums.map(|s| s / n));
            Some(LabelSummary {
                label,
                count: rows.len() as u64,
                update_index: f.update_index,
                eci: f.eci,
                d: f.d,
                ecs: f.ecs,
                emci: f.emci,
            })
        })
        .collect()
}

/// Logs the cluster id by label cross tabulation.
pub fn log_crosstab(outcome: &ClusterOutcome) {
    log::info!("Cluster id x label ({}):", outcome.year);
    for ((cluster, label), count) in &outcome.crosstab {
        log::info!("  cluster {cluster} / {label}: {count}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        name: &str,
        year: i32,
        kind: RecordKind,
        eci: f64,
        d: f64,
        emci: f64,
    ) -> CompositeRecord {
        CompositeRecord {
            name: name.to_string(),
            year,
            kind,
            node_count: 1,
            area_km2: 1.0,
            eci,
            d,
            resource_count: 10,
            update_index: 1.0,
            building_density: 1.0,
            erp: 0.1,
            ecs: eci * 2.0,
            emci_raw: emci.exp_m1(),
            emci,
            erp_norm: None,
            ecs_norm: None,
            emci_norm: None,
        }
    }

    fn table() -> Vec<CompositeRecord> {
        let mut records = Vec::new();
        for i in 0..12 {
            let v = f64::from(i);
            records.push(record(
                &format!("N{i:02}"),
                2020,
                RecordKind::Observed,
                (v * 0.37).sin().abs() * 4.0,
                (v * 0.11) % 0.9,
                (v * 0.53).cos().abs() * 3.0,
            ));
            records.push(record(&format!("N{i:02}"), 2016, RecordKind::Observed, 1.0, 0.2, 0.5));
            records.push(record(&format!("N{i:02}"), 2028, RecordKind::Forecast, 1.0, 0.2, 9.0));
        }
        records
    }

    #[test]
    fn reference_year_defaults_to_latest_observed() {
        let records = table();
        assert_eq!(reference_year(&records, None).unwrap(), 2020);
        assert_eq!(reference_year(&records, Some(2016)).unwrap(), 2016);
        assert!(matches!(
            reference_year(&records, Some(2028)),
            Err(ClusterError::NoRowsForYear { year: 2028 })
        ));
        assert!(matches!(reference_year(&[], None), Err(ClusterError::NoObservedRows)));
    }

    #[test]
    fn missing_values_take_column_mean() {
        let mut records = table();
        records[0].eci = f64::NAN;
        let rows = feature_table(&records, 2020);
        assert_eq!(rows.len(), 12);

        let others: Vec<f64> = rows[1..].iter().map(|(_, f)| f.eci).collect();
        let expected = others.iter().sum::<f64>() / 11.0;
        assert!((rows[0].1.eci - expected).abs() < 1e-12);
    }

    #[test]
    fn clustering_is_deterministic() {
        let records = table();
        let params = ClusterParams::default();
        let a = cluster_neighborhoods(&records, &params).unwrap();
        let b = cluster_neighborhoods(&records, &params).unwrap();

        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.centers, b.centers);
        assert_eq!(a.year, 2020);
        assert_eq!(a.centers.len(), 4);
        assert_eq!(a.centers.iter().map(|c| c.size).sum::<u64>(), 12);
        assert_eq!(a.crosstab.values().sum::<u64>(), 12);
    }

    #[test]
    fn centers_are_reported_in_original_units() {
        let outcome = cluster_neighborhoods(&table(), &ClusterParams::default()).unwrap();
        for center in &outcome.centers {
            // UpdateIndex is constant, so every center sits on it.
            assert!((center.update_index - 1.0).abs() < 1e-9);
            assert!((-0.5..=4.5).contains(&center.eci), "{center:?}");
        }
    }

    #[test]
    fn label_summaries_cover_every_row() {
        let outcome = cluster_neighborhoods(&table(), &ClusterParams::default()).unwrap();
        assert_eq!(outcome.labels.iter().map(|s| s.count).sum::<u64>(), 12);
        // Top quartile of EMCI is always labelled first.
        let high = outcome
            .labels
            .iter()
            .find(|s| s.label == ClusterLabel::HighCapability)
            .unwrap();
        assert!(high.count >= 3);
    }

    #[test]
    fn too_few_neighborhoods_is_an_error() {
        let records = table()[..9].to_vec();
        assert!(matches!(
            cluster_neighborhoods(&records, &ClusterParams::default()),
            Err(ClusterError::InsufficientRows { rows: 3, clusters: 4 })
        ));
    }
}

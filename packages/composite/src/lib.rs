#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Composite Emergency Management Capability Index.
//!
//! Joins infrastructure density and building demand per neighborhood and
//! year, derives the pressure and coordination terms, and combines them
//! into EMCI. Observed rows are normalized within each year; each
//! neighborhood's EMCI trend is then extrapolated over a forecast horizon.

pub mod export;
pub mod forecast;
pub mod index;

use thiserror::Error;

pub use export::export_year;
pub use forecast::{annual_growth, forecast};
pub use index::{compute_observed, emci_raw, normalize_within_years};

use emci_composite_models::{CompositeParams, CompositeRecord};
use emci_demand_models::NeighborhoodDemand;
use emci_infrastructure_models::NeighborhoodDensity;

/// Errors that can occur while building the composite table.
#[derive(Debug, Error)]
pub enum CompositeError {
    /// Neither input table has any rows.
    #[error("No density or demand rows to combine")]
    NoRows,

    /// The configured update intensity is unusable.
    #[error("Update index must be a finite number, got {value}")]
    InvalidUpdateIndex {
        /// Configured value.
        value: f64,
    },

    /// No observed row exists for the requested export year.
    #[error("No composite rows for year {year}")]
    NoRowsForYear {
        /// Requested year.
        year: i32,
    },

    /// Writing the export failed.
    #[error(transparent)]
    Table(#[from] emci_table::TableError),
}

/// Builds the full composite table: normalized observed rows followed by
/// forecast rows.
///
/// # Errors
///
/// Returns [`CompositeError`] if both inputs are empty or the update index
/// is not finite.
pub fn compose(
    demand: &[NeighborhoodDemand],
    density: &[NeighborhoodDensity],
    params: &CompositeParams,
) -> Result<Vec<CompositeRecord>, CompositeError> {
    let mut records = compute_observed(demand, density, params.update_index)?;
    normalize_within_years(&mut records);
    let predicted = forecast(&records, &params.forecast_years);
    log::info!(
        "Composite table: {} observed rows, {} forecast rows",
        records.len(),
        predicted.len()
    );
    records.extend(predicted);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emci_composite_models::RecordKind;

    fn density(name: &str, year: i32, nodes: u64, eci: f64) -> NeighborhoodDensity {
        NeighborhoodDensity {
            name: name.to_string(),
            year,
            node_count: nodes,
            area_km2: 0.73,
            avg_nearest_dist_m: 120.0,
            node_density_per_km2: 0.0,
            city_avg_dist_m: 150.0,
            eci,
            eci_log: 0.0,
        }
    }

    fn demand(name: &str, year: i32, parcels: u64, d: f64) -> NeighborhoodDemand {
        NeighborhoodDemand {
            name: name.to_string(),
            year,
            parcel_count: parcels,
            d_mean: d,
            d_log_mean: d / 2.0,
        }
    }

    fn sample() -> Vec<CompositeRecord> {
        compose(
            &[
                demand("Astoria", 2016, 412, 0.31),
                demand("Inwood", 2016, 95, 0.27),
                demand("Astoria", 2020, 430, 0.33),
                demand("Inwood", 2020, 97, 0.29),
                demand("Tottenville", 2020, 301, 0.12),
            ],
            &[
                density("Astoria", 2016, 7, 3.1),
                density("Inwood", 2016, 2, 0.7),
                density("Astoria", 2020, 11, 4.9),
                density("Inwood", 2020, 3, 1.3),
            ],
            &CompositeParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn compose_appends_forecast_after_observed() {
        let rows = sample();
        let observed = rows.iter().filter(|r| r.kind == RecordKind::Observed).count();
        assert_eq!(observed, 5);
        // Astoria and Inwood have two years; Tottenville has one.
        assert_eq!(rows.len() - observed, 2 * 5);
        assert!(rows[..observed].iter().all(|r| r.kind == RecordKind::Observed));
        assert!(
            rows[observed..]
                .iter()
                .all(|r| r.emci_norm.is_none() && r.name != "Tottenville")
        );
    }

    #[test]
    fn csv_round_trip_preserves_values() {
        let rows = sample();
        let dir = std::env::temp_dir().join("emci_composite_round_trip");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("emci.csv");

        emci_table::write_rows(&path, &rows).unwrap();
        let back: Vec<CompositeRecord> = emci_table::read_rows(&path).unwrap();

        assert_eq!(back.len(), rows.len());
        for (a, b) in rows.iter().zip(&back) {
            assert_eq!((&a.name, a.year, a.kind), (&b.name, b.year, b.kind));
            assert_eq!((a.node_count, a.resource_count), (b.node_count, b.resource_count));
            for (x, y) in [(a.emci, b.emci), (a.erp, b.erp), (a.ecs, b.ecs), (a.d, b.d)] {
                assert!((x - y).abs() < 1e-9);
            }
            assert_eq!(a.emci_norm.is_some(), b.emci_norm.is_some());
            if let (Some(x), Some(y)) = (a.emci_norm, b.emci_norm) {
                assert!((x - y).abs() < 1e-9);
            }
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}

//! Composite rows joined onto neighborhood boundaries.

use std::collections::HashMap;
use std::path::Path;

use emci_composite_models::{CompositeRecord, RecordKind};
use emci_neighborhood_models::Neighborhood;
use emci_table::geojson_io::{to_properties, write_feature_collection};
use geojson::{Geometry, JsonObject};

use crate::CompositeError;

/// Pairs each neighborhood's original boundary with its observed composite
/// row for `year`. Neighborhoods without a row are left out.
///
/// # Errors
///
/// Returns [`CompositeError::NoRowsForYear`] if no observed row has `year`.
pub fn features_for_year(
    records: &[CompositeRecord],
    neighborhoods: &[Neighborhood],
    year: i32,
) -> Result<Vec<(Geometry, JsonObject)>, CompositeError> {
    let by_name: HashMap<&str, &CompositeRecord> = records
        .iter()
        .filter(|r| r.year == year && r.kind == RecordKind::Observed)
        .map(|r| (r.name.as_str(), r))
        .collect();
    if by_name.is_empty() {
        return Err(CompositeError::NoRowsForYear { year });
    }

    let mut features = Vec::with_capacity(by_name.len());
    for neighborhood in neighborhoods {
        let Some(record) = by_name.get(neighborhood.name.as_str()) else {
            log::warn!("No {year} composite row for {}", neighborhood.name);
            continue;
        };
        let geometry = Geometry::new(geojson::Value::from(&neighborhood.source_boundary));
        features.push((geometry, to_properties(record)?));
    }
    Ok(features)
}

/// Writes the `year` composite rows as a `GeoJSON` `FeatureCollection` in
/// the boundaries' original coordinates.
///
/// # Errors
///
/// Returns [`CompositeError`] if the year has no rows or the write fails.
pub fn export_year(
    path: &Path,
    records: &[CompositeRecord],
    neighborhoods: &[Neighborhood],
    year: i32,
) -> Result<(), CompositeError> {
    let features = features_for_year(records, neighborhoods, year)?;
    write_feature_collection(path, features)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, polygon};

    fn neighborhood(name: &str) -> Neighborhood {
        let boundary = MultiPolygon(vec![polygon![
            (x: -73.99, y: 40.75),
            (x: -73.98, y: 40.75),
            (x: -73.98, y: 40.76),
            (x: -73.99, y: 40.75),
        ]]);
        Neighborhood {
            name: name.to_string(),
            boundary: boundary.clone(),
            source_boundary: boundary,
            area_km2: 1.0,
        }
    }

    fn record(name: &str, year: i32, kind: RecordKind) -> CompositeRecord {
        CompositeRecord {
            name: name.to_string(),
            year,
            kind,
            node_count: 1,
            area_km2: 1.0,
            eci: 0.0,
            d: 0.0,
            resource_count: 0,
            update_index: 1.0,
            building_density: 1.0,
            erp: 1.0,
            ecs: 0.0,
            emci_raw: 0.0,
            emci: 0.0,
            erp_norm: Some(0.0),
            ecs_norm: Some(0.0),
            emci_norm: Some(0.0),
        }
    }

    #[test]
    fn joins_observed_rows_by_name() {
        let records = [
            record("Midtown", 2020, RecordKind::Observed),
            record("Midtown", 2026, RecordKind::Forecast),
        ];
        let features =
            features_for_year(&records, &[neighborhood("Midtown"), neighborhood("Inwood")], 2020)
                .unwrap();

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].1["name"], "Midtown");
        assert_eq!(features[0].1["kind"], "observed");
        assert!(features[0].1.contains_key("EMCI_norm"));
    }

    #[test]
    fn year_without_observed_rows_is_an_error() {
        let records = [record("Midtown", 2026, RecordKind::Forecast)];
        assert!(matches!(
            features_for_year(&records, &[neighborhood("Midtown")], 2026),
            Err(CompositeError::NoRowsForYear { year: 2026 })
        ));
    }

    #[test]
    fn writes_geojson_file() {
        let dir = std::env::temp_dir().join("emci_composite_export");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("emci_2020.geojson");

        export_year(
            &path,
            &[record("Midtown", 2020, RecordKind::Observed)],
            &[neighborhood("Midtown")],
            2020,
        )
        .unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("Midtown"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}

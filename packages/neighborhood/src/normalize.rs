//! Normalizes raw `GeoJSON` features into [`NormalizedBoundary`] values.
//!
//! Uses the source's [`NeighborhoodFieldMapping`] to extract the
//! neighborhood name and geometry from each feature, regardless of how the
//! export names its properties.

use emci_neighborhood_models::{NeighborhoodFieldMapping, NormalizedBoundary};
use geo::MultiPolygon;
use geojson::Feature;

/// Normalizes a list of raw `GeoJSON` features into boundaries.
///
/// Skips features with missing names or non-polygonal geometries.
#[must_use]
pub fn normalize_features(
    features: &[Feature],
    fields: &NeighborhoodFieldMapping,
) -> Vec<NormalizedBoundary> {
    let boundaries: Vec<NormalizedBoundary> = features
        .iter()
        .filter_map(|feature| normalize_feature(feature, fields))
        .collect();

    let skipped = features.len() - boundaries.len();
    if skipped > 0 {
        log::warn!(
            "Skipped {skipped} neighborhood features without a '{}' name or polygon geometry",
            fields.name_field
        );
    }

    boundaries
}

/// Normalizes a single `GeoJSON` feature.
fn normalize_feature(
    feature: &Feature,
    fields: &NeighborhoodFieldMapping,
) -> Option<NormalizedBoundary> {
    let props = feature.properties.as_ref()?;

    let name = props
        .get(&fields.name_field)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let geometry = to_multi_polygon(feature.geometry.clone()?)?;

    Some(NormalizedBoundary { name, geometry })
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multi_polygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) if !mp.0.is_empty() => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

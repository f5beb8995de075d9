#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Neighborhood boundary types.
//!
//! Defines where neighborhood (NTA) polygons come from and the normalized
//! boundary every stage joins against. Neighborhoods are static reference
//! data: loaded once per run, never mutated.

use std::path::PathBuf;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// Default property holding the neighborhood name in NTA exports.
pub const DEFAULT_NAME_FIELD: &str = "NTAName";

/// A neighborhood boundary file, deserialized from the pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborhoodSource {
    /// `GeoJSON` `FeatureCollection` of polygon features.
    pub path: PathBuf,
    /// Field mapping for extracting the name from each feature.
    #[serde(default, flatten)]
    pub fields: NeighborhoodFieldMapping,
}

/// Field mapping for extracting the neighborhood name from raw features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborhoodFieldMapping {
    /// Property field containing the unique neighborhood name.
    #[serde(default = "default_name_field")]
    pub name_field: String,
}

impl Default for NeighborhoodFieldMapping {
    fn default() -> Self {
        Self {
            name_field: default_name_field(),
        }
    }
}

fn default_name_field() -> String {
    DEFAULT_NAME_FIELD.to_string()
}

/// A normalized boundary straight out of the source file, before
/// projection.
#[derive(Debug, Clone)]
pub struct NormalizedBoundary {
    /// Trimmed neighborhood name.
    pub name: String,
    /// Polygon geometry in source coordinates.
    pub geometry: MultiPolygon<f64>,
}

/// A neighborhood ready for spatial joins.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    /// Unique neighborhood name; the join key for every neighborhood table.
    pub name: String,
    /// Boundary in projected metres.
    pub boundary: MultiPolygon<f64>,
    /// Boundary in source coordinates, kept for export.
    pub source_boundary: MultiPolygon<f64>,
    /// Projected polygon area in square kilometres.
    pub area_km2: f64,
}

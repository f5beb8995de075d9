//! `GeoJSON` export for external map renderers.

use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde::Serialize;

use crate::TableError;

/// Serializes `properties` into a `GeoJSON` property object.
///
/// Non-object serializations (e.g. a bare number) yield an empty object.
///
/// # Errors
///
/// Returns [`TableError::Json`] if `properties` cannot be serialized.
pub fn to_properties<T: Serialize>(properties: &T) -> Result<JsonObject, TableError> {
    match serde_json::to_value(properties)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(JsonObject::new()),
    }
}

/// Writes a `FeatureCollection` built from `(geometry, properties)` pairs.
///
/// # Errors
///
/// Returns [`TableError`] if serialization or the file write fails.
pub fn write_feature_collection(
    path: &Path,
    features: Vec<(Geometry, JsonObject)>,
) -> Result<(), TableError> {
    let count = features.len();
    let collection = FeatureCollection {
        bbox: None,
        features: features
            .into_iter()
            .map(|(geometry, properties)| Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
            .collect(),
        foreign_members: None,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| TableError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let body = serde_json::to_string(&collection)?;
    std::fs::write(path, body).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!("Wrote {count} features to {}", path.display());
    Ok(())
}

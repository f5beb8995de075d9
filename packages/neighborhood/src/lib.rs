#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Neighborhood boundary loading, normalization, and point attribution.
//!
//! Reads neighborhood (NTA) polygons from a `GeoJSON` file, normalizes
//! them, projects them into metres, and builds the spatial index every
//! later stage uses to assign parcels and facilities to a neighborhood.

pub mod normalize;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use emci_neighborhood_models::{Neighborhood, NeighborhoodSource, NormalizedBoundary};
use emci_spatial::{Projection, Projector, SpatialIndex};
use geo::{Area, BoundingRect, Coord, Point, Rect};
use geojson::GeoJson;
use thiserror::Error;

/// Errors that can occur during neighborhood operations.
#[derive(Debug, Error)]
pub enum NeighborhoodError {
    /// Reading the boundary file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Boundary file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Data conversion or normalization error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// Two features share a name, which would make joins ambiguous.
    #[error("Duplicate neighborhood name: {name}")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },
}

/// Neighborhoods loaded for a run, with their spatial index.
pub struct NeighborhoodSet {
    neighborhoods: Vec<Neighborhood>,
    index: SpatialIndex,
    projector: Projector,
}

impl NeighborhoodSet {
    /// Loads and projects the neighborhoods described by `source`.
    ///
    /// # Errors
    ///
    /// Returns [`NeighborhoodError`] if the file cannot be read or parsed,
    /// holds no usable polygons, or repeats a neighborhood name.
    pub fn load(
        source: &NeighborhoodSource,
        projection: &Projection,
    ) -> Result<Self, NeighborhoodError> {
        let features = read_features(&source.path)?;
        log::info!(
            "Read {} features from {}",
            features.len(),
            source.path.display()
        );

        let boundaries = normalize::normalize_features(&features, &source.fields);
        if boundaries.is_empty() {
            return Err(NeighborhoodError::Conversion {
                message: format!(
                    "{} contains no polygon features with a '{}' property",
                    source.path.display(),
                    source.fields.name_field
                ),
            });
        }

        Self::from_boundaries(boundaries, projection)
    }

    /// Projects normalized boundaries and builds the spatial index.
    ///
    /// # Errors
    ///
    /// Returns [`NeighborhoodError::DuplicateName`] if a name repeats.
    pub fn from_boundaries(
        boundaries: Vec<NormalizedBoundary>,
        projection: &Projection,
    ) -> Result<Self, NeighborhoodError> {
        let mut seen = BTreeSet::new();
        for boundary in &boundaries {
            if !seen.insert(boundary.name.as_str()) {
                return Err(NeighborhoodError::DuplicateName {
                    name: boundary.name.clone(),
                });
            }
        }

        let projector = projection.resolve(extent(&boundaries));

        let neighborhoods: Vec<Neighborhood> = boundaries
            .into_iter()
            .map(|b| {
                let boundary = projector.multi_polygon(&b.geometry);
                let area_km2 = boundary.unsigned_area() / 1_000_000.0;
                Neighborhood {
                    name: b.name,
                    boundary,
                    source_boundary: b.geometry,
                    area_km2,
                }
            })
            .collect();

        let index = SpatialIndex::build(neighborhoods.iter().map(|n| &n.boundary));
        log::info!("Loaded {} neighborhoods", neighborhoods.len());

        Ok(Self {
            neighborhoods,
            index,
            projector,
        })
    }

    /// All neighborhoods in file order.
    #[must_use]
    pub fn neighborhoods(&self) -> &[Neighborhood] {
        &self.neighborhoods
    }

    /// Number of neighborhoods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.neighborhoods.len()
    }

    /// Whether no neighborhoods were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighborhoods.is_empty()
    }

    /// The projector fixed for this run.
    #[must_use]
    pub const fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Projects a source coordinate into metres.
    #[must_use]
    pub fn project(&self, x: f64, y: f64) -> Point<f64> {
        self.projector.point(x, y)
    }

    /// Neighborhood containing a source-coordinate point, if any.
    #[must_use]
    pub fn locate(&self, x: f64, y: f64) -> Option<&Neighborhood> {
        self.locate_projected(self.project(x, y))
    }

    /// Neighborhood containing an already projected point, if any.
    #[must_use]
    pub fn locate_projected(&self, point: Point<f64>) -> Option<&Neighborhood> {
        self.index
            .lookup(point)
            .and_then(|i| self.neighborhoods.get(i))
    }
}

fn read_features(path: &Path) -> Result<Vec<geojson::Feature>, NeighborhoodError> {
    let text = std::fs::read_to_string(path).map_err(|source| NeighborhoodError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => Ok(fc.features),
        GeoJson::Feature(f) => Ok(vec![f]),
        GeoJson::Geometry(_) => Err(NeighborhoodError::Conversion {
            message: format!(
                "{} is a bare geometry; expected a FeatureCollection",
                path.display()
            ),
        }),
    }
}

/// Bounding rectangle over every boundary.
fn extent(boundaries: &[NormalizedBoundary]) -> Option<Rect<f64>> {
    boundaries
        .iter()
        .filter_map(|b| b.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
}

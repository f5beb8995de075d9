#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for neighborhood attribution.
//!
//! Builds an R-tree over neighborhood polygons and provides fast
//! point-in-polygon lookups. Used by the demand stage (parcel centroids)
//! and the infrastructure stage (facility points). All geometry handed to
//! this crate is expected in the planar, metre-based coordinates produced
//! by [`projection::Projector`].

pub mod nearest;
pub mod projection;

use geo::{BoundingRect, Contains, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};

pub use nearest::nearest_neighbor_distances;
pub use projection::{Projection, Projector};

/// A boundary polygon stored in the R-tree with the position of its
/// neighborhood in the caller's list.
struct BoundaryEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over a fixed list of neighborhood polygons.
///
/// Lookups return the position of the containing polygon in the list the
/// index was built from.
pub struct SpatialIndex {
    boundaries: RTree<BoundaryEntry>,
}

impl SpatialIndex {
    /// Builds the index. Polygons keep their iteration order as their index.
    #[must_use]
    pub fn build<'a>(polygons: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> Self {
        let entries: Vec<BoundaryEntry> = polygons
            .into_iter()
            .enumerate()
            .map(|(index, polygon)| BoundaryEntry {
                index,
                envelope: compute_envelope(polygon),
                polygon: polygon.clone(),
            })
            .collect();

        let boundaries = RTree::bulk_load(entries);
        log::debug!("Loaded {} boundaries into spatial index", boundaries.size());

        Self { boundaries }
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boundaries.size()
    }

    /// Whether the index holds no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boundaries.size() == 0
    }

    /// Returns the index of the polygon strictly containing `point`.
    ///
    /// Points on a boundary edge are not contained. Neighborhoods tile
    /// without overlap; if inputs do overlap, the lowest index wins so the
    /// result does not depend on R-tree layout.
    #[must_use]
    pub fn lookup(&self, point: Point<f64>) -> Option<usize> {
        let query_env = AABB::from_point([point.x(), point.y()]);

        self.boundaries
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.index)
            .min()
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

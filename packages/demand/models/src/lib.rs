#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Building demand row types.

use serde::{Deserialize, Serialize};

/// Demand terms for one parcel in one year.
///
/// `d_units` and `d_log` are normalized within the parcel's year and lie in
/// `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelDemand {
    /// Borough-block-lot identifier.
    pub parcel_id: String,
    /// Extract year.
    pub year: i32,
    /// Land-use code as read.
    pub land_use: Option<String>,
    /// Residential units, missing counted as 0.
    pub units_res: u32,
    /// Normalized log residential units.
    #[serde(rename = "D_units")]
    pub d_units: f64,
    /// Land-use weight.
    #[serde(rename = "D_type")]
    pub d_type: f64,
    /// Combined demand `0.7 * D_units + 0.3 * D_type`.
    #[serde(rename = "D")]
    pub d: f64,
    /// Normalized `log1p(5 * D)`.
    #[serde(rename = "D_log")]
    pub d_log: f64,
    /// Neighborhood containing the parcel centroid, if any.
    pub neighborhood: Option<String>,
}

/// Demand aggregated over the parcels of one neighborhood in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodDemand {
    /// Neighborhood name.
    pub name: String,
    /// Analysis year.
    pub year: i32,
    /// Parcels whose centroid falls in the neighborhood.
    pub parcel_count: u64,
    /// Mean parcel `D`; 0 when there are no parcels.
    #[serde(rename = "D_mean")]
    pub d_mean: f64,
    /// Mean parcel `D_log`; 0 when there are no parcels.
    #[serde(rename = "D_log_mean")]
    pub d_log_mean: f64,
}

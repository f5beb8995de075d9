#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Facility and infrastructure density types.
//!
//! Facilities are point features (street kiosks and similar) with an
//! activation date. Density is summarized per neighborhood and year.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which facilities count toward a given analysis year.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DensityMode {
    /// Facilities activated on or before the year.
    #[default]
    Cumulative,
    /// Every facility in the dataset, regardless of activation year.
    Snapshot,
}

/// A facility file and how to read it, as configured by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitySource {
    /// Delimited text file with a header row.
    pub path: PathBuf,
    /// Header names of the columns used.
    #[serde(default)]
    pub columns: FacilityFieldMapping,
    /// Status value marking a live deployment, compared case-insensitively.
    #[serde(default = "default_live_status")]
    pub live_status: String,
    /// Year membership policy.
    #[serde(default)]
    pub mode: DensityMode,
    /// Analysis years. When unset the caller decides.
    #[serde(default)]
    pub years: Option<Vec<i32>>,
}

fn default_live_status() -> String {
    "live".to_string()
}

/// Header names for each facility attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityFieldMapping {
    /// Facility identifier.
    pub site_id: String,
    /// Deployment status.
    pub status: String,
    /// Longitude (or projected x).
    pub longitude: String,
    /// Latitude (or projected y).
    pub latitude: String,
    /// Activation date.
    pub activated: String,
    /// Borough name. Optional: a file without it yields facilities with no
    /// borough.
    pub borough: String,
}

impl Default for FacilityFieldMapping {
    fn default() -> Self {
        Self {
            site_id: "Site ID".to_string(),
            status: "Installation Status".to_string(),
            longitude: "Longitude".to_string(),
            latitude: "Latitude".to_string(),
            activated: "Activation Complete".to_string(),
            borough: "Borough".to_string(),
        }
    }
}

/// A live facility with known location and activation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    /// Facility identifier.
    pub site_id: String,
    /// Longitude (or projected x).
    pub longitude: f64,
    /// Latitude (or projected y).
    pub latitude: f64,
    /// Activation date.
    pub activated: NaiveDate,
    /// Borough, when the file records one.
    pub borough: Option<String>,
}

impl Facility {
    /// Calendar year of activation.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.activated.year()
    }
}

/// Facilities activated per borough and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationCount {
    /// Borough; empty for facilities without one.
    pub borough: Option<String>,
    /// Activation year.
    pub year: i32,
    /// Facilities activated that year.
    pub activated: u64,
    /// Facilities in the same borough activated up to and including that
    /// year.
    pub cumulative: u64,
}

/// Infrastructure density for one neighborhood in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodDensity {
    /// Neighborhood name.
    pub name: String,
    /// Analysis year.
    pub year: i32,
    /// Active facilities inside the neighborhood.
    pub node_count: u64,
    /// Neighborhood area in square kilometres.
    pub area_km2: f64,
    /// Mean distance from each facility here to its nearest other facility
    /// citywide, in metres; 0 without facilities.
    pub avg_nearest_dist_m: f64,
    /// `node_count / area_km2`.
    pub node_density_per_km2: f64,
    /// Mean nearest-neighbor distance over every active facility citywide.
    pub city_avg_dist_m: f64,
    /// Density scaled by relative spacing; 0 wherever undefined.
    pub eci: f64,
    /// `log10(eci + 1)` with facilities present, else 0.
    pub eci_log: f64,
}

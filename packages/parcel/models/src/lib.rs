#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel types shared by the normalizer, the change classifier and the
//! demand stage.
//!
//! A parcel is one tax lot (BBL) observed in one yearly extract. Source
//! extracts differ in column naming from year to year; [`SourceFormat`]
//! definitions describe how each known extract maps onto the canonical
//! [`ParcelRecord`] columns.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One parcel observed in one year.
///
/// `(parcel_id, year)` is unique in a normalized table. Attributes absent
/// from the source extract are `None`, never inferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRecord {
    /// Borough-block-lot identifier.
    pub parcel_id: String,
    /// Extract year.
    pub year: i32,
    /// Land-use category code.
    pub land_use: Option<String>,
    /// Year of construction; 0 means unknown.
    pub year_built: Option<i32>,
    /// Gross building floor area.
    pub bldg_area: Option<f64>,
    /// Lot area.
    pub lot_area: Option<f64>,
    /// Residential unit count.
    pub units_res: Option<u32>,
    /// Centroid x in source coordinates (longitude for WGS84 sources).
    pub centroid_x: Option<f64>,
    /// Centroid y in source coordinates (latitude for WGS84 sources).
    pub centroid_y: Option<f64>,
}

impl ParcelRecord {
    /// Centroid as an `(x, y)` pair, when both coordinates are present and
    /// finite.
    #[must_use]
    pub fn centroid(&self) -> Option<(f64, f64)> {
        match (self.centroid_x, self.centroid_y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }
}

/// How a parcel changed over its observed history.
///
/// Assigned by the first matching rule in declaration order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum ChangeType {
    /// Year built changed and the last value is known.
    Rebuilt,
    /// Land-use code differs between the first and last observation.
    UseChange,
    /// Floor area grew by more than 10% of its minimum, or units increased.
    Expanded,
    /// None of the above.
    Stable,
}

impl ChangeType {
    /// All change types in rule priority order.
    pub const ALL: [Self; 4] = [Self::Rebuilt, Self::UseChange, Self::Expanded, Self::Stable];
}

/// One parcel's multi-year history folded into a single row.
///
/// `*_first`/`*_last` come from the earliest and latest observed rows;
/// `*_min`/`*_max` are extremes over the whole history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelChange {
    /// Borough-block-lot identifier.
    pub parcel_id: String,
    /// Earliest observed year.
    pub first_year: i32,
    /// Latest observed year.
    pub last_year: i32,
    /// Number of yearly observations.
    pub years_recorded: u32,
    /// Year built in the earliest observation.
    pub year_built_first: Option<i32>,
    /// Year built in the latest observation.
    pub year_built_last: Option<i32>,
    /// Land use in the earliest observation.
    pub land_use_first: Option<String>,
    /// Land use in the latest observation.
    pub land_use_last: Option<String>,
    /// Smallest building area across the history.
    pub bldg_area_min: Option<f64>,
    /// Largest building area across the history.
    pub bldg_area_max: Option<f64>,
    /// Smallest residential unit count across the history.
    pub units_res_min: Option<u32>,
    /// Largest residential unit count across the history.
    pub units_res_max: Option<u32>,
    /// Classified change.
    pub change_type: ChangeType,
}

/// Population-level growth in distinct parcels between observed years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRatio {
    /// Extract year.
    pub year: i32,
    /// Distinct parcel ids observed in `year`.
    pub parcel_count: u64,
    /// Relative change from the previous observed year; 0 for the first.
    pub update_ratio: f64,
}

/// Share of parcels per change type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeTypeShare {
    /// Change type.
    pub change_type: ChangeType,
    /// Parcels with this change type.
    pub count: u64,
    /// Percentage of all classified parcels, rounded to two decimals.
    pub share_pct: f64,
}

/// A parcel extract to ingest, as configured by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelSource {
    /// A single extract file, or a directory of extracts for the same
    /// format (for example one file per borough).
    pub path: PathBuf,
    /// Registry id of the extract's format.
    pub format: String,
    /// Year to use when none can be read from the file or directory name.
    #[serde(default)]
    pub year: Option<i32>,
}

/// How a source file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReaderKind {
    /// Delimited text with a header row.
    Csv,
    /// `GeoJSON` `FeatureCollection`; properties hold the attributes.
    Geojson,
}

impl ReaderKind {
    /// File extension handled by this reader.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Geojson => "geojson",
        }
    }
}

/// A versioned parcel extract format, loaded from the embedded registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFormat {
    /// Unique identifier (e.g. `"pluto_csv"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Revision of this mapping.
    pub version: u32,
    /// How to read the files.
    pub reader: ReaderKind,
    /// Year-extraction regexes, tried in order. Each captures either a
    /// four-digit `full` group or a two-digit `short` group.
    pub patterns: Vec<String>,
    /// Accepted source headers per canonical column.
    pub columns: ColumnMapping,
}

/// Accepted source headers for each canonical column.
///
/// Headers are matched case-insensitively after trimming; the first
/// candidate present in a file wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Parcel identifier. Required.
    pub parcel_id: Vec<String>,
    /// Land-use code.
    #[serde(default)]
    pub land_use: Vec<String>,
    /// Year built.
    #[serde(default)]
    pub year_built: Vec<String>,
    /// Building area.
    #[serde(default)]
    pub bldg_area: Vec<String>,
    /// Lot area.
    #[serde(default)]
    pub lot_area: Vec<String>,
    /// Residential units.
    #[serde(default)]
    pub units_res: Vec<String>,
    /// Centroid x. Only read when the geometry does not supply one.
    #[serde(default)]
    pub centroid_x: Vec<String>,
    /// Centroid y. Only read when the geometry does not supply one.
    #[serde(default)]
    pub centroid_y: Vec<String>,
}

impl ColumnMapping {
    /// Canonical column names paired with their accepted headers.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<&'static str, &[String]> {
        BTreeMap::from([
            ("parcel_id", self.parcel_id.as_slice()),
            ("land_use", self.land_use.as_slice()),
            ("year_built", self.year_built.as_slice()),
            ("bldg_area", self.bldg_area.as_slice()),
            ("lot_area", self.lot_area.as_slice()),
            ("units_res", self.units_res.as_slice()),
            ("centroid_x", self.centroid_x.as_slice()),
            ("centroid_y", self.centroid_y.as_slice()),
        ])
    }
}

/// New York City borough, as encoded by the first digit of a BBL.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Borough {
    Manhattan,
    Bronx,
    Brooklyn,
    Queens,
    #[serde(rename = "Staten Island")]
    #[strum(serialize = "Staten Island")]
    StatenIsland,
}

impl Borough {
    /// Borough encoded by the leading digit of a parcel id (`1`-`5`).
    #[must_use]
    pub fn from_parcel_id(parcel_id: &str) -> Option<Self> {
        match parcel_id.trim_start().as_bytes().first()? {
            b'1' => Some(Self::Manhattan),
            b'2' => Some(Self::Bronx),
            b'3' => Some(Self::Brooklyn),
            b'4' => Some(Self::Queens),
            b'5' => Some(Self::StatenIsland),
            _ => None,
        }
    }
}

/// A Certificates of Occupancy file, as configured by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateSource {
    /// Delimited text file with a header row.
    pub path: PathBuf,
    /// Header names of the columns used.
    #[serde(default)]
    pub columns: CertificateFieldMapping,
}

/// Header names for the certificate attributes.
///
/// An unset column is detected from the headers: the first one containing
/// `bbl` (or both `block` and `lot`) for the parcel id, and the first one
/// containing `date` or `issue` for the issue date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateFieldMapping {
    /// Parcel identifier (BBL).
    pub parcel_id: Option<String>,
    /// Issue date.
    pub issued: Option<String>,
}

/// One certificate of occupancy, reduced to the parcel and issue year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Borough-block-lot identifier.
    pub parcel_id: String,
    /// Issue year.
    pub year: i32,
}

/// Certificates issued per parcel, summed per borough and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoroughUpdateIndex {
    /// Borough from the parcel id's leading digit.
    pub borough: Borough,
    /// Extract year.
    pub year: i32,
    /// Certificates issued that year on parcels of the extract.
    #[serde(rename = "CO_count")]
    pub co_count: u64,
    /// Parcels in the borough's extract for that year.
    pub parcel_count: u64,
    /// `co_count / parcel_count`.
    #[serde(rename = "UpdateIndex")]
    pub update_index: f64,
}

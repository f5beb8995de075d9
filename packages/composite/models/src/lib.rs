#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Composite EMCI row types.
//!
//! A composite row joins a neighborhood's infrastructure density with its
//! building demand for one year. Observed rows come straight from the
//! inputs; forecast rows extend each neighborhood's EMCI trend into future
//! years and carry no normalized values.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Whether a composite row was computed from data or extrapolated.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
    Observed,
    Forecast,
}

/// The composite index for one neighborhood in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRecord {
    /// Neighborhood name.
    pub name: String,
    /// Analysis or forecast year.
    pub year: i32,
    /// Observed or forecast.
    pub kind: RecordKind,
    /// Active facilities inside the neighborhood.
    pub node_count: u64,
    /// Area used for building density; never 0.
    pub area_km2: f64,
    /// Infrastructure density index.
    pub eci: f64,
    /// Mean parcel demand.
    #[serde(rename = "D")]
    pub d: f64,
    /// Parcels matched to the neighborhood that year.
    pub resource_count: u64,
    /// Update intensity term.
    #[serde(rename = "UpdateIndex")]
    pub update_index: f64,
    /// `node_count / area_km2`.
    pub building_density: f64,
    /// Emergency resource pressure.
    #[serde(rename = "ERP")]
    pub erp: f64,
    /// Emergency coordination score.
    #[serde(rename = "ECS")]
    pub ecs: f64,
    /// Ratio before the log transform.
    #[serde(rename = "EMCI_raw")]
    pub emci_raw: f64,
    /// `log1p(EMCI_raw)`, or the clamped prediction on forecast rows.
    #[serde(rename = "EMCI")]
    pub emci: f64,
    #[serde(rename = "ERP_norm")]
    pub erp_norm: Option<f64>,
    #[serde(rename = "ECS_norm")]
    pub ecs_norm: Option<f64>,
    /// EMCI min-max normalized within the year; `None` on forecast rows.
    #[serde(rename = "EMCI_norm")]
    pub emci_norm: Option<f64>,
}

/// Average yearly EMCI change for one neighborhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRecord {
    pub name: String,
    /// First observed year.
    pub first_year: i32,
    /// Last observed year.
    pub last_year: i32,
    /// `None` when only one year was observed.
    pub annual_growth: Option<f64>,
}

/// Composite stage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeParams {
    /// Constant update intensity applied to every row.
    pub update_index: f64,
    /// Years to extrapolate the EMCI trend into.
    pub forecast_years: Vec<i32>,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            update_index: 1.0,
            forecast_years: (2026..=2030).collect(),
        }
    }
}

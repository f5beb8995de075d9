#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Neighborhood clustering types.
//!
//! Every clustered neighborhood gets two independent classifications: a
//! numeric K-Means cluster id and a rule-based semantic label. The two are
//! reported side by side and are not expected to agree.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Column names of the clustering features, in feature-vector order.
pub const FEATURE_NAMES: [&str; 5] = ["UpdateIndex", "eci", "D", "ECS", "EMCI"];

/// Number of clustering features.
pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Semantic neighborhood label from the quantile naming rule.
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
    EnumIter,
    AsRefStr,
)]
pub enum ClusterLabel {
    #[serde(rename = "high-capability composite")]
    #[strum(serialize = "high-capability composite")]
    HighCapability,
    #[serde(rename = "high-coordination")]
    #[strum(serialize = "high-coordination")]
    HighCoordination,
    #[serde(rename = "high-demand/renewal")]
    #[strum(serialize = "high-demand/renewal")]
    HighDemand,
    #[serde(rename = "low-support/vulnerable")]
    #[strum(serialize = "low-support/vulnerable")]
    LowSupport,
    #[serde(rename = "stable/moderate")]
    #[strum(serialize = "stable/moderate")]
    Stable,
}

/// Clustering features of one neighborhood, in original units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(rename = "UpdateIndex")]
    pub update_index: f64,
    pub eci: f64,
    #[serde(rename = "D")]
    pub d: f64,
    #[serde(rename = "ECS")]
    pub ecs: f64,
    #[serde(rename = "EMCI")]
    pub emci: f64,
}

impl FeatureRow {
    /// Values in [`FEATURE_NAMES`] order.
    #[must_use]
    pub const fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [self.update_index, self.eci, self.d, self.ecs, self.emci]
    }

    /// Builds a row from values in [`FEATURE_NAMES`] order.
    #[must_use]
    pub const fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        let [update_index, eci, d, ecs, emci] = values;
        Self {
            update_index,
            eci,
            d,
            ecs,
            emci,
        }
    }
}

/// Clustering stage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Year to cluster. Defaults to the latest observed year.
    pub reference_year: Option<i32>,
    /// Number of K-Means clusters.
    pub clusters: usize,
    /// Seed for centroid initialization.
    pub seed: u64,
    /// Independent initializations; the lowest inertia wins.
    pub restarts: usize,
    /// Iteration cap per initialization.
    pub max_iterations: usize,
    /// Stop once the total squared center shift falls below this.
    pub tolerance: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            reference_year: None,
            clusters: 4,
            seed: 42,
            restarts: 20,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

/// One neighborhood's cluster id and semantic label, with its features
/// after mean imputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub name: String,
    pub year: i32,
    #[serde(rename = "UpdateIndex")]
    pub update_index: f64,
    pub eci: f64,
    #[serde(rename = "D")]
    pub d: f64,
    #[serde(rename = "ECS")]
    pub ecs: f64,
    #[serde(rename = "EMCI")]
    pub emci: f64,
    /// K-Means cluster id, `0..clusters`.
    pub cluster: usize,
    /// Rule-based label.
    pub label: ClusterLabel,
}

impl ClusterAssignment {
    #[must_use]
    pub const fn features(&self) -> FeatureRow {
        FeatureRow {
            update_index: self.update_index,
            eci: self.eci,
            d: self.d,
            ecs: self.ecs,
            emci: self.emci,
        }
    }
}

/// A K-Means center mapped back to original feature units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCenter {
    pub cluster: usize,
    /// Neighborhoods assigned to the cluster.
    pub size: u64,
    #[serde(rename = "UpdateIndex")]
    pub update_index: f64,
    pub eci: f64,
    #[serde(rename = "D")]
    pub d: f64,
    #[serde(rename = "ECS")]
    pub ecs: f64,
    #[serde(rename = "EMCI")]
    pub emci: f64,
}

/// Mean features of the neighborhoods sharing a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub label: ClusterLabel,
    pub count: u64,
    #[serde(rename = "UpdateIndex")]
    pub update_index: f64,
    pub eci: f64,
    #[serde(rename = "D")]
    pub d: f64,
    #[serde(rename = "ECS")]
    pub ecs: f64,
    #[serde(rename = "EMCI")]
    pub emci: f64,
}

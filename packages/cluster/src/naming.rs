//! Quantile naming rule.

use emci_cluster_models::{ClusterLabel, FeatureRow};
use emci_table::stats::quantile;

/// Cut-offs derived from the clustered year's population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamingThresholds {
    /// 75th percentile of EMCI.
    pub emci_high: f64,
    /// 70th percentile of ECS.
    pub ecs_high: f64,
    /// 70th percentile of D.
    pub d_high: f64,
    /// 30th percentile of eci.
    pub eci_low: f64,
}

impl NamingThresholds {
    /// Computes the cut-offs, or `None` for an empty population.
    #[must_use]
    pub fn from_rows(rows: &[FeatureRow]) -> Option<Self> {
        let column = |f: fn(&FeatureRow) -> f64| rows.iter().map(f).collect::<Vec<_>>();
        Some(Self {
            emci_high: quantile(&column(|r| r.emci), 0.75)?,
            ecs_high: quantile(&column(|r| r.ecs), 0.70)?,
            d_high: quantile(&column(|r| r.d), 0.70)?,
            eci_low: quantile(&column(|r| r.eci), 0.30)?,
        })
    }
}

/// Labels one row; the first matching rule wins.
#[must_use]
pub fn name_row(row: &FeatureRow, thresholds: &NamingThresholds) -> ClusterLabel {
    if row.emci >= thresholds.emci_high {
        ClusterLabel::HighCapability
    } else if row.ecs >= thresholds.ecs_high {
        ClusterLabel::HighCoordination
    } else if row.d >= thresholds.d_high {
        ClusterLabel::HighDemand
    } else if row.eci <= thresholds.eci_low {
        ClusterLabel::LowSupport
    } else {
        ClusterLabel::Stable
    }
}

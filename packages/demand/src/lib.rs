#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Building demand index.
//!
//! Scores every parcel from its residential units and land use, one year at
//! a time, then averages the scores over the parcels whose centroid falls
//! in each neighborhood.

pub mod land_use;

use std::collections::{BTreeMap, BTreeSet};

use emci_demand_models::{NeighborhoodDemand, ParcelDemand};
use emci_neighborhood::NeighborhoodSet;
use emci_parcel_models::ParcelRecord;
use emci_table::stats::{mean, min_max_normalize};

pub use land_use::land_use_score;

/// Weight of the units term in `D`; the land-use term gets the remainder.
const UNITS_WEIGHT: f64 = 0.7;

/// Scale applied to `D` before the log used for `D_log`.
const LOG_SCALE: f64 = 5.0;

/// Computes demand terms for every parcel, normalizing within each year.
///
/// Parcels without a usable centroid, or whose centroid lies outside every
/// neighborhood, are kept with no neighborhood.
#[must_use]
pub fn score_parcels(records: &[ParcelRecord], neighborhoods: &NeighborhoodSet) -> Vec<ParcelDemand> {
    let mut by_year: BTreeMap<i32, Vec<&ParcelRecord>> = BTreeMap::new();
    for record in records {
        by_year.entry(record.year).or_default().push(record);
    }

    let mut out = Vec::with_capacity(records.len());
    for (year, parcels) in by_year {
        let scored = score_year(&parcels, neighborhoods);
        let unmatched = scored.iter().filter(|p| p.neighborhood.is_none()).count();
        log::info!(
            "{year}: scored {} parcels, {unmatched} outside every neighborhood",
            scored.len()
        );
        out.extend(scored);
    }
    out
}

fn score_year(parcels: &[&ParcelRecord], neighborhoods: &NeighborhoodSet) -> Vec<ParcelDemand> {
    let log_units: Vec<f64> = parcels
        .iter()
        .map(|p| f64::from(p.units_res.unwrap_or(0)).ln_1p())
        .collect();
    let d_units = min_max_normalize(&log_units);

    let d_type: Vec<f64> = parcels
        .iter()
        .map(|p| land_use_score(p.land_use.as_deref()))
        .collect();

    let d: Vec<f64> = d_units
        .iter()
        .zip(&d_type)
        .map(|(u, t)| UNITS_WEIGHT.mul_add(*u, (1.0 - UNITS_WEIGHT) * t))
        .collect();

    let log_d: Vec<f64> = d.iter().map(|v| (LOG_SCALE * v).ln_1p()).collect();
    let d_log = min_max_normalize(&log_d);

    parcels
        .iter()
        .enumerate()
        .map(|(i, p)| ParcelDemand {
            parcel_id: p.parcel_id.clone(),
            year: p.year,
            land_use: p.land_use.clone(),
            units_res: p.units_res.unwrap_or(0),
            d_units: d_units[i],
            d_type: d_type[i],
            d: d[i],
            d_log: d_log[i],
            neighborhood: p
                .centroid()
                .and_then(|(x, y)| neighborhoods.locate(x, y))
                .map(|n| n.name.clone()),
        })
        .collect()
}

/// Averages parcel demand per neighborhood and year.
///
/// Emits one row for every `names` x `years` pair; a neighborhood with no
/// matched parcels in a year gets a zero row rather than no row.
#[must_use]
pub fn aggregate_by_neighborhood(
    parcels: &[ParcelDemand],
    names: &[String],
    years: &[i32],
) -> Vec<NeighborhoodDemand> {
    let mut groups: BTreeMap<(&str, i32), (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for parcel in parcels {
        if let Some(name) = &parcel.neighborhood {
            let entry = groups.entry((name.as_str(), parcel.year)).or_default();
            entry.0.push(parcel.d);
            entry.1.push(parcel.d_log);
        }
    }

    let years: BTreeSet<i32> = years.iter().copied().collect();
    let mut out = Vec::with_capacity(names.len() * years.len());
    for &year in &years {
        for name in names {
            let (d, d_log) = groups
                .get(&(name.as_str(), year))
                .map_or((&[][..], &[][..]), |(d, l)| (d.as_slice(), l.as_slice()));
            out.push(NeighborhoodDemand {
                name: name.clone(),
                year,
                parcel_count: d.len() as u64,
                d_mean: mean(d).unwrap_or(0.0),
                d_log_mean: mean(d_log).unwrap_or(0.0),
            });
        }
    }
    out
}

/// Distinct years present in the parcel demand table, ascending.
#[must_use]
pub fn demand_years(parcels: &[ParcelDemand]) -> Vec<i32> {
    parcels
        .iter()
        .map(|p| p.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

//! Observed composite rows.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use emci_composite_models::{CompositeRecord, RecordKind};
use emci_demand_models::NeighborhoodDemand;
use emci_infrastructure_models::NeighborhoodDensity;
use emci_table::stats::{finite_or_zero, min_max_normalize};

use crate::CompositeError;

/// Weight of demand in the EMCI denominator.
const DEMAND_WEIGHT: f64 = 0.5;

/// `ECS / (ERP * (1 + 0.5 * D))`, or 0 whenever `ERP` is not positive or
/// the ratio is undefined.
#[must_use]
pub fn emci_raw(erp: f64, ecs: f64, d: f64) -> f64 {
    if erp.is_nan() || erp <= 0.0 {
        return 0.0;
    }
    let denominator = erp * DEMAND_WEIGHT.mul_add(d, 1.0);
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    finite_or_zero(ecs / denominator)
}

/// Joins density and demand on `(name, year)` and computes the composite
/// terms for every pair present in either table.
///
/// A pair missing from the density table counts as having no facilities;
/// its area comes from another year of the same neighborhood when one
/// exists, else 1 km². A pair missing from the demand table has no parcels.
/// Rows are ordered by year, then name. Normalized values are left unset.
///
/// # Errors
///
/// Returns [`CompositeError::NoRows`] if both tables are empty and
/// [`CompositeError::InvalidUpdateIndex`] if `update_index` is not finite.
#[allow(clippy::cast_precision_loss)]
pub fn compute_observed(
    demand: &[NeighborhoodDemand],
    density: &[NeighborhoodDensity],
    update_index: f64,
) -> Result<Vec<CompositeRecord>, CompositeError> {
    if !update_index.is_finite() {
        return Err(CompositeError::InvalidUpdateIndex {
            value: update_index,
        });
    }
    if demand.is_empty() && density.is_empty() {
        return Err(CompositeError::NoRows);
    }

    let density_by_key: HashMap<(&str, i32), &NeighborhoodDensity> = density
        .iter()
        .map(|r| ((r.name.as_str(), r.year), r))
        .collect();
    let demand_by_key: HashMap<(&str, i32), &NeighborhoodDemand> = demand
        .iter()
        .map(|r| ((r.name.as_str(), r.year), r))
        .collect();
    let mut area_by_name: BTreeMap<&str, f64> = BTreeMap::new();
    for row in density {
        area_by_name.entry(row.name.as_str()).or_insert(row.area_km2);
    }

    let keys: BTreeSet<(i32, &str)> = density_by_key
        .keys()
        .chain(demand_by_key.keys())
        .map(|&(name, year)| (year, name))
        .collect();

    let mut missing_density = 0_usize;
    let mut missing_demand = 0_usize;
    let mut records = Vec::with_capacity(keys.len());

    for (year, name) in keys {
        let density_row = density_by_key.get(&(name, year));
        let demand_row = demand_by_key.get(&(name, year));
        if density_row.is_none() {
            missing_density += 1;
        }
        if demand_row.is_none() {
            missing_demand += 1;
        }

        let node_count = density_row.map_or(0, |r| r.node_count);
        let eci = density_row.map_or(0.0, |r| finite_or_zero(r.eci));
        let area = density_row
            .map(|r| r.area_km2)
            .or_else(|| area_by_name.get(name).copied())
            .unwrap_or(1.0);
        let area_km2 = if area.is_finite() && area > 0.0 { area } else { 1.0 };
        let d = demand_row.map_or(0.0, |r| finite_or_zero(r.d_mean));
        let resource_count = demand_row.map_or(0, |r| r.parcel_count);

        let building_density = node_count as f64 / area_km2;
        let resources = resource_count as f64;
        let erp = finite_or_zero(update_index * building_density / (resources + 1.0));
        let ecs = finite_or_zero(eci * (resources / (building_density + 1.0)));
        let emci_raw = emci_raw(erp, ecs, d);

        records.push(CompositeRecord {
            name: name.to_string(),
            year,
            kind: RecordKind::Observed,
            node_count,
            area_km2,
            eci,
            d,
            resource_count,
            update_index,
            building_density,
            erp,
            ecs,
            emci_raw,
            emci: finite_or_zero(emci_raw.ln_1p()),
            erp_norm: None,
            ecs_norm: None,
            emci_norm: None,
        });
    }

    if missing_density > 0 {
        log::warn!("{missing_density} neighborhood-years have demand but no density row");
    }
    if missing_demand > 0 {
        log::warn!("{missing_demand} neighborhood-years have density but no demand row");
    }
    Ok(records)
}

/// Min-max normalizes `ERP`, `ECS` and `EMCI` across the observed rows of
/// each year. Forecast rows are cleared.
pub fn normalize_within_years(records: &mut [CompositeRecord]) {
    let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, record) in records.iter_mut().enumerate() {
        match record.kind {
            RecordKind::Observed => by_year.entry(record.year).or_default().push(i),
            RecordKind::Forecast => {
                record.erp_norm = None;
                record.ecs_norm = None;
                record.emci_norm = None;
            }
        }
    }

    for indices in by_year.values() {
        let column = |f: fn(&CompositeRecord) -> f64| -> Vec<f64> {
            min_max_normalize(&indices.iter().map(|&i| f(&records[i])).collect::<Vec<_>>())
        };
        let erp = column(|r| r.erp);
        let ecs = column(|r| r.ecs);
        let emci = column(|r| r.emci);

        for (k, &i) in indices.iter().enumerate() {
            let record = &mut records[i];
            record.erp_norm = Some(erp[k]);
            record.ecs_norm = Some(ecs[k]);
            record.emci_norm = Some(emci[k]);
        }
    }
}

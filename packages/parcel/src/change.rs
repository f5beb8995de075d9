//! Folds each parcel's yearly history into a change category, and derives
//! the population-level update ratio series.

use std::collections::{BTreeMap, BTreeSet};

use emci_parcel_models::{ChangeType, ChangeTypeShare, ParcelChange, ParcelRecord, UpdateRatio};

/// Minimum relative growth of building area that counts as an expansion.
const AREA_GROWTH_THRESHOLD: f64 = 0.1;

/// Classifies every parcel in the table, ordered by parcel id.
#[must_use]
pub fn classify_changes(records: &[ParcelRecord]) -> Vec<ParcelChange> {
    let mut groups: BTreeMap<&str, Vec<&ParcelRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(&record.parcel_id).or_default().push(record);
    }

    let changes: Vec<ParcelChange> = groups
        .into_values()
        .filter_map(|mut history| {
            history.sort_by_key(|r| r.year);
            fold_history(&history)
        })
        .collect();

    log::info!("Classified {} parcels", changes.len());
    changes
}

fn fold_history(history: &[&ParcelRecord]) -> Option<ParcelChange> {
    let first = history.first()?;
    let last = history.last()?;

    let areas = history.iter().filter_map(|r| r.bldg_area);
    let units = history.iter().filter_map(|r| r.units_res);

    let mut change = ParcelChange {
        parcel_id: first.parcel_id.clone(),
        first_year: first.year,
        last_year: last.year,
        years_recorded: u32::try_from(history.len()).unwrap_or(u32::MAX),
        year_built_first: first.year_built,
        year_built_last: last.year_built,
        land_use_first: first.land_use.clone(),
        land_use_last: last.land_use.clone(),
        bldg_area_min: areas.clone().reduce(f64::min),
        bldg_area_max: areas.reduce(f64::max),
        units_res_min: units.clone().min(),
        units_res_max: units.max(),
        change_type: ChangeType::Stable,
    };
    change.change_type = classify(&change);
    Some(change)
}

/// Applies the change rules in priority order; the first match wins.
///
/// A missing land use compares equal to another missing land use.
/// Extremes over an attribute with no observed values never signal growth.
#[must_use]
pub fn classify(change: &ParcelChange) -> ChangeType {
    let rebuilt = change.year_built_first != change.year_built_last
        && change.year_built_last.is_some_and(|y| y > 0);
    if rebuilt {
        return ChangeType::Rebuilt;
    }

    if change.land_use_first != change.land_use_last {
        return ChangeType::UseChange;
    }

    let area_increase = match (change.bldg_area_min, change.bldg_area_max) {
        (Some(min), Some(max)) => (max - min) > AREA_GROWTH_THRESHOLD * min,
        _ => false,
    };
    let units_increase = match (change.units_res_min, change.units_res_max) {
        (Some(min), Some(max)) => max > min,
        _ => false,
    };
    if area_increase || units_increase {
        return ChangeType::Expanded;
    }

    ChangeType::Stable
}

/// Relative change in distinct parcel count from each observed year to the
/// next. The first observed year has ratio 0.
#[must_use]
pub fn update_ratio_by_year(records: &[ParcelRecord]) -> Vec<UpdateRatio> {
    let mut by_year: BTreeMap<i32, BTreeSet<&str>> = BTreeMap::new();
    for record in records {
        by_year.entry(record.year).or_default().insert(&record.parcel_id);
    }

    let mut previous: Option<u64> = None;
    by_year
        .into_iter()
        .map(|(year, ids)| {
            let parcel_count = ids.len() as u64;
            #[allow(clippy::cast_precision_loss)]
            let update_ratio = match previous {
                Some(prev) if prev > 0 => (parcel_count as f64 - prev as f64) / prev as f64,
                _ => 0.0,
            };
            previous = Some(parcel_count);
            UpdateRatio {
                year,
                parcel_count,
                update_ratio,
            }
        })
        .collect()
}

/// Percentage of parcels per change type, in rule priority order.
#[must_use]
pub fn change_type_shares(changes: &[ParcelChange]) -> Vec<ChangeTypeShare> {
    let total = changes.len() as u64;

    ChangeType::ALL
        .into_iter()
        .map(|change_type| {
            let count = changes
                .iter()
                .filter(|c| c.change_type == change_type)
                .count() as u64;
            #[allow(clippy::cast_precision_loss)]
            let share_pct = if total == 0 {
                0.0
            } else {
                (count as f64 / total as f64 * 10_000.0).round() / 100.0
            };
            log::info!("{change_type}: {count} parcels ({share_pct:.2}%)");
            ChangeTypeShare {
                change_type,
                count,
                share_pct,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parcel(
        id: &str,
        year: i32,
        land_use: &str,
        bldg_area: f64,
        units: u32,
        year_built: i32,
    ) -> ParcelRecord {
        ParcelRecord {
            parcel_id: id.to_string(),
            year,
            land_use: Some(land_use.to_string()),
            year_built: Some(year_built),
            bldg_area: Some(bldg_area),
            lot_area: None,
            units_res: Some(units),
            centroid_x: None,
            centroid_y: None,
        }
    }

    fn change_of<'a>(changes: &'a [ParcelChange], id: &str) -> &'a ParcelChange {
        changes.iter().find(|c| c.parcel_id == id).unwrap()
    }

    #[test]
    fn single_year_history_is_stable() {
        let changes = classify_changes(&[parcel("A", 2020, "4", 500.0, 2, 1990)]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::Stable);
        assert_eq!(changes[0].years_recorded, 1);
    }

    #[test]
    fn unit_increase_is_expanded_and_unchanged_is_stable() {
        let records = [
            parcel("A", 2016, "1", 1000.0, 0, 1920),
            parcel("A", 2020, "1", 1000.0, 0, 1920),
            parcel("B", 2016, "1", 1000.0, 0, 1920),
            parcel("B", 2020, "1", 1000.0, 5, 1920),
        ];
        let changes = classify_changes(&records);

        assert_eq!(change_of(&changes, "A").change_type, ChangeType::Stable);
        assert_eq!(change_of(&changes, "B").change_type, ChangeType::Expanded);
    }

    #[test]
    fn rules_apply_in_priority_order() {
        let records = [
            // Rebuilt beats use change and expansion.
            parcel("R", 2016, "1", 1000.0, 1, 1920),
            parcel("R", 2020, "5", 5000.0, 9, 2019),
            // Use change beats expansion.
            parcel("U", 2016, "1", 1000.0, 1, 1920),
            parcel("U", 2020, "5", 5000.0, 9, 1920),
            // A year built of 0 is unknown, not a rebuild.
            parcel("Z", 2016, "1", 1000.0, 1, 1920),
            parcel("Z", 2020, "1", 1000.0, 1, 0),
        ];
        let changes = classify_changes(&records);

        assert_eq!(change_of(&changes, "R").change_type, ChangeType::Rebuilt);
        assert_eq!(change_of(&changes, "U").change_type, ChangeType::UseChange);
        assert_eq!(change_of(&changes, "Z").change_type, ChangeType::Stable);
    }

    #[test]
    fn area_growth_must_exceed_ten_percent_of_minimum() {
        let records = [
            parcel("S", 2016, "1", 1000.0, 1, 1920),
            parcel("S", 2020, "1", 1100.0, 1, 1920),
            parcel("E", 2016, "1", 1000.0, 1, 1920),
            parcel("E", 2020, "1", 1100.5, 1, 1920),
        ];
        let changes = classify_changes(&records);

        assert_eq!(change_of(&changes, "S").change_type, ChangeType::Stable);
        assert_eq!(change_of(&changes, "E").change_type, ChangeType::Expanded);
    }

    #[test]
    fn first_last_come_from_years_and_extremes_from_history() {
        let records = [
            parcel("A", 2020, "2", 900.0, 3, 1950),
            parcel("A", 2016, "1", 1200.0, 1, 1950),
            parcel("A", 2018, "1", 800.0, 7, 1950),
        ];
        let changes = classify_changes(&records);
        let a = &changes[0];

        assert_eq!((a.first_year, a.last_year), (2016, 2020));
        assert_eq!(a.land_use_first.as_deref(), Some("1"));
        assert_eq!(a.land_use_last.as_deref(), Some("2"));
        assert_eq!(a.bldg_area_min, Some(800.0));
        assert_eq!(a.bldg_area_max, Some(1200.0));
        assert_eq!((a.units_res_min, a.units_res_max), (Some(1), Some(7)));
        assert_eq!(a.years_recorded, 3);
    }

    #[test]
    fn update_ratio_uses_previous_observed_year() {
        let records = [
            parcel("A", 2016, "1", 1.0, 0, 0),
            parcel("B", 2016, "1", 1.0, 0, 0),
            parcel("A", 2018, "1", 1.0, 0, 0),
            parcel("B", 2018, "1", 1.0, 0, 0),
            parcel("C", 2018, "1", 1.0, 0, 0),
        ];
        let ratios = update_ratio_by_year(&records);

        assert_eq!(ratios.len(), 2);
        assert!(ratios[0].update_ratio.abs() < f64::EPSILON);
        assert!((ratios[1].update_ratio - 0.5).abs() < 1e-12);
        assert_eq!(ratios[1].parcel_count, 3);
    }

    #[test]
    fn shares_cover_every_type() {
        let changes = classify_changes(&[
            parcel("A", 2016, "1", 1.0, 0, 0),
            parcel("B", 2016, "1", 1.0, 0, 0),
            parcel("B", 2020, "1", 1.0, 4, 0),
            parcel("C", 2016, "1", 1.0, 0, 0),
        ]);
        let shares = change_type_shares(&changes);

        assert_eq!(shares.len(), 4);
        let expanded = shares
            .iter()
            .find(|s| s.change_type == ChangeType::Expanded)
            .unwrap();
        assert_eq!(expanded.count, 1);
        assert!((expanded.share_pct - 33.33).abs() < 1e-9);
    }
}

//! EMCI trend extrapolation and growth summary.

use std::collections::BTreeMap;

use emci_composite_models::{CompositeRecord, GrowthRecord, RecordKind};
use emci_table::stats::{finite_or_zero, linear_fit};

/// Observed rows per neighborhood, in year order.
fn observed_by_name(records: &[CompositeRecord]) -> BTreeMap<&str, Vec<&CompositeRecord>> {
    let mut groups: BTreeMap<&str, Vec<&CompositeRecord>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.kind == RecordKind::Observed) {
        groups.entry(record.name.as_str()).or_default().push(record);
    }
    for rows in groups.values_mut() {
        rows.sort_by_key(|r| r.year);
    }
    groups
}

/// Extends each neighborhood's EMCI with a least-squares line over its
/// observed years.
///
/// Each forecast row copies the neighborhood's last observed row, with the
/// prediction clamped at 0 as `EMCI` and no normalized values. Neighborhoods
/// observed in fewer than two distinct years are skipped, as are forecast
/// years that are not after the last observed year.
#[must_use]
pub fn forecast(records: &[CompositeRecord], years: &[i32]) -> Vec<CompositeRecord> {
    let mut out = Vec::new();
    let mut skipped = 0_usize;

    for (name, rows) in observed_by_name(records) {
        let points: Vec<(f64, f64)> = rows.iter().map(|r| (f64::from(r.year), r.emci)).collect();
        let (Some(fit), Some(last)) = (linear_fit(&points), rows.last()) else {
            skipped += 1;
            continue;
        };
        log::debug!("{name}: EMCI slope {:.4} per year", fit.slope);

        for &year in years.iter().filter(|&&y| y > last.year) {
            out.push(CompositeRecord {
                year,
                kind: RecordKind::Forecast,
                emci: finite_or_zero(fit.predict(f64::from(year))).max(0.0),
                erp_norm: None,
                ecs_norm: None,
                emci_norm: None,
                ..(*last).clone()
            });
        }
    }

    if skipped > 0 {
        log::info!("{skipped} neighborhoods have fewer than two observed years and are not forecast");
    }
    out
}

/// Average yearly change in EMCI between each neighborhood's first and
/// last observed years.
#[must_use]
pub fn annual_growth(records: &[CompositeRecord]) -> Vec<GrowthRecord> {
    observed_by_name(records)
        .into_iter()
        .filter_map(|(name, rows)| {
            let (first, last) = (rows.first()?, rows.last()?);
            let span = last.year - first.year;
            let annual_growth =
                (span > 0).then(|| (last.emci - first.emci) / f64::from(span));
            Some(GrowthRecord {
                name: name.to_string(),
                first_year: first.year,
                last_year: last.year,
                annual_growth,
            })
        })
        .collect()
}

//! Loads live facilities from a delimited file.
//!
//! Only rows whose status matches the configured live status and whose
//! coordinates and activation date all parse are kept.

use std::collections::BTreeMap;

use emci_infrastructure_models::{ActivationCount, Facility, FacilitySource};
use emci_table::date::parse_date;

use crate::DensityError;

/// Reads the facility file and keeps live facilities with a location and
/// activation date.
///
/// # Errors
///
/// Returns [`DensityError`] if the file cannot be read or lacks one of the
/// configured columns.
pub fn load_facilities(source: &FacilitySource) -> Result<Vec<Facility>, DensityError> {
    let path = &source.path;
    let csv_err = |e| DensityError::Csv {
        path: path.clone(),
        source: e,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name.trim()));
    let column = |name: &str| {
        find(name).ok_or_else(|| DensityError::MissingColumn {
            path: path.clone(),
            column: name.to_string(),
        })
    };
    let fields = &source.columns;
    let site_col = column(&fields.site_id)?;
    let status_col = column(&fields.status)?;
    let lon_col = column(&fields.longitude)?;
    let lat_col = column(&fields.latitude)?;
    let date_col = column(&fields.activated)?;
    let borough_col = find(&fields.borough);
    if borough_col.is_none() {
        log::debug!(
            "{} has no '{}' column; activations are summarized without boroughs",
            path.display(),
            fields.borough
        );
    }

    let mut facilities = Vec::new();
    let mut total = 0_usize;
    let mut not_live = 0_usize;
    let mut incomplete = 0_usize;

    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        total += 1;
        let get = |i: usize| row.get(i).map(str::trim).filter(|s| !s.is_empty());

        let is_live =
            get(status_col).is_some_and(|s| s.eq_ignore_ascii_case(source.live_status.trim()));
        if !is_live {
            not_live += 1;
            continue;
        }

        let longitude = get(lon_col).and_then(parse_coordinate);
        let latitude = get(lat_col).and_then(parse_coordinate);
        let activated = get(date_col).and_then(parse_date);

        let (Some(longitude), Some(latitude), Some(activated)) = (longitude, latitude, activated)
        else {
            incomplete += 1;
            continue;
        };

        facilities.push(Facility {
            site_id: get(site_col).unwrap_or_default().to_string(),
            longitude,
            latitude,
            activated,
            borough: borough_col.and_then(get).map(str::to_string),
        });
    }

    log::info!(
        "Loaded {} live facilities from {} rows ({not_live} not live, {incomplete} missing location or activation date)",
        facilities.len(),
        total
    );
    Ok(facilities)
}

fn parse_coordinate(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Facilities activated per borough and year, with running totals that
/// restart for each borough.
///
/// Rows are ordered by borough, then year. Facilities without a borough
/// form their own group, listed first.
#[must_use]
pub fn activation_summary(facilities: &[Facility]) -> Vec<ActivationCount> {
    let mut by_key: BTreeMap<(Option<&str>, i32), u64> = BTreeMap::new();
    for facility in facilities {
        *by_key
            .entry((facility.borough.as_deref(), facility.year()))
            .or_default() += 1;
    }

    let mut cumulative = 0;
    let mut current: Option<Option<&str>> = None;
    by_key
        .into_iter()
        .map(|((borough, year), activated)| {
            if current != Some(borough) {
                current = Some(borough);
                cumulative = 0;
            }
            cumulative += activated;
            ActivationCount {
                borough: borough.map(str::to_string),
                year,
                activated,
                cumulative,
            }
        })
        .collect()
}

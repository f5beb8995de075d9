//! Building update intensity from Certificates of Occupancy.
//!
//! Certificates are matched to parcel extracts on `(parcel_id, year)` and
//! summed per borough, giving the share of a borough's parcels that
//! received a certificate in each extract year.

use std::collections::BTreeMap;

use chrono::Datelike;
use emci_parcel_models::{Borough, BoroughUpdateIndex, Certificate, CertificateSource, ParcelRecord};
use emci_table::date::parse_date;

use crate::ParcelError;
use crate::normalize::clean_code;

/// Reads certificates with a parcel id and a parseable issue date.
///
/// # Errors
///
/// Returns [`ParcelError`] if the file cannot be read, or if a parcel id or
/// issue date column can be neither found by name nor detected.
pub fn load_certificates(source: &CertificateSource) -> Result<Vec<Certificate>, ParcelError> {
    let path = &source.path;
    let csv_err = |source| ParcelError::Csv {
        path: path.clone(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();

    let missing = |column: &str| ParcelError::MissingColumn {
        path: path.clone(),
        column: column.to_string(),
    };
    let id_col = locate(&headers, source.columns.parcel_id.as_deref(), |h| {
        h.contains("bbl") || (h.contains("block") && h.contains("lot"))
    })
    .ok_or_else(|| missing(source.columns.parcel_id.as_deref().unwrap_or("bbl")))?;
    let date_col = locate(&headers, source.columns.issued.as_deref(), |h| {
        h.contains("date") || h.contains("issue")
    })
    .ok_or_else(|| missing(source.columns.issued.as_deref().unwrap_or("issue date")))?;

    log::debug!(
        "Certificates in {}: parcel id from '{}', issue date from '{}'",
        path.display(),
        headers[id_col],
        headers[date_col]
    );

    let mut certificates = Vec::new();
    let mut skipped = 0_usize;
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        let parcel_id = row.get(id_col).and_then(clean_code);
        let year = row.get(date_col).and_then(parse_date).map(|d| d.year());

        match (parcel_id, year) {
            (Some(parcel_id), Some(year)) => certificates.push(Certificate { parcel_id, year }),
            _ => skipped += 1,
        }
    }

    log::info!(
        "Loaded {} certificates from {} ({skipped} without a parcel id or issue date)",
        certificates.len(),
        path.display()
    );
    Ok(certificates)
}

/// Position of the configured header, or of the first header matching
/// `detect` when none is configured.
fn locate(
    headers: &[String],
    configured: Option<&str>,
    detect: impl Fn(&str) -> bool,
) -> Option<usize> {
    match configured {
        Some(name) => {
            let name = name.trim().to_lowercase();
            headers.iter().position(|h| *h == name)
        }
        None => headers.iter().position(|h| detect(h)),
    }
}

/// Certificates per parcel-year, summed per borough and year over the
/// parcels present in the extracts.
///
/// Certificates on parcels absent from that year's extract are not
/// counted. Parcels whose id does not start with a borough digit are
/// skipped. Rows are ordered by borough code, then year.
#[must_use]
pub fn update_index_by_borough(
    records: &[ParcelRecord],
    certificates: &[Certificate],
) -> Vec<BoroughUpdateIndex> {
    let mut per_parcel: BTreeMap<(&str, i32), u64> = BTreeMap::new();
    for certificate in certificates {
        *per_parcel
            .entry((certificate.parcel_id.as_str(), certificate.year))
            .or_default() += 1;
    }

    let mut groups: BTreeMap<(Borough, i32), (u64, u64)> = BTreeMap::new();
    let mut unknown = 0_usize;
    for record in records {
        let Some(borough) = Borough::from_parcel_id(&record.parcel_id) else {
            unknown += 1;
            continue;
        };
        let entry = groups.entry((borough, record.year)).or_default();
        entry.0 += per_parcel
            .get(&(record.parcel_id.as_str(), record.year))
            .copied()
            .unwrap_or(0);
        entry.1 += 1;
    }
    if unknown > 0 {
        log::warn!("{unknown} parcels have no borough digit and are left out of the update index");
    }

    groups
        .into_iter()
        .map(|((borough, year), (co_count, parcel_count))| {
            #[allow(clippy::cast_precision_loss)]
            let update_index = co_count as f64 / parcel_count as f64;
            BoroughUpdateIndex {
                borough,
                year,
                co_count,
                parcel_count,
                update_index,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use emci_parcel_models::CertificateFieldMapping;

    fn parcel(id: &str, year: i32) -> ParcelRecord {
        ParcelRecord {
            parcel_id: id.to_string(),
            year,
            land_use: None,
            year_built: None,
            bldg_area: None,
            lot_area: None,
            units_res: None,
            centroid_x: None,
            centroid_y: None,
        }
    }

    fn certificate(id: &str, year: i32) -> Certificate {
        Certificate {
            parcel_id: id.to_string(),
            year,
        }
    }

    fn write_file(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("emci_occupancy_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("certificates.csv");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn borough_comes_from_leading_digit() {
        assert_eq!(Borough::from_parcel_id("1000010001"), Some(Borough::Manhattan));
        assert_eq!(Borough::from_parcel_id(" 5012340001"), Some(Borough::StatenIsland));
        assert_eq!(Borough::from_parcel_id("6000010001"), None);
        assert_eq!(Borough::from_parcel_id(""), None);
        assert_eq!(Borough::StatenIsland.to_string(), "Staten Island");
    }

    #[test]
    fn index_is_certificates_over_parcels_per_borough_year() {
        let parcels = [
            parcel("1000010001", 2016),
            parcel("1000010002", 2016),
            parcel("1000010001", 2017),
            parcel("3000010001", 2016),
            parcel("9999999999", 2016),
        ];
        let certificates = [
            certificate("1000010001", 2016),
            certificate("1000010001", 2016),
            certificate("1000010001", 2017),
            // Not in the 2018 extract.
            certificate("1000010001", 2018),
            // Parcel not in any extract.
            certificate("1000099999", 2016),
        ];
        let rows = update_index_by_borough(&parcels, &certificates);

        let summary: Vec<(Borough, i32, u64, u64)> = rows
            .iter()
            .map(|r| (r.borough, r.year, r.co_count, r.parcel_count))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Borough::Manhattan, 2016, 2, 2),
                (Borough::Manhattan, 2017, 1, 1),
                (Borough::Brooklyn, 2016, 0, 1),
            ]
        );
        assert!((rows[0].update_index - 1.0).abs() < 1e-12);
        assert!(rows[2].update_index.abs() < f64::EPSILON);
    }

    #[test]
    fn detects_columns_and_skips_unusable_rows() {
        let path = write_file(
            "detect",
            "Job Number,C of O Issue Date,BBL\n\
             1,05/17/2016,1000010001.0\n\
             2,2017-02-01T00:00:00.000,3000010001\n\
             3,,1000010001\n\
             4,not a date,1000010001\n\
             5,05/17/2016,\n",
        );
        let source = CertificateSource {
            path: path.clone(),
            columns: CertificateFieldMapping::default(),
        };
        let certificates = load_certificates(&source).unwrap();

        assert_eq!(
            certificates,
            vec![certificate("1000010001", 2016), certificate("3000010001", 2017)]
        );
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn configured_column_must_exist() {
        let path = write_file("configured", "BBL,Issued\n1000010001,2016-01-01\n");
        let source = CertificateSource {
            path: path.clone(),
            columns: CertificateFieldMapping {
                parcel_id: None,
                issued: Some("C of O Issue Date".to_string()),
            },
        };
        assert!(matches!(
            load_certificates(&source),
            Err(ParcelError::MissingColumn { column, .. }) if column == "C of O Issue Date"
        ));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}

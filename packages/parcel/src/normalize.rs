//! Reads yearly parcel extracts into canonical [`ParcelRecord`] rows.
//!
//! Each source is read through its registered [`SourceFormat`]: headers
//! are matched against the format's accepted names, the year comes from
//! the file or directory name, and every optional canonical column missing
//! from an extract is left empty. Tabular extracts must carry centroid
//! columns; polygon extracts derive the centroid from their geometry. Any
//! failure halts the whole run, so one bad year never silently corrupts
//! the merged table.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use emci_parcel_models::{ColumnMapping, ParcelRecord, ParcelSource, ReaderKind, SourceFormat};
use emci_table::progress::ProgressCallback;
use geo::Centroid;
use geojson::GeoJson;

use crate::ParcelError;
use crate::registry::find_format;
use crate::year::{YearExtractor, resolve_year};

/// Reads every configured source and returns the deduplicated table.
///
/// # Errors
///
/// Returns [`ParcelError`] if a format is unknown, a file cannot be read,
/// a required column is missing, or a year cannot be determined.
pub fn normalize_sources(
    sources: &[ParcelSource],
    fallback_year: Option<i32>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<ParcelRecord>, ParcelError> {
    let mut plan = Vec::new();
    for source in sources {
        let format = find_format(&source.format)?;
        let extractor = YearExtractor::new(&format.patterns)?;
        for file in list_source_files(&source.path, format.reader)? {
            let year = resolve_year(&extractor, &file, source.year, fallback_year)?;
            plan.push((file, year, format.clone()));
        }
    }

    progress.set_total(plan.len() as u64);

    let mut records = Vec::new();
    for (file, year, format) in &plan {
        progress.set_message(format!("{year}: {}", file.display()));
        let rows = read_extract(file, *year, format)?;
        log::info!("Read {} parcels for {year} from {}", rows.len(), file.display());
        records.extend(rows);
        progress.inc(1);
    }

    let (records, dropped) = deduplicate(records);
    if dropped > 0 {
        log::warn!("Dropped {dropped} duplicate (parcel_id, year) rows, keeping the first read");
    }

    progress.finish(format!("{} parcel-year rows", records.len()));
    Ok(records)
}

/// Keeps the first row read for each `(parcel_id, year)` pair.
///
/// Returns the surviving rows in input order and the number dropped.
#[must_use]
pub fn deduplicate(records: Vec<ParcelRecord>) -> (Vec<ParcelRecord>, usize) {
    let before = records.len();
    let mut seen = BTreeSet::new();
    let kept: Vec<ParcelRecord> = records
        .into_iter()
        .filter(|r| seen.insert((r.parcel_id.clone(), r.year)))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Expands a source path into the extract files it names.
///
/// A directory contributes its matching files and those of its immediate
/// subdirectories (per-borough layouts), in sorted order.
fn list_source_files(path: &Path, reader: ReaderKind) -> Result<Vec<PathBuf>, ParcelError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in read_dir_sorted(path)? {
        if entry.is_dir() {
            files.extend(
                read_dir_sorted(&entry)?
                    .into_iter()
                    .filter(|p| has_extension(p, reader)),
            );
        } else if has_extension(&entry, reader) {
            files.push(entry);
        }
    }

    if files.is_empty() {
        return Err(ParcelError::NoFiles {
            path: path.to_path_buf(),
        });
    }
    Ok(files)
}

fn read_dir_sorted(path: &Path) -> Result<Vec<PathBuf>, ParcelError> {
    let io_err = |source| ParcelError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = std::fs::read_dir(path)
        .map_err(io_err)?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort();
    Ok(entries)
}

fn has_extension(path: &Path, reader: ReaderKind) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(reader.extension()))
}

/// Reads one extract file.
fn read_extract(
    path: &Path,
    year: i32,
    format: &SourceFormat,
) -> Result<Vec<ParcelRecord>, ParcelError> {
    match format.reader {
        ReaderKind::Csv => read_csv_extract(path, year, &format.columns),
        ReaderKind::Geojson => read_geojson_extract(path, year, &format.columns),
    }
}

/// Positions of the canonical columns in an extract's header list.
#[derive(Debug)]
struct ResolvedColumns {
    parcel_id: usize,
    land_use: Option<usize>,
    year_built: Option<usize>,
    bldg_area: Option<usize>,
    lot_area: Option<usize>,
    units_res: Option<usize>,
    centroid_x: Option<usize>,
    centroid_y: Option<usize>,
}

fn resolve_columns(
    headers: &[String],
    mapping: &ColumnMapping,
    path: &Path,
) -> Result<ResolvedColumns, ParcelError> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let find = |candidates: &[String]| find_column(&normalized, candidates);

    let parcel_id =
        find(mapping.parcel_id.as_slice()).ok_or_else(|| ParcelError::MissingColumn {
            path: path.to_path_buf(),
            column: "parcel_id".to_string(),
        })?;

    let missing: Vec<&str> = mapping
        .entries()
        .into_iter()
        .filter(|&(_, candidates)| !candidates.is_empty() && find(candidates).is_none())
        .map(|(name, _)| name)
        .collect();
    if !missing.is_empty() {
        log::debug!(
            "{} lacks columns {}; leaving them empty",
            path.display(),
            missing.join(", ")
        );
    }

    Ok(ResolvedColumns {
        parcel_id,
        land_use: find(mapping.land_use.as_slice()),
        year_built: find(mapping.year_built.as_slice()),
        bldg_area: find(mapping.bldg_area.as_slice()),
        lot_area: find(mapping.lot_area.as_slice()),
        units_res: find(mapping.units_res.as_slice()),
        centroid_x: find(mapping.centroid_x.as_slice()),
        centroid_y: find(mapping.centroid_y.as_slice()),
    })
}

/// Position of the first candidate present among normalized headers.
fn find_column(normalized: &[String], candidates: &[String]) -> Option<usize> {
    candidates.iter().find_map(|c| {
        let c = normalize_header(c);
        normalized.iter().position(|h| *h == c)
    })
}

/// Lowercases and trims a header, dropping a UTF-8 byte-order mark.
fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

fn read_csv_extract(
    path: &Path,
    year: i32,
    mapping: &ColumnMapping,
) -> Result<Vec<ParcelRecord>, ParcelError> {
    let csv_err = |source| ParcelError::Csv {
        path: path.to_path_buf(),
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
        .map(String::from)
        .collect();
    let cols = resolve_columns(&headers, mapping, path)?;

    // Tabular extracts carry no geometry, so the centroid columns are required.
    for (column, position) in [("centroid_x", cols.centroid_x), ("centroid_y", cols.centroid_y)] {
        if position.is_none() {
            return Err(ParcelError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut records = Vec::new();
    let mut skipped = 0_usize;
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        let get = |i: usize| row.get(i).map(str::to_string);
        match build_record(get, &cols, year, None) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} rows without a parcel id in {}", path.display());
    }
    Ok(records)
}

fn read_geojson_extract(
    path: &Path,
    year: i32,
    mapping: &ColumnMapping,
) -> Result<Vec<ParcelRecord>, ParcelError> {
    let text = std::fs::read_to_string(path).map_err(|source| ParcelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let features = match text.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(fc)) => fc.features,
        Ok(GeoJson::Feature(f)) => vec![f],
        Ok(GeoJson::Geometry(_)) => Vec::new(),
        Err(e) => {
            return Err(ParcelError::GeoJson {
                path: path.to_path_buf(),
                source: Box::new(e),
            });
        }
    };

    // Property keys vary per feature; resolve against their union.
    let headers: Vec<String> = features
        .iter()
        .filter_map(|f| f.properties.as_ref())
        .flat_map(|p| p.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let cols = resolve_columns(&headers, mapping, path)?;

    let mut records = Vec::with_capacity(features.len());
    let mut skipped = 0_usize;
    for feature in features {
        let centroid = feature
            .geometry
            .and_then(|g| geo::Geometry::<f64>::try_from(g).ok())
            .and_then(|g| g.centroid())
            .map(|p| (p.x(), p.y()));

        let props = feature.properties.unwrap_or_default();
        let get = |i: usize| headers.get(i).and_then(|k| props.get(k)).and_then(json_text);

        match build_record(get, &cols, year, centroid) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} features without a parcel id in {}", path.display());
    }
    Ok(records)
}

fn json_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Builds one canonical row, or `None` when the parcel id is empty.
fn build_record(
    get: impl Fn(usize) -> Option<String>,
    cols: &ResolvedColumns,
    year: i32,
    geometry_centroid: Option<(f64, f64)>,
) -> Option<ParcelRecord> {
    let text = |col: Option<usize>| col.and_then(&get);
    let number = |col: Option<usize>| text(col).as_deref().and_then(parse_number);

    let parcel_id = clean_code(&get(cols.parcel_id)?)?;

    let (centroid_x, centroid_y) = geometry_centroid.map_or_else(
        || (number(cols.centroid_x), number(cols.centroid_y)),
        |(x, y)| (Some(x), Some(y)),
    );

    Some(ParcelRecord {
        parcel_id,
        year,
        land_use: text(cols.land_use).as_deref().and_then(clean_code),
        year_built: number(cols.year_built).and_then(to_i32),
        bldg_area: number(cols.bldg_area),
        lot_area: number(cols.lot_area),
        units_res: number(cols.units_res).and_then(to_count),
        centroid_x,
        centroid_y,
    })
}

/// Trims a code and strips a trailing `.0` left by float-typed exports.
pub(crate) fn clean_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let code = trimmed
        .strip_suffix(".0")
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(trimmed);
    (!code.is_empty()).then(|| code.to_string())
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[allow(clippy::cast_possible_truncation)]
fn to_i32(value: f64) -> Option<i32> {
    let rounded = value.round();
    (rounded >= f64::from(i32::MIN) && rounded <= f64::from(i32::MAX)).then(|| rounded as i32)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: f64) -> Option<u32> {
    let rounded = value.round();
    (rounded >= 0.0 && rounded <= f64::from(u32::MAX)).then(|| rounded as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emci_table::progress::null_progress;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("emci_parcel_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn record(id: &str, year: i32, units: Option<u32>) -> ParcelRecord {
        ParcelRecord {
            parcel_id: id.to_string(),
            year,
            land_use: Some("1".to_string()),
            year_built: Some(1950),
            bldg_area: Some(1000.0),
            lot_area: None,
            units_res: units,
            centroid_x: None,
            centroid_y: None,
        }
    }

    #[test]
    fn clean_code_strips_float_artifacts() {
        assert_eq!(clean_code(" 1000010001.0 ").as_deref(), Some("1000010001"));
        assert_eq!(clean_code("01").as_deref(), Some("01"));
        assert_eq!(clean_code("R1.0A").as_deref(), Some("R1.0A"));
        assert_eq!(clean_code("   "), None);
    }

    #[test]
    fn deduplicate_keeps_first_row_read() {
        let rows = vec![
            record("A", 2016, Some(1)),
            record("A", 2016, Some(9)),
            record("A", 2017, Some(2)),
        ];
        let (kept, dropped) = deduplicate(rows);

        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].units_res, Some(1));
    }

    #[test]
    fn reads_csv_with_varying_headers_and_missing_columns() {
        let dir = temp_dir("csv");
        std::fs::write(
            dir.join("pluto_16v2.csv"),
            "\u{feff}BBL,LandUse,UnitsRes,Longitude,Latitude\n\
             1000010001.0,01,4,-73.99,40.75\n\
             ,02,1,-73.98,40.74\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("pluto_2020.csv"),
            "bbl,land_use,yearbuilt,bldgarea,unitsres,latitude,longitude\n\
             1000010001,1,1931,2500,5.0,40.75,-73.99\n",
        )
        .unwrap();

        let sources = [ParcelSource {
            path: dir.clone(),
            format: "pluto_csv".to_string(),
            year: None,
        }];
        let rows = normalize_sources(&sources, None, &null_progress()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].year, 2016);
        assert_eq!(rows[0].parcel_id, "1000010001");
        assert_eq!(rows[0].land_use.as_deref(), Some("01"));
        assert_eq!(rows[0].year_built, None);
        assert_eq!(rows[0].centroid(), Some((-73.99, 40.75)));
        assert_eq!(rows[1].year, 2020);
        assert_eq!(rows[1].units_res, Some(5));
        assert_eq!(rows[1].year_built, Some(1931));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_parcel_id_column_is_fatal() {
        let dir = temp_dir("no_bbl");
        let file = dir.join("pluto_2019.csv");
        std::fs::write(&file, "landuse,unitsres\n1,2\n").unwrap();

        let sources = [ParcelSource {
            path: file,
            format: "pluto_csv".to_string(),
            year: None,
        }];
        let result = normalize_sources(&sources, None, &null_progress());
        assert!(matches!(result, Err(ParcelError::MissingColumn { .. })));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn state_plane_only_extract_is_rejected() {
        let dir = temp_dir("state_plane");
        std::fs::write(
            dir.join("pluto_16v2.csv"),
            "BBL,LandUse,UnitsRes,XCoord,YCoord\n1000010001,01,4,987654,210987\n",
        )
        .unwrap();

        let sources = [ParcelSource {
            path: dir.clone(),
            format: "pluto_csv".to_string(),
            year: None,
        }];
        let result = normalize_sources(&sources, None, &null_progress());
        assert!(matches!(
            result,
            Err(ParcelError::MissingColumn { column, .. }) if column == "centroid_x"
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reads_geojson_centroids_from_polygons() {
        let dir = temp_dir("geojson").join("mappluto_2018");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("brooklyn.geojson"),
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"BBL":3000010001.0,"LandUse":"2","UnitsRes":3},
                 "geometry":{"type":"Polygon","coordinates":[[[0,0],[2,0],[2,2],[0,2],[0,0]]]}}
            ]}"#,
        )
        .unwrap();

        let sources = [ParcelSource {
            path: dir.clone(),
            format: "mappluto_geojson".to_string(),
            year: None,
        }];
        let rows = normalize_sources(&sources, None, &null_progress()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].parcel_id, "3000010001");
        assert_eq!(rows[0].year, 2018);
        assert_eq!(rows[0].units_res, Some(3));
        let (x, y) = rows[0].centroid().unwrap();
        assert!((x - 1.0).abs() < 1e-12 && (y - 1.0).abs() < 1e-12);

        std::fs::remove_dir_all(dir.parent().unwrap()).ok();
    }
}

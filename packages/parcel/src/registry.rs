//! Compile-time registry of parcel extract formats.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Supporting a new extract layout requires creating a TOML file in
//! `formats/` and adding a corresponding entry here.

use emci_parcel_models::SourceFormat;

use crate::ParcelError;

/// Number of registered formats. Enforced by a test.
#[cfg(test)]
const EXPECTED_FORMAT_COUNT: usize = 2;

/// Embedded TOML format definitions.
const FORMAT_TOMLS: &[(&str, &str)] = &[
    ("pluto_csv", include_str!("../formats/pluto_csv.toml")),
    (
        "mappluto_geojson",
        include_str!("../formats/mappluto_geojson.toml"),
    ),
];

/// Returns all registered formats.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn all_formats() -> Vec<SourceFormat> {
    FORMAT_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse parcel format '{name}': {e}"))
        })
        .collect()
}

/// Looks up a format by id.
///
/// # Errors
///
/// Returns [`ParcelError::UnknownFormat`] if no format has this id.
pub fn find_format(id: &str) -> Result<SourceFormat, ParcelError> {
    all_formats()
        .into_iter()
        .find(|f| f.id == id)
        .ok_or_else(|| ParcelError::UnknownFormat { id: id.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use emci_parcel_models::ReaderKind;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_formats() {
        let formats = all_formats();
        assert_eq!(
            formats.len(),
            EXPECTED_FORMAT_COUNT,
            "Expected {EXPECTED_FORMAT_COUNT} parcel formats, found {}. \
             Update EXPECTED_FORMAT_COUNT after adding/removing formats.",
            formats.len()
        );
    }

    #[test]
    fn format_ids_are_unique() {
        let mut seen = BTreeSet::new();
        for format in &all_formats() {
            assert!(
                seen.insert(format.id.clone()),
                "Duplicate parcel format ID: {}",
                format.id
            );
        }
    }

    #[test]
    fn all_formats_have_required_fields() {
        for format in &all_formats() {
            assert!(!format.id.is_empty(), "Format has empty id");
            assert!(
                !format.name.is_empty(),
                "Format {} has empty name",
                format.id
            );
            assert!(
                !format.columns.parcel_id.is_empty(),
                "Format {} has no parcel_id column",
                format.id
            );
            assert!(
                !format.patterns.is_empty(),
                "Format {} has no year patterns",
                format.id
            );
        }
    }

    #[test]
    fn csv_formats_declare_wgs84_centroid_columns() {
        for format in all_formats().iter().filter(|f| f.reader == ReaderKind::Csv) {
            let columns = &format.columns;
            assert!(
                !columns.centroid_x.is_empty() && !columns.centroid_y.is_empty(),
                "Format {} has no centroid columns",
                format.id
            );
            for header in columns.centroid_x.iter().chain(&columns.centroid_y) {
                assert!(
                    !matches!(header.to_lowercase().as_str(), "xcoord" | "ycoord"),
                    "Format {} maps state plane column {header} to a centroid",
                    format.id
                );
            }
        }
    }

    #[test]
    fn all_patterns_compile_with_a_year_group() {
        for format in &all_formats() {
            for pattern in &format.patterns {
                let re = regex::Regex::new(pattern).unwrap_or_else(|e| {
                    panic!("Format {} has invalid pattern {pattern}: {e}", format.id)
                });
                let names: Vec<_> = re.capture_names().flatten().collect();
                assert!(
                    names.contains(&"full") || names.contains(&"short"),
                    "Format {} pattern {pattern} has no full/short group",
                    format.id
                );
            }
        }
    }

    #[test]
    fn unknown_format_is_an_error() {
        assert!(matches!(
            find_format("shapefile"),
            Err(ParcelError::UnknownFormat { .. })
        ));
        assert!(find_format("pluto_csv").is_ok());
    }
}

//! Extract-year detection from file and directory names.

use std::path::Path;

use regex::Regex;

use crate::ParcelError;

/// Compiled year patterns for one source format.
pub struct YearExtractor {
    patterns: Vec<Regex>,
}

impl YearExtractor {
    /// Compiles the format's patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ParcelError::Regex`] if a pattern is invalid.
    pub fn new(patterns: &[String]) -> Result<Self, ParcelError> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Year found in a single name, trying each pattern in order.
    ///
    /// A `full` group is taken as-is; a two-digit `short` group maps to
    /// `2000 + yy`.
    #[must_use]
    pub fn from_name(&self, name: &str) -> Option<i32> {
        self.patterns.iter().find_map(|re| {
            let caps = re.captures(name)?;
            if let Some(full) = caps.name("full") {
                return full.as_str().parse().ok();
            }
            caps.name("short")
                .and_then(|m| m.as_str().parse::<i32>().ok())
                .map(|yy| 2000 + yy)
        })
    }

    /// Year found in the file name, then in the parent directory name.
    #[must_use]
    pub fn from_path(&self, path: &Path) -> Option<i32> {
        let file_name = path.file_name().and_then(|n| n.to_str());
        let parent_name = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str());

        file_name
            .and_then(|n| self.from_name(n))
            .or_else(|| parent_name.and_then(|n| self.from_name(n)))
    }
}

/// Resolves the year for one extract file.
///
/// Falls back to the source's explicit year, then the global fallback.
///
/// # Errors
///
/// Returns [`ParcelError::NoYear`] if no year can be determined.
pub fn resolve_year(
    extractor: &YearExtractor,
    path: &Path,
    source_year: Option<i32>,
    fallback_year: Option<i32>,
) -> Result<i32, ParcelError> {
    if let Some(year) = extractor.from_path(path) {
        return Ok(year);
    }

    if let Some(year) = source_year.or(fallback_year) {
        log::warn!(
            "No year in '{}', using configured year {year}",
            path.display()
        );
        return Ok(year);
    }

    Err(ParcelError::NoYear {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pluto_extractor() -> YearExtractor {
        YearExtractor::new(&[
            "(?P<full>20[0-9]{2})".to_string(),
            "(?P<short>[0-9]{2})v[0-9]".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn reads_short_versioned_names() {
        let ex = pluto_extractor();
        assert_eq!(ex.from_name("pluto_16v2.csv"), Some(2016));
        assert_eq!(ex.from_name("pluto_24v1_1.csv"), Some(2024));
    }

    #[test]
    fn prefers_four_digit_years() {
        let ex = pluto_extractor();
        assert_eq!(ex.from_name("pluto_2019.csv"), Some(2019));
        assert_eq!(ex.from_name("MapPLUTO_2017_18v1.geojson"), Some(2017));
    }

    #[test]
    fn falls_back_to_parent_directory() {
        let ex = pluto_extractor();
        let path = Path::new("/data/mappluto_2017/manhattan.geojson");
        assert_eq!(ex.from_path(path), Some(2017));
    }

    #[test]
    fn unparseable_year_without_fallback_fails() {
        let ex = pluto_extractor();
        let path = Path::new("/data/parcels/latest.csv");

        assert!(matches!(
            resolve_year(&ex, path, None, None),
            Err(ParcelError::NoYear { .. })
        ));
        assert_eq!(resolve_year(&ex, path, None, Some(2025)).unwrap(), 2025);
        assert_eq!(
            resolve_year(&ex, path, Some(2020), Some(2025)).unwrap(),
            2020
        );
    }
}

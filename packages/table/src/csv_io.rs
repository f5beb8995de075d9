//! Typed CSV artifacts.
//!
//! Row types derive `Serialize`/`Deserialize`; the header row is taken from
//! the field names. Optional fields are written as empty cells and read back
//! as `None`, so missing values never turn into NaN on disk.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::TableError;

/// Writes `rows` to `path`, replacing any existing file.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns [`TableError`] if the directory or file cannot be created or a
/// row fails to serialize.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), TableError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| TableError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let csv_err = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Reads every row of the CSV file at `path`.
///
/// # Errors
///
/// Returns [`TableError::MissingInput`] if the file does not exist, or
/// [`TableError::Csv`] if any row fails to deserialize. A single bad row
/// fails the whole read.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, TableError> {
    if !path.exists() {
        return Err(TableError::MissingInput {
            path: path.to_path_buf(),
        });
    }

    let csv_err = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err)?;

    log::debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        name: String,
        value: f64,
        note: Option<String>,
        score: Option<f64>,
    }

    #[test]
    fn round_trips_optional_fields() {
        let tmp = std::env::temp_dir().join("emci_table_csv_roundtrip");
        let _ = std::fs::remove_dir_all(&tmp);
        let path = tmp.join("rows.csv");

        let rows = vec![
            Row {
                name: "Astoria (Central)".to_string(),
                value: 0.1 + 0.2,
                note: None,
                score: Some(1e-12),
            },
            Row {
                name: "Midtown, South".to_string(),
                value: -3.25,
                note: Some("quoted \"text\"".to_string()),
                score: None,
            },
        ];

        write_rows(&path, &rows).unwrap();
        let back: Vec<Row> = read_rows(&path).unwrap();
        assert_eq!(back, rows);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_is_reported() {
        let path = std::env::temp_dir().join("emci_table_does_not_exist.csv");
        let err = read_rows::<Row>(&path).unwrap_err();
        assert!(matches!(err, TableError::MissingInput { .. }));
    }
}

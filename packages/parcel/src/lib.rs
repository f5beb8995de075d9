#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Multi-year parcel normalization and change classification.
//!
//! Reads yearly parcel extracts whose column naming differs between
//! releases, maps them onto one canonical table through the embedded
//! format registry, folds each parcel's history into a change category,
//! and measures per-borough update intensity from certificates of
//! occupancy.

pub mod change;
pub mod normalize;
pub mod occupancy;
pub mod registry;
pub mod year;

use std::path::PathBuf;

use thiserror::Error;

pub use change::{change_type_shares, classify, classify_changes, update_ratio_by_year};
pub use normalize::{deduplicate, normalize_sources};
pub use occupancy::{load_certificates, update_index_by_borough};

/// Errors that can occur during parcel operations.
#[derive(Debug, Error)]
pub enum ParcelError {
    /// Reading a source file or directory failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A CSV extract could not be parsed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Extract file.
        path: PathBuf,
        /// Underlying error.
        source: csv::Error,
    },

    /// A `GeoJSON` extract could not be parsed.
    #[error("GeoJSON error in {path}: {source}")]
    GeoJson {
        /// Extract file.
        path: PathBuf,
        /// Underlying error.
        source: Box<geojson::Error>,
    },

    /// A year pattern failed to compile.
    #[error("Invalid year pattern: {0}")]
    Regex(#[from] regex::Error),

    /// No format with this id is registered.
    #[error("Unknown parcel format '{id}'")]
    UnknownFormat {
        /// Requested format id.
        id: String,
    },

    /// A required column is absent from an extract.
    #[error("{path} has no '{column}' column")]
    MissingColumn {
        /// Extract file.
        path: PathBuf,
        /// Canonical column name.
        column: String,
    },

    /// No year could be determined for an extract.
    #[error("Cannot determine the year of {path}: no year in the file or directory name and no fallback configured")]
    NoYear {
        /// Extract file.
        path: PathBuf,
    },

    /// A source directory holds no files the format can read.
    #[error("No readable extract files under {path}")]
    NoFiles {
        /// Source path.
        path: PathBuf,
    },
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared plumbing for the EMCI pipeline stages.
//!
//! Every stage persists a complete flat file that the next stage reads back.
//! This crate owns that contract: typed CSV reading and writing through
//! `serde`, `GeoJSON` feature collection export, lenient date parsing, the
//! small set of numeric helpers the index formulas share (min-max
//! normalization, quantiles, least-squares lines), and the
//! [`progress::ProgressCallback`] trait that decouples long-running stages
//! from any terminal rendering.

pub mod csv_io;
pub mod date;
pub mod geojson_io;
pub mod progress;
pub mod stats;

use std::path::PathBuf;

use thiserror::Error;

pub use csv_io::{read_rows, write_rows};

/// Errors that can occur while reading or writing pipeline artifacts.
#[derive(Debug, Error)]
pub enum TableError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// CSV encoding or decoding failed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying error.
        source: csv::Error,
    },

    /// JSON encoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required artifact does not exist yet.
    #[error("Missing input {path}: run the stage that produces it first")]
    MissingInput {
        /// Expected location of the artifact.
        path: PathBuf,
    },
}

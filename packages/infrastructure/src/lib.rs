#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Infrastructure density per neighborhood.
//!
//! Loads live facility points and measures, for every neighborhood and
//! analysis year, how many facilities it holds and how tightly they are
//! spaced relative to the citywide average.

pub mod density;
pub mod facilities;

use std::path::PathBuf;

use thiserror::Error;

pub use density::{activation_years, compute_density};
pub use facilities::{activation_summary, load_facilities};

/// Errors that can occur while loading facilities.
#[derive(Debug, Error)]
pub enum DensityError {
    /// The facility file could not be read or parsed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Facility file.
        path: PathBuf,
        /// Underlying error.
        source: csv::Error,
    },

    /// A configured column is absent from the facility file.
    #[error("{path} has no '{column}' column")]
    MissingColumn {
        /// Facility file.
        path: PathBuf,
        /// Configured header name.
        column: String,
    },
}

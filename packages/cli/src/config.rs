//! Pipeline settings loaded from a TOML file.
//!
//! Relative paths in the file are resolved against the file's directory so
//! a run does not depend on the working directory.

use std::path::{Path, PathBuf};

use emci_cluster_models::ClusterParams;
use emci_composite_models::CompositeParams;
use emci_infrastructure_models::FacilitySource;
use emci_neighborhood_models::NeighborhoodSource;
use emci_parcel_models::{CertificateSource, ParcelSource};
use emci_spatial::Projection;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Settings file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the expected layout.
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        /// Settings file.
        path: PathBuf,
        /// Underlying error.
        source: Box<toml::de::Error>,
    },

    /// The settings parse but cannot drive a run.
    #[error("Invalid config {path}: {message}")]
    Invalid {
        /// Settings file.
        path: PathBuf,
        /// What is wrong.
        message: String,
    },
}

/// Everything a pipeline run needs.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Directory for every inter-stage artifact.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub neighborhoods: NeighborhoodSource,
    #[serde(default)]
    pub projection: Projection,
    pub parcels: ParcelConfig,
    pub facilities: FacilitySource,
    #[serde(default)]
    pub composite: CompositeParams,
    #[serde(default)]
    pub cluster: ClusterParams,
}

/// Parcel extracts and the year to assume when a name has none.
#[derive(Debug, Clone, Deserialize)]
pub struct ParcelConfig {
    #[serde(default)]
    pub fallback_year: Option<i32>,
    pub sources: Vec<ParcelSource>,
    /// Certificates of occupancy for the per-borough update index.
    #[serde(default)]
    pub certificates: Option<CertificateSource>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl PipelineConfig {
    /// Reads and validates the settings file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or
    /// its settings are unusable.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

        let invalid = |message: &str| ConfigError::Invalid {
            path: path.to_path_buf(),
            message: message.to_string(),
        };
        if config.parcels.sources.is_empty() {
            return Err(invalid("at least one [[parcels.sources]] entry is required"));
        }
        if config.cluster.clusters == 0 {
            return Err(invalid("cluster.clusters must be at least 1"));
        }
        if !config.composite.update_index.is_finite() {
            return Err(invalid("composite.update_index must be a finite number"));
        }

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.output_dir);
        resolve(&mut self.neighborhoods.path);
        resolve(&mut self.facilities.path);
        for source in &mut self.parcels.sources {
            resolve(&mut source.path);
        }
        if let Some(certificates) = &mut self.parcels.certificates {
            resolve(&mut certificates.path);
        }
    }
}

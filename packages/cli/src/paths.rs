#![allow(clippy::module_name_repetitions)]
//! Canonical artifact paths under the configured output directory.

use std::path::{Path, PathBuf};

/// Locations of every artifact a run reads or writes.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    root: PathBuf,
}

impl ArtifactPaths {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalized parcel-year table.
    #[must_use]
    pub fn parcels(&self) -> PathBuf {
        self.root.join("parcels.csv")
    }

    #[must_use]
    pub fn parcel_changes(&self) -> PathBuf {
        self.root.join("parcel_changes.csv")
    }

    #[must_use]
    pub fn update_ratio(&self) -> PathBuf {
        self.root.join("update_ratio_by_year.csv")
    }

    #[must_use]
    pub fn change_type_summary(&self) -> PathBuf {
        self.root.join("change_type_summary.csv")
    }

    #[must_use]
    pub fn update_index_by_borough(&self) -> PathBuf {
        self.root.join("update_index_by_borough.csv")
    }

    #[must_use]
    pub fn parcel_demand(&self) -> PathBuf {
        self.root.join("parcel_demand.csv")
    }

    #[must_use]
    pub fn demand_by_neighborhood(&self) -> PathBuf {
        self.root.join("demand_by_neighborhood.csv")
    }

    #[must_use]
    pub fn density_by_neighborhood(&self) -> PathBuf {
        self.root.join("density_by_neighborhood.csv")
    }

    #[must_use]
    pub fn facility_activations(&self) -> PathBuf {
        self.root.join("facility_activations.csv")
    }

    /// Composite table, observed and forecast rows.
    #[must_use]
    pub fn emci(&self) -> PathBuf {
        self.root.join("emci.csv")
    }

    #[must_use]
    pub fn emci_growth(&self) -> PathBuf {
        self.root.join("emci_growth.csv")
    }

    #[must_use]
    pub fn clusters(&self) -> PathBuf {
        self.root.join("clusters.csv")
    }

    #[must_use]
    pub fn cluster_centers(&self) -> PathBuf {
        self.root.join("cluster_centers.csv")
    }

    #[must_use]
    pub fn cluster_labels(&self) -> PathBuf {
        self.root.join("cluster_labels.csv")
    }

    /// `GeoJSON` export for one year.
    #[must_use]
    pub fn export(&self, year: i32) -> PathBuf {
        self.root.join(format!("emci_{year}.geojson"))
    }
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifacts_live_under_root() {
        let paths = ArtifactPaths::new(Path::new("/data/out"));
        assert_eq!(paths.emci(), PathBuf::from("/data/out/emci.csv"));
        assert_eq!(paths.export(2024), PathBuf::from("/data/out/emci_2024.geojson"));
        assert!(paths.cluster_labels().starts_with(paths.root()));
    }
}

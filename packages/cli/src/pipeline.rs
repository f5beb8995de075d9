//! Stage runners.
//!
//! Each stage reads its predecessor's artifact from the output directory,
//! computes its table in memory, and writes its own artifacts back. A
//! failure halts the stage before anything partial is written.

use std::collections::BTreeSet;
use std::time::Instant;

use emci_cli_utils::{IndicatifProgress, MultiProgress};
use emci_cluster::{cluster_neighborhoods, log_crosstab};
use emci_composite::{annual_growth, compose, export_year};
use emci_composite_models::CompositeRecord;
use emci_demand::{aggregate_by_neighborhood, demand_years, score_parcels};
use emci_demand_models::NeighborhoodDemand;
use emci_infrastructure::{activation_summary, activation_years, compute_density, load_facilities};
use emci_infrastructure_models::NeighborhoodDensity;
use emci_neighborhood::NeighborhoodSet;
use emci_parcel::{
    change_type_shares, classify_changes, load_certificates, normalize_sources,
    update_index_by_borough, update_ratio_by_year,
};
use emci_parcel_models::ParcelRecord;
use emci_table::{read_rows, write_rows};

use crate::config::PipelineConfig;
use crate::paths::{ArtifactPaths, ensure_dir};

type StageResult = Result<(), Box<dyn std::error::Error>>;

/// Stages in dependency order.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Normalize,
    Classify,
    Demand,
    Density,
    Composite,
    Cluster,
}

impl Stage {
    const ALL: &[Self] = &[
        Self::Normalize,
        Self::Classify,
        Self::Demand,
        Self::Density,
        Self::Composite,
        Self::Cluster,
    ];

    #[must_use]
    const fn label(self) -> &'static str {
        match self {
            Self::Normalize => "Normalize parcels",
            Self::Classify => "Classify parcel changes",
            Self::Demand => "Score building demand",
            Self::Density => "Measure infrastructure density",
            Self::Composite => "Compose EMCI",
            Self::Cluster => "Cluster neighborhoods",
        }
    }
}

/// A configured pipeline bound to its output directory.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    paths: ArtifactPaths,
    multi: &'a MultiProgress,
}

impl<'a> Pipeline<'a> {
    /// Prepares the output directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be created.
    pub fn new(config: &'a PipelineConfig, multi: &'a MultiProgress) -> Result<Self, std::io::Error> {
        let paths = ArtifactPaths::new(&config.output_dir);
        ensure_dir(paths.root())?;
        Ok(Self {
            config,
            paths,
            multi,
        })
    }

    /// Runs every stage in order.
    ///
    /// # Errors
    ///
    /// Returns the first stage error; later stages do not run.
    pub fn run(&self) -> StageResult {
        let start = Instant::now();
        let steps = IndicatifProgress::steps_bar(self.multi, "Pipeline", Stage::ALL.len() as u64);

        for &stage in Stage::ALL {
            steps.set_message(stage.label().to_string());
            self.run_stage(stage)?;
            steps.inc(1);
        }

        steps.finish(format!("Pipeline finished in {:.1?}", start.elapsed()));
        log::info!(
            "All stages complete; artifacts in {}",
            self.paths.root().display()
        );
        Ok(())
    }

    fn run_stage(&self, stage: Stage) -> StageResult {
        let start = Instant::now();
        log::info!("=== {} ===", stage.label());
        match stage {
            Stage::Normalize => self.normalize()?,
            Stage::Classify => self.classify()?,
            Stage::Demand => self.demand()?,
            Stage::Density => self.density()?,
            Stage::Composite => self.composite()?,
            Stage::Cluster => self.cluster()?,
        }
        log::info!("{} took {:.1?}", stage.label(), start.elapsed());
        Ok(())
    }

    fn neighborhoods(&self) -> Result<NeighborhoodSet, emci_neighborhood::NeighborhoodError> {
        NeighborhoodSet::load(&self.config.neighborhoods, &self.config.projection)
    }

    /// Reads every parcel source into `parcels.csv`.
    ///
    /// # Errors
    ///
    /// Returns an error if any source fails to normalize or the table
    /// cannot be written.
    pub fn normalize(&self) -> StageResult {
        let progress = IndicatifProgress::files_bar(self.multi, "Reading parcel extracts");
        let records = normalize_sources(
            &self.config.parcels.sources,
            self.config.parcels.fallback_year,
            &progress,
        )?;

        let years: BTreeSet<i32> = records.iter().map(|r| r.year).collect();
        log::info!("{} parcel-year rows across years {years:?}", records.len());
        write_rows(&self.paths.parcels(), &records)?;
        Ok(())
    }

    /// Classifies parcel histories and summarizes change, plus the borough
    /// update index when certificates are configured.
    ///
    /// # Errors
    ///
    /// Returns an error if `parcels.csv` is missing or unreadable, or an
    /// output cannot be written.
    pub fn classify(&self) -> StageResult {
        let records: Vec<ParcelRecord> = read_rows(&self.paths.parcels())?;

        let changes = classify_changes(&records);
        write_rows(&self.paths.parcel_changes(), &changes)?;

        let ratios = update_ratio_by_year(&records);
        for ratio in &ratios {
            log::info!(
                "{}: {} parcels, update ratio {:.4}",
                ratio.year,
                ratio.parcel_count,
                ratio.update_ratio
            );
        }
        write_rows(&self.paths.update_ratio(), &ratios)?;

        write_rows(&self.paths.change_type_summary(), &change_type_shares(&changes))?;

        match &self.config.parcels.certificates {
            Some(source) => {
                let certificates = load_certificates(source)?;
                let index = update_index_by_borough(&records, &certificates);
                for row in &index {
                    log::info!(
                        "{} {}: {} certificates over {} parcels, update index {:.4}",
                        row.borough,
                        row.year,
                        row.co_count,
                        row.parcel_count,
                        row.update_index
                    );
                }
                write_rows(&self.paths.update_index_by_borough(), &index)?;
            }
            None => log::info!("No certificates configured; skipping the borough update index"),
        }
        Ok(())
    }

    /// Scores parcel demand and aggregates it per neighborhood.
    ///
    /// # Errors
    ///
    /// Returns an error if the parcel table or boundaries cannot be read,
    /// or an output cannot be written.
    pub fn demand(&self) -> StageResult {
        let records: Vec<ParcelRecord> = read_rows(&self.paths.parcels())?;
        let neighborhoods = self.neighborhoods()?;

        let scored = score_parcels(&records, &neighborhoods);
        write_rows(&self.paths.parcel_demand(), &scored)?;

        let names: Vec<String> = neighborhoods
            .neighborhoods()
            .iter()
            .map(|n| n.name.clone())
            .collect();
        let aggregated = aggregate_by_neighborhood(&scored, &names, &demand_years(&scored));
        write_rows(&self.paths.demand_by_neighborhood(), &aggregated)?;
        Ok(())
    }

    /// Measures facility density per neighborhood and year.
    ///
    /// Analysis years come from the facility settings, else the demand
    /// table, else the parcel table, else the facilities' activation years.
    ///
    /// # Errors
    ///
    /// Returns an error if the facility file or boundaries cannot be read,
    /// or an output cannot be written.
    pub fn density(&self) -> StageResult {
        let source = &self.config.facilities;
        let facilities = load_facilities(source)?;

        let activations = activation_summary(&facilities);
        for count in &activations {
            log::info!(
                "{} {}: {} activated, {} cumulative",
                count.borough.as_deref().unwrap_or("(no borough)"),
                count.year,
                count.activated,
                count.cumulative
            );
        }
        write_rows(&self.paths.facility_activations(), &activations)?;

        let years = match &source.years {
            Some(years) => years.clone(),
            None => self
                .artifact_years()?
                .unwrap_or_else(|| activation_years(&facilities)),
        };
        log::info!("Density years ({}): {years:?}", source.mode);

        let neighborhoods = self.neighborhoods()?;
        let density = compute_density(&facilities, &neighborhoods, &years, source.mode);
        write_rows(&self.paths.density_by_neighborhood(), &density)?;
        Ok(())
    }

    /// Years of the demand table, or of the parcel table, when either exists.
    fn artifact_years(&self) -> Result<Option<Vec<i32>>, emci_table::TableError> {
        let demand_path = self.paths.demand_by_neighborhood();
        if demand_path.exists() {
            let rows: Vec<NeighborhoodDemand> = read_rows(&demand_path)?;
            return Ok(Some(distinct(rows.iter().map(|r| r.year))));
        }
        let parcels_path = self.paths.parcels();
        if parcels_path.exists() {
            let rows: Vec<ParcelRecord> = read_rows(&parcels_path)?;
            return Ok(Some(distinct(rows.iter().map(|r| r.year))));
        }
        Ok(None)
    }

    /// Joins demand and density into the composite table and growth summary.
    ///
    /// # Errors
    ///
    /// Returns an error if either input is missing or the composite cannot
    /// be computed or written.
    pub fn composite(&self) -> StageResult {
        let demand: Vec<NeighborhoodDemand> = read_rows(&self.paths.demand_by_neighborhood())?;
        let density: Vec<NeighborhoodDensity> = read_rows(&self.paths.density_by_neighborhood())?;

        let records = compose(&demand, &density, &self.config.composite)?;
        write_rows(&self.paths.emci(), &records)?;
        write_rows(&self.paths.emci_growth(), &annual_growth(&records))?;
        Ok(())
    }

    /// Clusters the reference year and writes assignments, centers and
    /// label summaries.
    ///
    /// # Errors
    ///
    /// Returns an error if the composite table is missing or clustering
    /// fails.
    pub fn cluster(&self) -> StageResult {
        let records: Vec<CompositeRecord> = read_rows(&self.paths.emci())?;
        let outcome = cluster_neighborhoods(&records, &self.config.cluster)?;

        log_crosstab(&outcome);
        for summary in &outcome.labels {
            log::info!("{}: {} neighborhoods", summary.label, summary.count);
        }

        write_rows(&self.paths.clusters(), &outcome.assignments)?;
        write_rows(&self.paths.cluster_centers(), &outcome.centers)?;
        write_rows(&self.paths.cluster_labels(), &outcome.labels)?;
        Ok(())
    }

    /// Writes `emci_<year>.geojson` for external map renderers.
    ///
    /// # Errors
    ///
    /// Returns an error if the composite table or boundaries cannot be
    /// read, the year has no rows, or the file cannot be written.
    pub fn export(&self, year: i32) -> StageResult {
        let records: Vec<CompositeRecord> = read_rows(&self.paths.emci())?;
        let neighborhoods = self.neighborhoods()?;
        export_year(
            &self.paths.export(year),
            &records,
            neighborhoods.neighborhoods(),
            year,
        )?;
        Ok(())
    }
}

fn distinct(years: impl Iterator<Item = i32>) -> Vec<i32> {
    years.collect::<BTreeSet<_>>().into_iter().collect()
}

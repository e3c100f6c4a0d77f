pub mod tns;
pub mod zeta;

use crate::config::Config;
use crate::error::Result;
use crate::storage::ResultStore;
use crate::table::RawTable;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// The two supported experiment types, decided once at the entry point from
/// the uploaded file's extension. Each variant carries its own grouping,
/// threshold, and identifier rules in its pipeline module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Experiment {
    /// Zeta-potential instrument export (CSV of replicate measurements).
    Zeta,
    /// TNS uptake assay plate export (spreadsheet, one plate per row).
    Tns,
}

impl Experiment {
    /// Classify an upload by its file extension. `None` means the file type
    /// is not accepted at all.
    pub fn from_filename(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?;
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Experiment::Zeta),
            "xlsx" | "xls" => Some(Experiment::Tns),
            _ => None,
        }
    }

    /// Result store table name, also the public name used by the charts API.
    pub fn table_name(&self) -> &'static str {
        match self {
            Experiment::Zeta => "Zeta",
            Experiment::Tns => "TNS",
        }
    }

    pub fn from_table_name(name: &str) -> Option<Self> {
        match name {
            "Zeta" => Some(Experiment::Zeta),
            "TNS" => Some(Experiment::Tns),
            _ => None,
        }
    }

    pub fn threshold(&self, config: &Config) -> f64 {
        match self {
            Experiment::Zeta => config.zeta_threshold,
            Experiment::Tns => config.tns_threshold,
        }
    }
}

/// One formulation's condensed result: produced by a pipeline, checked
/// against the acceptance threshold, then persisted or discarded with the
/// rest of its batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulationResult {
    pub formulation_id: String,
    pub calculated_value: f64,
}

impl FormulationResult {
    pub fn new(formulation_id: impl Into<String>, calculated_value: f64) -> Self {
        Self {
            formulation_id: formulation_id.into(),
            calculated_value,
        }
    }
}

/// Summary of one accepted upload.
#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub experiment: Experiment,
    pub formulations: usize,
}

/// Run one experiment's pipeline over a saved upload: load, clean,
/// compute, threshold-check. Returns the full batch or the first error;
/// no partial batches.
pub fn process_file(experiment: Experiment, path: &Path, config: &Config) -> Result<Vec<FormulationResult>> {
    let threshold = experiment.threshold(config);
    match experiment {
        Experiment::Zeta => {
            let table = RawTable::from_csv(path)?.clean();
            zeta::process(&table, threshold)
        }
        Experiment::Tns => {
            let table = RawTable::from_spreadsheet(path)?.clean();
            tns::process(&table, threshold)
        }
    }
}

/// Full upload flow: pipeline plus the persistence gate. Every failure
/// before the append leaves the store untouched; the append itself is a
/// single transaction, so a rejected upload never leaves partial rows.
#[instrument(skip(store, config), fields(experiment = %experiment.table_name()))]
pub async fn ingest_file(
    store: Arc<dyn ResultStore>,
    config: &Config,
    experiment: Experiment,
    path: &Path,
) -> Result<UploadOutcome> {
    let batch = process_file(experiment, path, config)?;
    store.append_batch(experiment, &batch).await?;

    info!(
        formulations = batch.len(),
        file = %path.display(),
        "upload accepted and persisted"
    );

    Ok(UploadOutcome {
        experiment,
        formulations: batch.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_is_decided_by_extension() {
        assert_eq!(Experiment::from_filename("run1.csv"), Some(Experiment::Zeta));
        assert_eq!(Experiment::from_filename("plate.XLSX"), Some(Experiment::Tns));
        assert_eq!(Experiment::from_filename("plate.xls"), Some(Experiment::Tns));
        assert_eq!(Experiment::from_filename("notes.txt"), None);
        assert_eq!(Experiment::from_filename("no_extension"), None);
    }

    #[test]
    fn table_names_round_trip() {
        for experiment in [Experiment::Zeta, Experiment::Tns] {
            assert_eq!(
                Experiment::from_table_name(experiment.table_name()),
                Some(experiment)
            );
        }
        assert_eq!(Experiment::from_table_name("Unknown"), None);
    }
}

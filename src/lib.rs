//! Ingestion and validation service for nanoparticle formulation screening
//! assays.
//!
//! Two pipelines turn raw laboratory exports into per-formulation scalar
//! results: zeta-potential CSVs are replicate-averaged and normalized
//! against the `STD 1` calibration sample, and TNS plate spreadsheets are
//! reduced to control-triplet ratios. Each batch must pass its experiment's
//! acceptance threshold in full before anything is persisted.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod stats;
pub mod storage;
pub mod table;

pub use config::Config;
pub use error::{AssayError, Result};
pub use pipeline::{Experiment, FormulationResult};
pub use storage::{InMemoryStore, ResultStore, SqliteStore, StoredResult};
pub use table::{Cell, RawTable};

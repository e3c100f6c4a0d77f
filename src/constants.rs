/// Fixed acceptance criteria and storage defaults shared across the codebase.
///
/// Calculated values must strictly exceed their experiment's threshold to be
/// persisted; values at or below it reject the whole upload.

// Acceptance thresholds per experiment type
pub const ZETA_THRESHOLD: f64 = 0.5;
pub const TNS_THRESHOLD: f64 = 0.3;

// Column labels expected in zeta-potential instrument exports
pub const MEASUREMENT_TYPE_COLUMN: &str = "Measurement Type";
pub const SAMPLE_NAME_COLUMN: &str = "Sample Name";
pub const ZETA_POTENTIAL_COLUMN: &str = "Zeta Potential (mV)";

// Grouping key of the calibration sample all zeta values are normalized against
pub const REFERENCE_MEASUREMENT_TYPE: &str = "Zeta";
pub const REFERENCE_SAMPLE_NAME: &str = "STD 1";

// Storage defaults, overridable via config.toml
pub const DEFAULT_DATABASE_PATH: &str = "experiments.db";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";

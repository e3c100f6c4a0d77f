use crate::constants;
use crate::error::{AssayError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Runtime configuration, loaded from `config.toml` when present.
///
/// The acceptance thresholds and directory layout are deployment constants;
/// the defaults here mirror the values the lab has been running with.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: String,
    pub upload_dir: String,
    pub static_dir: String,
    pub log_dir: String,
    pub listen_addr: String,
    pub zeta_threshold: f64,
    pub tns_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: constants::DEFAULT_DATABASE_PATH.to_string(),
            upload_dir: constants::DEFAULT_UPLOAD_DIR.to_string(),
            static_dir: constants::DEFAULT_STATIC_DIR.to_string(),
            log_dir: constants::DEFAULT_LOG_DIR.to_string(),
            listen_addr: constants::DEFAULT_LISTEN_ADDR.to_string(),
            zeta_threshold: constants::ZETA_THRESHOLD,
            tns_threshold: constants::TNS_THRESHOLD,
        }
    }
}

impl Config {
    /// Load configuration from `config.toml`, falling back to defaults when
    /// the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            AssayError::Config(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_from("does-not-exist.toml").unwrap();
        assert_eq!(config.zeta_threshold, constants::ZETA_THRESHOLD);
        assert_eq!(config.database_path, constants::DEFAULT_DATABASE_PATH);
    }

    #[test]
    fn partial_file_keeps_defaults_for_omitted_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "zeta_threshold = 0.75").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.zeta_threshold, 0.75);
        assert_eq!(config.tns_threshold, constants::TNS_THRESHOLD);
        assert_eq!(config.upload_dir, constants::DEFAULT_UPLOAD_DIR);
        assert_eq!(config.log_dir, constants::DEFAULT_LOG_DIR);
    }
}

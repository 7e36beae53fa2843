//! Optional RON configuration for the demo binary.

use std::path::Path;
use std::time::Duration;

use progress_core::DEFAULT_INITIAL_DELAY;
use progress_dispatch::{DispatchConfig, DEFAULT_QUANTUM};
use progress_logging::{progress_info, progress_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    /// Coalescing window in milliseconds.
    #[serde(default = "default_quantum_ms")]
    pub quantum_ms: u64,
    /// Grace period in milliseconds before a task is shown.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_quantum_ms() -> u64 {
    DEFAULT_QUANTUM.as_millis() as u64
}

fn default_initial_delay_ms() -> u64 {
    DEFAULT_INITIAL_DELAY.as_millis() as u64
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            quantum_ms: default_quantum_ms(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl CliConfig {
    pub fn to_dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            quantum: Duration::from_millis(self.quantum_ms),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            ..DispatchConfig::default()
        }
    }
}

pub fn load(path: &Path) -> Result<CliConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    ron::from_str(&content).map_err(|err| ConfigError::Parse(err.to_string()))
}

/// Loads the config, falling back to defaults when the file is missing or
/// malformed.
pub fn load_or_default(path: &Path) -> CliConfig {
    match load(path) {
        Ok(config) => {
            progress_info!("Loaded config from {:?}", path);
            config
        }
        Err(err) => {
            progress_warn!("Falling back to default config: {}", err);
            CliConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::NamedTempFile;

    #[test]
    fn loads_explicit_values() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "(quantum_ms: 100, initial_delay_ms: 50)").unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.quantum_ms, 100);
        assert_eq!(config.initial_delay_ms, 50);

        let dispatch = config.to_dispatch();
        assert_eq!(dispatch.quantum, Duration::from_millis(100));
        assert_eq!(dispatch.initial_delay, Duration::from_millis(50));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "()").unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_or_default(Path::new("./does-not-exist.ron"));
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not ron at all").unwrap();

        assert!(matches!(load(file.path()), Err(ConfigError::Parse(_))));
        assert_eq!(load_or_default(file.path()), CliConfig::default());
    }
}

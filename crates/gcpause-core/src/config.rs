//! Configuration management for gcpause
//!
//! Settings for pause capture, the simulated collector driver, and output.
//! Loaded from `.gcpause/config.toml` under a root directory.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{GcPauseError, Result};

/// Top-level gcpause configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GcPauseConfig {
    /// Capture behaviour
    #[serde(default)]
    pub profiler: ProfilerConfig,

    /// Simulated collector parameters
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Output rendering
    #[serde(default)]
    pub output: OutputConfig,
}

/// Capture behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilerConfig {
    /// Pauses longer than this are logged at warn level. Delivery is unaffected.
    #[serde(default)]
    pub slow_pause_ms: Option<f64>,

    /// Log every hook invocation at trace level
    #[serde(default)]
    pub trace_hooks: bool,
}

/// Simulated collector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of collections to run
    #[serde(default = "default_cycles")]
    pub cycles: usize,

    /// Length of each stop-the-world pause
    #[serde(default = "default_pause_ms")]
    pub pause_ms: f64,

    /// Time the mutator runs between collections
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Collector kind codes, cycled through in order
    #[serde(default = "default_kinds")]
    pub kinds: Vec<u32>,

    /// Mark every Nth collection as forced
    #[serde(default)]
    pub forced_every: Option<usize>,
}

/// Output rendering
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// How delivered pauses are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `<kind> <duration>` per line
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

// Default value providers
fn default_cycles() -> usize {
    10
}

fn default_pause_ms() -> f64 {
    5.0
}

fn default_interval_ms() -> u64 {
    50
}

fn default_kinds() -> Vec<u32> {
    vec![1, 1, 1, 2]
}

impl GcPauseConfig {
    /// Load configuration from `.gcpause/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(".gcpause/config.toml");

        let config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| GcPauseError::Config(format!("Failed to parse config file: {}", e)))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Write default configuration to `.gcpause/config.toml`
    pub fn write_default(root: &Path) -> Result<()> {
        let config_dir = root.join(".gcpause");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| GcPauseError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        tracing::debug!("Wrote default config to {:?}", config_path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.profiler.slow_pause_ms {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(GcPauseError::Config(format!(
                    "slow_pause_ms must be a non-negative number, got {}",
                    threshold
                )));
            }
        }

        let pause = self.simulation.pause_ms;
        if !pause.is_finite() || pause < 0.0 {
            return Err(GcPauseError::Config(format!(
                "pause_ms must be a non-negative number, got {}",
                pause
            )));
        }

        if self.simulation.kinds.is_empty() {
            return Err(GcPauseError::Config(
                "simulation.kinds must list at least one collector kind".to_string(),
            ));
        }

        if self.simulation.forced_every == Some(0) {
            return Err(GcPauseError::Config(
                "forced_every must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cycles: default_cycles(),
            pause_ms: default_pause_ms(),
            interval_ms: default_interval_ms(),
            kinds: default_kinds(),
            forced_every: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = GcPauseConfig::load_or_default(dir.path()).unwrap();

        assert_eq!(config.simulation.cycles, 10);
        assert_eq!(config.simulation.kinds, vec![1, 1, 1, 2]);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.profiler.slow_pause_ms.is_none());
    }

    #[test]
    fn test_write_then_load_default() {
        let dir = tempdir().unwrap();
        GcPauseConfig::write_default(dir.path()).unwrap();

        assert!(dir.path().join(".gcpause/config.toml").exists());
        let config = GcPauseConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.simulation.pause_ms, 5.0);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".gcpause")).unwrap();
        std::fs::write(
            dir.path().join(".gcpause/config.toml"),
            "[profiler]\nslow_pause_ms = 20.0\n\n[output]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = GcPauseConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.profiler.slow_pause_ms, Some(20.0));
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.simulation.cycles, 10);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = GcPauseConfig::default();
        config.simulation.kinds.clear();
        assert!(matches!(config.validate(), Err(GcPauseError::Config(_))));

        let mut config = GcPauseConfig::default();
        config.simulation.pause_ms = -1.0;
        assert!(config.validate().is_err());

        let mut config = GcPauseConfig::default();
        config.profiler.slow_pause_ms = Some(f64::NAN);
        assert!(config.validate().is_err());

        let mut config = GcPauseConfig::default();
        config.simulation.forced_every = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unparseable_file_is_config_error() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".gcpause")).unwrap();
        std::fs::write(dir.path().join(".gcpause/config.toml"), "profiler = 3").unwrap();

        let result = GcPauseConfig::load_or_default(dir.path());
        assert!(matches!(result, Err(GcPauseError::Config(_))));
    }
}

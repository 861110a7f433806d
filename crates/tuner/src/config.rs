//! Configuration management for the tuner CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "TUNER_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default, rename = "loop")]
    pub optimization: LoopConfig,
}

/// Input and output locations, relative to the working directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default)]
    pub cross_check: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            cross_check: false,
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_max_iterations() -> usize {
    tuner_core::optimizer::MAX_ITERATIONS
}

impl Config {
    /// Load configuration from the config file, or defaults if it is absent
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// `$TUNER_CONFIG`, or `~/.tuner/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tuner")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.paths.input_dir, PathBuf::from("input"));
        assert_eq!(config.paths.output_dir, PathBuf::from("output"));
        assert_eq!(config.optimization.max_iterations, 5);
        assert!(!config.optimization.cross_check);
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse(
            r#"
[paths]
output_dir = "/tmp/tuner-out"

[loop]
max_iterations = 3
"#,
        )
        .unwrap();

        assert_eq!(config.paths.input_dir, PathBuf::from("input"));
        assert_eq!(config.paths.output_dir, PathBuf::from("/tmp/tuner-out"));
        assert_eq!(config.optimization.max_iterations, 3);
    }

    #[test]
    fn test_empty_file() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.optimization.max_iterations, 5);
    }

    #[test]
    fn test_invalid_file() {
        assert!(Config::parse("[loop]\nmax_iterations = \"many\"").is_err());
    }
}

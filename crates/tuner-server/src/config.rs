//! Server configuration.

use std::path::PathBuf;

use tuner_core::optimizer::MAX_ITERATIONS;

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:7878";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on
    pub bind_addr: String,
    /// Root data directory
    pub data_dir: PathBuf,
    /// Step artifacts are written below this directory
    pub output_dir: PathBuf,
    /// SQLite history database (memory store when unset)
    pub database_path: Option<PathBuf>,
    /// Round limit for `POST /optimize`
    pub max_iterations: usize,
    /// Log evaluator pass rates next to self-reported ones
    pub cross_check: bool,
    /// Allow cross-origin requests
    pub cors: bool,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let data_dir = home.join(".tuner");

        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            output_dir: data_dir.join("output"),
            data_dir,
            database_path: None,
            max_iterations: MAX_ITERATIONS,
            cross_check: false,
            cors: false,
        }
    }
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Directory structure:
    /// ```text
    /// ~/.tuner/                     # TUNER_DIR
    /// ├── history.db                # TUNER_DATABASE_PATH (optional)
    /// └── output/
    ///     └── optimization-steps/   # Step artifacts
    /// ```
    pub fn load() -> anyhow::Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Build configuration from a key lookup, creating the data directories.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = var("TUNER_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let output_dir = data_dir.join("output");

        let max_iterations = match var("TUNER_MAX_ITERATIONS") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("Invalid TUNER_MAX_ITERATIONS '{}': {}", v, e))?
                .max(1),
            None => defaults.max_iterations,
        };

        let flag = |key: &str| var(key).is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            bind_addr: var("TUNER_BIND").unwrap_or(defaults.bind_addr),
            database_path: var("TUNER_DATABASE_PATH").map(PathBuf::from),
            max_iterations,
            cross_check: flag("TUNER_CROSS_CHECK"),
            cors: flag("TUNER_CORS"),
            data_dir,
            output_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.bind_addr, "127.0.0.1:7878");
        assert!(config.data_dir.ends_with(".tuner"));
        assert!(config.output_dir.ends_with("output"));
        assert!(config.output_dir.starts_with(&config.data_dir));
        assert!(config.database_path.is_none());
        assert_eq!(config.max_iterations, 5);
    }

    #[test]
    fn test_resolve_with_custom_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let custom = temp_dir.path().join("tuner");

        let config = Config::resolve(lookup(&[
            ("TUNER_DIR", custom.to_str().unwrap()),
            ("TUNER_BIND", "0.0.0.0:9000"),
            ("TUNER_DATABASE_PATH", "/tmp/history.db"),
            ("TUNER_CROSS_CHECK", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, custom);
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/history.db")));
        assert!(config.cross_check);
        assert!(!config.cors);

        // Output directory is created on load
        assert!(custom.join("output").is_dir());
    }

    #[test]
    fn test_resolve_max_iterations() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().to_str().unwrap();

        let config = Config::resolve(lookup(&[("TUNER_DIR", dir), ("TUNER_MAX_ITERATIONS", "3")])).unwrap();
        assert_eq!(config.max_iterations, 3);

        let config = Config::resolve(lookup(&[("TUNER_DIR", dir), ("TUNER_MAX_ITERATIONS", "0")])).unwrap();
        assert_eq!(config.max_iterations, 1);

        assert!(Config::resolve(lookup(&[("TUNER_DIR", dir), ("TUNER_MAX_ITERATIONS", "many")])).is_err());
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config::resolve(lookup(&[
            ("TUNER_DIR", temp_dir.path().to_str().unwrap()),
            ("TUNER_BIND", ""),
            ("TUNER_DATABASE_PATH", "  "),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, DEFAULT_BIND);
        assert!(config.database_path.is_none());
    }
}

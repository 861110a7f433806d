//! Key/value settings with typed accessors.
//!
//! Settings are loaded from multiple sources with precedence:
//! 1. `.env` file in the working directory (dotenv syntax)
//! 2. Process environment
//!
//! An empty value is treated the same as a missing key.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Authorization key for the completion oracle
pub const AI_API_KEY: &str = "AI_API_KEY";
/// Chat-completions endpoint URL
pub const AI_API_URL: &str = "AI_API_URL";
/// Model identifier
pub const AI_MODEL: &str = "AI_MODEL";
/// Sampling temperature
pub const AI_TEMPERATURE: &str = "AI_TEMPERATURE";
/// Completion token limit
pub const AI_MAX_TOKENS: &str = "AI_MAX_TOKENS";
/// HTTP request timeout
pub const AI_TIMEOUT_SECS: &str = "AI_TIMEOUT_SECS";

/// String key/value lookup.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// Empty settings (every lookup falls back to its default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build settings from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load the process environment, overlaid with `./.env` when present.
    pub fn load() -> Self {
        let mut settings = Self::from_pairs(std::env::vars());

        let env_path = std::env::current_dir()
            .map(|dir| dir.join(".env"))
            .unwrap_or_else(|_| ".env".into());

        if env_path.exists() {
            debug!("Loading settings from {}", env_path.display());
            if let Err(e) = settings.merge_env_file(&env_path) {
                warn!("Failed to read {}: {}", env_path.display(), e);
            }
        } else {
            debug!(".env file not found, using process environment only");
        }

        settings
    }

    /// Overlay values from a dotenv file without touching the process
    /// environment.
    pub fn merge_env_file(&mut self, path: &Path) -> Result<()> {
        let entries = dotenvy::from_path_iter(path).map_err(|e| Error::Config(e.to_string()))?;
        for entry in entries {
            let (key, value) = entry.map_err(|e| Error::Config(e.to_string()))?;
            self.values.insert(key, value);
        }
        Ok(())
    }

    /// Set a single value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up a non-empty value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Look up a value, falling back to `default`.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Boolean lookup; only a case-insensitive `true` is true.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => v.eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    /// Numeric lookup; unparseable values fall back to `default`.
    pub fn get_number(&self, key: &str, default: f64) -> f64 {
        self.get(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_get_treats_empty_as_missing() {
        let settings = Settings::from_pairs([("A", ""), ("B", "value")]);
        assert_eq!(settings.get("A"), None);
        assert_eq!(settings.get("B"), Some("value"));
        assert_eq!(settings.get_or("A", "fallback"), "fallback");
        assert_eq!(settings.get_or("C", "fallback"), "fallback");
    }

    #[test]
    fn test_typed_accessors() {
        let settings = Settings::from_pairs([
            ("ENABLED", "TRUE"),
            ("DISABLED", "yes"),
            ("TEMP", "0.2"),
            ("BROKEN", "abc"),
        ]);

        assert!(settings.get_bool("ENABLED", false));
        assert!(!settings.get_bool("DISABLED", true));
        assert!(settings.get_bool("MISSING", true));

        assert_eq!(settings.get_number("TEMP", 0.7), 0.2);
        assert_eq!(settings.get_number("BROKEN", 0.7), 0.7);
        assert_eq!(settings.get_number("MISSING", 2000.0), 2000.0);
    }

    #[test]
    fn test_env_file_syntax() {
        let temp = tempdir().expect("Failed to create temp dir");
        let path = temp.path().join(".env");
        std::fs::write(
            &path,
            "# comment\n\
             AI_API_KEY=sk-test\n\
             export AI_MODEL=gpt-4o # pinned\n\
             AI_API_URL=\"http://localhost:8080/v1\\n\"\n\
             AI_TEMPERATURE='0.2'\n",
        )
        .unwrap();

        let mut settings = Settings::new();
        settings.merge_env_file(&path).unwrap();

        assert_eq!(settings.get(AI_API_KEY), Some("sk-test"));
        assert_eq!(settings.get(AI_MODEL), Some("gpt-4o"));
        assert_eq!(settings.get(AI_API_URL), Some("http://localhost:8080/v1\n"));
        assert_eq!(settings.get_number(AI_TEMPERATURE, 0.7), 0.2);
    }

    #[test]
    fn test_merge_leaves_process_env_alone() {
        let temp = tempdir().expect("Failed to create temp dir");
        let path = temp.path().join(".env");
        std::fs::write(&path, "TUNER_SETTINGS_OVERLAY_ONLY=1\n").unwrap();

        let mut settings = Settings::new();
        settings.merge_env_file(&path).unwrap();

        assert_eq!(settings.get("TUNER_SETTINGS_OVERLAY_ONLY"), Some("1"));
        assert!(std::env::var("TUNER_SETTINGS_OVERLAY_ONLY").is_err());
    }

    #[test]
    fn test_env_file_overrides_existing_values() {
        let temp = tempdir().expect("Failed to create temp dir");
        let path = temp.path().join(".env");
        std::fs::write(&path, "AI_MODEL=from-file\n").unwrap();

        let mut settings = Settings::from_pairs([("AI_MODEL", "from-env"), ("AI_API_KEY", "k")]);
        settings.merge_env_file(&path).unwrap();

        assert_eq!(settings.get(AI_MODEL), Some("from-file"));
        assert_eq!(settings.get(AI_API_KEY), Some("k"));
    }

    #[test]
    fn test_merge_missing_file_errors() {
        let temp = tempdir().expect("Failed to create temp dir");
        let mut settings = Settings::new();
        assert!(settings.merge_env_file(&temp.path().join("missing.env")).is_err());
    }
}

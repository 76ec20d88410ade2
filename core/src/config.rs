use serde::{Deserialize, Serialize};

/// Runtime settings for the store and the runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LendingConfig {
    /// SQLite file to open. ":memory:" gives a private in-memory database.
    pub database_path: String,
    /// How long a writer waits for another writer's lock before failing.
    pub busy_timeout_ms: u64,
    /// Enable WAL journaling on file databases.
    pub journal_mode_wal: bool,
    /// Currency used by the runner when a command does not name one.
    pub default_currency: String,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            database_path: "lending.db".into(),
            busy_timeout_ms: 5_000,
            journal_mode_wal: true,
            default_currency: "VND".into(),
        }
    }
}

impl LendingConfig {
    /// Load from a JSON file. Missing keys fall back to the defaults.
    /// In tests, use LendingConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: LendingConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))?;
        if config.default_currency.trim().is_empty() {
            anyhow::bail!("Invalid config {path}: default_currency must not be empty");
        }
        Ok(config)
    }

    /// Config with an in-memory database for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            database_path: ":memory:".into(),
            busy_timeout_ms: 1_000,
            journal_mode_wal: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: LendingConfig =
            serde_json::from_str(r#"{ "database_path": "/tmp/x.db" }"#).unwrap();
        assert_eq!(config.database_path, "/tmp/x.db");
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert_eq!(config.default_currency, "VND");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = LendingConfig::load("/nonexistent/lending.json").unwrap_err();
        assert!(err.to_string().contains("Cannot read"));
    }
}

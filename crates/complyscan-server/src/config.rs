//! Service configuration
//!
//! Layered: built-in defaults, then an optional YAML/TOML file, then
//! `COMPLYSCAN__<SECTION>__<KEY>` environment variables, then `DATABASE_URL`,
//! then command line overrides.

use complyscan_classifiers::ClassifierSettings;
use complyscan_core::{Error, KnowledgeBase, Result, MAX_INPUT_CHARS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment prefix for layered settings
pub const ENV_PREFIX: &str = "COMPLYSCAN";

/// Environment variable selecting the durable store
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub analysis: AnalysisConfig,
    pub classifier: ClassifierSettings,
    pub knowledge: KnowledgeConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub listen: String,

    /// Listen port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Characters kept after normalization
    pub max_input_chars: usize,

    /// Deadline for one classification, in seconds
    pub timeout_secs: u64,

    /// Entries held by the in-memory store
    pub cache_capacity: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_input_chars: MAX_INPUT_CHARS,
            timeout_secs: 30,
            cache_capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// YAML taxonomy replacing the built-in one
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Durable store location; the in-memory store is used when unset
    pub url: Option<String>,
}

impl AppConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let mut app_config: AppConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| Error::config(format!("Failed to load configuration: {}", e)))?;

        if app_config.database.url.is_none() {
            app_config.database.url = std::env::var(DATABASE_URL_ENV)
                .ok()
                .filter(|url| !url.trim().is_empty());
        }

        Ok(app_config)
    }

    /// Apply command line overrides
    pub fn with_overrides(
        mut self,
        listen: Option<String>,
        port: Option<u16>,
        database_url: Option<String>,
    ) -> Self {
        if let Some(listen) = listen {
            self.server.listen = listen;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        if let Some(url) = database_url {
            self.database.url = Some(url);
        }
        self
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.analysis.max_input_chars == 0 {
            return Err(Error::config("analysis.max_input_chars must be at least 1"));
        }
        if self.analysis.timeout_secs == 0 {
            return Err(Error::config("analysis.timeout_secs must be at least 1"));
        }
        if self.analysis.cache_capacity == 0 {
            return Err(Error::config("analysis.cache_capacity must be at least 1"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.analysis.timeout_secs)
    }

    /// Knowledge base from `knowledge.path`, or the built-in taxonomy
    pub fn knowledge_base(&self) -> Result<KnowledgeBase> {
        match &self.knowledge.path {
            Some(path) => KnowledgeBase::from_yaml_file(path),
            None => Ok(KnowledgeBase::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.analysis.max_input_chars, 512);
        assert_eq!(config.analysis.timeout_secs, 30);
        assert_eq!(config.analysis.cache_capacity, 100);
        assert_eq!(config.classifier.top_k, 3);
        assert!(config.database.url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
server:
  port: 8088
analysis:
  timeout_secs: 10
classifier:
  source:
    type: local
    path: "./models/audit-bert"
database:
  url: "sqlite://./complyscan.db"
"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let config = AppConfig::load(Some(path.as_str())).unwrap();

        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.listen, "0.0.0.0");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.analysis.cache_capacity, 100);
        assert_eq!(config.database.url.as_deref(), Some("sqlite://./complyscan.db"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load(Some("/nonexistent/complyscan.yaml")).unwrap();
        assert_eq!(config.analysis.timeout_secs, 30);
    }

    #[test]
    fn test_cli_overrides() {
        let config = AppConfig::default().with_overrides(
            Some("127.0.0.1".to_string()),
            Some(9000),
            Some("sqlite:test.db".to_string()),
        );
        assert_eq!(config.server.listen, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.url.as_deref(), Some("sqlite:test.db"));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = AppConfig::default();
        config.analysis.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = AppConfig::default();
        config.analysis.cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builtin_knowledge_by_default() {
        let kb = AppConfig::default().knowledge_base().unwrap();
        assert_eq!(kb.len(), 11);
    }
}

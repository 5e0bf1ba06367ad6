use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for the workflow circuit
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Completion monitor polling settings
    pub monitor: MonitorConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Circuit definition handling
    pub definitions: DefinitionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Delay between archival polls
    pub poll_interval_ms: u64,
    /// Polls before the monitor gives up and refreshes anyway
    pub max_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            max_attempts: 30,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefinitionConfig {
    /// Keywords the flexible-status backfill looks for in legacy titles
    pub backfill_flexible_keywords: Vec<String>,
}

impl Default for DefinitionConfig {
    fn default() -> Self {
        Self {
            backfill_flexible_keywords: vec![
                "flexible".to_string(),
                "any".to_string(),
                "free".to_string(),
            ],
        }
    }
}

impl CircuitConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (doc-circuit.toml)
    /// 3. Environment variables (prefixed with DOC_CIRCUIT_, `__` between sections)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("doc-circuit.toml").exists() {
            builder = builder.add_source(File::with_name("doc-circuit"));
        }

        builder = builder.add_source(
            Environment::with_prefix("DOC_CIRCUIT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let circuit_config: CircuitConfig = config.try_deserialize()?;
        Ok(circuit_config)
    }

    /// Load from an explicit file, ignoring the environment
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<CircuitConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = CircuitConfig::load_env_file();
        CircuitConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static CircuitConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

//! Layered settings for the flow analyzer.

use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use flow_analysis::AnalyzerConfig;
use flow_types::FlowError;
use serde::{Deserialize, Serialize};

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Pretty-print JSON output
    #[serde(default = "default_pretty")]
    pub pretty: bool,

    /// Analysis engine configuration
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_pretty() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            pretty: default_pretty(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

/// Directory holding the default config file.
pub fn config_dir() -> PathBuf {
    ProjectDirs::from("", "", "flow-analyzer")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/flow-analyzer/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (FLOW_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, FlowError> {
        let default_config_path = config_dir().join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| FlowError::Config(e.to_string()))?
            .set_default("pretty", default_pretty())
            .map_err(|e| FlowError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // FLOW_LOG_LEVEL, FLOW_ANALYZER__EXTRACTION__CONFIDENCE_THRESHOLD, ...
        builder = builder.add_source(
            Environment::with_prefix("FLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(|e| FlowError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| FlowError::Config(e.to_string()))?;

        settings
            .analyzer
            .validate()
            .map_err(|e| FlowError::Config(e.to_string()))?;
        Ok(settings)
    }
}

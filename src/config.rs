use crate::cli::{Cli, VerbosityLevel};
use crate::error::{ConfigError, ConfigResult as Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Ambient settings. None of these change what is printed on stdout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub json: JsonConfig,
    pub network: NetworkConfig,
}

/// Diagnostic logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
}

/// JSON Schema engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JsonConfig {
    /// Draft to compile schemas with; `auto` detects it from `$schema`
    pub draft: DraftSetting,
    /// Fetch `http(s)` `$ref` targets
    pub remote_refs: bool,
}

/// Network configuration for remote `$ref` retrieval.
///
/// Downloads are attempted once with no timeout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// User agent sent with schema downloads
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DraftSetting {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "4")]
    Draft4,
    #[serde(rename = "6")]
    Draft6,
    #[serde(rename = "7")]
    Draft7,
    #[serde(rename = "2019-09")]
    Draft201909,
    #[serde(rename = "2020-12")]
    Draft202012,
}

impl DraftSetting {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "4" | "draft4" | "draft-04" => Some(Self::Draft4),
            "6" | "draft6" | "draft-06" => Some(Self::Draft6),
            "7" | "draft7" | "draft-07" => Some(Self::Draft7),
            "2019-09" | "draft2019-09" => Some(Self::Draft201909),
            "2020-12" | "draft2020-12" => Some(Self::Draft202012),
            _ => None,
        }
    }

    /// The engine draft to force, or `None` to let the engine detect it.
    pub fn to_draft(self) -> Option<jsonschema::Draft> {
        match self {
            Self::Auto => None,
            Self::Draft4 => Some(jsonschema::Draft::Draft4),
            Self::Draft6 => Some(jsonschema::Draft::Draft6),
            Self::Draft7 => Some(jsonschema::Draft::Draft7),
            Self::Draft201909 => Some(jsonschema::Draft::Draft201909),
            Self::Draft202012 => Some(jsonschema::Draft::Draft202012),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            draft: DraftSetting::Auto,
            remote_refs: true,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("schema-validate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(cli, &SystemEnvProvider).await
    }

    pub async fn load_config_with(cli: &Cli, env: &impl EnvProvider) -> Result<Config> {
        let config = match &cli.config {
            Some(config_path) => Self::load_from_file(config_path).await?,
            None => Self::find_config_file().await?.unwrap_or_default(),
        };

        let config = Self::apply_environment_overrides_with(env, config)?;
        let config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "schema-validate.toml",
            "schema-validate.json",
            ".schema-validate.toml",
            ".schema-validate.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.is_file() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("schema-validate");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.is_file() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(level) = env.get("SCHEMA_VALIDATE_LOG") {
            config.logging.level = level.trim().to_ascii_lowercase();
        }

        if let Some(draft) = env.get("SCHEMA_VALIDATE_DRAFT") {
            config.json.draft = DraftSetting::parse(&draft).ok_or_else(|| {
                ConfigError::Environment(format!("Invalid SCHEMA_VALIDATE_DRAFT value: {}", draft))
            })?;
        }

        if let Some(remote) = env.get("SCHEMA_VALIDATE_REMOTE_REFS") {
            config.json.remote_refs = remote.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid SCHEMA_VALIDATE_REMOTE_REFS value: {}",
                    remote
                ))
            })?;
        }

        Ok(config)
    }

    /// CLI flags win over everything else.
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        match cli.verbosity() {
            VerbosityLevel::Quiet => config.logging.level = "error".to_string(),
            VerbosityLevel::Verbose => config.logging.level = "debug".to_string(),
            VerbosityLevel::Normal => {}
        }
        config
    }

    pub fn validate_config(config: &Config) -> Result<()> {
        if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown log level '{}', expected one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        if config.network.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Network user agent cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

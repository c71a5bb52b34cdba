//! Configuration loader for Vision.
//!
//! Layers, lowest priority first:
//! 1. built-in defaults ([`AppConfig::default()`]);
//! 2. a TOML file: the explicit `--config` path, else `VISION_CONFIG`, else
//!    `~/.vision/config.toml` when it exists;
//! 3. environment variable overrides.
//!
//! The merged result is validated before it is returned.

use std::path::{Path, PathBuf};

use vision_types::config::AppConfig;
use vision_types::error::ConfigError;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "VISION_CONFIG";

/// Load configuration from the default sources and the process environment.
pub async fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok()).await
}

/// Load configuration reading environment variables through `env`.
pub async fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let explicit = path
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_ENV).filter(|v| !v.is_empty()).map(PathBuf::from));

    let mut config = match explicit {
        Some(path) => read_config_file(&path).await?,
        None => match default_config_path() {
            Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
                read_config_file(&path).await?
            }
            _ => {
                tracing::debug!("no config file found, using defaults");
                AppConfig::default()
            }
        },
    };

    apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

/// `~/.vision/config.toml`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".vision").join("config.toml"))
}

async fn read_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    let config = toml::from_str::<AppConfig>(&content)
        .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Apply environment overrides. Empty values are ignored.
fn apply_env_overrides<F>(config: &mut AppConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = var("PORT") {
        config.server.port = parse_var("PORT", &port)?;
    }
    if let Some(host) = var("VISION_HOST") {
        config.server.host = host;
    }
    if let Some(token) = var("AUTH_TOKEN") {
        config.auth.token = Some(token);
    }
    if let Some(region) = var("AWS_REGION") {
        config.provider.region = region;
    }
    if let Some(model_id) = var("VISION_MODEL_ID") {
        config.provider.model_id = model_id;
    }
    if let Some(api_key) = var("AWS_BEARER_TOKEN_BEDROCK") {
        config.provider.api_key = Some(api_key);
    }
    if let Some(max) = var("VISION_MAX_HISTORY") {
        config.conversation.max_history_messages = parse_var("VISION_MAX_HISTORY", &max)?;
    }
    if let Some(dir) = var("VISION_TRANSCRIPT_DIR") {
        config.persistence.dir = Some(PathBuf::from(dir));
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        field: key.to_string(),
        message: e.to_string(),
    })
}

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::{models::ThicketConfig, validation::ThicketConfigValidator};

/// Default config file name looked up in the project directory.
pub const DEFAULT_CONFIG_FILE: &str = "thicket.toml";

/// Load and validate configuration from a file.
pub async fn load_config(config_path: &str) -> Result<ThicketConfig> {
    let config = load_config_sync(config_path)?;
    ThicketConfigValidator::validate(&config)
        .with_context(|| format!("Invalid configuration in {config_path}"))?;
    Ok(config)
}

/// Load configuration synchronously using the config crate.
/// Supports YAML, JSON, TOML and INI; `THICKET_*` environment variables
/// override file values (`THICKET_LISTEN_ADDR`, `THICKET_DEV_SERVER__PROXY_TIMEOUT_SECS`).
pub fn load_config_sync(config_path: &str) -> Result<ThicketConfig> {
    let config_path = Path::new(config_path);

    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml,
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .add_source(
            Environment::with_prefix("THICKET")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let config: ThicketConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(config)
}

/// Load the config if the file exists, otherwise fall back to defaults.
pub fn load_config_or_default(config_path: &str) -> Result<ThicketConfig> {
    if Path::new(config_path).exists() {
        load_config_sync(config_path)
    } else {
        tracing::info!("No config file at {}, using defaults", config_path);
        Ok(ThicketConfig::default())
    }
}

/// Load configuration without validation (used for validation command)
pub async fn load_config_unchecked(config_path: &str) -> Result<ThicketConfig> {
    load_config_sync(config_path)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::config::models::SiteMode;

    #[tokio::test]
    async fn test_load_toml_config() {
        let toml_content = r#"
listen_addr = "127.0.0.1:3000"
mode = "spa"
output_dir = "dist"

[dev_server.proxy]
"/api" = "https://api.example.com"

[dev_server.headers]
x-frame-options = "DENY"
"#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.mode, SiteMode::Spa);
        assert_eq!(config.output_dir, "dist");
        assert_eq!(config.workspace, "src");
        assert_eq!(config.dev_server.proxy.len(), 1);
        assert_eq!(config.dev_server.headers.len(), 1);
    }

    #[tokio::test]
    async fn test_load_yaml_config() {
        let yaml_content = r#"
listen_addr: "127.0.0.1:4000"
prerender: true
logging:
  level: debug
  json: true
"#;

        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert!(config.prerender);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "listen_addr = \"nowhere\"").unwrap();

        assert!(load_config(temp_file.path().to_str().unwrap()).await.is_err());
        assert!(
            load_config_unchecked(temp_file.path().to_str().unwrap())
                .await
                .is_ok()
        );
    }
}

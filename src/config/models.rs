//! Configuration data structures for thicket.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files. Every
//! section carries serde defaults so that an empty file is a valid project config.
//! Builders here are part of the public API for embedding.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Site rendering mode.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SiteMode {
    /// Multi-page static site, one artifact per route.
    #[default]
    Ssg,
    /// Single-page app, every client-side route is served the shell.
    Spa,
}

/// Development server settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DevServerConfig {
    /// Path prefix to upstream origin, e.g. `"/api" = "https://example.com"`.
    pub proxy: BTreeMap<String, String>,
    /// Headers added to every response of the dev server.
    pub headers: BTreeMap<String, String>,
    /// Upstream timeout for proxied requests, in seconds.
    pub proxy_timeout_secs: u64,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            proxy: BTreeMap::new(),
            headers: BTreeMap::new(),
            proxy_timeout_secs: 30,
        }
    }
}

impl DevServerConfig {
    pub fn has_proxy(&self) -> bool {
        !self.proxy.is_empty()
    }
}

/// Logging configuration consumed by `tracing_setup::init_tracing`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human readable output.
    pub json: bool,
    /// Include the current span list in JSON output.
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            include_spans: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ThicketConfig {
    pub listen_addr: String,
    pub mode: SiteMode,
    /// Pre-render SSR pages at build time instead of on request.
    pub prerender: bool,
    /// User workspace, relative to the project directory.
    pub workspace: String,
    /// Pages directory, relative to the workspace.
    pub pages_dir: String,
    /// Build output directory, relative to the project directory.
    pub output_dir: String,
    /// Route graph location; defaults to `graph.json` in the output dir.
    pub graph_path: Option<String>,
    /// API manifest location; defaults to `manifest.json` in the output dir.
    pub manifest_path: Option<String>,
    pub dev_server: DevServerConfig,
    pub logging: LoggingConfig,
}

impl ThicketConfig {
    /// Create a new configuration builder
    pub fn builder() -> ThicketConfigBuilder {
        ThicketConfigBuilder::default()
    }
}

impl Default for ThicketConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:1984".to_string(),
            mode: SiteMode::default(),
            prerender: false,
            workspace: "src".to_string(),
            pages_dir: "pages".to_string(),
            output_dir: "public".to_string(),
            graph_path: None,
            manifest_path: None,
            dev_server: DevServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Builder for ThicketConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct ThicketConfigBuilder {
    config: ThicketConfig,
}

impl ThicketConfigBuilder {
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn mode(mut self, mode: SiteMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn prerender(mut self, prerender: bool) -> Self {
        self.config.prerender = prerender;
        self
    }

    pub fn workspace(mut self, workspace: impl Into<String>) -> Self {
        self.config.workspace = workspace.into();
        self
    }

    pub fn pages_dir(mut self, pages_dir: impl Into<String>) -> Self {
        self.config.pages_dir = pages_dir.into();
        self
    }

    pub fn output_dir(mut self, output_dir: impl Into<String>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    /// Forward requests under `prefix` to `target`.
    pub fn proxy(mut self, prefix: impl Into<String>, target: impl Into<String>) -> Self {
        self.config
            .dev_server
            .proxy
            .insert(prefix.into(), target.into());
        self
    }

    /// Add a header to every dev server response.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .dev_server
            .headers
            .insert(name.into(), value.into());
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Build the final ThicketConfig
    pub fn build(self) -> Result<ThicketConfig, String> {
        if self.config.listen_addr.is_empty() {
            return Err("listen_addr is required".to_string());
        }
        if self.config.output_dir.is_empty() {
            return Err("output_dir is required".to_string());
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: ThicketConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ThicketConfig::default());
        assert_eq!(config.listen_addr, "127.0.0.1:1984");
        assert_eq!(config.mode, SiteMode::Ssg);
        assert!(!config.dev_server.has_proxy());
    }

    #[test]
    fn builder_collects_proxy_and_headers() {
        let config = ThicketConfig::builder()
            .mode(SiteMode::Spa)
            .proxy("/api", "https://example.com")
            .header("x-powered-by", "thicket")
            .build()
            .unwrap();

        assert_eq!(config.mode, SiteMode::Spa);
        assert_eq!(
            config.dev_server.proxy.get("/api").map(String::as_str),
            Some("https://example.com")
        );
        assert_eq!(config.dev_server.headers.len(), 1);
        assert_eq!(config.dev_server.proxy_timeout_secs, 30);
    }

    #[test]
    fn builder_rejects_empty_listen_addr() {
        assert!(ThicketConfig::builder().listen_addr("").build().is_err());
    }
}

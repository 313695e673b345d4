use thiserror::Error;
use url::Url;

use crate::ports::{
    file_system::FileSystemError, handler_loader::HandlerError, http_client::HttpClientError,
};

/// Boxed error carried by plugin failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures raised while running a request through the resource pipeline.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("plugin '{plugin}' failed to resolve {url}: {source}")]
    Resolve {
        plugin: String,
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("plugin '{plugin}' failed to serve {url}: {source}")]
    Serve {
        plugin: String,
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("plugin '{plugin}' failed to intercept {url}: {source}")]
    Intercept {
        plugin: String,
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("plugin '{plugin}' failed to optimize {url}: {source}")]
    Optimize {
        plugin: String,
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("File system error: {0}")]
    FileSystem(#[from] FileSystemError),

    #[error("Proxy error: {0}")]
    Http(#[from] HttpClientError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl PipelineError {
    pub(crate) fn resolve(plugin: &str, url: &Url, report: eyre::Report) -> Self {
        Self::Resolve {
            plugin: plugin.to_string(),
            url: url.to_string(),
            source: report.into(),
        }
    }

    pub(crate) fn serve(plugin: &str, url: &Url, report: eyre::Report) -> Self {
        Self::Serve {
            plugin: plugin.to_string(),
            url: url.to_string(),
            source: report.into(),
        }
    }

    pub(crate) fn intercept(plugin: &str, url: &Url, report: eyre::Report) -> Self {
        Self::Intercept {
            plugin: plugin.to_string(),
            url: url.to_string(),
            source: report.into(),
        }
    }

    pub(crate) fn optimize(plugin: &str, url: &Url, report: eyre::Report) -> Self {
        Self::Optimize {
            plugin: plugin.to_string(),
            url: url.to_string(),
            source: report.into(),
        }
    }
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

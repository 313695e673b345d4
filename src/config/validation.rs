use std::{net::SocketAddr, path::Path};

use http::{HeaderName, HeaderValue};
use tracing_subscriber::EnvFilter;

use crate::config::models::{DevServerConfig, ThicketConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Invalid proxy rule '{prefix}': {message}")]
    InvalidProxy { prefix: String, message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Project configuration validator
pub struct ThicketConfigValidator;

impl ThicketConfigValidator {
    /// Validate the entire configuration, reporting every problem at once.
    pub fn validate(config: &ThicketConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        for (field, value) in [
            ("workspace", &config.workspace),
            ("pages_dir", &config.pages_dir),
            ("output_dir", &config.output_dir),
        ] {
            if let Err(e) = Self::validate_relative_dir(field, value) {
                errors.push(e);
            }
        }

        if let Err(mut dev_server_errors) = Self::validate_dev_server(&config.dev_server) {
            errors.append(&mut dev_server_errors);
        }

        if EnvFilter::try_new(&config.logging.level).is_err() {
            errors.push(ValidationError::InvalidField {
                field: "logging.level".to_string(),
                message: format!("'{}' is not a valid filter directive", config.logging.level),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:1984')".to_string(),
            });
        }
        Ok(())
    }

    /// Directories are resolved against the project, so they must stay relative.
    fn validate_relative_dir(field: &str, value: &str) -> ValidationResult<()> {
        if value.is_empty() {
            return Err(ValidationError::MissingField {
                field: field.to_string(),
            });
        }
        let path = Path::new(value);
        if path.is_absolute() || path.components().any(|c| c.as_os_str() == "..") {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: "must be a relative path inside the project".to_string(),
            });
        }
        Ok(())
    }

    fn validate_dev_server(config: &DevServerConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (prefix, target) in &config.proxy {
            if !prefix.starts_with('/') {
                errors.push(ValidationError::InvalidProxy {
                    prefix: prefix.clone(),
                    message: "prefix must start with '/'".to_string(),
                });
            }
            if let Err(e) = Self::validate_url(target, &format!("dev_server.proxy.{prefix}")) {
                errors.push(e);
            }
        }

        for (name, value) in &config.headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidField {
                    field: format!("dev_server.headers.{name}"),
                    message: "invalid header name".to_string(),
                });
            }
            if HeaderValue::from_str(value).is_err() {
                errors.push(ValidationError::InvalidField {
                    field: format!("dev_server.headers.{name}"),
                    message: "invalid header value".to_string(),
                });
            }
        }

        if config.has_proxy() && config.proxy_timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "dev_server.proxy_timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate URL format
    fn validate_url(url_str: &str, context: &str) -> ValidationResult<()> {
        match url::Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: format!(
                            "URL scheme must be 'http' or 'https', got '{}'",
                            url.scheme()
                        ),
                    });
                }

                if url.host().is_none() {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: "URL must have a valid host".to_string(),
                    });
                }

                Ok(())
            }
            Err(e) => Err(ValidationError::InvalidField {
                field: context.to_string(),
                message: format!("Invalid URL format: {e}"),
            }),
        }
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}

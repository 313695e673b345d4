pub mod config_providers;
pub mod file_system;
pub mod handler_registry;
pub mod http_client;
pub mod http_handler;
pub mod middleware;

/// Re-export commonly used types from adapters
pub use config_providers::FileConfigProvider;
pub use file_system::FileSystemAdapter;
pub use handler_registry::{FnHandler, HandlerRegistry, handler_fn};
pub use http_client::HttpClientAdapter;
pub use http_handler::{HttpHandler, router};
pub use middleware::*;

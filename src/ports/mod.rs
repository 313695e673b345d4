//! Ports (interfaces) between the pipeline core and the outside world.
pub mod config_provider;
pub mod file_system;
pub mod handler_loader;
pub mod http_client;
pub mod http_server;

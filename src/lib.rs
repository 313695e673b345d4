//! Thicket - a static-site and SSR build tool built around a pluggable
//! resource pipeline.
//!
//! Every URL the development server sees flows through four phases
//! contributed by resource plugins:
//!
//! - **resolve** rewrites the request URL (e.g. onto a `file://` URL in the
//!   user workspace), folded over every claiming plugin
//! - **serve** produces the response; the first claiming plugin wins
//! - **intercept** post-processes the response, folded left to right with
//!   [`ResourceResponse::merge`](core::resource::ResourceResponse::merge)
//! - **optimize** rewrites emitted bodies at build time
//!
//! The production server ([`core::dispatch::SiteServer`]) serves the built
//! output directory and, for hybrid projects, routes on-demand SSR pages and
//! API routes to handlers loaded through the
//! [`HandlerLoader`](ports::handler_loader::HandlerLoader) port.
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use thicket::{
//!     FileSystemAdapter,
//!     config::ThicketConfig,
//!     core::{Compilation, DevServer, PluginContext, RunMode},
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let compilation = Compilation::builder(ThicketConfig::default(), RunMode::Develop)
//!     .project_dir(".")
//!     .build()
//!     .await?;
//! let context = PluginContext::new(Arc::new(compilation), Arc::new(FileSystemAdapter::new()));
//! let server = DevServer::new(&context)?;
//! let url = server.request_url("/blog/first-post/")?;
//! let response = server.process(thicket::core::ResourceRequest::get(url)).await;
//! println!("{}", response.effective_status());
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! Ports (traits) live in [`ports`], their implementations in [`adapters`],
//! and the pipeline itself in [`core`]. Built-in plugins are in [`plugins`].
//!
//! # Error Handling
//! Application code returns `eyre::Result<T>` with `WrapErr` context; the
//! pipeline reports failures as [`core::error::PipelineError`], which the
//! servers turn into status codes instead of propagating.
pub mod config;
pub mod plugins;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{
        FileConfigProvider, FileSystemAdapter, HandlerRegistry, HttpClientAdapter, HttpHandler,
    },
    core::{Compilation, DevServer, SiteServer},
    ports::{handler_loader::RouteHandler, http_client::HttpClient},
    utils::GracefulShutdown,
};

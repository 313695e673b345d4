use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{
    compilation::Compilation,
    resource::{ResourceRequest, ResourceResponse},
};

/// Error type for route handler loading and invocation
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    /// No handler is registered for the module path
    #[error("No handler registered for module {0}")]
    NotFound(String),

    /// The handler ran and failed
    #[error("Handler for {module} failed: {message}")]
    Invocation { module: String, message: String },
}

/// A server-side route handler: an SSR page or an API endpoint.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    /// SSR handlers receive the compilation, API handlers receive `None`.
    async fn handle(
        &self,
        request: ResourceRequest,
        compilation: Option<&Compilation>,
    ) -> eyre::Result<ResourceResponse>;
}

/// HandlerLoader resolves a module path (absolute, inside the output dir)
/// to the handler it exports.
#[async_trait]
pub trait HandlerLoader: Send + Sync + 'static {
    async fn load(&self, module: &Path) -> Result<Arc<dyn RouteHandler>, HandlerError>;
}

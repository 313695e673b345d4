use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use scc::HashMap;

use crate::{
    core::{
        compilation::Compilation,
        resource::{ResourceRequest, ResourceResponse},
    },
    ports::handler_loader::{HandlerError, HandlerLoader, RouteHandler},
};

/// In-process handler loader: route handlers are registered by the module
/// path the build emitted for them, relative to the output dir.
pub struct HandlerRegistry {
    output_dir: PathBuf,
    handlers: HashMap<PathBuf, Arc<dyn RouteHandler>>,
}

impl HandlerRegistry {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `module` (e.g. `api/ping.js`), replacing any
    /// handler already registered there.
    pub async fn register(&self, module: &str, handler: Arc<dyn RouteHandler>) {
        let key = self.output_dir.join(module.trim_start_matches('/'));
        if self.handlers.upsert_async(key, handler).await.is_some() {
            tracing::debug!("Replaced route handler for {}", module);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl HandlerLoader for HandlerRegistry {
    async fn load(&self, module: &Path) -> Result<Arc<dyn RouteHandler>, HandlerError> {
        self.handlers
            .get_async(module)
            .await
            .map(|entry| entry.get().clone())
            .ok_or_else(|| HandlerError::NotFound(module.display().to_string()))
    }
}

/// A [`RouteHandler`] backed by a plain function of the request.
pub struct FnHandler<F>(pub F);

/// Wrap a closure as a shareable route handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn RouteHandler>
where
    F: Fn(&ResourceRequest, Option<&Compilation>) -> eyre::Result<ResourceResponse>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnHandler(f))
}

#[async_trait]
impl<F> RouteHandler for FnHandler<F>
where
    F: Fn(&ResourceRequest, Option<&Compilation>) -> eyre::Result<ResourceResponse> + Send + Sync,
{
    async fn handle(
        &self,
        request: ResourceRequest,
        compilation: Option<&Compilation>,
    ) -> eyre::Result<ResourceResponse> {
        (self.0)(&request, compilation)
    }
}

//! Development server: resolve, serve, intercept and tag every request.
use std::sync::Arc;

use http::StatusCode;
use url::Url;

use crate::{
    core::{
        compilation::Compilation,
        error::PipelineResult,
        etag::apply_etag,
        pipeline::ResourcePipeline,
        plugin::PluginContext,
        resource::{ResourceRequest, ResourceResponse},
    },
    ports::http_server::ResourceServer,
};

#[derive(Debug, Clone)]
pub struct DevServer {
    compilation: Arc<Compilation>,
    pipeline: ResourcePipeline,
}

impl DevServer {
    /// Instantiate every registered resource plugin once for this server.
    pub fn new(context: &PluginContext) -> eyre::Result<Self> {
        let pipeline =
            ResourcePipeline::from_descriptors(context.compilation.plugins(), context)?;
        tracing::info!(
            "Development server ready with {} resource plugins",
            pipeline.len()
        );
        Ok(Self {
            compilation: context.compilation.clone(),
            pipeline,
        })
    }

    pub fn with_pipeline(compilation: Arc<Compilation>, pipeline: ResourcePipeline) -> Self {
        Self {
            compilation,
            pipeline,
        }
    }

    pub fn compilation(&self) -> &Arc<Compilation> {
        &self.compilation
    }

    pub fn pipeline(&self) -> &ResourcePipeline {
        &self.pipeline
    }

    /// Build the network URL a request path is first resolved from.
    pub fn request_url(&self, path_and_query: &str) -> PipelineResult<Url> {
        let raw = format!("{}{}", self.compilation.base_url(), path_and_query);
        Url::parse(&raw).map_err(|e| crate::core::error::PipelineError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Run one request through every phase.
    ///
    /// A resolve failure ends the request with a bare 500. A serve failure
    /// becomes a bodiless 500 that still flows through intercept and ETag.
    /// An intercept failure keeps the pre-intercept response with a 500.
    pub async fn process(&self, request: ResourceRequest) -> ResourceResponse {
        let resolved = match self.pipeline.resolve(request).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::error!("Resolution failed: {}", e);
                return ResourceResponse::internal_error();
            }
        };

        let served = match self.pipeline.serve(&resolved).await {
            Ok(served) => served,
            Err(e) => {
                tracing::error!("Serve failed: {}", e);
                ResourceResponse::internal_error()
            }
        };

        let intercepted = match self.pipeline.intercept(&resolved, served.clone()).await {
            Ok(intercepted) => intercepted,
            Err(e) => {
                tracing::error!("Intercept failed: {}", e);
                served.with_status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        apply_etag(self.compilation.mode, &resolved, intercepted)
    }
}

impl ResourceServer for DevServer {
    async fn handle(&self, request: ResourceRequest) -> ResourceResponse {
        self.process(request).await
    }
}

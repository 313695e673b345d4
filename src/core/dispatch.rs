//! Production serving of a built site.
//!
//! Each request walks four branches and stops at the first that answers:
//!
//! 1. HTML artifacts: the SPA shell, statically resolved routes, `.html` paths
//! 2. the dev proxy, when proxy rules are configured
//! 3. files in the output dir, served by the standard static plugins
//! 4. hybrid only: on-demand SSR pages, then API routes
use std::sync::Arc;

use http::StatusCode;
use url::Url;

use crate::{
    core::{
        compilation::Compilation,
        error::{PipelineError, PipelineResult},
        graph::PageNode,
        pipeline::ResourcePipeline,
        plugin::{PluginContext, ResourcePlugin},
        resource::{ResourceRequest, ResourceResponse, url_extension},
    },
    plugins::DEV_PROXY_PLUGIN,
    ports::{
        file_system::{FileSystem, confine},
        handler_loader::{HandlerError, HandlerLoader},
        http_server::ResourceServer,
    },
};

pub struct SiteServer {
    compilation: Arc<Compilation>,
    standard: ResourcePipeline,
    proxy: Option<ResourcePlugin>,
    file_system: Arc<dyn FileSystem>,
    handlers: Arc<dyn HandlerLoader>,
    hybrid: bool,
}

impl SiteServer {
    pub fn new(context: &PluginContext, handlers: Arc<dyn HandlerLoader>) -> eyre::Result<Self> {
        let compilation = context.compilation.clone();
        let standard = ResourcePipeline::standard_static(compilation.plugins(), context)?;

        let proxy = if compilation.config.dev_server.has_proxy() {
            compilation
                .plugin(DEV_PROXY_PLUGIN)
                .map(|descriptor| descriptor.instantiate(context))
                .transpose()?
        } else {
            None
        };

        let hybrid = compilation.is_hybrid();
        tracing::info!(
            "Site server ready ({}, {} static plugins, proxy: {})",
            if hybrid { "hybrid" } else { "static" },
            standard.len(),
            proxy.is_some()
        );

        Ok(Self {
            compilation,
            standard,
            proxy,
            file_system: context.file_system.clone(),
            handlers,
            hybrid,
        })
    }

    pub fn is_hybrid(&self) -> bool {
        self.hybrid
    }

    /// Answer a request. A failure in any branch is logged and answered with
    /// a bare 500; only a request no branch claims is a 404.
    pub async fn process(&self, request: ResourceRequest) -> ResourceResponse {
        match self.dispatch(&request).await {
            Ok(Some(response)) => response,
            Ok(None) => ResourceResponse::not_found(),
            Err(e) => {
                tracing::error!("Failed to serve {}: {}", request.url, e);
                ResourceResponse::internal_error()
            }
        }
    }

    async fn dispatch(&self, request: &ResourceRequest) -> PipelineResult<Option<ResourceResponse>> {
        let path = request.url.path();
        let node = self.compilation.graph.find_by_route(path);

        if let Some(response) = self.serve_html_artifact(request, node).await? {
            return Ok(Some(response));
        }
        if let Some(response) = self.serve_proxied(request).await? {
            return Ok(Some(response));
        }
        if let Some(response) = self.serve_static_file(request).await? {
            return Ok(Some(response));
        }
        if self.hybrid {
            return self.serve_dynamic(request, node).await;
        }
        Ok(None)
    }

    async fn serve_html_artifact(
        &self,
        request: &ResourceRequest,
        node: Option<&PageNode>,
    ) -> PipelineResult<Option<ResourceResponse>> {
        let extension = url_extension(&request.url);
        let spa_shell = self.compilation.graph.spa_shell().is_some() && extension.is_none();
        let prerender = self.compilation.config.prerender;
        let static_node = node.filter(|node| node.is_statically_resolved(prerender));

        let relative = if spa_shell {
            "index.html"
        } else if let Some(node) = static_node {
            node.output_path.as_str()
        } else if extension == Some("html") {
            request.url.path()
        } else {
            return Ok(None);
        };

        let file = confine(&self.compilation.context.output_dir, relative)?;
        let body = self.file_system.read_to_string(&file).await?;
        Ok(Some(
            ResourceResponse::text("text/html", body).with_status(StatusCode::OK),
        ))
    }

    async fn serve_proxied(
        &self,
        request: &ResourceRequest,
    ) -> PipelineResult<Option<ResourceResponse>> {
        let Some(proxy) = &self.proxy else {
            return Ok(None);
        };
        let Some(server) = proxy.server() else {
            return Ok(None);
        };

        let url = &request.url;
        let claimed = server
            .should_serve(url, request)
            .await
            .map_err(|e| PipelineError::serve(proxy.name(), url, e))?;
        if !claimed {
            return Ok(None);
        }
        let response = server
            .serve(url, request)
            .await
            .map_err(|e| PipelineError::serve(proxy.name(), url, e))?;
        Ok(Some(response))
    }

    async fn serve_static_file(
        &self,
        request: &ResourceRequest,
    ) -> PipelineResult<Option<ResourceResponse>> {
        let file = confine(&self.compilation.context.output_dir, request.url.path())?;
        if !self.file_system.exists(&file).await {
            return Ok(None);
        }

        let file_url = Url::from_file_path(&file)
            .map_err(|()| PipelineError::InvalidUrl(file.display().to_string()))?;
        let file_request = request.with_url(file_url);
        let response = self.standard.serve(&file_request).await?;

        Ok((response.is_success() && !response.is_placeholder()).then_some(response))
    }

    async fn serve_dynamic(
        &self,
        request: &ResourceRequest,
        node: Option<&PageNode>,
    ) -> PipelineResult<Option<ResourceResponse>> {
        let prerender = self.compilation.config.prerender;
        let output_dir = &self.compilation.context.output_dir;

        if let Some(node) = node.filter(|node| node.renders_on_demand(prerender)) {
            let filename = node.filename.as_deref().ok_or_else(|| {
                HandlerError::NotFound(format!("route {} has no handler module", node.route))
            })?;
            let module = confine(output_dir, filename)?;
            let response = self
                .invoke(&module, request.clone(), Some(self.compilation.as_ref()))
                .await?;
            let page = ResourceResponse::new()
                .with_status(StatusCode::OK)
                .with_content_type("text/html");
            return Ok(Some(ResourceResponse::merge(&response, &page)));
        }

        if let Some(api) = self.compilation.manifest.get(request.url.path()) {
            let module = confine(output_dir, &api.path)?;
            let response = self.invoke(&module, request.clone(), None).await?;
            return Ok(Some(response.with_status(StatusCode::OK)));
        }

        Ok(None)
    }

    async fn invoke(
        &self,
        module: &std::path::Path,
        request: ResourceRequest,
        compilation: Option<&Compilation>,
    ) -> PipelineResult<ResourceResponse> {
        let handler = self.handlers.load(module).await?;
        handler
            .handle(request, compilation)
            .await
            .map_err(|e| {
                PipelineError::Handler(HandlerError::Invocation {
                    module: module.display().to_string(),
                    message: format!("{e:#}"),
                })
            })
    }
}

impl ResourceServer for SiteServer {
    async fn handle(&self, request: ResourceRequest) -> ResourceResponse {
        self.process(request).await
    }
}

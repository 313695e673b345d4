//! Sequential resource pipeline.
//!
//! Plugin order is an observable contract: built-in plugins come first, user
//! plugins after, each group in registration order. Every phase awaits one
//! plugin at a time; there is no fan-out within a phase.
//!
//! | phase     | semantics                                   |
//! |-----------|---------------------------------------------|
//! | resolve   | fold, each match replaces the request        |
//! | serve     | first match wins, merged onto a placeholder  |
//! | intercept | fold, each match merged onto the accumulator |
//! | optimize  | fold over the body                           |
use std::sync::Arc;

use tracing::Instrument;
use url::Url;

use crate::{
    core::{
        error::{PipelineError, PipelineResult},
        plugin::{PluginContext, PluginKind, ResourcePlugin, ResourcePluginDescriptor},
        resource::{ResourceRequest, ResourceResponse},
    },
    tracing_setup::create_phase_span,
};

/// Ordered, immutable list of plugin instances shared by every request of a
/// lifecycle. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ResourcePipeline {
    plugins: Arc<[ResourcePlugin]>,
}

impl ResourcePipeline {
    pub fn new(plugins: Vec<ResourcePlugin>) -> Self {
        Self {
            plugins: plugins.into(),
        }
    }

    /// Instantiate every resource descriptor, built-in plugins first.
    pub fn from_descriptors(
        descriptors: &[ResourcePluginDescriptor],
        context: &PluginContext,
    ) -> eyre::Result<Self> {
        let resources = descriptors
            .iter()
            .filter(|descriptor| descriptor.kind == PluginKind::Resource);
        let ordered = resources
            .clone()
            .filter(|descriptor| descriptor.is_default)
            .chain(resources.filter(|descriptor| !descriptor.is_default));

        Self::instantiate(ordered, context)
    }

    /// Instantiate only the built-in plugins that serve plain static assets.
    pub fn standard_static(
        descriptors: &[ResourcePluginDescriptor],
        context: &PluginContext,
    ) -> eyre::Result<Self> {
        let standard = descriptors.iter().filter(|descriptor| {
            descriptor.kind == PluginKind::Resource
                && descriptor.is_default
                && descriptor.is_standard_static_resource
        });

        Self::instantiate(standard, context)
    }

    fn instantiate<'a>(
        descriptors: impl Iterator<Item = &'a ResourcePluginDescriptor>,
        context: &PluginContext,
    ) -> eyre::Result<Self> {
        let mut plugins = Vec::new();
        for descriptor in descriptors {
            let plugin = descriptor.instantiate(context).map_err(|e| {
                e.wrap_err(format!("Failed to instantiate plugin '{}'", descriptor.name))
            })?;
            tracing::debug!(
                plugin = %descriptor.name,
                capabilities = ?plugin.capabilities(),
                "Registered resource plugin"
            );
            plugins.push(plugin);
        }
        Ok(Self::new(plugins))
    }

    pub fn plugins(&self) -> &[ResourcePlugin] {
        &self.plugins
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Resolution phase: fold over resolvers, each seeing the request the
    /// previous one produced. The final request's URL is the resolved URL.
    pub async fn resolve(&self, request: ResourceRequest) -> PipelineResult<ResourceRequest> {
        let span = create_phase_span("resolve", request.url.as_str());
        async move {
            let mut current = request;
            for plugin in self.plugins.iter() {
                let Some(resolver) = plugin.resolver() else {
                    continue;
                };
                let url = current.url.clone();
                let claimed = resolver
                    .should_resolve(&url, &current)
                    .await
                    .map_err(|e| PipelineError::resolve(plugin.name(), &url, e))?;
                if claimed {
                    current = resolver
                        .resolve(&url, current.clone())
                        .await
                        .map_err(|e| PipelineError::resolve(plugin.name(), &url, e))?;
                    tracing::debug!(plugin = plugin.name(), from = %url, to = %current.url, "Resolved");
                }
            }
            Ok(current)
        }
        .instrument(span)
        .await
    }

    /// Serve phase: the first plugin that claims the URL produces the
    /// response. With no claim the untouched placeholder is returned.
    pub async fn serve(&self, request: &ResourceRequest) -> PipelineResult<ResourceResponse> {
        let url = &request.url;
        let span = create_phase_span("serve", url.as_str());
        async move {
            let response = ResourceResponse::new();
            for plugin in self.plugins.iter() {
                let Some(server) = plugin.server() else {
                    continue;
                };
                let claimed = server
                    .should_serve(url, request)
                    .await
                    .map_err(|e| PipelineError::serve(plugin.name(), url, e))?;
                if claimed {
                    let served = server
                        .serve(url, request)
                        .await
                        .map_err(|e| PipelineError::serve(plugin.name(), url, e))?;
                    tracing::debug!(plugin = plugin.name(), "Served");
                    return Ok(ResourceResponse::merge(&response, &served));
                }
            }
            tracing::debug!("No plugin served the request");
            Ok(response)
        }
        .instrument(span)
        .await
    }

    /// Intercept phase: every claiming plugin contributes, each contribution
    /// merged onto the accumulated response before the next plugin looks.
    pub async fn intercept(
        &self,
        request: &ResourceRequest,
        response: ResourceResponse,
    ) -> PipelineResult<ResourceResponse> {
        let url = &request.url;
        let span = create_phase_span("intercept", url.as_str());
        async move {
            let mut current = response;
            for plugin in self.plugins.iter() {
                let Some(interceptor) = plugin.interceptor() else {
                    continue;
                };
                let claimed = interceptor
                    .should_intercept(url, request, &current)
                    .await
                    .map_err(|e| PipelineError::intercept(plugin.name(), url, e))?;
                if claimed {
                    let contribution = interceptor
                        .intercept(url, request, current.clone())
                        .await
                        .map_err(|e| PipelineError::intercept(plugin.name(), url, e))?;
                    current = ResourceResponse::merge(&current, &contribution);
                    tracing::debug!(plugin = plugin.name(), "Intercepted");
                }
            }
            Ok(current)
        }
        .instrument(span)
        .await
    }

    /// Optimize phase: fold every claiming optimizer over the body.
    pub async fn optimize(&self, url: &Url, body: String) -> PipelineResult<String> {
        let span = create_phase_span("optimize", url.as_str());
        async move {
            let mut current = body;
            for plugin in self.plugins.iter() {
                let Some(optimizer) = plugin.optimizer() else {
                    continue;
                };
                let claimed = optimizer
                    .should_optimize(url)
                    .await
                    .map_err(|e| PipelineError::optimize(plugin.name(), url, e))?;
                if claimed {
                    current = optimizer
                        .optimize(url, current)
                        .await
                        .map_err(|e| PipelineError::optimize(plugin.name(), url, e))?;
                }
            }
            Ok(current)
        }
        .instrument(span)
        .await
    }
}

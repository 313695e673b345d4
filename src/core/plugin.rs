//! The resource plugin contract.
//!
//! A [`ResourcePlugin`] has four independent capability slots. Each slot holds
//! a trait object that pairs a side-effect free predicate with the operation
//! it guards, so a plugin either takes part in a phase completely or not at
//! all. Phases check slot presence and skip plugins with an empty slot.
//!
//! Plugins are produced by a [`ResourcePluginDescriptor`] whose provider runs
//! once per server or build lifecycle, never per request.
use std::{fmt, sync::Arc};

use async_trait::async_trait;
use url::Url;

use crate::{
    core::{
        compilation::Compilation,
        resource::{ResourceRequest, ResourceResponse},
    },
    ports::{file_system::FileSystem, http_client::HttpClient},
};

/// Result type returned by plugin predicates and operations.
pub type PluginResult<T> = eyre::Result<T>;

/// URL rewriting ahead of content lookup.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn should_resolve(&self, url: &Url, request: &ResourceRequest) -> PluginResult<bool>;

    /// Produce a new request, usually with a rewritten URL.
    async fn resolve(&self, url: &Url, request: ResourceRequest) -> PluginResult<ResourceRequest>;
}

/// Producing the base response for a URL.
#[async_trait]
pub trait Server: Send + Sync {
    async fn should_serve(&self, url: &Url, request: &ResourceRequest) -> PluginResult<bool>;

    async fn serve(&self, url: &Url, request: &ResourceRequest) -> PluginResult<ResourceResponse>;
}

/// Post-processing of a response that has already been produced.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn should_intercept(
        &self,
        url: &Url,
        request: &ResourceRequest,
        response: &ResourceResponse,
    ) -> PluginResult<bool>;

    /// Return a partial response; it is merged onto `response` by the caller.
    async fn intercept(
        &self,
        url: &Url,
        request: &ResourceRequest,
        response: ResourceResponse,
    ) -> PluginResult<ResourceResponse>;
}

/// Build-time body transformation, independent of serving.
#[async_trait]
pub trait Optimizer: Send + Sync {
    async fn should_optimize(&self, url: &Url) -> PluginResult<bool>;

    async fn optimize(&self, url: &Url, body: String) -> PluginResult<String>;
}

/// A plugin instance taking part in pipeline phases.
#[derive(Clone)]
pub struct ResourcePlugin {
    name: Arc<str>,
    resolver: Option<Arc<dyn Resolver>>,
    server: Option<Arc<dyn Server>>,
    interceptor: Option<Arc<dyn Interceptor>>,
    optimizer: Option<Arc<dyn Optimizer>>,
}

impl ResourcePlugin {
    pub fn builder(name: impl Into<String>) -> ResourcePluginBuilder {
        ResourcePluginBuilder {
            name: name.into(),
            resolver: None,
            server: None,
            interceptor: None,
            optimizer: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolver(&self) -> Option<&dyn Resolver> {
        self.resolver.as_deref()
    }

    pub fn server(&self) -> Option<&dyn Server> {
        self.server.as_deref()
    }

    pub fn interceptor(&self) -> Option<&dyn Interceptor> {
        self.interceptor.as_deref()
    }

    pub fn optimizer(&self) -> Option<&dyn Optimizer> {
        self.optimizer.as_deref()
    }

    /// Names of the filled capability slots, for diagnostics.
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut capabilities = Vec::new();
        if self.resolver.is_some() {
            capabilities.push("resolve");
        }
        if self.server.is_some() {
            capabilities.push("serve");
        }
        if self.interceptor.is_some() {
            capabilities.push("intercept");
        }
        if self.optimizer.is_some() {
            capabilities.push("optimize");
        }
        capabilities
    }
}

impl fmt::Debug for ResourcePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePlugin")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Builder for [`ResourcePlugin`]. The same `Arc` may fill several slots
/// when one type implements several capabilities.
pub struct ResourcePluginBuilder {
    name: String,
    resolver: Option<Arc<dyn Resolver>>,
    server: Option<Arc<dyn Server>>,
    interceptor: Option<Arc<dyn Interceptor>>,
    optimizer: Option<Arc<dyn Optimizer>>,
}

impl ResourcePluginBuilder {
    pub fn resolver<R: Resolver + 'static>(mut self, resolver: Arc<R>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn server<S: Server + 'static>(mut self, server: Arc<S>) -> Self {
        self.server = Some(server);
        self
    }

    pub fn interceptor<I: Interceptor + 'static>(mut self, interceptor: Arc<I>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn optimizer<O: Optimizer + 'static>(mut self, optimizer: Arc<O>) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn build(self) -> ResourcePlugin {
        ResourcePlugin {
            name: self.name.into(),
            resolver: self.resolver,
            server: self.server,
            interceptor: self.interceptor,
            optimizer: self.optimizer,
        }
    }
}

/// Everything a provider may need to construct a plugin instance.
#[derive(Clone)]
pub struct PluginContext {
    pub compilation: Arc<Compilation>,
    pub file_system: Arc<dyn FileSystem>,
    pub http_client: Option<Arc<dyn HttpClient>>,
}

impl PluginContext {
    pub fn new(compilation: Arc<Compilation>, file_system: Arc<dyn FileSystem>) -> Self {
        Self {
            compilation,
            file_system,
            http_client: None,
        }
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }
}

/// Kind of plugin a descriptor registers. Only `Resource` descriptors are
/// instantiated by the pipeline; the others belong to other lifecycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Resource,
    Context,
    Copy,
}

/// Provider function turning the lifecycle context into a plugin instance.
pub type PluginProvider =
    Arc<dyn Fn(&PluginContext) -> eyre::Result<ResourcePlugin> + Send + Sync>;

/// Registration record for a plugin.
#[derive(Clone)]
pub struct ResourcePluginDescriptor {
    pub kind: PluginKind,
    pub name: String,
    pub is_default: bool,
    pub is_standard_static_resource: bool,
    provider: PluginProvider,
}

impl ResourcePluginDescriptor {
    /// A user resource plugin.
    pub fn resource<F>(name: impl Into<String>, provider: F) -> Self
    where
        F: Fn(&PluginContext) -> eyre::Result<ResourcePlugin> + Send + Sync + 'static,
    {
        Self {
            kind: PluginKind::Resource,
            name: name.into(),
            is_default: false,
            is_standard_static_resource: false,
            provider: Arc::new(provider),
        }
    }

    /// Mark this descriptor as one of the built-in plugins.
    pub fn default_plugin(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Mark this descriptor as serving plain static assets from disk.
    pub fn standard_static(mut self) -> Self {
        self.is_standard_static_resource = true;
        self
    }

    pub fn with_kind(mut self, kind: PluginKind) -> Self {
        self.kind = kind;
        self
    }

    /// Run the provider.
    pub fn instantiate(&self, context: &PluginContext) -> eyre::Result<ResourcePlugin> {
        (self.provider)(context)
    }
}

impl fmt::Debug for ResourcePluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePluginDescriptor")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("is_default", &self.is_default)
            .field(
                "is_standard_static_resource",
                &self.is_standard_static_resource,
            )
            .finish_non_exhaustive()
    }
}

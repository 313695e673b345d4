//! The compilation: everything a plugin or server needs to know about the
//! project being served or built. Constructed once per lifecycle and shared
//! read-only as `Arc<Compilation>`.
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use eyre::{Result, WrapErr};

use crate::{
    config::{SiteMode, ThicketConfig},
    core::{
        graph::{ApiManifest, RouteGraph},
        plugin::ResourcePluginDescriptor,
    },
    plugins::default_plugins,
};

/// Which lifecycle the compilation was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Develop,
    Build,
    Serve,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Develop => write!(f, "develop"),
            RunMode::Build => write!(f, "build"),
            RunMode::Serve => write!(f, "serve"),
        }
    }
}

/// Absolute filesystem roots of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationContext {
    pub project_dir: PathBuf,
    pub user_workspace: PathBuf,
    pub pages_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl CompilationContext {
    pub fn from_config(project_dir: &Path, config: &ThicketConfig) -> Self {
        let user_workspace = project_dir.join(&config.workspace);
        Self {
            project_dir: project_dir.to_path_buf(),
            pages_dir: user_workspace.join(&config.pages_dir),
            output_dir: project_dir.join(&config.output_dir),
            user_workspace,
        }
    }
}

#[derive(Debug)]
pub struct Compilation {
    pub config: Arc<ThicketConfig>,
    pub graph: RouteGraph,
    pub manifest: ApiManifest,
    pub context: CompilationContext,
    pub mode: RunMode,
    plugins: Vec<ResourcePluginDescriptor>,
}

impl Compilation {
    pub fn builder(config: ThicketConfig, mode: RunMode) -> CompilationBuilder {
        CompilationBuilder::new(config, mode)
    }

    /// Registered plugin descriptors: built-in ones first, then user ones.
    pub fn plugins(&self) -> &[ResourcePluginDescriptor] {
        &self.plugins
    }

    /// Find a registered descriptor by name.
    pub fn plugin(&self, name: &str) -> Option<&ResourcePluginDescriptor> {
        self.plugins.iter().find(|descriptor| descriptor.name == name)
    }

    /// Origin used to build request URLs, e.g. `http://127.0.0.1:1984`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.config.listen_addr)
    }

    pub fn is_spa(&self) -> bool {
        self.config.mode == SiteMode::Spa
    }

    /// A project needs the hybrid server when any page renders on demand or
    /// any API route exists.
    pub fn is_hybrid(&self) -> bool {
        self.graph.has_ssr_routes(self.config.prerender) || !self.manifest.is_empty()
    }
}

pub struct CompilationBuilder {
    config: ThicketConfig,
    mode: RunMode,
    project_dir: PathBuf,
    graph: Option<RouteGraph>,
    manifest: Option<ApiManifest>,
    user_plugins: Vec<ResourcePluginDescriptor>,
    default_plugins: bool,
}

impl CompilationBuilder {
    fn new(config: ThicketConfig, mode: RunMode) -> Self {
        Self {
            config,
            mode,
            project_dir: PathBuf::from("."),
            graph: None,
            manifest: None,
            user_plugins: Vec::new(),
            default_plugins: true,
        }
    }

    pub fn project_dir(mut self, project_dir: impl Into<PathBuf>) -> Self {
        self.project_dir = project_dir.into();
        self
    }

    /// Use this graph instead of loading `graph.json`.
    pub fn graph(mut self, graph: RouteGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Use this manifest instead of loading `manifest.json`.
    pub fn manifest(mut self, manifest: ApiManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Register a user plugin. User plugins run after the built-in ones, in
    /// registration order.
    pub fn plugin(mut self, descriptor: ResourcePluginDescriptor) -> Self {
        self.user_plugins.push(descriptor);
        self
    }

    pub fn without_default_plugins(mut self) -> Self {
        self.default_plugins = false;
        self
    }

    pub async fn build(self) -> Result<Compilation> {
        let project_dir = tokio::fs::canonicalize(&self.project_dir)
            .await
            .wrap_err_with(|| {
                format!(
                    "Failed to resolve project directory {}",
                    self.project_dir.display()
                )
            })?;
        let context = CompilationContext::from_config(&project_dir, &self.config);

        if !context.user_workspace.is_dir() {
            tracing::warn!(
                "User workspace {} does not exist",
                context.user_workspace.display()
            );
        }

        let graph = match self.graph {
            Some(graph) => graph,
            None => {
                let path = Self::artifact_path(&context, self.config.graph_path.as_deref(), "graph.json");
                Self::load_optional(&path, RouteGraph::load)?
            }
        };
        let manifest = match self.manifest {
            Some(manifest) => manifest,
            None => {
                let path =
                    Self::artifact_path(&context, self.config.manifest_path.as_deref(), "manifest.json");
                Self::load_optional(&path, ApiManifest::load)?
            }
        };

        let mut plugins = if self.default_plugins {
            default_plugins()
        } else {
            Vec::new()
        };
        plugins.extend(self.user_plugins.into_iter().map(|mut descriptor| {
            descriptor.is_default = false;
            descriptor
        }));

        tracing::info!(
            "Compilation ready for {}: {} routes, {} APIs, {} plugins",
            self.mode,
            graph.nodes().len(),
            manifest.apis.len(),
            plugins.len()
        );

        Ok(Compilation {
            config: Arc::new(self.config),
            graph,
            manifest,
            context,
            mode: self.mode,
            plugins,
        })
    }

    fn artifact_path(context: &CompilationContext, configured: Option<&str>, default: &str) -> PathBuf {
        match configured {
            Some(path) => context.project_dir.join(path),
            None => context.output_dir.join(default),
        }
    }

    fn load_optional<T: Default>(path: &Path, load: fn(&Path) -> Result<T>) -> Result<T> {
        if path.is_file() {
            load(path)
        } else {
            tracing::debug!("No build artifact at {}, starting empty", path.display());
            Ok(T::default())
        }
    }
}

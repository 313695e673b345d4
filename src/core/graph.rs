//! Route graph and API manifest produced by the build, loaded read-only.
use std::{collections::BTreeMap, path::Path};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

/// Per-node data bag. Only the `static` flag is interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageData {
    /// SSR node whose output was pre-rendered at build time.
    #[serde(rename = "static")]
    pub is_static: bool,
}

/// One page in the route graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageNode {
    pub route: String,
    pub output_path: String,
    /// Server handler module reference, relative to the output dir.
    pub filename: Option<String>,
    #[serde(rename = "isSSR")]
    pub is_ssr: bool,
    #[serde(rename = "isSPA")]
    pub is_spa: bool,
    pub data: PageData,
    pub external: bool,
    pub template: Option<String>,
    pub title: Option<String>,
    /// Pre-rendered content for external nodes.
    pub body: Option<String>,
}

impl PageNode {
    pub fn new(route: impl Into<String>, output_path: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            output_path: output_path.into(),
            ..Default::default()
        }
    }

    pub fn ssr(mut self, filename: impl Into<String>) -> Self {
        self.is_ssr = true;
        self.filename = Some(filename.into());
        self
    }

    pub fn spa(mut self) -> Self {
        self.is_spa = true;
        self
    }

    pub fn with_static_data(mut self) -> Self {
        self.data.is_static = true;
        self
    }

    pub fn external_body(mut self, body: impl Into<String>) -> Self {
        self.external = true;
        self.body = Some(body.into());
        self
    }

    /// Whether the node's artifact on disk is authoritative: plain static
    /// pages always, SSR pages when prerendering or marked `static`.
    pub fn is_statically_resolved(&self, prerender: bool) -> bool {
        !self.is_ssr || prerender || self.data.is_static
    }

    /// Whether requests must be rendered on demand by the node's handler.
    pub fn renders_on_demand(&self, prerender: bool) -> bool {
        self.is_ssr && !prerender && !self.data.is_static
    }
}

/// Ordered list of page nodes. Lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteGraph {
    nodes: Vec<PageNode>,
}

impl RouteGraph {
    pub fn new(nodes: Vec<PageNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[PageNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find_by_route(&self, route: &str) -> Option<&PageNode> {
        self.nodes.iter().find(|node| node.route == route)
    }

    /// The node flagged as the SPA shell, if any.
    pub fn spa_shell(&self) -> Option<&PageNode> {
        self.nodes.iter().find(|node| node.is_spa)
    }

    /// The external node whose route contains `path`, only when exactly one
    /// external node matches.
    pub fn external_for(&self, path: &str) -> Option<&PageNode> {
        let mut matches = self
            .nodes
            .iter()
            .filter(|node| node.external && node.route.contains(path));
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    pub fn has_ssr_routes(&self, prerender: bool) -> bool {
        self.nodes.iter().any(|node| node.renders_on_demand(prerender))
    }

    /// Load `graph.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read route graph {}", path.display()))?;
        serde_json::from_str(&raw)
            .wrap_err_with(|| format!("Failed to parse route graph {}", path.display()))
    }
}

/// One API route in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEntry {
    /// Handler module path, relative to the output dir.
    pub path: String,
}

/// API routes keyed by URL path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiManifest {
    pub apis: BTreeMap<String, ApiEntry>,
}

impl ApiManifest {
    pub fn get(&self, route: &str) -> Option<&ApiEntry> {
        self.apis.get(route)
    }

    pub fn with_api(mut self, route: impl Into<String>, path: impl Into<String>) -> Self {
        self.apis.insert(route.into(), ApiEntry { path: path.into() });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }

    /// Load `manifest.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read API manifest {}", path.display()))?;
        serde_json::from_str(&raw)
            .wrap_err_with(|| format!("Failed to parse API manifest {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_graph() {
        let raw = r#"[
            {"route": "/", "outputPath": "index.html"},
            {"route": "/blog/first-post/", "outputPath": "blog/first-post/index.html", "title": "First"},
            {"route": "/products/", "outputPath": "products/index.html", "isSSR": true,
             "filename": "products.route.js", "data": {"static": true}},
            {"route": "/app/", "outputPath": "index.html", "isSPA": true}
        ]"#;

        let graph: RouteGraph = serde_json::from_str(raw).unwrap();
        assert_eq!(graph.nodes().len(), 4);

        let post = graph.find_by_route("/blog/first-post/").unwrap();
        assert_eq!(post.output_path, "blog/first-post/index.html");
        assert_eq!(post.title.as_deref(), Some("First"));

        let products = graph.find_by_route("/products/").unwrap();
        assert!(products.is_ssr);
        assert!(products.data.is_static);
        assert!(products.is_statically_resolved(false));
        assert!(!products.renders_on_demand(false));

        assert_eq!(graph.spa_shell().unwrap().route, "/app/");
        assert!(!graph.has_ssr_routes(false));
    }

    #[test]
    fn ssr_node_statics_follow_prerender() {
        let node = PageNode::new("/live/", "live/index.html").ssr("live.route.js");
        assert!(node.renders_on_demand(false));
        assert!(!node.is_statically_resolved(false));
        assert!(node.is_statically_resolved(true));
        assert!(!node.renders_on_demand(true));
    }

    #[test]
    fn external_requires_a_unique_match() {
        let graph = RouteGraph::new(vec![
            PageNode::new("/docs/", "").external_body("<h1>docs</h1>"),
            PageNode::new("/docs/api/", "").external_body("<h1>api</h1>"),
            PageNode::new("/about/", "").external_body("<h1>about</h1>"),
        ]);

        assert_eq!(graph.external_for("/about/").unwrap().route, "/about/");
        assert_eq!(graph.external_for("/docs/api/").unwrap().route, "/docs/api/");
        assert!(graph.external_for("/docs/").is_none());
        assert!(graph.external_for("/missing/").is_none());
    }

    #[test]
    fn manifest_lookup() {
        let manifest: ApiManifest =
            serde_json::from_str(r#"{"apis": {"/api/ping": {"path": "/api/ping.js"}}}"#).unwrap();
        assert_eq!(manifest.get("/api/ping").unwrap().path, "/api/ping.js");
        assert!(manifest.get("/api/pong").is_none());
    }
}

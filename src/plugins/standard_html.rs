//! Pages: serves HTML documents from the pages directory, external graph
//! nodes, and the SPA shell for client-side routes. At build time it strips
//! development-only shims from every HTML `<head>`.
use std::{
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use crate::{
    core::{
        compilation::Compilation,
        plugin::{Optimizer, PluginResult, ResourcePlugin, ResourcePluginDescriptor, Server},
        resource::{ResourceRequest, ResourceResponse, url_extension},
    },
    ports::file_system::{FileSystem, confine},
};

const CONTENT_TYPE: &str = "text/html";
const CONTENT_OUTLET: &str = "<content-outlet></content-outlet>";

static HEAD: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)<head>.*</head>"));

/// Tags only needed by the development server, removed from built pages.
static DEV_SHIMS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        compile(r#"<script src="[^"]*lit/polyfill-support\.js"></script>"#),
        compile(r#"<script src="[^"]*webcomponents-bundle\.js"></script>"#),
        compile(r#"(?s)<script type="importmap-shim">.*?</script>"#),
        compile(r#"<script defer="" src="[^"]*es-module-shims\.js"></script>"#),
    ]
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

/// Where a page's markup comes from.
enum PageSource {
    File(PathBuf),
    External { template: Option<String>, body: String },
    SpaShell,
}

pub struct StandardHtmlResource {
    compilation: Arc<Compilation>,
    file_system: Arc<dyn FileSystem>,
}

impl StandardHtmlResource {
    pub fn new(compilation: Arc<Compilation>, file_system: Arc<dyn FileSystem>) -> Self {
        Self {
            compilation,
            file_system,
        }
    }

    /// URL path relative to the workspace, for both network and workspace
    /// `file:` URLs.
    fn relative_path(&self, url: &Url) -> Option<String> {
        match url.scheme() {
            "http" | "https" => Some(url.path().to_string()),
            "file" => {
                let path = url.to_file_path().ok()?;
                let relative = path
                    .strip_prefix(&self.compilation.context.user_workspace)
                    .ok()?;
                Some(format!("/{}", relative.to_string_lossy()))
            }
            _ => None,
        }
    }

    /// Files under the pages dir that could hold the page at `relative`.
    fn page_candidates(pages_dir: &Path, relative: &str) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if relative.ends_with('/') {
            let mut names = vec![format!("{relative}index.html")];
            let bare = relative.trim_end_matches('/');
            if !bare.is_empty() {
                names.push(format!("{bare}.html"));
            }
            for name in names {
                if let Ok(path) = confine(pages_dir, &name) {
                    candidates.push(path);
                }
            }
        } else if relative.ends_with(".html") {
            if let Ok(path) = confine(pages_dir, relative) {
                candidates.push(path);
            }
        } else {
            for candidate in [format!("{relative}.html"), format!("{relative}/index.html")] {
                if let Ok(path) = confine(pages_dir, &candidate) {
                    candidates.push(path);
                }
            }
        }
        candidates
    }

    async fn source(&self, url: &Url, request: &ResourceRequest) -> Option<PageSource> {
        let relative = self.relative_path(url)?;
        let extension = url_extension(url);
        if !matches!(extension, None | Some("html")) {
            return None;
        }

        for candidate in Self::page_candidates(&self.compilation.context.pages_dir, &relative) {
            if self.file_system.exists(&candidate).await {
                return Some(PageSource::File(candidate));
            }
        }

        if let Some(node) = self.compilation.graph.external_for(&relative) {
            return Some(PageSource::External {
                template: node.template.clone(),
                body: node.body.clone().unwrap_or_default(),
            });
        }

        let is_client_side_route =
            self.compilation.is_spa() && extension.is_none() && request.accepts(CONTENT_TYPE);
        is_client_side_route.then_some(PageSource::SpaShell)
    }

    async fn render_external(&self, template: Option<&str>, body: &str) -> PluginResult<String> {
        let templates = self.compilation.context.user_workspace.join("templates");
        let name = template.unwrap_or("page");
        let path = templates.join(format!("{name}.html"));
        if !self.file_system.exists(&path).await {
            return Ok(body.to_string());
        }
        let layout = self.file_system.read_to_string(&path).await?;
        Ok(layout.replacen(CONTENT_OUTLET, body, 1))
    }
}

#[async_trait]
impl Server for StandardHtmlResource {
    async fn should_serve(&self, url: &Url, request: &ResourceRequest) -> PluginResult<bool> {
        Ok(self.source(url, request).await.is_some())
    }

    async fn serve(&self, url: &Url, request: &ResourceRequest) -> PluginResult<ResourceResponse> {
        let body = match self.source(url, request).await {
            Some(PageSource::File(path)) => self.file_system.read_to_string(&path).await?,
            Some(PageSource::External { template, body }) => {
                self.render_external(template.as_deref(), &body).await?
            }
            Some(PageSource::SpaShell) => {
                let shell = self.compilation.context.user_workspace.join("index.html");
                self.file_system.read_to_string(&shell).await?
            }
            None => eyre::bail!("No page found for {url}"),
        };
        Ok(ResourceResponse::text(CONTENT_TYPE, body))
    }
}

/// Remove development shims from `<head>` and promote shimmed module
/// scripts to native ones.
pub fn strip_dev_shims(body: &str) -> String {
    let Some(head) = HEAD.find(body) else {
        return body.to_string();
    };

    let mut contents = head.as_str().to_string();
    for shim in DEV_SHIMS.iter() {
        contents = shim.replace(&contents, "").into_owned();
    }
    contents = contents.replace(r#"type="module-shim""#, r#"type="module""#);

    format!("{}{}{}", &body[..head.start()], contents, &body[head.end()..])
}

#[async_trait]
impl Optimizer for StandardHtmlResource {
    async fn should_optimize(&self, url: &Url) -> PluginResult<bool> {
        Ok(url_extension(url) == Some("html"))
    }

    async fn optimize(&self, _url: &Url, body: String) -> PluginResult<String> {
        Ok(strip_dev_shims(&body))
    }
}

pub fn descriptor() -> ResourcePluginDescriptor {
    ResourcePluginDescriptor::resource("plugin-standard-html", |context| {
        let html = Arc::new(StandardHtmlResource::new(
            context.compilation.clone(),
            context.file_system.clone(),
        ));
        Ok(ResourcePlugin::builder("plugin-standard-html")
            .server(html.clone())
            .optimizer(html)
            .build())
    })
    .default_plugin()
}

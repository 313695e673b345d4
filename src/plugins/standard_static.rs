//! Built-in servers for plain static assets, chosen by file extension.
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::{
    core::{
        plugin::{PluginContext, PluginResult, ResourcePlugin, ResourcePluginDescriptor, Server},
        resource::{ResourceRequest, ResourceResponse, url_extension},
    },
    plugins::file_path,
    ports::file_system::FileSystem,
};

/// Extension to content type table of one asset family.
type ContentTypes = &'static [(&'static str, &'static str)];

const CSS: ContentTypes = &[("css", "text/css")];
const JAVASCRIPT: ContentTypes = &[("js", "text/javascript"), ("mjs", "text/javascript")];
const JSON: ContentTypes = &[("json", "application/json")];
const IMAGE: ContentTypes = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
];
const FONT: ContentTypes = &[
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("eot", "application/vnd.ms-fontobject"),
];

/// Serves `file:` URLs whose extension belongs to one asset family.
pub struct StandardStaticResource {
    content_types: ContentTypes,
    binary: bool,
    file_system: Arc<dyn FileSystem>,
}

impl StandardStaticResource {
    fn content_type(&self, url: &Url) -> Option<&'static str> {
        let extension = url_extension(url)?.to_ascii_lowercase();
        self.content_types
            .iter()
            .find(|(known, _)| *known == extension)
            .map(|(_, content_type)| *content_type)
    }
}

#[async_trait]
impl Server for StandardStaticResource {
    async fn should_serve(&self, url: &Url, _request: &ResourceRequest) -> PluginResult<bool> {
        Ok(url.scheme() == "file" && self.content_type(url).is_some())
    }

    async fn serve(&self, url: &Url, _request: &ResourceRequest) -> PluginResult<ResourceResponse> {
        let path = file_path(url)?;
        let content_type = self
            .content_type(url)
            .ok_or_else(|| eyre::eyre!("No content type known for {url}"))?;

        let response = if self.binary {
            ResourceResponse::binary(content_type, self.file_system.read(&path).await?)
        } else {
            ResourceResponse::text(content_type, self.file_system.read_to_string(&path).await?)
        };
        Ok(response)
    }
}

fn descriptor(
    name: &'static str,
    content_types: ContentTypes,
    binary: bool,
) -> ResourcePluginDescriptor {
    ResourcePluginDescriptor::resource(name, move |context: &PluginContext| {
        Ok(ResourcePlugin::builder(name)
            .server(Arc::new(StandardStaticResource {
                content_types,
                binary,
                file_system: context.file_system.clone(),
            }))
            .build())
    })
    .default_plugin()
    .standard_static()
}

pub fn css() -> ResourcePluginDescriptor {
    descriptor("plugin-standard-css", CSS, false)
}

pub fn javascript() -> ResourcePluginDescriptor {
    descriptor("plugin-standard-javascript", JAVASCRIPT, false)
}

pub fn json() -> ResourcePluginDescriptor {
    descriptor("plugin-standard-json", JSON, false)
}

pub fn image() -> ResourcePluginDescriptor {
    descriptor("plugin-standard-image", IMAGE, true)
}

pub fn font() -> ResourcePluginDescriptor {
    descriptor("plugin-standard-font", FONT, true)
}

#[cfg(test)]
mod tests {
    use http::header;

    use super::*;
    use crate::{
        adapters::FileSystemAdapter,
        core::resource::Body,
    };

    fn resource(content_types: ContentTypes, binary: bool) -> StandardStaticResource {
        StandardStaticResource {
            content_types,
            binary,
            file_system: Arc::new(FileSystemAdapter::new()),
        }
    }

    #[tokio::test]
    async fn serves_css_as_text() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.css"), "a { color: red; }").unwrap();
        let url = Url::from_file_path(dir.path().join("main.css")).unwrap();
        let request = ResourceRequest::get(url.clone());
        let css = resource(CSS, false);

        assert!(css.should_serve(&url, &request).await.unwrap());
        let response = css.serve(&url, &request).await.unwrap();
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(response.declared_length(), Some(17));
        assert_eq!(response.body, Some(Body::Text("a { color: red; }".to_string())));
    }

    #[tokio::test]
    async fn serves_images_as_binary() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("logo.PNG"), [0x89, b'P', b'N', b'G']).unwrap();
        let url = Url::from_file_path(dir.path().join("logo.PNG")).unwrap();
        let request = ResourceRequest::get(url.clone());
        let image = resource(IMAGE, true);

        assert!(image.should_serve(&url, &request).await.unwrap());
        let response = image.serve(&url, &request).await.unwrap();
        assert!(response.body.as_ref().is_some_and(Body::is_binary));
        assert_eq!(response.headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
    }

    #[tokio::test]
    async fn ignores_network_urls_and_other_extensions() {
        let css = resource(CSS, false);
        let http = Url::parse("http://localhost:1984/main.css").unwrap();
        let js = Url::parse("file:///site/main.js").unwrap();

        assert!(!css.should_serve(&http, &ResourceRequest::get(http.clone())).await.unwrap());
        assert!(!css.should_serve(&js, &ResourceRequest::get(js.clone())).await.unwrap());
    }
}

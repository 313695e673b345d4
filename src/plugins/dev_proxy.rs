//! Forwards configured path prefixes to an upstream origin.
use std::sync::Arc;

use async_trait::async_trait;
use eyre::WrapErr;
use http::header;
use url::Url;

use crate::{
    core::{
        plugin::{PluginResult, ResourcePlugin, ResourcePluginDescriptor, Server},
        resource::{ResourceRequest, ResourceResponse},
    },
    ports::http_client::HttpClient,
};

pub const DEV_PROXY_PLUGIN: &str = "plugin-dev-proxy";

pub struct DevProxy {
    /// (prefix, upstream origin), longest prefix first.
    rules: Vec<(String, Url)>,
    client: Arc<dyn HttpClient>,
}

impl DevProxy {
    pub fn new<'a>(
        rules: impl IntoIterator<Item = (&'a String, &'a String)>,
        client: Arc<dyn HttpClient>,
    ) -> eyre::Result<Self> {
        let mut parsed = rules
            .into_iter()
            .map(|(prefix, target)| {
                Url::parse(target)
                    .map(|target| (prefix.clone(), target))
                    .wrap_err_with(|| format!("Invalid proxy target '{target}' for '{prefix}'"))
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        parsed.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        Ok(Self {
            rules: parsed,
            client,
        })
    }

    fn upstream_for(&self, url: &Url) -> Option<&Url> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return None;
        }
        self.rules
            .iter()
            .find(|(prefix, _)| url.path().starts_with(prefix.as_str()))
            .map(|(_, target)| target)
    }

    /// The upstream URL keeps the request path and query unchanged.
    fn target_url(upstream: &Url, url: &Url) -> Url {
        let mut target = upstream.clone();
        let base = upstream.path().trim_end_matches('/');
        target.set_path(&format!("{base}{}", url.path()));
        target.set_query(url.query());
        target
    }
}

#[async_trait]
impl Server for DevProxy {
    async fn should_serve(&self, url: &Url, _request: &ResourceRequest) -> PluginResult<bool> {
        Ok(self.upstream_for(url).is_some())
    }

    async fn serve(&self, url: &Url, request: &ResourceRequest) -> PluginResult<ResourceResponse> {
        let upstream = self
            .upstream_for(url)
            .ok_or_else(|| eyre::eyre!("No proxy rule matches {url}"))?;
        let target = Self::target_url(upstream, url);
        tracing::debug!("Proxying {} to {}", url, target);

        let mut forwarded = request.with_url(target);
        forwarded.headers.remove(header::HOST);
        let response = self.client.send_request(forwarded).await?;
        Ok(response)
    }
}

pub fn descriptor() -> ResourcePluginDescriptor {
    ResourcePluginDescriptor::resource(DEV_PROXY_PLUGIN, |context| {
        let proxy = &context.compilation.config.dev_server.proxy;
        let mut builder = ResourcePlugin::builder(DEV_PROXY_PLUGIN);
        if !proxy.is_empty() {
            let client = context
                .http_client
                .clone()
                .ok_or_else(|| eyre::eyre!("{DEV_PROXY_PLUGIN} requires an HTTP client"))?;
            builder = builder.server(Arc::new(DevProxy::new(proxy, client)?));
        }
        Ok(builder.build())
    })
    .default_plugin()
}

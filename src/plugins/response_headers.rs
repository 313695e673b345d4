//! Adds the configured `dev_server.headers` to every response.
use std::sync::Arc;

use async_trait::async_trait;
use eyre::WrapErr;
use http::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::core::{
    plugin::{Interceptor, PluginResult, ResourcePlugin, ResourcePluginDescriptor},
    resource::{ResourceRequest, ResourceResponse},
};

pub struct ResponseHeaders {
    headers: HeaderMap,
}

impl ResponseHeaders {
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> eyre::Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes())
                .wrap_err_with(|| format!("Invalid response header name '{name}'"))?;
            let value = HeaderValue::from_str(value)
                .wrap_err_with(|| format!("Invalid value for response header '{name}'"))?;
            headers.insert(name, value);
        }
        Ok(Self { headers })
    }
}

#[async_trait]
impl Interceptor for ResponseHeaders {
    async fn should_intercept(
        &self,
        _url: &Url,
        _request: &ResourceRequest,
        _response: &ResourceResponse,
    ) -> PluginResult<bool> {
        Ok(!self.headers.is_empty())
    }

    async fn intercept(
        &self,
        _url: &Url,
        _request: &ResourceRequest,
        _response: ResourceResponse,
    ) -> PluginResult<ResourceResponse> {
        Ok(ResourceResponse {
            headers: self.headers.clone(),
            ..Default::default()
        })
    }
}

pub fn descriptor() -> ResourcePluginDescriptor {
    ResourcePluginDescriptor::resource("plugin-response-headers", |context| {
        let headers = ResponseHeaders::from_pairs(&context.compilation.config.dev_server.headers)?;
        Ok(ResourcePlugin::builder("plugin-response-headers")
            .interceptor(Arc::new(headers))
            .build())
    })
    .default_plugin()
}

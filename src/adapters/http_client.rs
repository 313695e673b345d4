use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eyre::Result;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Version, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tokio::time::timeout;
use tracing::Instrument;

use crate::{
    core::resource::{Body, ResourceRequest, ResourceResponse},
    ports::http_client::{HttpClient, HttpClientError, HttpClientResult},
};

/// HTTP client adapter using Hyper with Rustls, used by the dev proxy.
///
/// Responsibilities:
/// * Sets the `Host` header from the target URL
/// * Buffers the upstream body and classifies it as text or binary
/// * Applies a per-request timeout
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout_secs: u64,
}

impl HttpClientAdapter {
    /// Create a new HTTP client adapter.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();
        for cert in native_certs.certs {
            if root_cert_store.add(cert).is_err() {
                tracing::warn!("Failed to add native certificate to rustls RootCertStore");
            }
        }
        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }
        tracing::debug!("Loaded {} native root certificates.", root_cert_store.len());

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, Full<Bytes>>(https_connector);

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Whether a response with this content type is handled as text.
    fn is_textual(content_type: Option<&str>) -> bool {
        content_type.is_some_and(|content_type| {
            content_type.starts_with("text/")
                || content_type.contains("json")
                || content_type.contains("javascript")
                || content_type.contains("xml")
        })
    }

    fn host_header(req: &ResourceRequest) -> HttpClientResult<HeaderValue> {
        let host = req.url.host_str().ok_or_else(|| {
            HttpClientError::InvalidRequest(format!("Outgoing URL has no host: {}", req.url))
        })?;
        let value = match req.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        HeaderValue::from_str(&value).map_err(|e| HttpClientError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(&self, req: ResourceRequest) -> HttpClientResult<ResourceResponse> {
        let host = Self::host_header(&req)?;

        let span = tracing::info_span!(
            "upstream_request",
            upstream.url = %req.url,
            http.method = %req.method,
            http.status_code = tracing::field::Empty,
        );
        let mut outgoing = Request::builder()
            .method(req.method.clone())
            .uri(req.url.as_str())
            .version(Version::HTTP_11)
            .body(Full::new(req.body.clone()))
            .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?;
        *outgoing.headers_mut() = req.headers.clone();
        outgoing.headers_mut().insert(header::HOST, host);

        tracing::debug!("Sending request: {} {}", req.method, req.url);

        let response = match timeout(
            Duration::from_secs(self.timeout_secs),
            self.client.request(outgoing),
        )
        .instrument(span.clone())
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!("Error making request to {}: {}", req.url, e);
                return Err(HttpClientError::ConnectionError(format!(
                    "Request to {} {} failed: {e}",
                    req.method, req.url
                )));
            }
            Err(_) => return Err(HttpClientError::Timeout(self.timeout_secs)),
        };

        span.record("http.status_code", response.status().as_u16());

        let (mut parts, body) = response.into_parts();
        // Framing is recomputed when the response is emitted
        parts.headers.remove(header::TRANSFER_ENCODING);
        parts.headers.remove(header::CONNECTION);

        let bytes = body
            .collect()
            .await
            .map_err(|e| HttpClientError::ConnectionError(e.to_string()))?
            .to_bytes();

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        let body = if Self::is_textual(content_type) {
            match String::from_utf8(bytes.to_vec()) {
                Ok(text) => Body::Text(text),
                Err(_) => Body::Binary(bytes),
            }
        } else {
            Body::Binary(bytes)
        };

        Ok(ResourceResponse {
            status: Some(parts.status),
            headers: parts.headers,
            body: None,
        }
        .with_body(body))
    }
}

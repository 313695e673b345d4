//! Axum glue between the network and a [`ResourceServer`].
//!
//! The server behind the handler is held in an [`ArcSwap`] so a config
//! reload can swap in a freshly built one without dropping connections.
use std::{convert::Infallible, sync::Arc, time::Instant};

use arc_swap::ArcSwap;
use axum::{
    Router,
    body::Body as AxumBody,
    extract::Request,
    http::{HeaderValue, StatusCode, header},
    response::Response,
    routing::any,
};
use eyre::{Result, WrapErr};
use http_body_util::LengthLimitError;
use tracing::Instrument;
use url::Url;

use crate::{
    core::resource::{ResourceRequest, ResourceResponse},
    ports::http_server::ResourceServer,
    tracing_setup::create_request_span,
};

/// Largest request body accepted before the request is rejected.
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct HttpHandler<S> {
    server: Arc<ArcSwap<S>>,
    base_url: String,
    body_limit: usize,
}

impl<S: ResourceServer> HttpHandler<S> {
    /// `base_url` is the origin request paths are resolved against, e.g.
    /// `http://127.0.0.1:1984`.
    pub fn new(server: Arc<ArcSwap<S>>, base_url: impl Into<String>) -> Self {
        Self {
            server,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    /// Convert, answer, convert back.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Result<Response<AxumBody>> {
        let start = Instant::now();
        let (parts, body) = req.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let span = create_request_span(parts.method.as_str(), parts.uri.path(), &request_id);

        let raw = format!("{}{}", self.base_url, path_and_query);
        let url = Url::parse(&raw).wrap_err_with(|| format!("Invalid request URL: {raw}"))?;
        let body = match axum::body::to_bytes(body, self.body_limit).await {
            Ok(body) => body,
            Err(e) if exceeds_limit(&e) => {
                tracing::warn!(parent: &span, "Request body exceeds {} bytes", self.body_limit);
                return into_http_response(
                    ResourceResponse::new().with_status(StatusCode::PAYLOAD_TOO_LARGE),
                );
            }
            Err(e) => return Err(e).wrap_err("Failed to read request body"),
        };

        let mut request = ResourceRequest::new(parts.method, url).with_body(body);
        request.headers = parts.headers;

        let server = self.server.load_full();
        let response = server.handle(request).instrument(span.clone()).await;

        span.record("http.status_code", response.effective_status().as_u16());
        span.record("duration_ms", start.elapsed().as_millis() as u64);

        into_http_response(response)
    }
}

fn exceeds_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Emit a pipeline response. `Content-Length` always reflects the body
/// actually sent.
pub fn into_http_response(response: ResourceResponse) -> Result<Response<AxumBody>> {
    let status = response.effective_status();
    let mut headers = response.headers;
    headers.remove(header::CONTENT_LENGTH);

    let body = match response.body {
        Some(body) => {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
            AxumBody::from(body.into_bytes())
        }
        None => AxumBody::empty(),
    };

    let mut http_response = Response::builder()
        .status(status)
        .body(body)
        .wrap_err("Failed to build response")?;
    *http_response.headers_mut() = headers;
    Ok(http_response)
}

/// Route every path through `handler`.
pub fn router<S: ResourceServer>(handler: Arc<HttpHandler<S>>) -> Router {
    let route = |handler: Arc<HttpHandler<S>>| {
        any(move |req: Request| {
            let handler = handler.clone();
            async move {
                match handler.handle_request(req).await {
                    Ok(response) => Ok::<Response<AxumBody>, Infallible>(response),
                    Err(e) => {
                        tracing::error!("Request handling error: {:?}", e);
                        let error_response = Response::builder()
                            .status(500)
                            .body(AxumBody::from("Internal Server Error"))
                            .unwrap_or_else(|_| {
                                Response::new(AxumBody::from("Internal Server Error"))
                            });
                        Ok(error_response)
                    }
                }
            }
        })
    };

    Router::new()
        .route("/{*path}", route(handler.clone()))
        .route("/", route(handler))
}

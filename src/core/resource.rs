//! Request and response values that travel through the resource pipeline.
//!
//! These are deliberately plain data: a [`ResourceRequest`] is cloned before
//! every plugin call that may consume it, and a [`ResourceResponse`] is only
//! ever combined with another through [`ResourceResponse::merge`], which never
//! mutates either input.
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use url::Url;

/// Response payload. Text bodies take part in ETag hashing and optimization,
/// binary bodies are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Binary(Bytes),
}

impl Body {
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Body::Binary(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Text(text) => text.as_bytes(),
            Body::Binary(bytes) => bytes,
        }
    }

    /// Borrow the body as text, if it is a text body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            Body::Binary(_) => None,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Body::Text(text) => Bytes::from(text),
            Body::Binary(bytes) => bytes,
        }
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::Text(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body::Binary(Bytes::from(value))
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Body::Binary(value)
    }
}

/// Return the extension of the last path segment of `url`, without the dot.
pub fn url_extension(url: &Url) -> Option<&str> {
    let segment = url.path().rsplit('/').next()?;
    let (stem, extension) = segment.rsplit_once('.')?;
    if stem.is_empty() && extension.is_empty() {
        return None;
    }
    Some(extension)
}

/// An inbound request as seen by resource plugins.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResourceRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for a `GET` request without headers.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Copy this request with a different URL. Method, headers and body are
    /// carried over unchanged.
    pub fn with_url(&self, url: Url) -> Self {
        Self {
            method: self.method.clone(),
            url,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header_str(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Whether the client asked for the given content type in `Accept`.
    pub fn accepts(&self, content_type: &str) -> bool {
        self.header_str(header::ACCEPT)
            .is_some_and(|accept| accept.contains(content_type))
    }
}

/// A possibly partial response.
///
/// Every field is optional so that plugins can contribute only the parts they
/// care about (an interceptor that only adds headers leaves `status` and
/// `body` unset).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceResponse {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

impl ResourceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// A complete text response with `Content-Type` and `Content-Length` set.
    pub fn text(content_type: &'static str, body: impl Into<String>) -> Self {
        Self::new()
            .with_content_type(content_type)
            .with_body(Body::Text(body.into()))
    }

    /// A complete binary response with `Content-Type` and `Content-Length` set.
    pub fn binary(content_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self::new()
            .with_content_type(content_type)
            .with_body(Body::Binary(body.into()))
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_content_type(self, content_type: &'static str) -> Self {
        self.with_header(header::CONTENT_TYPE, HeaderValue::from_static(content_type))
    }

    /// Set the body and a matching `Content-Length`.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        let body = body.into();
        self.headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        self.body = Some(body);
        self
    }

    /// A bare `500` with no body.
    pub fn internal_error() -> Self {
        Self::new().with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// A bare `404` with no body.
    pub fn not_found() -> Self {
        Self::new().with_status(StatusCode::NOT_FOUND)
    }

    /// Merge `incoming` onto `base` without touching either.
    ///
    /// * status: `incoming` if set, else `base`
    /// * headers: union; a name present in `incoming` replaces every value
    ///   `base` had for that name
    /// * body: `incoming` if present, else `base`
    pub fn merge(base: &ResourceResponse, incoming: &ResourceResponse) -> ResourceResponse {
        let mut headers = base.headers.clone();
        for name in incoming.headers.keys() {
            headers.remove(name);
            for value in incoming.headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        ResourceResponse {
            status: incoming.status.or(base.status),
            headers,
            body: incoming.body.clone().or_else(|| base.body.clone()),
        }
    }

    /// True for the untouched default produced when no plugin served a URL.
    pub fn is_placeholder(&self) -> bool {
        self.status.is_none() && self.body.is_none() && self.headers.is_empty()
    }

    /// Status that will actually be emitted. An unset status means `200`
    /// when there is a body and `404` otherwise.
    pub fn effective_status(&self) -> StatusCode {
        match (self.status, &self.body) {
            (Some(status), _) => status,
            (None, Some(_)) => StatusCode::OK,
            (None, None) => StatusCode::NOT_FOUND,
        }
    }

    pub fn is_success(&self) -> bool {
        self.effective_status().is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Declared `Content-Length`, if any and parseable.
    pub fn declared_length(&self) -> Option<usize> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
    }
}

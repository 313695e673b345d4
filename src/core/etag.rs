//! Conditional caching for the development server.
use http::{HeaderValue, StatusCode, header};
use sha1::{Digest, Sha1};

use crate::core::{
    compilation::RunMode,
    resource::{Body, ResourceRequest, ResourceResponse, url_extension},
};

/// Hex SHA-1 of a text body. JSON resources are hashed in their canonical
/// serialized form so formatting differences do not change the tag.
pub fn compute_etag(body: &str, is_json: bool) -> String {
    let canonical = is_json
        .then(|| serde_json::from_str::<serde_json::Value>(body).ok())
        .flatten()
        .map(|value| value.to_string());

    let mut hasher = Sha1::new();
    hasher.update(canonical.as_deref().unwrap_or(body).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Attach an `ETag` to a development response, or collapse it into a `304`
/// when the client already holds the same content.
///
/// Responses are left untouched outside develop mode, for non-`file:` URLs,
/// for unsuccessful statuses, and for binary or empty bodies.
pub fn apply_etag(
    mode: RunMode,
    request: &ResourceRequest,
    response: ResourceResponse,
) -> ResourceResponse {
    if mode != RunMode::Develop || request.url.scheme() != "file" || !response.is_success() {
        return response;
    }
    let Some(Body::Text(text)) = response.body.as_ref() else {
        return response;
    };
    if text.is_empty() {
        return response;
    }

    let tag = compute_etag(text, url_extension(&request.url) == Some("json"));
    let Ok(tag_value) = HeaderValue::from_str(&tag) else {
        return response;
    };

    if request.header_str(header::IF_NONE_MATCH) == Some(tag.as_str()) {
        let mut not_modified = ResourceResponse {
            status: Some(StatusCode::NOT_MODIFIED),
            headers: response.headers,
            body: None,
        };
        not_modified.headers.remove(header::CONTENT_LENGTH);
        not_modified.headers.insert(header::ETAG, tag_value);
        not_modified
            .headers
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        return not_modified;
    }

    response.with_header(header::ETAG, tag_value)
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    fn file_request(path: &str) -> ResourceRequest {
        ResourceRequest::get(Url::parse(&format!("file:///site{path}")).unwrap())
    }

    #[test]
    fn attaches_etag_on_first_request() {
        let request = file_request("/index.html");
        let response = apply_etag(
            RunMode::Develop,
            &request,
            ResourceResponse::text("text/html", "<h1>hi</h1>"),
        );

        assert_eq!(response.effective_status(), StatusCode::OK);
        assert_eq!(
            response.headers.get(header::ETAG).unwrap(),
            compute_etag("<h1>hi</h1>", false).as_str()
        );
    }

    #[test]
    fn matching_if_none_match_yields_not_modified() {
        let body = "body { color: red; }";
        let first = apply_etag(
            RunMode::Develop,
            &file_request("/main.css"),
            ResourceResponse::text("text/css", body),
        );
        let tag = first.headers.get(header::ETAG).unwrap().clone();

        let request = file_request("/main.css").with_header(header::IF_NONE_MATCH, tag.clone());
        let second = apply_etag(
            RunMode::Develop,
            &request,
            ResourceResponse::text("text/css", body),
        );

        assert_eq!(second.status, Some(StatusCode::NOT_MODIFIED));
        assert!(second.body.is_none());
        assert_eq!(second.headers.get(header::ETAG), Some(&tag));
        assert_eq!(second.headers.get(header::CACHE_CONTROL).unwrap(), "no-cache");
    }

    #[test]
    fn stale_if_none_match_gets_fresh_tag() {
        let request = file_request("/index.html")
            .with_header(header::IF_NONE_MATCH, HeaderValue::from_static("stale"));
        let response = apply_etag(
            RunMode::Develop,
            &request,
            ResourceResponse::text("text/html", "fresh"),
        );

        assert_eq!(response.effective_status(), StatusCode::OK);
        assert_eq!(
            response.headers.get(header::ETAG).unwrap(),
            compute_etag("fresh", false).as_str()
        );
    }

    #[test]
    fn skips_binary_empty_and_non_file_responses() {
        let png = apply_etag(
            RunMode::Develop,
            &file_request("/logo.png"),
            ResourceResponse::binary("image/png", vec![0x89, 0x50]),
        );
        assert!(!png.headers.contains_key(header::ETAG));

        let empty = apply_etag(
            RunMode::Develop,
            &file_request("/empty.js"),
            ResourceResponse::text("text/javascript", ""),
        );
        assert!(!empty.headers.contains_key(header::ETAG));

        let remote = ResourceRequest::get(Url::parse("http://localhost:1984/api/ping").unwrap());
        let api = apply_etag(
            RunMode::Develop,
            &remote,
            ResourceResponse::text("text/plain", "pong"),
        );
        assert!(!api.headers.contains_key(header::ETAG));
    }

    #[test]
    fn only_runs_in_develop_mode() {
        let response = apply_etag(
            RunMode::Serve,
            &file_request("/index.html"),
            ResourceResponse::text("text/html", "x"),
        );
        assert!(!response.headers.contains_key(header::ETAG));
    }

    #[test]
    fn json_is_hashed_canonically() {
        assert_eq!(
            compute_etag("{ \"a\" : 1 }", true),
            compute_etag("{\"a\":1}", true)
        );
        assert_ne!(
            compute_etag("{ \"a\" : 1 }", false),
            compute_etag("{\"a\":1}", false)
        );
        assert_eq!(compute_etag("not json", true), compute_etag("not json", false));
    }

    #[test]
    fn skips_error_responses() {
        let response = apply_etag(
            RunMode::Develop,
            &file_request("/index.html"),
            ResourceResponse::text("text/html", "oops").with_status(StatusCode::INTERNAL_SERVER_ERROR),
        );
        assert!(!response.headers.contains_key(header::ETAG));
    }
}

// Production dispatch over a built output directory.
#[cfg(test)]
mod test {
    use std::{
        path::Path,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use arc_swap::ArcSwap;
    use async_trait::async_trait;
    use axum::{
        body::Body as AxumBody,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use thicket::{
        FileSystemAdapter,
        adapters::{HandlerRegistry, HttpHandler, handler_fn, router},
        config::{SiteMode, ThicketConfig},
        core::{
            Body, Compilation, PluginContext, ResourceRequest, ResourceResponse, RunMode,
            SiteServer,
        },
        ports::http_client::{HttpClient, HttpClientResult},
    };
    use tower::ServiceExt;
    use url::Url;

    const GRAPH: &str = r#"[
        {"route": "/blog/first-post/", "isSSR": false, "outputPath": "blog/first-post/index.html"},
        {"route": "/about/", "isSSR": true, "filename": "about.js", "outputPath": "about/index.html", "data": {"static": true}},
        {"route": "/dashboard/", "isSSR": true, "filename": "dashboard.js", "outputPath": "dashboard/index.html"}
    ]"#;

    const MANIFEST: &str = r#"{"apis": {
        "/api/ping": {"path": "/api/ping.js"},
        "/api/broken": {"path": "/api/broken.js"}
    }}"#;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn built_site() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "public/graph.json", GRAPH);
        write(root, "public/manifest.json", MANIFEST);
        write(root, "public/blog/first-post/index.html", "<h1>First Post</h1>");
        write(root, "public/about/index.html", "<h1>About (prerendered)</h1>");
        write(root, "public/styles/main.css", "h1 { color: green; }");
        write(root, "public/images/logo.png", "\u{89}PNG");
        dir
    }

    struct Site {
        server: SiteServer,
        about_calls: Arc<AtomicUsize>,
    }

    /// Upstream stand-in for the dev proxy; records every forwarded URL.
    #[derive(Default)]
    struct Upstream {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpClient for Upstream {
        async fn send_request(&self, req: ResourceRequest) -> HttpClientResult<ResourceResponse> {
            self.seen.lock().unwrap().push(req.url.to_string());
            Ok(ResourceResponse::text("application/json", "{\"from\":\"upstream\"}"))
        }
    }

    async fn site(dir: &TempDir, config: ThicketConfig) -> Site {
        site_with_client(dir, config, None).await
    }

    async fn site_with_client(
        dir: &TempDir,
        config: ThicketConfig,
        http_client: Option<Arc<dyn HttpClient>>,
    ) -> Site {
        let compilation = Compilation::builder(config, RunMode::Serve)
            .project_dir(dir.path())
            .build()
            .await
            .unwrap();
        let compilation = Arc::new(compilation);

        let registry = HandlerRegistry::new(&compilation.context.output_dir);
        registry
            .register(
                "/api/ping.js",
                handler_fn(|_, compilation| {
                    assert!(compilation.is_none());
                    Ok(ResourceResponse::text("text/plain", "pong"))
                }),
            )
            .await;
        registry
            .register(
                "/api/broken.js",
                handler_fn(|_, _| Err(eyre::eyre!("database unavailable"))),
            )
            .await;
        registry
            .register(
                "dashboard.js",
                handler_fn(|request, compilation| {
                    let compilation =
                        compilation.ok_or_else(|| eyre::eyre!("SSR needs the compilation"))?;
                    Ok(ResourceResponse::new().with_body(format!(
                        "<p>{} of {} routes</p>",
                        request.url.path(),
                        compilation.graph.nodes().len()
                    )))
                }),
            )
            .await;

        let about_calls = Arc::new(AtomicUsize::new(0));
        let calls = about_calls.clone();
        registry
            .register(
                "about.js",
                handler_fn(move |_, _| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(ResourceResponse::text("text/html", "<h1>About (live)</h1>"))
                }),
            )
            .await;

        let mut context = PluginContext::new(compilation, Arc::new(FileSystemAdapter::new()));
        if let Some(client) = http_client {
            context = context.with_http_client(client);
        }
        Site {
            server: SiteServer::new(&context, Arc::new(registry)).unwrap(),
            about_calls,
        }
    }

    fn get(path: &str) -> ResourceRequest {
        ResourceRequest::get(Url::parse(&format!("http://127.0.0.1:1984{path}")).unwrap())
    }

    fn text(response: &ResourceResponse) -> &str {
        response
            .body
            .as_ref()
            .and_then(Body::as_text)
            .unwrap_or_default()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_static_route_served_from_output_path() {
        let dir = built_site();
        let site = site(&dir, ThicketConfig::default()).await;
        assert!(site.server.is_hybrid());

        let response = site.server.process(get("/blog/first-post/")).await;
        assert_eq!(response.effective_status(), StatusCode::OK);
        assert_eq!(response.content_type(), Some("text/html"));
        assert_eq!(text(&response), "<h1>First Post</h1>");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_static_ssr_node_skips_handler() {
        let dir = built_site();
        let site = site(&dir, ThicketConfig::default()).await;

        let response = site.server.process(get("/about/")).await;
        assert_eq!(response.effective_status(), StatusCode::OK);
        assert_eq!(text(&response), "<h1>About (prerendered)</h1>");
        assert_eq!(site.about_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_on_demand_ssr_receives_compilation() {
        let dir = built_site();
        let site = site(&dir, ThicketConfig::default()).await;

        let response = site.server.process(get("/dashboard/")).await;
        assert_eq!(response.status, Some(StatusCode::OK));
        assert_eq!(response.content_type(), Some("text/html"));
        assert_eq!(text(&response), "<p>/dashboard/ of 3 routes</p>");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prerender_serves_ssr_artifacts() {
        let dir = built_site();
        write(dir.path(), "public/dashboard/index.html", "<p>prerendered dashboard</p>");
        let config = ThicketConfig::builder().prerender(true).build().unwrap();
        let site = site(&dir, config).await;

        let response = site.server.process(get("/dashboard/")).await;
        assert_eq!(text(&response), "<p>prerendered dashboard</p>");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_api_route_answers() {
        let dir = built_site();
        let site = site(&dir, ThicketConfig::default()).await;

        let response = site.server.process(get("/api/ping")).await;
        assert_eq!(response.status, Some(StatusCode::OK));
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(text(&response), "pong");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failures_map_to_status_codes() {
        let dir = built_site();
        let site = site(&dir, ThicketConfig::default()).await;

        let broken = site.server.process(get("/api/broken")).await;
        assert_eq!(broken.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(broken.body.is_none());

        let missing_page = site.server.process(get("/missing.html")).await;
        assert_eq!(missing_page.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(missing_page.body.is_none());

        let unknown = site.server.process(get("/api/unknown")).await;
        assert_eq!(unknown.effective_status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_route_artifact_is_server_error() {
        let dir = built_site();
        std::fs::remove_file(dir.path().join("public/blog/first-post/index.html")).unwrap();
        let site = site(&dir, ThicketConfig::default()).await;

        let response = site.server.process(get("/blog/first-post/")).await;
        assert_eq!(response.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(response.body.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_proxy_sits_between_artifacts_and_static_files() {
        let dir = built_site();
        write(dir.path(), "public/api/remote/data.json", "{\"from\":\"disk\"}");
        let config = ThicketConfig::builder()
            .proxy("/api/remote", "https://upstream.test")
            .proxy("/blog", "https://upstream.test")
            .build()
            .unwrap();
        let upstream = Arc::new(Upstream::default());
        let client: Arc<dyn HttpClient> = upstream.clone();
        let site = site_with_client(&dir, config, Some(client)).await;

        let proxied = site.server.process(get("/api/remote/data.json?page=2")).await;
        assert_eq!(proxied.effective_status(), StatusCode::OK);
        assert_eq!(text(&proxied), "{\"from\":\"upstream\"}");

        let page = site.server.process(get("/blog/first-post/")).await;
        assert_eq!(text(&page), "<h1>First Post</h1>");

        let css = site.server.process(get("/styles/main.css")).await;
        assert_eq!(css.content_type(), Some("text/css"));
        assert_eq!(text(&css), "h1 { color: green; }");

        let api = site.server.process(get("/api/ping")).await;
        assert_eq!(text(&api), "pong");

        assert_eq!(
            *upstream.seen.lock().unwrap(),
            vec!["https://upstream.test/api/remote/data.json?page=2".to_string()]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_configured_proxy_requires_http_client() {
        let dir = built_site();
        let config = ThicketConfig::builder()
            .proxy("/api/remote", "https://upstream.test")
            .build()
            .unwrap();
        let compilation = Compilation::builder(config, RunMode::Serve)
            .project_dir(dir.path())
            .build()
            .await
            .unwrap();
        let context = PluginContext::new(Arc::new(compilation), Arc::new(FileSystemAdapter::new()));
        let registry = HandlerRegistry::new(&context.compilation.context.output_dir);

        assert!(SiteServer::new(&context, Arc::new(registry)).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_static_assets_use_standard_plugins() {
        let dir = built_site();
        let site = site(&dir, ThicketConfig::default()).await;

        let css = site.server.process(get("/styles/main.css")).await;
        assert_eq!(css.effective_status(), StatusCode::OK);
        assert_eq!(css.content_type(), Some("text/css"));
        assert!(!css.headers.contains_key(header::ETAG));

        let png = site.server.process(get("/images/logo.png")).await;
        assert_eq!(png.content_type(), Some("image/png"));
        assert!(png.body.as_ref().is_some_and(Body::is_binary));

        let artifact = site.server.process(get("/graph.json")).await;
        assert_eq!(artifact.content_type(), Some("application/json"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spa_shell_for_client_routes() {
        let dir = built_site();
        write(dir.path(), "public/index.html", "<div id=\"app\"></div>");
        let graph = r#"[{"route": "/", "outputPath": "index.html", "isSPA": true}]"#;
        write(dir.path(), "public/graph.json", graph);
        let config = ThicketConfig::builder().mode(SiteMode::Spa).build().unwrap();
        let site = site(&dir, config).await;

        for path in ["/", "/users/42", "/settings/profile/"] {
            let response = site.server.process(get(path)).await;
            assert_eq!(text(&response), "<div id=\"app\"></div>", "{path}");
        }
        let asset = site.server.process(get("/styles/main.css")).await;
        assert_eq!(asset.content_type(), Some("text/css"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_http_surface_sets_content_length() {
        let dir = built_site();
        let site = site(&dir, ThicketConfig::default()).await;
        let app = router(Arc::new(HttpHandler::new(
            Arc::new(ArcSwap::from_pointee(site.server)),
            "http://127.0.0.1:1984",
        )));

        let response = app
            .oneshot(Request::builder().uri("/api/ping").body(AxumBody::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "4");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"pong");
    }
}

// End-to-end checks of the development server behind the axum router.
#[cfg(test)]
mod test {
    use std::{path::Path, sync::Arc};

    use arc_swap::ArcSwap;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        response::Response,
    };
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use thicket::{
        FileSystemAdapter,
        adapters::{HttpHandler, router},
        config::ThicketConfig,
        core::{Compilation, DevServer, PluginContext, RunMode},
    };
    use tower::ServiceExt;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/pages/index.html", "<h1>home</h1>");
        write(dir.path(), "src/pages/blog/first-post.html", "<h1>first post</h1>");
        write(dir.path(), "src/styles/main.css", "body { color: red; }");
        dir
    }

    async fn dev_server(dir: &TempDir, config: ThicketConfig) -> DevServer {
        let compilation = Compilation::builder(config, RunMode::Develop)
            .project_dir(dir.path())
            .build()
            .await
            .unwrap();
        let context = PluginContext::new(Arc::new(compilation), Arc::new(FileSystemAdapter::new()));
        DevServer::new(&context).unwrap()
    }

    fn app(holder: Arc<ArcSwap<DevServer>>) -> Router {
        router(Arc::new(HttpHandler::new(holder, "http://127.0.0.1:1984")))
    }

    async fn get(app: &Router, path: &str, if_none_match: Option<&str>) -> Response {
        let mut request = Request::builder().uri(path);
        if let Some(tag) = if_none_match {
            request = request.header(header::IF_NONE_MATCH, tag);
        }
        app.clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pages_served_with_configured_headers() {
        let dir = project();
        let config = ThicketConfig::builder()
            .header("x-powered-by", "thicket")
            .build()
            .unwrap();
        let app = app(Arc::new(ArcSwap::from_pointee(dev_server(&dir, config).await)));

        let response = get(&app, "/blog/first-post/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/html");
        assert_eq!(response.headers().get("x-powered-by").unwrap(), "thicket");
        assert_eq!(body_text(response).await, "<h1>first post</h1>");

        let response = get(&app, "/", None).await;
        assert_eq!(body_text(response).await, "<h1>home</h1>");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_workspace_assets_get_etags() {
        let dir = project();
        let app = app(Arc::new(ArcSwap::from_pointee(
            dev_server(&dir, ThicketConfig::default()).await,
        )));

        let first = get(&app, "/styles/main.css", None).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers().get(header::CONTENT_TYPE).unwrap(), "text/css");
        let tag = first
            .headers()
            .get(header::ETAG)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let cached = get(&app, "/styles/main.css", Some(&tag)).await;
        assert_eq!(cached.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(cached.headers().get(header::CACHE_CONTROL).unwrap(), "no-cache");
        assert!(body_text(cached).await.is_empty());

        write(dir.path(), "src/styles/main.css", "body { color: blue; }");
        let changed = get(&app, "/styles/main.css", Some(&tag)).await;
        assert_eq!(changed.status(), StatusCode::OK);
        assert_ne!(changed.headers().get(header::ETAG).unwrap(), tag.as_str());
        assert_eq!(body_text(changed).await, "body { color: blue; }");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_paths_are_not_found() {
        let dir = project();
        let app = app(Arc::new(ArcSwap::from_pointee(
            dev_server(&dir, ThicketConfig::default()).await,
        )));

        assert_eq!(get(&app, "/styles/missing.css", None).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get(&app, "/nope/", None).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_swapped_server_takes_effect() {
        let dir = project();
        let holder = Arc::new(ArcSwap::from_pointee(
            dev_server(&dir, ThicketConfig::default()).await,
        ));
        let app = app(holder.clone());

        let before = get(&app, "/", None).await;
        assert!(before.headers().get("x-reloaded").is_none());

        let config = ThicketConfig::builder()
            .header("x-reloaded", "yes")
            .build()
            .unwrap();
        holder.store(Arc::new(dev_server(&dir, config).await));

        let after = get(&app, "/", None).await;
        assert_eq!(after.headers().get("x-reloaded").unwrap(), "yes");
    }
}

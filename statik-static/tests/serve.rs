use async_trait::async_trait;
use bytes::Bytes;
use http::header::{
    ACCEPT_ENCODING, ALLOW, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE, ETAG, IF_NONE_MATCH, LOCATION, RANGE, VARY,
};
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use statik_static::send::NoEvents;
use statik_static::{
    Dotfiles, Engine, FsEngine, OriginalUri, Outcome, PathCache, SendError, SendEvents,
    SendOptions, SendRequest, ServeStatic, ServeStaticOptions, StaticBody,
};

fn site(files: &[(&str, &[u8])]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    dir
}

fn middleware(root: &Path, options: ServeStaticOptions) -> ServeStatic {
    ServeStatic::new(root, options)
        .unwrap()
        .with_path_cache(Arc::new(PathCache::with_capacity(16)))
}

fn get(uri: &str) -> Request<()> {
    Request::get(uri).body(()).unwrap()
}

fn respond(outcome: Outcome) -> Response<StaticBody> {
    assert!(!outcome.is_next(), "expected a response, got {:?}", outcome);
    outcome.into_response().unwrap()
}

async fn body(response: Response<StaticBody>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

#[tokio::test]
async fn test_serves_file() {
    let dir = site(&[("hello.txt", b"hello world")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default());

    let response = respond(serve.serve(&get("/hello.txt")).await);
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=UTF-8");
    assert_eq!(response.headers()[CONTENT_LENGTH], "11");
    assert_eq!(response.headers()[VARY], "Accept-Encoding");
    assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age=0");
    assert!(response.headers().contains_key(ETAG));
    assert_eq!(body(response).await, "hello world");
}

#[tokio::test]
async fn test_head_has_no_body() {
    let dir = site(&[("hello.txt", b"hello world")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default());

    let req = Request::head("/hello.txt").body(()).unwrap();
    let response = respond(serve.serve(&req).await);
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_LENGTH], "11");
    assert!(body(response).await.is_empty());
}

#[tokio::test]
async fn test_missing_file_falls_through() {
    let dir = site(&[]);
    let serve = middleware(dir.path(), ServeStaticOptions::default());

    let outcome = serve.serve(&get("/missing.txt")).await;
    assert!(outcome.is_next());
    assert!(matches!(outcome, Outcome::Next(None)));
}

#[tokio::test]
async fn test_missing_file_without_fallthrough_forwards_404() {
    let dir = site(&[]);
    let serve = middleware(dir.path(), ServeStaticOptions::default().fallthrough(false));

    match serve.serve(&get("/missing.txt")).await {
        Outcome::Next(Some(err)) => assert_eq!(err.status_code(), StatusCode::NOT_FOUND),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_post_falls_through() {
    let dir = site(&[("hello.txt", b"hello")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default());

    let req = Request::post("/hello.txt").body(()).unwrap();
    assert!(matches!(serve.serve(&req).await, Outcome::Next(None)));
}

#[tokio::test]
async fn test_post_without_fallthrough_is_405() {
    let dir = site(&[("hello.txt", b"hello")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default().fallthrough(false));

    let req = Request::builder()
        .method(Method::POST)
        .uri("/hello.txt")
        .body(())
        .unwrap();
    let response = respond(serve.serve(&req).await);
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[ALLOW], "GET, HEAD");
    assert_eq!(response.headers()[CONTENT_LENGTH], "0");
    assert!(body(response).await.is_empty());
}

#[tokio::test]
async fn test_directory_redirect_uses_original_url() {
    let dir = site(&[("index.html", b"<h1>assets</h1>")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default());

    // mounted at /assets: the prefix is stripped to "/"
    let mut req = get("/");
    req.extensions_mut()
        .insert(OriginalUri("/assets?v=1".parse().unwrap()));

    let response = respond(serve.serve(&req).await);
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[LOCATION], "/assets/?v=1");
    let text = body(response).await;
    assert!(std::str::from_utf8(&text).unwrap().contains("Redirecting to /assets/?v=1"));
}

#[tokio::test]
async fn test_subdirectory_redirect() {
    let dir = site(&[("docs/readme.txt", b"docs")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default());

    let response = respond(serve.serve(&get("/docs")).await);
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[LOCATION], "/docs/");
}

#[tokio::test]
async fn test_index_file_served_for_trailing_slash() {
    let dir = site(&[("docs/index.html", b"<p>docs</p>")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default());

    let response = respond(serve.serve(&get("/docs/")).await);
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=UTF-8");
    assert_eq!(body(response).await, "<p>docs</p>");
}

#[tokio::test]
async fn test_trailing_slash_without_index() {
    let dir = site(&[("docs/readme.txt", b"docs")]);

    let serve = middleware(dir.path(), ServeStaticOptions::default());
    assert!(matches!(serve.serve(&get("/docs/")).await, Outcome::Next(None)));

    let serve = middleware(dir.path(), ServeStaticOptions::default().fallthrough(false));
    match serve.serve(&get("/docs/")).await {
        Outcome::Next(Some(err)) => assert_eq!(err.status_code(), StatusCode::NOT_FOUND),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_directory_without_redirect_is_not_found() {
    let dir = site(&[("docs/readme.txt", b"docs")]);
    let serve = middleware(
        dir.path(),
        ServeStaticOptions::default().redirect(false).fallthrough(false),
    );

    match serve.serve(&get("/docs")).await {
        Outcome::Next(Some(err)) => assert_eq!(err.status_code(), StatusCode::NOT_FOUND),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_precompressed_brotli() {
    let dir = site(&[
        ("app.js", b"console.log('hello world');"),
        ("app.js.br", b"BROTLI"),
        ("app.js.gz", b"GZIP-BYTES"),
    ]);
    let serve = middleware(dir.path(), ServeStaticOptions::default().prefer_precompressed(true));

    let req = Request::get("/app.js")
        .header(ACCEPT_ENCODING, "gzip, br")
        .body(())
        .unwrap();
    let response = respond(serve.serve(&req).await);
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_ENCODING], "br");
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "text/javascript; charset=UTF-8"
    );
    assert_eq!(response.headers()[CONTENT_LENGTH], "6");
    assert_eq!(response.headers()[VARY], "Accept-Encoding");
    assert_eq!(body(response).await, "BROTLI");
}

#[tokio::test]
async fn test_precompressed_gzip_fallback_and_identity() {
    let dir = site(&[("app.js", b"plain"), ("app.js.gz", b"GZIP")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default().prefer_precompressed(true));

    let req = Request::get("/app.js")
        .header(ACCEPT_ENCODING, "br, gzip")
        .body(())
        .unwrap();
    let response = respond(serve.serve(&req).await);
    assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
    assert_eq!(body(response).await, "GZIP");

    let response = respond(serve.serve(&get("/app.js")).await);
    assert!(!response.headers().contains_key(CONTENT_ENCODING));
    assert_eq!(response.headers()[VARY], "Accept-Encoding");
    assert_eq!(body(response).await, "plain");
}

#[tokio::test]
async fn test_precompressed_encoded_path_keeps_type() {
    let dir = site(&[("app.js", b"plain"), ("app.js.br", b"BR")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default().prefer_precompressed(true));

    let req = Request::get("/app%2Ejs")
        .header(ACCEPT_ENCODING, "br")
        .body(())
        .unwrap();
    let response = respond(serve.serve(&req).await);
    assert_eq!(response.headers()[CONTENT_ENCODING], "br");
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "text/javascript; charset=UTF-8"
    );
    assert_eq!(body(response).await, "BR");
}

#[tokio::test]
async fn test_precompressed_index() {
    let dir = site(&[("index.html", b"<html>"), ("index.html.gz", b"GZ")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default().prefer_precompressed(true));

    let req = Request::get("/")
        .header(ACCEPT_ENCODING, "gzip")
        .body(())
        .unwrap();
    let response = respond(serve.serve(&req).await);
    assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=UTF-8");
}

#[tokio::test]
async fn test_set_headers_overrides_defaults() {
    let dir = site(&[("hello.txt", b"hello")]);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let options = ServeStaticOptions::default().set_headers(move |headers, path, meta| {
        seen.fetch_add(1, Ordering::SeqCst);
        assert!(path.ends_with("hello.txt"));
        assert_eq!(meta.len(), 5);
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(VARY, HeaderValue::from_static("Origin"));
    });
    let serve = middleware(dir.path(), options);

    let response = respond(serve.serve(&get("/hello.txt")).await);
    assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
    assert_eq!(response.headers()[VARY], "Origin");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // not called for misses
    let _ = serve.serve(&get("/missing.txt")).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_range_request() {
    let dir = site(&[("hello.txt", b"hello world")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default());

    let req = Request::get("/hello.txt")
        .header(RANGE, "bytes=0-4")
        .body(())
        .unwrap();
    let response = respond(serve.serve(&req).await);
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[CONTENT_RANGE], "bytes 0-4/11");
    assert_eq!(response.headers()[CONTENT_LENGTH], "5");
    assert_eq!(body(response).await, "hello");
}

#[tokio::test]
async fn test_malformed_range_serves_whole_file() {
    let dir = site(&[("hello.txt", b"hello world")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default());

    for range in ["bytes=abc", "bytes=x-y"] {
        let req = Request::get("/hello.txt")
            .header(RANGE, range)
            .body(())
            .unwrap();
        let response = respond(serve.serve(&req).await);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(CONTENT_RANGE));
        assert_eq!(response.headers()[CONTENT_LENGTH], "11");
        assert_eq!(body(response).await, "hello world");
    }
}

#[tokio::test]
async fn test_unsatisfiable_range_is_forwarded_under_fallthrough() {
    let dir = site(&[("hello.txt", b"hello world")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default());

    let req = Request::get("/hello.txt")
        .header(RANGE, "bytes=50-60")
        .body(())
        .unwrap();
    match serve.serve(&req).await {
        Outcome::Next(Some(err)) => {
            assert_eq!(err.status_code(), StatusCode::RANGE_NOT_SATISFIABLE);
            assert_eq!(err.headers()[CONTENT_RANGE], "bytes */11");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_not_modified() {
    let dir = site(&[("hello.txt", b"hello world")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default());

    let first = respond(serve.serve(&get("/hello.txt")).await);
    let etag = first.headers()[ETAG].clone();

    let req = Request::get("/hello.txt")
        .header(IF_NONE_MATCH, etag)
        .body(())
        .unwrap();
    let response = respond(serve.serve(&req).await);
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(!response.headers().contains_key(CONTENT_LENGTH));
    assert!(body(response).await.is_empty());
}

#[tokio::test]
async fn test_dotfiles() {
    let dir = site(&[(".env", b"SECRET=1")]);

    let serve = middleware(dir.path(), ServeStaticOptions::default().fallthrough(false));
    match serve.serve(&get("/.env")).await {
        Outcome::Next(Some(err)) => assert_eq!(err.status_code(), StatusCode::NOT_FOUND),
        other => panic!("unexpected outcome: {:?}", other),
    }

    let serve = middleware(
        dir.path(),
        ServeStaticOptions::default()
            .fallthrough(false)
            .dotfiles(Dotfiles::Deny),
    );
    match serve.serve(&get("/.env")).await {
        Outcome::Next(Some(err)) => assert_eq!(err.status_code(), StatusCode::FORBIDDEN),
        other => panic!("unexpected outcome: {:?}", other),
    }

    let serve = middleware(dir.path(), ServeStaticOptions::default().dotfiles(Dotfiles::Allow));
    let response = respond(serve.serve(&get("/.env")).await);
    assert_eq!(body(response).await, "SECRET=1");
}

#[tokio::test]
async fn test_traversal_is_forbidden() {
    let dir = site(&[("public/a.txt", b"a"), ("secret.txt", b"s")]);
    let serve = middleware(
        &dir.path().join("public"),
        ServeStaticOptions::default().fallthrough(false),
    );

    match serve.serve(&get("/%2e%2e/secret.txt")).await {
        Outcome::Next(Some(err)) => assert_eq!(err.status_code(), StatusCode::FORBIDDEN),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_extensions_fallback() {
    let dir = site(&[("about.html", b"about")]);
    let serve = middleware(dir.path(), ServeStaticOptions::default().extensions(["html"]));

    let response = respond(serve.serve(&get("/about")).await);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=UTF-8");
    assert_eq!(body(response).await, "about");
}

#[tokio::test]
async fn test_duplicate_slashes_are_collapsed() {
    let dir = site(&[("a/b.txt", b"b")]);
    let cache = Arc::new(PathCache::with_capacity(16));
    let serve = ServeStatic::new(dir.path(), ServeStaticOptions::default())
        .unwrap()
        .with_path_cache(Arc::clone(&cache));

    let response = respond(serve.serve(&get("//a///b.txt")).await);
    assert_eq!(body(response).await, "b");
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_engine_without_listener() {
    let dir = site(&[("hello.txt", b"hello world"), ("docs/a.txt", b"a")]);
    let options = SendOptions::new(dir.path());

    let req = get("/hello.txt");
    let response = FsEngine
        .send(&SendRequest::from_request(&req), "/hello.txt", &options, &mut NoEvents)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(VARY));
    assert_eq!(body(response).await, "hello world");

    // the default directory disposition is not found
    let req = get("/docs");
    let err = FsEngine
        .send(&SendRequest::from_request(&req), "/docs", &options, &mut NoEvents)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

struct FailingEngine;

#[async_trait]
impl Engine for FailingEngine {
    async fn send(
        &self,
        _req: &SendRequest<'_>,
        _path: &str,
        _options: &SendOptions,
        _events: &mut dyn SendEvents,
    ) -> Result<Response<StaticBody>, SendError> {
        Err(SendError::status(StatusCode::INTERNAL_SERVER_ERROR))
    }
}

#[tokio::test]
async fn test_server_errors_are_forwarded_under_fallthrough() {
    let dir = site(&[]);
    let serve =
        middleware(dir.path(), ServeStaticOptions::default()).with_engine(Arc::new(FailingEngine));

    match serve.serve(&get("/anything")).await {
        Outcome::Next(Some(err)) => {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR)
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_rejects_bad_options() {
    assert!(ServeStatic::new("", ServeStaticOptions::default()).is_err());
    assert!(ServeStatic::new("public", ServeStaticOptions::default().index(["a/b"])).is_err());
}

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
    routing::{get, put},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use agora_api::auth::{AppState, AppStateInner};
use agora_api::metadata::MetadataClient;
use agora_api::routes::api_router;
use agora_api::storage::{DiskStore, ObjectStore, S3Settings, S3Store};

const UPLOAD_BASE: &str = "http://media.test/uploads";
const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

struct TestApp {
    router: Router,
    tmp: TempDir,
}

/// Router over an in-memory database. Uploads go to `store`, or to a
/// disk store inside the app's temp dir when none is given.
async fn app_with(metadata_url: &str, store: Option<Arc<dyn ObjectStore>>) -> TestApp {
    let tmp = TempDir::new().unwrap();
    let store = match store {
        Some(store) => store,
        None => Arc::new(
            DiskStore::new(tmp.path().join("uploads"), UPLOAD_BASE)
                .await
                .unwrap(),
        ),
    };
    let state: AppState = Arc::new(AppStateInner {
        db: agora_db::Database::open_in_memory().unwrap(),
        jwt_secret: "test-secret".into(),
        token_ttl_hours: 1,
        secure_cookies: false,
        store,
        metadata: MetadataClient::new(metadata_url).unwrap(),
        max_upload_bytes: MAX_UPLOAD_BYTES,
    });
    TestApp {
        router: api_router(state),
        tmp,
    }
}

async fn app_with_metadata(metadata_url: &str) -> TestApp {
    app_with(metadata_url, None).await
}

async fn app() -> TestApp {
    // nothing listens on port 1
    app_with_metadata("http://127.0.0.1:1/latest").await
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, headers, body)
    }

    async fn upload(&self, cookie: &str, filename: &str, data: &[u8]) -> (StatusCode, Value) {
        let (content_type, body) = multipart("file", filename, data);
        let req = Request::post("/api/upload")
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, _, body) = self.send(req).await;
        (status, body)
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, _, body) = self.send(req).await;
        (status, body)
    }

    /// Registers and logs in; returns (user id, cookie header value).
    async fn signup(&self, handle: &str) -> (i64, String) {
        let (status, body) = self
            .call(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "username": handle,
                    "email": format!("{handle}@example.com"),
                    "password": "correct horse",
                    "name": handle,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert!(body.get("password").is_none());

        let req = Request::post("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "username": handle, "password": "correct horse" }).to_string(),
            ))
            .unwrap();
        let (status, headers, body) = self.send(req).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let cookie = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("accessToken="))
            .and_then(|v| v.split(';').next())
            .expect("login sets the session cookie")
            .to_string();
        (body["user"]["id"].as_i64().unwrap(), cookie)
    }
}

#[tokio::test]
async fn health_and_about_are_public() {
    let app = app().await;
    let (status, body) = app.call("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));

    let (status, body) = app.call("GET", "/api/about", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("social media"));
}

#[tokio::test]
async fn registration_rejects_duplicates_and_weak_input() {
    let app = app().await;
    app.signup("ann").await;

    let (status, body) = app
        .call(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "someone-else",
                "email": "ann@example.com",
                "password": "long enough",
                "name": "Other"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, _) = app
        .call(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "ann",
                "email": "ann2@example.com",
                "password": "long enough",
                "name": "Ann Two"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "bo",
                "email": "bo@example.com",
                "password": "short",
                "name": "Bo"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn authentication_gates_resource_routes() {
    let app = app().await;
    let (ann, _) = app.signup("ann").await;

    let (status, body) = app.call("GET", "/api/posts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "not authenticated");

    let (status, _) = app
        .call("GET", "/api/posts", Some("accessToken=forged.token.value"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "ann", "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // bearer tokens are accepted as well as the cookie
    let token = agora_api::auth::create_token("test-secret", ann, "ann", 1).unwrap();
    let req = Request::get(format!("/api/users/{ann}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ann");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn post_round_trip() {
    let app = app().await;
    let (ann, cookie) = app.signup("ann").await;

    let (status, created) = app
        .call(
            "POST",
            "/api/posts",
            Some(&cookie),
            Some(json!({ "desc": "first post", "img": "http://media.test/uploads/1-a-cat.png" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_i64().unwrap();

    let (status, post) = app.call("GET", &format!("/api/posts/{id}"), Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["desc"], "first post");
    assert_eq!(post["img"], "http://media.test/uploads/1-a-cat.png");
    assert_eq!(post["userId"], ann);
    assert!(post["createdAt"].is_string());

    let (status, _) = app.call("POST", "/api/posts", Some(&cookie), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ownership_and_cascade_end_to_end() {
    let app = app().await;
    let (_, ann) = app.signup("ann").await;
    let (_, ben) = app.signup("ben").await;

    let (_, post) = app
        .call("POST", "/api/posts", Some(&ann), Some(json!({ "desc": "mine" })))
        .await;
    let post_id = post["id"].as_i64().unwrap();

    let (status, _) = app
        .call(
            "POST",
            "/api/comments",
            Some(&ben),
            Some(json!({ "desc": "hello", "postId": post_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .call("POST", "/api/likes", Some(&ben), Some(json!({ "postId": post_id })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // ben cannot touch ann's post
    let uri = format!("/api/posts/{post_id}");
    let (status, body) = app.call("DELETE", &uri, Some(&ben), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    let (status, _) = app
        .call("PUT", &uri, Some(&ben), Some(json!({ "desc": "defaced" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.call("GET", &uri, Some(&ben), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["desc"], "mine");

    let (status, _) = app.call("DELETE", &uri, Some(&ann), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call("GET", &uri, Some(&ann), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, comments) = app
        .call("GET", &format!("/api/comments?postId={post_id}"), Some(&ann), None)
        .await;
    assert_eq!(comments, json!([]));
    let (_, likes) = app
        .call("GET", &format!("/api/likes?postId={post_id}"), Some(&ann), None)
        .await;
    assert_eq!(likes, json!([]));
}

#[tokio::test]
async fn deleting_account_cascades_and_is_self_only() {
    let app = app().await;
    let (ann_id, ann) = app.signup("ann").await;
    let (ben_id, ben) = app.signup("ben").await;

    app.call("POST", "/api/posts", Some(&ann), Some(json!({ "desc": "bye" })))
        .await;
    app.call("POST", "/api/stories", Some(&ann), Some(json!({ "img": "s.png" })))
        .await;
    app.call("POST", "/api/relationships", Some(&ben), Some(json!({ "userId": ann_id })))
        .await;

    let (status, _) = app
        .call("DELETE", &format!("/api/users/{ann_id}"), Some(&ben), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call("DELETE", &format!("/api/users/{ann_id}"), Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, posts) = app
        .call("GET", &format!("/api/posts?userId={ann_id}"), Some(&ben), None)
        .await;
    assert_eq!(posts, json!([]));
    let (_, stories) = app
        .call("GET", &format!("/api/stories?userId={ann_id}"), Some(&ben), None)
        .await;
    assert_eq!(stories, json!([]));
    let (_, edges) = app
        .call(
            "GET",
            &format!("/api/relationships?followerUserId={ben_id}"),
            Some(&ben),
            None,
        )
        .await;
    assert_eq!(edges, json!([]));
}

#[tokio::test]
async fn follow_feed_and_unfollow() {
    let app = app().await;
    let (ann_id, ann) = app.signup("ann").await;
    let (ben_id, ben) = app.signup("ben").await;

    app.call("POST", "/api/posts", Some(&ben), Some(json!({ "desc": "from ben" })))
        .await;

    let (_, feed) = app.call("GET", "/api/posts", Some(&ann), None).await;
    assert_eq!(feed, json!([]));

    let (status, edge) = app
        .call("POST", "/api/relationships", Some(&ann), Some(json!({ "userId": ben_id })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(edge["followerUserId"], ann_id);

    let (_, feed) = app.call("GET", "/api/posts", Some(&ann), None).await;
    assert_eq!(feed[0]["desc"], "from ben");
    assert_eq!(feed[0]["name"], "ben");

    let (status, _) = app
        .call("POST", "/api/relationships", Some(&ann), Some(json!({ "userId": ann_id })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.call("GET", "/api/relationships", Some(&ann), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the followed side does not own the edge
    let edge_uri = format!("/api/relationships/{}", edge["id"]);
    let (status, _) = app.call("DELETE", &edge_uri, Some(&ben), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call("DELETE", &format!("/api/relationships?userId={ben_id}"), Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call("DELETE", &format!("/api/relationships?userId={ben_id}"), Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_on_missing_post_is_rejected() {
    let app = app().await;
    let (_, ann) = app.signup("ann").await;
    let (status, _) = app
        .call(
            "POST",
            "/api/comments",
            Some(&ann),
            Some(json!({ "desc": "hello?", "postId": 999 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, post) = app
        .call("POST", "/api/posts", Some(&ann), Some(json!({ "desc": "p" })))
        .await;
    let (status, _) = app
        .call(
            "POST",
            "/api/comments",
            Some(&ann),
            Some(json!({ "desc": "x".repeat(201), "postId": post["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn multipart(field: &str, filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "agora-test-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

#[tokio::test]
async fn upload_stores_object_and_returns_url() {
    let app = app().await;
    let (_, ann) = app.signup("ann").await;

    let (content_type, body) = multipart("file", "cat picture.png", b"\x89PNG fake");
    let req = Request::post("/api/upload")
        .header(header::COOKIE, &ann)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    let (status, _, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with(UPLOAD_BASE));
    assert!(url.ends_with("-cat_picture.png"));
    let key = url.rsplit('/').next().unwrap();
    let stored = std::fs::read(app.tmp.path().join("uploads").join(key)).unwrap();
    assert_eq!(stored, b"\x89PNG fake");

    // the url is attached to a post afterwards
    let (status, post) = app
        .call("POST", "/api/posts", Some(&ann), Some(json!({ "img": url })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["img"], url);
}

#[tokio::test]
async fn upload_requires_file_field_and_session() {
    let app = app().await;
    let (_, ann) = app.signup("ann").await;

    let (content_type, body) = multipart("avatar", "a.png", b"data");
    let req = Request::post("/api/upload")
        .header(header::COOKIE, &ann)
        .header(header::CONTENT_TYPE, content_type.clone())
        .body(Body::from(body.clone()))
        .unwrap();
    let (status, _, _) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = Request::post("/api/upload")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    let (status, _, _) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

async fn fake_metadata_service() -> String {
    let imds = Router::new()
        .route("/latest/api/token", put(|| async { "session-token" }))
        .route(
            "/latest/meta-data/private-ipv4",
            get(|headers: HeaderMap| async move {
                match headers.get("X-aws-ec2-metadata-token") {
                    Some(v) if v == "session-token" => Ok("10.0.3.17"),
                    _ => Err(StatusCode::UNAUTHORIZED),
                }
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, imds).await.unwrap();
    });
    format!("http://{addr}/latest")
}

#[tokio::test]
async fn info_reports_private_ip() {
    let base = fake_metadata_service().await;
    let app = app_with_metadata(&base).await;

    let (status, body) = app.call("GET", "/api/info", None, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["privateIp"], "10.0.3.17");
}

#[tokio::test]
async fn info_surfaces_metadata_failure_as_upstream_error() {
    let app = app().await;
    let (status, body) = app.call("GET", "/api/info", None, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("private IPv4"));
}

#[tokio::test]
async fn username_cannot_be_taken_over_by_rename() {
    let app = app().await;
    let (bob, bob_cookie) = app.signup("bob").await;
    let (ann, _) = app.signup("ann").await;

    let (status, body) = app
        .call(
            "PUT",
            &format!("/api/users/{bob}"),
            Some(&bob_cookie),
            Some(json!({ "username": "ann" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["error"], "username is already taken");

    let (status, body) = app
        .call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "ann", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], ann);
    assert_eq!(body["user"]["email"], "ann@example.com");
}

#[tokio::test]
async fn malformed_requests_get_json_validation_errors() {
    let app = app().await;
    let (_, ann) = app.signup("ann").await;

    let req = Request::post("/api/comments")
        .header(header::COOKIE, &ann)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "desc": "x" }).to_string()))
        .unwrap();
    let (status, headers, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(body["error"].as_str().unwrap().contains("postId"), "{body}");

    let (status, body) = app.call("GET", "/api/posts/abc", Some(&ann), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("abc"), "{body}");

    let (status, body) = app
        .call("GET", "/api/comments?postId=first", Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let (status, body) = app
        .call("POST", "/api/auth/register", None, Some(json!({ "username": "x" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");
}

#[tokio::test]
async fn invalid_cookie_falls_back_to_bearer_token() {
    let app = app().await;
    let (ann, _) = app.signup("ann").await;
    let token = agora_api::auth::create_token("test-secret", ann, "ann", 1).unwrap();

    let req = Request::get(format!("/api/users/{ann}"))
        .header(header::COOKIE, "accessToken=stale.session.token")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["username"], "ann");
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let app = app().await;
    let (_, ann) = app.signup("ann").await;

    let (status, body) = app
        .upload(&ann, "huge.png", &vec![7u8; MAX_UPLOAD_BYTES * 2])
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{body}");
    assert!(body["error"].is_string());
}

type SeenRequests = Arc<Mutex<Vec<(Method, String, HeaderMap)>>>;

/// Bucket endpoint that answers every request with `status` and records
/// what it was sent.
async fn fake_s3(status: StatusCode) -> (String, SeenRequests) {
    let seen: SeenRequests = Arc::default();
    let log = seen.clone();
    let s3 = Router::new().fallback(move |req: Request<Body>| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push((
                req.method().clone(),
                req.uri().path().to_string(),
                req.headers().clone(),
            ));
            (status, [(header::ETAG, "\"0123456789abcdef\"")])
        }
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, s3).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

fn s3_store(endpoint: &str) -> Arc<dyn ObjectStore> {
    Arc::new(S3Store::new(S3Settings {
        bucket: "agora-media".into(),
        region: "us-east-1".into(),
        access_key_id: "AKIDEXAMPLE".into(),
        secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
        endpoint: Some(endpoint.to_string()),
        public_base: "https://cdn.example.com".into(),
    }))
}

#[tokio::test]
async fn s3_upload_is_signed_and_returns_public_url() {
    let (endpoint, seen) = fake_s3(StatusCode::OK).await;
    let app = app_with("http://127.0.0.1:1/latest", Some(s3_store(&endpoint))).await;
    let (_, ann) = app.signup("ann").await;

    let (status, body) = app.upload(&ann, "beach.jpg", b"jpeg bytes").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("https://cdn.example.com/"), "{url}");
    assert!(url.ends_with("-beach.jpg"));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (method, path, headers) = &seen[0];
    assert_eq!(method, Method::PUT);
    let key = url.rsplit('/').next().unwrap();
    assert_eq!(path, &format!("/agora-media/{key}"));
    assert_eq!(headers["x-amz-meta-fieldname"], "file");
    assert!(
        headers[header::AUTHORIZATION]
            .to_str()
            .unwrap()
            .starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/")
    );
}

#[tokio::test]
async fn s3_failure_is_bad_gateway() {
    let (endpoint, seen) = fake_s3(StatusCode::INTERNAL_SERVER_ERROR).await;
    let app = app_with("http://127.0.0.1:1/latest", Some(s3_store(&endpoint))).await;
    let (_, ann) = app.signup("ann").await;

    let (status, body) = app.upload(&ann, "beach.jpg", b"jpeg bytes").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY, "{body}");
    assert!(body["error"].as_str().unwrap().contains("could not store upload"));
    assert!(!seen.lock().unwrap().is_empty());
}

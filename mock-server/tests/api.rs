use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::Value;
use tower::ServiceExt;

const ENTRY: &str = "/webapi/entry.cgi";

/// Percent-encode a query component; `http::Uri` rejects quotes and spaces.
fn enc(raw: &str) -> String {
    let mut out = String::new();
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn uri(pairs: &[(&str, &str)]) -> String {
    let query: Vec<String> = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", enc(key), enc(value)))
        .collect();
    format!("{ENTRY}?{}", query.join("&"))
}

fn get(uri: &str, cookie: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(String::new()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Log in and return the session cookie pair (`id=<sid>`).
async fn login(app: &axum::Router) -> String {
    let uri = uri(&[
        ("api", "SYNO.API.Auth"),
        ("version", "7"),
        ("method", "login"),
        ("account", "api-client"),
        ("passwd", "secret"),
        ("session", "webui"),
        ("format", "cookie"),
    ]);
    let response = app.clone().oneshot(get(&uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set a session cookie")
        .to_str()
        .unwrap()
        .to_string();
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let app = app();
    let cookie = login(&app).await;
    assert!(cookie.starts_with("id="));
}

#[tokio::test]
async fn login_rejects_empty_credentials() {
    let app = app();
    let uri = uri(&[
        ("api", "SYNO.API.Auth"),
        ("version", "7"),
        ("method", "login"),
        ("account", ""),
        ("passwd", ""),
        ("session", "webui"),
        ("format", "cookie"),
    ]);
    let response = app.oneshot(get(&uri, None)).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], 400);
}

#[tokio::test]
async fn unauthenticated_call_is_rejected() {
    let app = app();
    let uri = uri(&[
        ("api", "SYNO.FileStation.Info"),
        ("version", "2"),
        ("method", "get"),
    ]);
    let response = app.oneshot(get(&uri, None)).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], 119);
}

#[tokio::test]
async fn unknown_api_reports_code_102() {
    let app = app();
    let cookie = login(&app).await;
    let uri = uri(&[("api", "SYNO.No.Such.Api"), ("version", "1"), ("method", "get")]);
    let response = app.oneshot(get(&uri, Some(&cookie))).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], 102);
}

#[tokio::test]
async fn create_rename_delete_flow() {
    let app = app();
    let cookie = login(&app).await;

    // create, forcing the parent chain into existence
    let create = uri(&[
        ("api", "SYNO.FileStation.CreateFolder"),
        ("version", "2"),
        ("method", "create"),
        ("folder_path", r#"["/test-folder"]"#),
        ("name", r#"["integration-test"]"#),
        ("force_parent", "true"),
    ]);
    let response = app.clone().oneshot(get(&create, Some(&cookie))).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], true, "{body}");
    assert_eq!(body["data"]["folders"][0]["path"], "/test-folder/integration-test");
    assert_eq!(body["data"]["folders"][0]["isdir"], true);

    // rename
    let rename = uri(&[
        ("api", "SYNO.FileStation.Rename"),
        ("version", "2"),
        ("method", "rename"),
        ("path", r#"["/test-folder/integration-test"]"#),
        ("name", r#"["integration-test-renamed"]"#),
    ]);
    let response = app.clone().oneshot(get(&rename, Some(&cookie))).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], true, "{body}");
    assert_eq!(
        body["data"]["files"][0]["path"],
        "/test-folder/integration-test-renamed"
    );

    // delete the parent recursively
    let delete = uri(&[
        ("api", "SYNO.FileStation.Delete"),
        ("version", "2"),
        ("method", "delete"),
        ("path", r#"["/test-folder"]"#),
        ("recursive", "true"),
    ]);
    let response = app.clone().oneshot(get(&delete, Some(&cookie))).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], true, "{body}");
}

#[tokio::test]
async fn create_without_force_parent_reports_missing_parent() {
    let app = app();
    let cookie = login(&app).await;
    let create = uri(&[
        ("api", "SYNO.FileStation.CreateFolder"),
        ("version", "2"),
        ("method", "create"),
        ("folder_path", r#"["/no-such-parent"]"#),
        ("name", r#"["child"]"#),
    ]);
    let response = app.oneshot(get(&create, Some(&cookie))).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], 1100);
    assert_eq!(body["error"]["errors"][0]["code"], 408);
    assert_eq!(body["error"]["errors"][0]["path"], "/no-such-parent");
}

#[tokio::test]
async fn delete_missing_path_reports_item_error() {
    let app = app();
    let cookie = login(&app).await;
    let delete = uri(&[
        ("api", "SYNO.FileStation.Delete"),
        ("version", "2"),
        ("method", "delete"),
        ("path", r#"["/ghost"]"#),
        ("recursive", "true"),
    ]);
    let response = app.oneshot(get(&delete, Some(&cookie))).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], 900);
    assert_eq!(body["error"]["errors"][0]["code"], 408);
}

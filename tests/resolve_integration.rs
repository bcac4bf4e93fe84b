//! Integration tests for interstitial resolution against a mock server.
//!
//! Covers each leg of the Drive negotiation state machine, the Dropbox
//! HTML rejection rule, and the public-disk href exchange.

use modfetch::build_http_client;
use modfetch::resolve::{DiskResolver, DriveResolver, ResolveError, dropbox};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZIP_BYTES: &[u8] = b"PK\x03\x04fake-zip-content";

fn zip_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/octet-stream")
        .insert_header("content-disposition", r#"attachment; filename="mod.zip""#)
        .set_body_bytes(ZIP_BYTES.to_vec())
}

fn html_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

fn drive_resolver(server: &MockServer) -> DriveResolver {
    DriveResolver::new(build_http_client(), None).with_endpoint(format!("{}/uc", server.uri()))
}

// ==================== Drive: direct fetch ====================

#[tokio::test]
async fn test_drive_small_file_fetched_directly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", "FILE0"))
        .respond_with(zip_response())
        .mount(&server)
        .await;

    let response = drive_resolver(&server)
        .resolve("FILE0", "https://drive.google.com/file/d/FILE0/view")
        .await
        .unwrap();
    assert_eq!(response.bytes().await.unwrap().as_ref(), ZIP_BYTES);
}

// ==================== Drive: confirm cookie ====================

#[tokio::test]
async fn test_drive_confirm_cookie_retries_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", "FILE1"))
        .and(query_param("confirm", "cookietok"))
        .respond_with(zip_response())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", "FILE1"))
        .and(query_param_is_missing("confirm"))
        .respond_with(
            html_response("<html>virus scan warning</html>")
                .insert_header("set-cookie", "download_warning_1234=cookietok; Path=/"),
        )
        .mount(&server)
        .await;

    let response = drive_resolver(&server)
        .resolve("FILE1", "https://drive.google.com/file/d/FILE1/view")
        .await
        .unwrap();
    assert_eq!(response.bytes().await.unwrap().as_ref(), ZIP_BYTES);
}

// ==================== Drive: token in HTML ====================

#[tokio::test]
async fn test_drive_html_form_token_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", "FILE2"))
        .and(query_param("confirm", "htmltok"))
        .respond_with(zip_response())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", "FILE2"))
        .and(query_param_is_missing("confirm"))
        .respond_with(html_response(
            r#"<html><input type="hidden" name="confirm" value="htmltok"></html>"#,
        ))
        .mount(&server)
        .await;

    let response = drive_resolver(&server)
        .resolve("FILE2", "https://drive.google.com/file/d/FILE2/view")
        .await
        .unwrap();
    assert_eq!(response.bytes().await.unwrap().as_ref(), ZIP_BYTES);
}

// ==================== Drive: downloadUrl redirect ====================

#[tokio::test]
async fn test_drive_json_download_url_followed() {
    let server = MockServer::start().await;
    let escaped = format!("{}/direct/dl", server.uri()).replace('/', "\\/");
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", "FILE3"))
        .respond_with(html_response(&format!(
            r#"<html><script>var d = {{"downloadUrl":"{escaped}"}};</script></html>"#
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/direct/dl"))
        .respond_with(zip_response())
        .mount(&server)
        .await;

    let response = drive_resolver(&server)
        .resolve("FILE3", "https://drive.google.com/file/d/FILE3/view")
        .await
        .unwrap();
    assert_eq!(response.bytes().await.unwrap().as_ref(), ZIP_BYTES);
}

// ==================== Drive: form reconstruction ====================

#[tokio::test]
async fn test_drive_download_form_reconstructed() {
    let server = MockServer::start().await;
    let action = format!("{}/fetch?export=download", server.uri());
    // No downloadUrl, no confirm token: only the download form remains.
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", "FILE4"))
        .respond_with(html_response(&format!(
            r#"<html><form id="download-form" method="get" action="{action}"><input type="hidden" name="uuid" value="u-42"></form></html>"#
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fetch"))
        .and(query_param("id", "FILE4"))
        .and(query_param("uuid", "u-42"))
        .and(query_param("export", "download"))
        .respond_with(zip_response())
        .mount(&server)
        .await;

    let response = drive_resolver(&server)
        .resolve("FILE4", "https://drive.google.com/file/d/FILE4/view")
        .await
        .unwrap();
    assert_eq!(response.bytes().await.unwrap().as_ref(), ZIP_BYTES);
}

// ==================== Drive: terminal failures ====================

#[tokio::test]
async fn test_drive_signin_wall_is_auth_required() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .respond_with(html_response(
            r#"<html><a href="https://accounts.google.com/ServiceLogin">Sign in</a></html>"#,
        ))
        .mount(&server)
        .await;

    let err = drive_resolver(&server)
        .resolve("FILE5", "https://drive.google.com/file/d/FILE5/view")
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::AuthRequired { .. }), "got: {err}");
}

#[tokio::test]
async fn test_drive_opaque_html_is_permission_denied_with_capture() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .respond_with(html_response(
            "<html><head><title>Sorry, you can't view this file</title></head></html>",
        ))
        .mount(&server)
        .await;

    let capture_dir = TempDir::new().unwrap();
    let resolver = DriveResolver::new(build_http_client(), Some(capture_dir.path().to_path_buf()))
        .with_endpoint(format!("{}/uc", server.uri()));
    let err = resolver
        .resolve("FILE6", "https://drive.google.com/file/d/FILE6/view")
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(matches!(err, ResolveError::PermissionDenied { .. }), "got: {msg}");
    assert!(msg.contains("Sorry, you can't view this file"), "got: {msg}");
    let capture = capture_dir.path().join("gdrive_FILE6.html");
    assert!(capture.is_file(), "interstitial HTML should be persisted");
}

// ==================== Dropbox ====================

#[tokio::test]
async fn test_dropbox_html_without_disposition_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/abc/mod.zip"))
        .respond_with(html_response("<html>preview page</html>"))
        .mount(&server)
        .await;

    let client = build_http_client();
    let url = format!("{}/s/abc/mod.zip", server.uri());
    let err = dropbox::fetch(&client, &url).await.unwrap_err();
    assert!(matches!(err, ResolveError::PermissionDenied { .. }), "got: {err}");
}

#[tokio::test]
async fn test_dropbox_file_bytes_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/abc/mod.zip"))
        .respond_with(zip_response())
        .mount(&server)
        .await;

    let client = build_http_client();
    let url = format!("{}/s/abc/mod.zip", server.uri());
    let response = dropbox::fetch(&client, &url).await.unwrap();
    assert_eq!(response.bytes().await.unwrap().as_ref(), ZIP_BYTES);
}

// ==================== Yandex Disk ====================

#[tokio::test]
async fn test_disk_href_exchange_with_subpath() {
    let server = MockServer::start().await;
    let href = format!("{}/content/core.zip", server.uri());
    Mock::given(method("GET"))
        .and(path("/download"))
        .and(query_param("public_key", "https://disk.yandex.ru/d/AbCd"))
        .and(query_param("path", "/mods/core.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "href": href,
            "method": "GET",
            "templated": false,
        })))
        .mount(&server)
        .await;

    let resolver = DiskResolver::new(build_http_client())
        .with_endpoint(format!("{}/download", server.uri()));
    let resolved = resolver
        .resolve("https://disk.yandex.ru/d/AbCd", Some("mods/core.zip"))
        .await
        .unwrap();
    assert_eq!(resolved, href);
}

#[tokio::test]
async fn test_disk_missing_href_is_permission_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let resolver = DiskResolver::new(build_http_client())
        .with_endpoint(format!("{}/download", server.uri()));
    let err = resolver
        .resolve("https://disk.yandex.ru/d/AbCd", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::PermissionDenied { .. }), "got: {err}");
}

#[tokio::test]
async fn test_disk_error_status_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let resolver = DiskResolver::new(build_http_client())
        .with_endpoint(format!("{}/download", server.uri()));
    let err = resolver
        .resolve("https://disk.yandex.ru/d/Gone", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::HttpStatus { status: 404, .. }), "got: {err}");
}

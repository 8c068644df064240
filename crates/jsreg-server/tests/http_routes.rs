//! Integration tests for the HTTP surface.
//!
//! Each test binds the router to an ephemeral port and talks to it with reqwest.

use flate2::write::GzEncoder;
use flate2::Compression;
use jsreg_core::{EngineConfig, MemoryStore, Registry, TransformEngine, VersionRecord};
use jsreg_server::{router, AppState, ServerConfig};
use reqwest::{header, StatusCode};
use serde_json::Value;
use std::io::Write;
use tokio::net::TcpListener;

fn tgz(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut tar_bytes = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut tar_bytes);
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(path).unwrap();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, *contents).unwrap();
        }
        builder.finish().unwrap();
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).unwrap();
    encoder.finish().unwrap()
}

fn left_pad_blob() -> Vec<u8> {
    tgz(&[
        ("package/index.js", b"export default function leftPad(s) { return s; }\n"),
        (
            "package/lib/main.js",
            b"import { pad } from './util.js';\nimport logo from '../logo.svg';\nexport const out = pad(logo);\n",
        ),
        ("package/lib/util.js", b"export const pad = (s) => ' ' + s;\n"),
        ("package/logo.svg", b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
        ("package/README.md", b"# left-pad\n"),
    ])
}

fn store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store
        .publish(
            "left-pad",
            VersionRecord::new("1.0.0", "index.js", "left-pad-1.0.0.tgz"),
            left_pad_blob(),
        )
        .unwrap()
        .publish(
            "right-pad",
            VersionRecord::new("0.1.0", "index.js", "right-pad-0.1.0.tgz"),
            tgz(&[("index.js", b"export const right = 1;\n")]),
        )
        .unwrap();
    store
}

/// Serve `registry` on an ephemeral port and return its base URL.
async fn spawn(registry: Registry, config: ServerConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(registry, config));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_default() -> String {
    let config = ServerConfig::default();
    let registry = Registry::new(
        Box::new(store()),
        TransformEngine::new(EngineConfig::default()),
    );
    spawn(registry, config).await
}

async fn get_text(url: &str) -> (StatusCode, String) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn test_index_module() {
    let base = spawn_default().await;
    let response = reqwest::get(format!("{base}/left-pad@1.0.0")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/javascript"), "{content_type}");

    let body = response.text().await.unwrap();
    assert!(body.starts_with("/* left-pad@1.0.0 */\n"), "{body}");
    assert!(body.contains("export * from \"/v1/left-pad/1.0.0/es2022/index.js\";"));
    assert!(body.contains("export { default } from \"/v1/left-pad/1.0.0/es2022/index.js\";"));
}

#[tokio::test]
async fn test_index_without_version_uses_latest() {
    let base = spawn_default().await;
    let (status, body) = get_text(&format!("{base}/right-pad")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("/v1/right-pad/0.1.0/es2022/index.js"), "{body}");
    assert!(!body.contains("default"));
}

#[tokio::test]
async fn test_invalid_name_is_json_400() {
    let base = spawn_default().await;
    let response = reqwest::get(format!("{base}/bad~name@1.0.0")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("bad~name"));
}

#[tokio::test]
async fn test_unknown_package_is_json_404() {
    let base = spawn_default().await;
    let response = reqwest::get(format!("{base}/no-such-package")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_file_module_rewrites_and_inlines() {
    let base = spawn_default().await;
    let (status, body) = get_text(&format!("{base}/v1/left-pad/1.0.0/es2019/lib/main.js")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("/* left-pad@1.0.0 (es2019) */\n"), "{body}");
    assert!(body.contains("/v1/left-pad/1.0.0/es2019/lib/util.js"), "{body}");
    assert!(body.contains("data:image/svg+xml;base64,"), "{body}");
    assert!(!body.contains("logo.svg"), "{body}");
}

#[tokio::test]
async fn test_file_module_unknown_target_is_error_module() {
    let base = spawn_default().await;
    let (status, body) = get_text(&format!("{base}/v1/left-pad/1.0.0/es1999/index.js")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("throw new Error("), "{body}");
    assert!(body.contains("es1999"));
}

#[tokio::test]
async fn test_file_module_missing_path_is_error_module() {
    let base = spawn_default().await;
    let (status, body) = get_text(&format!("{base}/v1/left-pad/1.0.0/es2019/nope.js")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("throw new Error("), "{body}");
    assert!(body.contains("nope.js"));
}

#[tokio::test]
async fn test_asset_request_is_data_url_module() {
    let base = spawn_default().await;
    let (status, body) = get_text(&format!("{base}/v1/left-pad/1.0.0/es2019/logo.svg")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("export default \"data:image/svg+xml;base64,"), "{body}");
}

#[tokio::test]
async fn test_wrong_segment_is_404() {
    let base = spawn_default().await;
    let response = reqwest::get(format!("{base}/v9/left-pad/1.0.0/es2019/index.js"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metadata_via_accept_and_query() {
    let base = spawn_default().await;
    let client = reqwest::Client::new();

    let package: Value = client
        .get(format!("{base}/left-pad"))
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(package["name"], "left-pad");
    assert!(package["versions"]["1.0.0"].is_object());

    let version: Value = reqwest::get(format!("{base}/left-pad@1.0.0?meta"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(version["version"], "1.0.0");
    assert!(version["dist"]["integrity"].as_str().unwrap().starts_with("MD5_"));
}

#[tokio::test]
async fn test_tarball_download() {
    let base = spawn_default().await;
    let response = reqwest::get(format!("{base}/left-pad/_/1.0.0/left-pad.tgz"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("left-pad-1.0.0.tgz"), "{disposition}");
    assert_eq!(response.bytes().await.unwrap().as_ref(), left_pad_blob().as_slice());

    let latest = reqwest::get(format!("{base}/left-pad/_/left-pad.tgz")).await.unwrap();
    assert_eq!(latest.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_source_passthrough() {
    let base = spawn_default().await;
    let response = reqwest::get(format!("{base}/source/left-pad/1.0.0/README.md"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "# left-pad\n");

    let missing = reqwest::get(format!("{base}/source/left-pad/1.0.0/nope.md"))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_packages_listing() {
    let base = spawn_default().await;
    let list: Value = reqwest::get(format!("{base}/packages?page=1&perPage=1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(list["totalItems"], 2);
    assert_eq!(list["totalPages"], 2);
    assert_eq!(list["perPage"], 1);
    assert_eq!(list["packages"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_root_redirects_to_docs() {
    let base = spawn_default().await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let response = client.get(format!("{base}/")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        jsreg_server::config::DEFAULT_DOCS_URL
    );
}

#[tokio::test]
async fn test_serves_from_data_directory() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp
        .path()
        .join(jsreg_core::encode_name("left-pad").unwrap().as_str());
    std::fs::create_dir_all(&dir).unwrap();
    let records = vec![VersionRecord::new("1.0.0", "index.js", "left-pad-1.0.0.tgz")];
    std::fs::write(
        dir.join(jsreg_server::fs_store::VERSIONS_FILE),
        serde_json::to_vec(&records).unwrap(),
    )
    .unwrap();
    std::fs::write(dir.join("left-pad-1.0.0.tgz"), left_pad_blob()).unwrap();

    let config = ServerConfig {
        data_dir: temp.path().to_path_buf(),
        ..ServerConfig::default()
    };
    let registry = jsreg_server::build_registry(&config);
    let base = spawn(registry, config).await;

    let (status, body) = get_text(&format!("{base}/left-pad")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("export { default } from \"/v1/left-pad/1.0.0/es2022/index.js\";"));
}

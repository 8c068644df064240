//! HTTP routes.
//!
//! | Route                                        | Serves                          |
//! |----------------------------------------------|---------------------------------|
//! | `/`                                          | redirect to docs                |
//! | `/packages`                                  | paged package listing           |
//! | `/maintainers/<pkg>`                         | maintainer ids                  |
//! | `/dependencies/<pkg>`                        | dependency tarball URLs         |
//! | `/source/<pkg>/<ver>/<path>`                 | raw file bytes                  |
//! | `/<pkg>[@<ver>]`                             | index shim, or metadata as JSON |
//! | `/<pkg>/_/[<ver>/]<archive>`                 | archive download                |
//! | `/<segment>/<pkg>/<ver>/<target>/<path>`     | transformed module              |

use crate::config::ServerConfig;
use crate::response::{self, content_type_for, javascript};
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use jsreg_core::{Registry, RegistryError, Specifier};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(registry: Registry, config: ServerConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/packages", get(list_packages))
        .route("/maintainers/:name", get(maintainers))
        .route("/dependencies/:name", get(dependencies))
        .route("/source/:name/:version/*path", get(source))
        .route("/:first", get(index))
        .route("/:first/_/*rest", get(tarball))
        .route("/:first/:name/:version/:target/*path", get(file))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run registry work off the async runtime; archive decoding and transforms
/// are CPU-bound.
async fn blocking<T, F>(f: F) -> Result<T, RegistryError>
where
    F: FnOnce() -> Result<T, RegistryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| Err(RegistryError::store(format!("worker task failed: {e}"))))
}

fn wants_metadata(headers: &HeaderMap, query: Option<&str>) -> bool {
    let meta_query = query.is_some_and(|q| {
        q.split('&')
            .any(|pair| pair == "meta" || pair.starts_with("meta="))
    });
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json") && !accept.contains("javascript"));
    meta_query || accepts_json
}

async fn root(State(state): State<AppState>) -> Response {
    match HeaderValue::from_str(&state.config.docs_url) {
        Ok(location) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response(),
        Err(_) => response::error_with(StatusCode::NOT_FOUND, "no docs URL configured"),
    }
}

async fn not_found() -> Response {
    response::error_with(StatusCode::NOT_FOUND, "route not found")
}

async fn index(
    State(state): State<AppState>,
    Path(first): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let registry = Arc::clone(&state.registry);

    if wants_metadata(&headers, query.as_deref()) {
        let result = blocking(move || {
            let spec = Specifier::parse(&first);
            match spec.version {
                Some(version) => {
                    serde_json::to_value(registry.version_metadata(&spec.name, &version)?)
                }
                None => serde_json::to_value(registry.package_metadata(&spec.name)?),
            }
            .map_err(RegistryError::from)
        })
        .await;

        return match result {
            Ok(value) => Json(value).into_response(),
            Err(err) => response::error(&err),
        };
    }

    match blocking(move || registry.index_module(&first)).await {
        Ok(module) => javascript(module),
        Err(err) => response::error(&err),
    }
}

async fn tarball(
    State(state): State<AppState>,
    Path((name, rest)): Path<(String, String)>,
) -> Response {
    let segments: Vec<String> = rest
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    let version = match segments.as_slice() {
        [_archive] => None,
        [version, _archive] => Some(version.clone()),
        _ => return not_found().await,
    };

    let registry = Arc::clone(&state.registry);
    match blocking(move || registry.tarball(&name, version.as_deref())).await {
        Ok(tarball) => {
            let disposition = format!("attachment; filename=\"{}\"", tarball.file_name);
            let mut response = Bytes::from(tarball.bytes).into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/gzip"));
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
            response
        }
        Err(err) => response::error(&err),
    }
}

async fn file(
    State(state): State<AppState>,
    Path((segment, name, version, target, path)): Path<(String, String, String, String, String)>,
) -> Response {
    if segment != state.config.segment {
        debug!(%segment, expected = %state.config.segment, "unknown module segment");
        return not_found().await;
    }

    let registry = Arc::clone(&state.registry);
    let path = path.trim_start_matches('/').to_string();
    match blocking(move || registry.file_module(&name, &version, &target, &path)).await {
        Ok(module) => javascript(module),
        Err(err) => response::error(&err),
    }
}

async fn source(
    State(state): State<AppState>,
    Path((name, version, path)): Path<(String, String, String)>,
) -> Response {
    let registry = Arc::clone(&state.registry);
    let path = path.trim_start_matches('/').to_string();
    let content_type = content_type_for(&path);

    match blocking(move || registry.source_file(&name, &version, &path)).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static(content_type))],
            Bytes::from(bytes),
        )
            .into_response(),
        Err(err) => response::error(&err),
    }
}

async fn maintainers(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let registry = Arc::clone(&state.registry);
    match blocking(move || registry.maintainers(&name)).await {
        Ok(list) => Json(list).into_response(),
        Err(err) => response::error(&err),
    }
}

async fn dependencies(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let registry = Arc::clone(&state.registry);
    match blocking(move || registry.dependencies(&name)).await {
        Ok(deps) => Json(deps).into_response(),
        Err(err) => response::error(&err),
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<usize>,
    #[serde(rename = "perPage")]
    per_page: Option<usize>,
}

async fn list_packages(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let registry = Arc::clone(&state.registry);
    match blocking(move || registry.packages(query.page, query.per_page)).await {
        Ok(list) => Json(list).into_response(),
        Err(err) => response::error(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_metadata() {
        let mut headers = HeaderMap::new();
        assert!(!wants_metadata(&headers, None));
        assert!(wants_metadata(&headers, Some("meta")));
        assert!(wants_metadata(&headers, Some("x=1&meta=true")));
        assert!(!wants_metadata(&headers, Some("metadata")));

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(wants_metadata(&headers, None));

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/javascript, application/json"),
        );
        assert!(!wants_metadata(&headers, None));
    }
}

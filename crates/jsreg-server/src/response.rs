//! Response envelopes and helpers.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsreg_core::RegistryError;
use serde::{Deserialize, Serialize};

pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";

/// JSON error envelope for failures raised before any module text exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: String,
}

/// HTTP status for a registry error.
#[must_use]
pub fn status_for(err: &RegistryError) -> StatusCode {
    match err {
        RegistryError::InvalidName { .. } | RegistryError::UnsupportedTarget(_) => StatusCode::BAD_REQUEST,
        RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::LocalOnly { .. } => StatusCode::FORBIDDEN,
        RegistryError::Archive(_) | RegistryError::Transform(_) | RegistryError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Render `err` as a `{status, error}` JSON response.
#[must_use]
pub fn error(err: &RegistryError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        tracing::error!(code = err.code(), error = %err, "request failed");
    } else {
        tracing::debug!(code = err.code(), error = %err, "request rejected");
    }
    error_with(status, err.to_string())
}

#[must_use]
pub fn error_with(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            status: status.as_u16(),
            error: message.into(),
        }),
    )
        .into_response()
}

/// An ESM module body. Always 200, including error modules.
#[must_use]
pub fn javascript(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static(JAVASCRIPT))],
        body,
    )
        .into_response()
}

/// Content type for raw file passthrough, by extension.
#[must_use]
pub fn content_type_for(path: &str) -> &'static str {
    if let Some(asset) = jsreg_core::transform::InlineAsset::from_path(path) {
        return asset.mime();
    }
    let ext = path.rsplit_once('.').map_or("", |(_, ext)| ext);
    match ext.to_lowercase().as_str() {
        "js" | "mjs" | "cjs" => JAVASCRIPT,
        "json" | "map" => "application/json",
        "css" => "text/css; charset=utf-8",
        "html" | "htm" => "text/html; charset=utf-8",
        "md" | "txt" | "ts" | "mts" | "cts" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&RegistryError::invalid_name(".x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&RegistryError::package_not_found("x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&RegistryError::archive("truncated")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&RegistryError::LocalOnly { name: "x".into() }),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("index.js"), JAVASCRIPT);
        assert_eq!(content_type_for("package.json"), "application/json");
        assert_eq!(content_type_for("logo.svg"), "image/svg+xml");
        assert_eq!(content_type_for("LICENSE"), "application/octet-stream");
    }
}

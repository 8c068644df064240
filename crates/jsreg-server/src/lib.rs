//! jsreg HTTP server.
//!
//! Wires a [`FsStore`] and a [`jsreg_core::Registry`] behind an axum router.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod fs_store;
pub mod logging;
pub mod response;
pub mod routes;

pub use config::{ServerArgs, ServerConfig};
pub use fs_store::FsStore;
pub use routes::{router, AppState};

use jsreg_core::{Registry, TransformEngine};
use miette::{IntoDiagnostic, Result};
use tokio::net::TcpListener;
use tracing::info;

/// Registry over the configured data directory.
#[must_use]
pub fn build_registry(config: &ServerConfig) -> Registry {
    let store = FsStore::new(&config.data_dir);
    Registry::new(Box::new(store), TransformEngine::new(config.engine_config()))
        .with_public_url(config.public_url.trim_end_matches('/'))
}

/// Bind and serve until ctrl-c.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let addr = config.addr().into_diagnostic()?;
    let registry = build_registry(&config);

    info!(
        %addr,
        data_dir = %config.data_dir.display(),
        segment = %config.segment,
        default_target = %config.default_target,
        "starting registry server"
    );

    let app = router(AppState::new(registry, config));
    let listener = TcpListener::bind(addr).await.into_diagnostic()?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

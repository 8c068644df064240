//! Server configuration.
//!
//! Every option can come from a flag or a `JSREG_*` environment variable.
//! The parsed [`ServerArgs`] are frozen into a [`ServerConfig`] at startup.

use clap::Args;
use jsreg_core::{EngineConfig, EsTarget};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8090;
pub const DEFAULT_DOCS_URL: &str = "https://jsreg.dev/docs/registry";

/// Command-line and environment options for `jsreg serve`.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Directory holding one subdirectory per package
    #[arg(long, env = "JSREG_DATA_DIR", value_name = "PATH", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Address to bind
    #[arg(long, env = "JSREG_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "JSREG_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Leading path segment of every module URL
    #[arg(long, env = "JSREG_SEGMENT", default_value = jsreg_core::transform::DEFAULT_SEGMENT)]
    pub segment: String,

    /// Language level index shims point at
    #[arg(long, env = "JSREG_DEFAULT_TARGET", default_value = "es2022")]
    pub default_target: EsTarget,

    /// Base URL for tarball links in metadata (host-relative when empty)
    #[arg(long, env = "JSREG_PUBLIC_URL", default_value = "")]
    pub public_url: String,

    /// Where `GET /` redirects
    #[arg(long, env = "JSREG_DOCS_URL", default_value = DEFAULT_DOCS_URL)]
    pub docs_url: String,
}

impl ServerArgs {
    #[must_use]
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            data_dir: self.data_dir,
            host: self.host,
            port: self.port,
            segment: self.segment.trim_matches('/').to_string(),
            default_target: self.default_target,
            public_url: self.public_url,
            docs_url: self.docs_url,
        }
    }
}

/// Resolved server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub segment: String,
    pub default_target: EsTarget,
    pub public_url: String,
    pub docs_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            segment: jsreg_core::transform::DEFAULT_SEGMENT.to_string(),
            default_target: EsTarget::default(),
            public_url: String::new(),
            docs_url: DEFAULT_DOCS_URL.to_string(),
        }
    }
}

impl ServerConfig {
    /// Engine settings derived from this config.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            segment: self.segment.clone(),
            default_target: self.default_target,
        }
    }

    /// Socket address to bind.
    ///
    /// # Errors
    /// Returns an error if `host` is not an IP address.
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

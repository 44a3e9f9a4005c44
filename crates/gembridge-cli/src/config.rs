//! Command-line and environment configuration.
//!
//! Every flag can also be set through a `GEMBRIDGE_*` environment variable,
//! including from a `.env` file loaded before parsing.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;

use gembridge_proxy::{ProxyConfig, UnknownRolePolicy};
use gembridge_runtime::{BackendConfig, BackendKind, VertexTarget};

/// OpenAI-compatible chat completion gateway.
#[derive(Debug, Parser)]
#[command(name = "gembridge")]
#[command(about = "Serve an OpenAI-compatible chat API backed by another chat model")]
#[command(version)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "GEMBRIDGE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "GEMBRIDGE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Backend adapter (gemini or openai)
    #[arg(long, env = "GEMBRIDGE_BACKEND", default_value = "gemini")]
    pub backend: BackendKind,

    /// Backend base URL; defaults to the adapter's public endpoint
    #[arg(long = "backend-url", env = "GEMBRIDGE_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Backend API key
    #[arg(long = "api-key", env = "GEMBRIDGE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// OAuth access token for the gemini backend (e.g. from
    /// `gcloud auth print-access-token`); used instead of the API key
    #[arg(long = "access-token", env = "GEMBRIDGE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Serve Gemini through this Vertex AI project instead of the public API
    #[arg(long = "vertex-project", env = "GEMBRIDGE_VERTEX_PROJECT")]
    pub vertex_project: Option<String>,

    /// Vertex AI region
    #[arg(
        long = "vertex-location",
        env = "GEMBRIDGE_VERTEX_LOCATION",
        default_value = "us-central1"
    )]
    pub vertex_location: String,

    /// Whole-request timeout for backend calls, in seconds
    #[arg(long = "timeout-secs", env = "GEMBRIDGE_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// What to do with messages whose role is not system/user/assistant (reject or drop)
    #[arg(long = "unknown-role", env = "GEMBRIDGE_UNKNOWN_ROLE", default_value = "reject")]
    pub unknown_role: UnknownRolePolicy,
}

impl Cli {
    /// Socket address to bind.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .with_context(|| format!("Invalid listen address '{addr}'"))
    }

    /// Backend adapter settings.
    ///
    /// Fails when the selected backend needs credentials and none were given.
    pub fn backend_config(&self) -> anyhow::Result<BackendConfig> {
        let api_key = non_blank(self.api_key.as_deref());
        let access_token = non_blank(self.access_token.as_deref());
        let vertex = match (self.backend, non_blank(self.vertex_project.as_deref())) {
            (BackendKind::Gemini, Some(project)) => {
                Some(VertexTarget::new(project, self.vertex_location.trim()))
            }
            (BackendKind::OpenAi, Some(_)) => {
                bail!("--vertex-project only applies to the gemini backend")
            }
            (_, None) => None,
        };

        if self.backend == BackendKind::Gemini {
            if vertex.is_some() && access_token.is_none() {
                bail!(
                    "Vertex AI requires an access token (--access-token or GEMBRIDGE_ACCESS_TOKEN)"
                );
            }
            if api_key.is_none() && access_token.is_none() {
                bail!(
                    "The gemini backend requires an API key (--api-key or GEMBRIDGE_API_KEY) \
                     or an access token (--access-token or GEMBRIDGE_ACCESS_TOKEN)"
                );
            }
        }

        let base_url = match (&self.backend_url, &vertex) {
            (Some(url), _) => url.clone(),
            (None, Some(target)) => target.default_base_url(),
            (None, None) => self.backend.default_base_url().to_string(),
        };

        let mut config = BackendConfig::new(base_url);
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        if let Some(token) = access_token {
            config = config.with_access_token(token);
        }
        if let Some(target) = vertex {
            config = config.with_vertex(target);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Request-handling settings for the gateway.
    pub const fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig {
            unknown_role: self.unknown_role,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

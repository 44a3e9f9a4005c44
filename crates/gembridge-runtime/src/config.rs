//! Public configuration for backend adapters.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default base URL for the Gemini backend.
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Default base URL for an OpenAI-compatible backend (local llama-server).
pub const DEFAULT_OPENAI_URL: &str = "http://127.0.0.1:8081";

/// Which backend protocol to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Google Generative Language API.
    #[default]
    Gemini,
    /// OpenAI-compatible chat completions API.
    OpenAi,
}

impl BackendKind {
    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    /// Base URL used when none is configured.
    #[must_use]
    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => DEFAULT_GEMINI_URL,
            Self::OpenAi => DEFAULT_OPENAI_URL,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!(
                "unknown backend '{other}' (expected 'gemini' or 'openai')"
            )),
        }
    }
}

/// Vertex AI deployment that serves Gemini models.
///
/// With a target set, the Gemini adapter addresses
/// `v1/projects/{project}/locations/{location}/publishers/google/models/...`
/// instead of the public `v1beta/models/...` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexTarget {
    /// Google Cloud project id.
    pub project: String,
    /// Region, e.g. `us-central1`.
    pub location: String,
}

impl VertexTarget {
    /// Create a target for `project` in `location`.
    #[must_use]
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
        }
    }

    /// Regional endpoint for this target.
    #[must_use]
    pub fn default_base_url(&self) -> String {
        format!("https://{}-aiplatform.googleapis.com", self.location)
    }
}

/// Connection settings shared by all backend adapters.
///
/// # Example
///
/// ```
/// use gembridge_runtime::BackendConfig;
/// use std::time::Duration;
///
/// let config = BackendConfig::new("https://generativelanguage.googleapis.com")
///     .with_api_key("secret")
///     .with_timeout(Duration::from_secs(60));
/// ```
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL of the model service, without a trailing path.
    pub(crate) base_url: String,
    /// Credential sent with every request.
    pub(crate) api_key: Option<String>,
    /// OAuth access token, sent as `Authorization: Bearer`. Takes precedence
    /// over `api_key`.
    pub(crate) access_token: Option<String>,
    /// Vertex AI deployment, when not using the public Gemini API.
    pub(crate) vertex: Option<VertexTarget>,
    /// Whole-request timeout. `None` relies on the service's own limits.
    pub(crate) timeout: Option<Duration>,
    /// User agent string for HTTP requests.
    pub(crate) user_agent: String,
}

impl BackendConfig {
    /// Create a configuration pointing at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            access_token: None,
            vertex: None,
            timeout: None,
            user_agent: concat!("gembridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the OAuth access token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Address a Vertex AI deployment.
    #[must_use]
    pub fn with_vertex(mut self, target: VertexTarget) -> Self {
        self.vertex = Some(target);
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Base URL with any trailing slash removed.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Whether an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Whether any credential (API key or access token) is configured.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.api_key.is_some() || self.access_token.is_some()
    }

    /// Vertex AI deployment, if any.
    #[must_use]
    pub const fn vertex(&self) -> Option<&VertexTarget> {
        self.vertex.as_ref()
    }
}

// Keeps credentials out of logs.
impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("vertex", &self.vertex)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

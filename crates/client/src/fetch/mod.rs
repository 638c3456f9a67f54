//! Network transport for the agent.
//!
//! ### Transport contract
//! - One request in, one whole response out (status, headers, body bytes).
//! - Non-2xx statuses are returned as responses, never as errors.
//! - Only failing to obtain a response yields a [`NetworkError`].
//!
//! ### Response classification
//! - Final URL same-origin as the agent: `basic`
//! - Cross-origin with `Access-Control-Allow-Origin`: `cors`
//! - Any other cross-origin response: `opaque`
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

pub mod error;
pub mod url;

use appshell_core::{Request, Response, ResponseType};
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, is_same_origin, resolve};
pub use error::NetworkError;

use ::url::Url;

/// Network transport: a fetch-style call.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Send a request and return the whole response.
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "appshell/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "appshell/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&appshell_core::AppConfig> for FetchConfig {
    fn from(config: &appshell_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Classify a response by where it finally came from.
pub fn classify_response_type(origin: &Url, final_url: &Url, headers: &[(String, String)]) -> ResponseType {
    if is_same_origin(origin, final_url) {
        return ResponseType::Basic;
    }
    let has_cors = headers
        .iter()
        .any(|(k, _)| k.eq_ignore_ascii_case(header::ACCESS_CONTROL_ALLOW_ORIGIN.as_str()));
    if has_cors { ResponseType::Cors } else { ResponseType::Opaque }
}

/// reqwest-backed transport.
pub struct HttpNetwork {
    http: Client,
    origin: Url,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a transport for the agent serving `origin`.
    pub fn new(origin: Url, config: FetchConfig) -> Result<Self, NetworkError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| NetworkError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, origin, config })
    }
}

#[async_trait::async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let start = Instant::now();
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;

        let response = self.http.request(method, request.url.clone()).send().await?;

        let status = response.status();
        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(NetworkError::TooLarge { size: len, limit: self.config.max_bytes });
        }

        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Body(e.to_string()))?;

        if body.len() > self.config.max_bytes {
            return Err(NetworkError::TooLarge { size: body.len() as u64, limit: self.config.max_bytes });
        }

        let response_type = classify_response_type(&self.origin, &final_url, &headers);

        tracing::debug!(
            url = %request.url,
            final_url = %final_url,
            status = status.as_u16(),
            response_type = %response_type,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "network fetch"
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            response_type,
            headers,
            body,
        })
    }
}

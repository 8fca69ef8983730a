//! Connection manager: holds one configured HTTP client and performs
//! single attempts of a network call.
//!
//! Retries live in [`crate::client::retry`]; this layer never re-attempts.
//! The underlying `reqwest` client pools connections across calls.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::outcome::RawResponse;
use crate::config::ClientConfig;
use crate::errors::MatchPipelineError;

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET request.
    Get,
    /// POST request.
    Post,
    /// PUT request.
    Put,
    /// DELETE request.
    Delete,
    /// PATCH request.
    Patch,
}

impl HttpMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
        }
    }
}

/// Owns the outbound connection configuration and performs one attempt
/// of a network call.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    http: reqwest::Client,
    base_url: reqwest::Url,
    config: ClientConfig,
}

impl ConnectionManager {
    /// Creates a manager from a validated configuration.
    ///
    /// Fails with [`MatchPipelineError::Config`] when the base URL is
    /// empty, malformed, or not http(s).
    pub fn new(config: ClientConfig) -> Result<Self, MatchPipelineError> {
        if config.base_url.trim().is_empty() {
            return Err(MatchPipelineError::Config(
                "base URL must not be empty".to_string(),
            ));
        }
        let base_url = reqwest::Url::parse(&config.base_url).map_err(|e| {
            MatchPipelineError::Config(format!("invalid base URL '{}': {e}", config.base_url))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(MatchPipelineError::Config(format!(
                "unsupported URL scheme '{}'",
                base_url.scheme()
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    /// The validated base URL.
    #[must_use]
    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    /// The configuration this manager was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolves a path relative to the base URL. An empty path means the
    /// base URL itself.
    fn request_url(&self, path: &str) -> Result<reqwest::Url, MatchPipelineError> {
        if path.is_empty() {
            return Ok(self.base_url.clone());
        }
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        base.join(path.trim_start_matches('/')).map_err(|e| {
            MatchPipelineError::Config(format!("invalid request path '{path}': {e}"))
        })
    }

    /// Performs exactly one attempt of a network call.
    ///
    /// Per-call headers are merged over the configured defaults. Errors
    /// map to [`MatchPipelineError::Timeout`] when the configured timeout
    /// elapsed and [`MatchPipelineError::Connection`] for DNS/TCP level
    /// failures.
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        headers: Option<&HashMap<String, String>>,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse, MatchPipelineError> {
        let url = self.request_url(path)?;

        let mut request = self.http.request(method.as_reqwest(), url.clone());
        for (key, value) in &self.config.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(extra) = headers {
            for (key, value) in extra {
                request = request.header(key.as_str(), value.as_str());
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(method = %method, url = %url, "Sending request");
        let response = request.send().await?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            method = %method,
            url = %url,
            status = status_code,
            bytes = body.len(),
            "Received response"
        );

        Ok(RawResponse {
            status_code,
            body,
            content_type,
        })
    }
}

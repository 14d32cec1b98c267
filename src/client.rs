use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::{Config, Credentials};
use crate::error::BridgeError;
use crate::readiness::{
    AppLauncher, Liveness, ReadinessPolicy, ReadinessProber, ReadinessState, SystemLauncher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        };
        f.write_str(name)
    }
}

/// Declared type of a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Markdown,
}

impl ContentKind {
    pub fn mime(self) -> &'static str {
        match self {
            ContentKind::Json => "application/json",
            ContentKind::Markdown => "text/markdown",
        }
    }
}

/// One fully resolved HTTP call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub bearer: String,
    pub content_kind: ContentKind,
    pub body: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Wire-level HTTP seam. Errors are connection-level failures only; any
/// response, whatever its status, is `Ok`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// `reqwest` transport for the companion app's loopback endpoint.
///
/// The app serves a self-signed certificate, so this client skips certificate
/// validation. It must only ever be pointed at the companion endpoint.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .context("Failed to build HTTP client for Obsidian")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
            Method::Patch => self.client.patch(&request.url),
        };

        let mut builder = builder
            .bearer_auth(&request.bearer)
            .header(reqwest::header::CONTENT_TYPE, request.content_kind.mime())
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(request.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("{} {} failed", request.method, request.url))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("Failed to read Obsidian response body")?;

        Ok(HttpResponse { status, body })
    }
}

/// Authenticated client for the companion app's REST API.
///
/// Built once at startup and shared by every tool; the only state it holds is
/// read-only configuration.
pub struct RestClient {
    credentials: Option<Credentials>,
    transport: Arc<dyn Transport>,
    prober: ReadinessProber,
    request_timeout: Duration,
}

impl RestClient {
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        launcher: Arc<dyn AppLauncher>,
    ) -> Self {
        let policy = ReadinessPolicy::from(&config.readiness);
        Self {
            credentials: config.credentials(),
            transport,
            prober: ReadinessProber::new(policy, launcher),
            request_timeout: config.http.request_timeout(),
        }
    }

    /// Client wired to the real network and OS.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        let launcher = Arc::new(SystemLauncher::new(&config.obsidian));
        Ok(Self::new(config, transport, launcher))
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Send an authenticated request and return the response body.
    ///
    /// Fails fast without any I/O when no credentials are configured. The
    /// readiness probe runs first on every call; an unreachable app does not
    /// stop the request from being attempted.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        content_kind: ContentKind,
    ) -> Result<String, BridgeError> {
        let credentials = self.credentials.as_ref().ok_or(BridgeError::Configuration)?;

        let readiness = self.prober.ensure_ready(self).await;

        let url = join_url(&credentials.base_url, path);
        log::debug!("{} {}", method, url);

        let request = HttpRequest {
            method,
            url,
            bearer: credentials.api_key.clone(),
            content_kind,
            body,
            timeout: self.request_timeout,
        };

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) if readiness == ReadinessState::Unreachable => {
                return Err(BridgeError::Unreachable {
                    attempts: self.prober.policy().max_attempts,
                    message: format!("{:#}", e),
                });
            }
            Err(e) => return Err(BridgeError::Transport(format!("{:#}", e))),
        };

        match response.status {
            401 => Err(BridgeError::Unauthorized),
            404 => Err(BridgeError::NotFound),
            204 => Ok(String::new()),
            200..=299 => Ok(response.body),
            status => Err(BridgeError::remote(status, response.body)),
        }
    }

    pub async fn get(&self, path: &str) -> Result<String, BridgeError> {
        self.request(Method::Get, path, None, ContentKind::Json).await
    }
}

#[async_trait::async_trait]
impl Liveness for RestClient {
    async fn is_alive(&self, timeout: Duration) -> bool {
        let Some(credentials) = self.credentials.as_ref() else {
            return false;
        };
        let probe = HttpRequest {
            method: Method::Get,
            url: join_url(&credentials.base_url, "/"),
            bearer: credentials.api_key.clone(),
            content_kind: ContentKind::Json,
            body: None,
            timeout,
        };
        match self.transport.send(probe).await {
            Ok(response) => (200..300).contains(&response.status),
            Err(e) => {
                log::debug!("Liveness probe failed: {:#}", e);
                false
            }
        }
    }
}

/// Join an API path onto the base endpoint without doubling separators.
fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

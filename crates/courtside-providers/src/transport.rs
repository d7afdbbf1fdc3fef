//! HTTP transport seam.
//!
//! The provider code never talks to `reqwest` directly. It builds
//! [`HttpRequest`]s and hands them to an [`HttpTransport`], which performs
//! exactly one round-trip: no redirect following and no cookie store. Both
//! are handled explicitly by the session layer so that cookies from every
//! redirect hop can be accumulated.

use reqwest::{Client, Method as ReqwestMethod, StatusCode};
use tracing::trace;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;

/// HTTP methods used by the booking sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A single outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Request body, sent exactly as given.
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// A POST whose body is an already-encoded form payload.
    pub fn post_form(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![(
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded; charset=UTF-8".to_string(),
            )],
            body: Some(body.into()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received response with its body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// All headers in arrival order; repeated names (`Set-Cookie`) are kept.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every `Set-Cookie` header value.
    pub fn set_cookies(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }
}

/// Performs single HTTP round-trips.
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, ProviderResult<HttpResponse>>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, ProviderResult<HttpResponse>> {
        Box::pin(async move {
            let method = match request.method {
                Method::Get => ReqwestMethod::GET,
                Method::Post => ReqwestMethod::POST,
            };

            let mut builder = self.client.request(method, &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            trace!(method = request.method.as_str(), url = %request.url, "Sending request");

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout").with_source(e)
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e)).with_source(e)
                } else {
                    ProviderError::network(format!("request failed: {}", e)).with_source(e)
                }
            })?;

            let status = response.status();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();

            let body = response
                .text()
                .await
                .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

            trace!(status = %status, bytes = body.len(), "Received response");

            Ok(HttpResponse {
                status: status.as_u16(),
                headers,
                body,
            })
        })
    }
}

/// Maps transport-level statuses onto error codes.
///
/// 2xx and 3xx pass through; 429 and 5xx become retryable errors; anything
/// else is an invalid response.
pub fn check_status(response: HttpResponse) -> ProviderResult<HttpResponse> {
    let status = StatusCode::from_u16(response.status)
        .map_err(|_| ProviderError::invalid_response(format!("bad status {}", response.status)))?;

    match status {
        s if s.is_success() || s.is_redirection() => Ok(response),
        StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::rate_limited(
            "too many requests to the reservation site",
        )),
        s if s.is_server_error() => Err(ProviderError::server(format!(
            "server error ({})",
            s
        ))),
        s => Err(ProviderError::invalid_response(format!(
            "unexpected status {}",
            s
        ))),
    }
}

/// URL-encodes form pairs into an `a=1&b=2` body.
pub fn form_body<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k.as_ref()),
                urlencoding::encode(v.as_ref())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Resolves a `Location` value against the URL that produced it.
pub fn resolve_location(current: &str, location: &str) -> ProviderResult<String> {
    let base = url::Url::parse(current)
        .map_err(|e| ProviderError::internal(format!("invalid request URL {}: {}", current, e)))?;
    base.join(location)
        .map(|u| u.to_string())
        .map_err(|e| ProviderError::invalid_response(format!("invalid redirect {}: {}", location, e)))
}

//! HTTP transport for the farmOS client.
//!
//! Requests and responses are plain data. [`FarmOsClient`](super::FarmOsClient)
//! builds an [`HttpRequest`], hands it to a [`Transport`], and inspects the
//! returned [`HttpResponse`]. Production code uses [`ReqwestTransport`];
//! tests substitute an in-memory fake.
//!
//! Any HTTP response, including 4xx and 5xx, is `Ok`. `Err` means there was
//! no response at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderValue, COOKIE, LOCATION, SET_COOKIE};
use reqwest::Url;

use super::error::TransportError;

/// Maximum number of redirects followed for a single request.
pub const MAX_REDIRECTS: usize = 5;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// How redirects are followed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// RFC-compliant: keep the method and body on 301, 302, 307 and 308.
    /// Only 303 switches to GET.
    #[default]
    Strict,
    /// Browser behavior: a POST answered with 301, 302 or 303 becomes a GET.
    Lenient,
    /// Return the redirect response as-is.
    None,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Full URL once prepared by the session, a bare path before that.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Cookie jar read before and written after every hop.
    pub cookies: Option<Arc<Jar>>,
    /// `None` lets the session pick its default.
    pub redirect: Option<RedirectPolicy>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            cookies: None,
            redirect: None,
        }
    }

    /// A POST with a `application/x-www-form-urlencoded` body.
    pub fn post_form(url: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![(
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            )],
            body: Some(body),
            cookies: None,
            redirect: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_redirect(mut self, policy: RedirectPolicy) -> Self {
        self.redirect = Some(policy);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
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

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Executes a single request/response exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

/// [`Transport`] backed by `reqwest`.
///
/// Redirects are followed here rather than by reqwest, so the strict policy
/// can resend a POST body and the cookie jar sees every hop.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = Url::parse(&request.url).map_err(|e| TransportError::InvalidUrl {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(jar) = &request.cookies {
            if request.header(COOKIE.as_str()).is_none() {
                if let Some(value) = jar.cookies(&url) {
                    builder = builder.header(COOKIE, value);
                }
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| TransportError::Request {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        if let Some(jar) = &request.cookies {
            let mut set_cookies = response.headers().get_all(SET_COOKIE).iter();
            jar.set_cookies(&mut set_cookies, &url);
        }

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| header_pair(name.as_str(), value))
            .collect();
        let body = response.text().await.map_err(|e| TransportError::Request {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn header_pair(name: &str, value: &HeaderValue) -> Option<(String, String)> {
    value
        .to_str()
        .ok()
        .map(|v| (name.to_string(), v.to_string()))
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let policy = request.redirect.unwrap_or_default();
        let origin = request.url.clone();
        let mut current = request;
        let mut hops = 0;

        loop {
            let response = self.execute(&current).await?;

            if policy == RedirectPolicy::None || !is_redirect(response.status) {
                return Ok(response);
            }
            let Some(location) = response.header(LOCATION.as_str()) else {
                return Ok(response);
            };
            if hops == MAX_REDIRECTS {
                return Err(TransportError::TooManyRedirects {
                    url: origin,
                    limit: MAX_REDIRECTS,
                });
            }

            let next = Url::parse(&current.url)
                .and_then(|base| base.join(location))
                .map_err(|e| TransportError::InvalidUrl {
                    url: location.to_string(),
                    reason: e.to_string(),
                })?;

            tracing::debug!(status = response.status, to = %next, "following redirect");
            current = redirected(current, response.status, next.to_string(), policy);
            hops += 1;
        }
    }
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Builds the follow-up request for a redirect hop.
fn redirected(
    mut request: HttpRequest,
    status: u16,
    url: String,
    policy: RedirectPolicy,
) -> HttpRequest {
    request.url = url;

    let switch_to_get = match policy {
        RedirectPolicy::Strict => status == 303,
        RedirectPolicy::Lenient => {
            status == 303 || (request.method == HttpMethod::Post && matches!(status, 301 | 302))
        }
        RedirectPolicy::None => false,
    };

    if switch_to_get {
        request.method = HttpMethod::Get;
        request.body = None;
        request
            .headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case("content-type"));
    }

    request
}

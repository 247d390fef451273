//! Scripted in-memory transport for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use reqwest::Url;

use super::error::TransportError;
use super::transport::{HttpRequest, HttpResponse, Transport};

/// Replays queued responses in order and records every request.
///
/// Once the queue is empty every request gets a 404. `Set-Cookie` headers on
/// a response are stored in the request's jar, as a real transport would.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.push(Ok(HttpResponse::new(status, body)))
    }

    pub fn respond_json(self, body: serde_json::Value) -> Self {
        self.push(Ok(HttpResponse::new(200, body.to_string())))
    }

    pub fn push(self, response: Result<HttpResponse, TransportError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Appends everything queued on `other`.
    pub fn push_all(self, other: FakeTransport) -> Self {
        let queued = other.responses.into_inner().unwrap();
        self.responses.lock().unwrap().extend(queued);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(404, "")));

        if let (Ok(resp), Some(jar), Ok(url)) = (
            &response,
            &request.cookies,
            Url::parse(&request.url),
        ) {
            let values: Vec<HeaderValue> = resp
                .headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
                .filter_map(|(_, v)| HeaderValue::from_str(v).ok())
                .collect();
            jar.set_cookies(&mut values.iter(), &url);
        }

        self.requests.lock().unwrap().push(request);
        response
    }
}

//! Error types for the farmOS client.

/// Failure to get any HTTP response at all.
///
/// Error responses (4xx, 5xx) are not transport errors: they come back as
/// ordinary [`HttpResponse`](super::HttpResponse) values so callers can
/// branch on the status code.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request URL could not be parsed.
    #[error("invalid request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection, timeout or body read failure.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// Redirect chain exceeded the limit.
    #[error("too many redirects starting at {url} (limit {limit})")]
    TooManyRedirects { url: String, limit: usize },

    /// The HTTP client itself could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Errors returned by [`FarmOsClient::authenticate`](super::FarmOsClient::authenticate).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Hostname, username or password is empty. No request was sent.
    #[error("farmOS hostname, username and password are all required")]
    MissingCredentials,

    /// The login form POST did not return 200.
    #[error("farmOS login rejected (HTTP {status})")]
    LoginRejected { status: u16 },

    /// Login succeeded but no CSRF token could be fetched.
    #[error("farmOS session token unavailable (HTTP {status})")]
    TokenUnavailable { status: u16 },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

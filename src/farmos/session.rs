//! farmOS session state: credentials, cookie jar and CSRF token.

use std::sync::Arc;

use reqwest::cookie::Jar;

use super::transport::{HttpRequest, RedirectPolicy};

/// Header carrying the session's CSRF token.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Login details for a farmOS instance.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Host name without protocol, e.g. `farm.example.com`.
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns true if none of the three fields is empty.
    pub fn is_complete(&self) -> bool {
        !self.hostname.trim().is_empty()
            && !self.username.is_empty()
            && !self.password.is_empty()
    }

    /// Hostname with any protocol prefix and trailing slash removed.
    pub fn host(&self) -> &str {
        strip_scheme(self.hostname.trim()).trim_end_matches('/')
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

fn strip_scheme(s: &str) -> &str {
    s.strip_prefix("http://")
        .or_else(|| s.strip_prefix("https://"))
        .unwrap_or(s)
}

/// `rest` without a leading `host`, if `host` is the entire first segment.
fn strip_authority<'a>(rest: &'a str, host: &str) -> &'a str {
    match rest.strip_prefix(host) {
        Some(tail) if tail.is_empty() || tail.starts_with(['/', '?']) => tail,
        _ => rest,
    }
}

/// Per-client session. Populated by `authenticate`, never persisted.
#[derive(Debug)]
pub struct Session {
    credentials: Credentials,
    cookies: Arc<Jar>,
    token: String,
}

impl Session {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            cookies: Arc::new(Jar::default()),
            token: String::new(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The CSRF token, if authenticated.
    pub fn token(&self) -> Option<&str> {
        if self.token.is_empty() {
            None
        } else {
            Some(&self.token)
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// Drops all cookies and the token.
    pub fn reset(&mut self) {
        self.cookies = Arc::new(Jar::default());
        self.token.clear();
    }

    pub(crate) fn set_token(&mut self, token: String) {
        self.token = token;
    }

    /// Builds the absolute URL for `path`.
    ///
    /// A protocol prefix and the configured hostname are stripped first, so
    /// passing an already-absolute URL for this host gives the same result
    /// as passing the bare path.
    ///
    /// The hostname is only stripped when it fills the whole first segment.
    /// Without a protocol prefix that segment is also required to look like
    /// an authority (a dot or a port), so a host named `user` still gets
    /// `user/login` as a path.
    pub fn url_for(&self, path: &str) -> String {
        let host = self.credentials.host();
        let path = path.trim();
        let unqualified = strip_scheme(path);
        let qualified = unqualified.len() != path.len();

        let mut rest = unqualified;
        if !host.is_empty() && (qualified || host.contains(['.', ':'])) {
            rest = strip_authority(rest, host);
        }
        let rest = rest.trim_matches(|c: char| c == '/' || c.is_whitespace());

        format!("http://{}/{}", host, rest)
    }

    /// Resolves the URL and attaches session state the caller has not set.
    pub fn prepare(&self, request: &mut HttpRequest) {
        request.url = self.url_for(&request.url);

        if request.cookies.is_none() {
            request.cookies = Some(Arc::clone(&self.cookies));
        }
        if !self.token.is_empty() && request.header(CSRF_HEADER).is_none() {
            request
                .headers
                .push((CSRF_HEADER.to_string(), self.token.clone()));
        }
        if request.redirect.is_none() {
            request.redirect = Some(RedirectPolicy::Strict);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Credentials::new("farm.example.com", "ann", "secret"))
    }

    #[test]
    fn test_url_for_bare_path() {
        assert_eq!(
            session().url_for("taxonomy_term.json"),
            "http://farm.example.com/taxonomy_term.json"
        );
    }

    #[test]
    fn test_url_for_is_idempotent() {
        let s = session();
        let bare = s.url_for("taxonomy_term.json");
        assert_eq!(s.url_for("http://farm.example.com/taxonomy_term.json"), bare);
        assert_eq!(s.url_for("https://farm.example.com/taxonomy_term.json"), bare);
        assert_eq!(s.url_for("farm.example.com/taxonomy_term.json"), bare);
        assert_eq!(s.url_for(" /taxonomy_term.json/ "), bare);
        assert_eq!(s.url_for(&bare), bare);
    }

    #[test]
    fn test_url_for_keeps_query() {
        assert_eq!(
            session().url_for("/taxonomy_term.json?vocabulary=7&page=1"),
            "http://farm.example.com/taxonomy_term.json?vocabulary=7&page=1"
        );
    }

    #[test]
    fn test_url_for_host_that_prefixes_a_path_segment() {
        let s = Session::new(Credentials::new("user", "a", "b"));
        assert_eq!(s.url_for("user/login"), "http://user/user/login");
        assert_eq!(s.url_for("http://user/user/login"), "http://user/user/login");

        let s = Session::new(Credentials::new("farm", "a", "b"));
        assert_eq!(s.url_for("farm_asset.json"), "http://farm/farm_asset.json");
        assert_eq!(s.url_for("http://farm/farm_asset.json"), "http://farm/farm_asset.json");

        let s = session();
        assert_eq!(
            s.url_for("farm.example.community/x.json"),
            "http://farm.example.com/farm.example.community/x.json"
        );
    }

    #[test]
    fn test_url_for_host_with_port() {
        let s = Session::new(Credentials::new("127.0.0.1:8080", "a", "b"));
        assert_eq!(s.url_for("127.0.0.1:8080/user/login"), "http://127.0.0.1:8080/user/login");
        assert_eq!(s.url_for("restws/session/token"), "http://127.0.0.1:8080/restws/session/token");
    }

    #[test]
    fn test_hostname_with_scheme_is_normalized() {
        let s = Session::new(Credentials::new("http://farm.example.com/", "a", "b"));
        assert_eq!(s.url_for("user/login"), "http://farm.example.com/user/login");
    }

    #[test]
    fn test_credentials_completeness() {
        assert!(Credentials::new("h", "u", "p").is_complete());
        assert!(!Credentials::new("", "u", "p").is_complete());
        assert!(!Credentials::new("h", "", "p").is_complete());
        assert!(!Credentials::new("h", "u", "").is_complete());
    }

    #[test]
    fn test_debug_masks_password() {
        let debug = format!("{:?}", Credentials::new("h", "u", "hunter2"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_prepare_attaches_token_and_defaults() {
        let mut s = session();
        s.set_token("abc".to_string());

        let mut req = HttpRequest::get("areas.json");
        s.prepare(&mut req);

        assert_eq!(req.url, "http://farm.example.com/areas.json");
        assert_eq!(req.header(CSRF_HEADER), Some("abc"));
        assert!(req.cookies.is_some());
        assert_eq!(req.redirect, Some(RedirectPolicy::Strict));
    }

    #[test]
    fn test_prepare_respects_caller_overrides() {
        let mut s = session();
        s.set_token("abc".to_string());

        let mut req = HttpRequest::get("areas.json")
            .with_header("x-csrf-token", "mine")
            .with_redirect(RedirectPolicy::None);
        s.prepare(&mut req);

        assert_eq!(req.header(CSRF_HEADER), Some("mine"));
        assert_eq!(
            req.headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(CSRF_HEADER))
                .count(),
            1
        );
        assert_eq!(req.redirect, Some(RedirectPolicy::None));
    }

    #[test]
    fn test_prepare_without_token_sends_no_csrf_header() {
        let mut req = HttpRequest::get("areas.json");
        session().prepare(&mut req);
        assert!(req.header(CSRF_HEADER).is_none());
    }

    #[test]
    fn test_reset_clears_token_and_jar() {
        let mut s = session();
        s.set_token("abc".to_string());
        let old_jar = Arc::clone(&s.cookies);

        s.reset();

        assert!(!s.is_authenticated());
        assert!(s.token().is_none());
        assert!(!Arc::ptr_eq(&old_jar, &s.cookies));
    }
}

//! farmOS REST client: session login plus record retrieval.
//!
//! # Flow
//! 1. [`FarmOsClient::authenticate`] POSTs the login form, then fetches the
//!    CSRF token. Cookies and token stay in the [`Session`].
//! 2. Every later request goes through [`FarmOsClient::request`], which
//!    resolves the URL and attaches the session state.
//! 3. List endpoints (`<entity_type>.json`) return an [`Envelope`]; the
//!    fetch methods unwrap it into plain [`Record`] lists.
//!
//! Error responses and malformed bodies read as "no records" and are only
//! logged. `Err` is reserved for requests that got no response at all.

use std::time::Duration;

use super::error::{AuthError, TransportError};
use super::records::{Envelope, Filters, Record, Vocabulary};
use super::session::{Credentials, Session};
use super::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

pub const LOGIN_PATH: &str = "user/login";
pub const LOGIN_FORM_ID: &str = "user_login";
pub const TOKEN_PATH: &str = "restws/session/token";

pub const VOCABULARY_ENTITY: &str = "taxonomy_vocabulary";
pub const TERM_ENTITY: &str = "taxonomy_term";
/// Machine name of the vocabulary holding areas.
pub const AREA_VOCABULARY: &str = "farm_areas";

/// Records gathered across every page of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageWalk {
    pub records: Vec<Record>,
    /// Pages that answered with an error status or an unreadable body.
    pub missing_pages: Vec<u32>,
}

impl PageWalk {
    pub fn is_complete(&self) -> bool {
        self.missing_pages.is_empty()
    }
}

/// Client for a single farmOS instance.
pub struct FarmOsClient<T = ReqwestTransport> {
    transport: T,
    session: Session,
}

impl FarmOsClient<ReqwestTransport> {
    /// Creates a client backed by reqwest.
    pub fn connect(credentials: Credentials, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self::new(ReqwestTransport::new(timeout)?, credentials))
    }
}

impl<T: Transport> FarmOsClient<T> {
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Self {
            transport,
            session: Session::new(credentials),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Logs in and fetches a CSRF token.
    ///
    /// Empty credentials fail before any request is sent. Any earlier
    /// session state is discarded first.
    pub async fn authenticate(&mut self) -> Result<(), AuthError> {
        if !self.session.credentials().is_complete() {
            tracing::warn!("farmOS credentials incomplete, not attempting login");
            return Err(AuthError::MissingCredentials);
        }

        self.session.reset();

        let credentials = self.session.credentials();
        let login = HttpRequest::post_form(
            LOGIN_PATH,
            &[
                ("name", credentials.username.as_str()),
                ("pass", credentials.password.as_str()),
                ("form_id", LOGIN_FORM_ID),
            ],
        );

        let response = self.request(login).await?;
        if response.status != 200 {
            tracing::warn!(status = response.status, "farmOS login rejected");
            return Err(AuthError::LoginRejected {
                status: response.status,
            });
        }

        let response = self.request(HttpRequest::get(TOKEN_PATH)).await?;
        let token = if response.status == 200 {
            response.body.trim()
        } else {
            ""
        };
        if token.is_empty() {
            tracing::warn!(status = response.status, "farmOS session token unavailable");
            return Err(AuthError::TokenUnavailable {
                status: response.status,
            });
        }

        self.session.set_token(token.to_string());
        tracing::info!(host = self.session.credentials().host(), "authenticated with farmOS");
        Ok(())
    }

    /// Sends a request through the session.
    ///
    /// `request.url` may be a bare path or a full URL on this host.
    pub async fn request(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.session.prepare(&mut request);

        let method = request.method;
        let url = request.url.clone();
        tracing::debug!(%method, %url, "farmOS request");

        match self.transport.send(request).await {
            Ok(response) => {
                tracing::debug!(%method, %url, status = response.status, "farmOS response");
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(%method, %url, error = %e, "farmOS request failed");
                Err(e)
            }
        }
    }

    /// Looks up a vocabulary's numeric ID by machine name.
    pub async fn vocabulary_id(&self, machine_name: &str) -> Result<Option<u64>, TransportError> {
        let vocabularies = self.get_records(VOCABULARY_ENTITY, &Filters::new()).await?;

        Ok(vocabularies
            .iter()
            .filter_map(Vocabulary::from_record)
            .find(|v| v.machine_name == machine_name)
            .map(|v| v.vid))
    }

    /// Fetches one page of `entity_type` records.
    pub async fn get_records(
        &self,
        entity_type: &str,
        filters: &Filters,
    ) -> Result<Vec<Record>, TransportError> {
        Ok(self
            .fetch_envelope(entity_type, filters)
            .await?
            .map(|envelope| envelope.list)
            .unwrap_or_default())
    }

    /// Fetches one page of area terms.
    ///
    /// Returns an empty list without querying terms if the area vocabulary
    /// cannot be resolved.
    pub async fn get_areas(&self, filters: &Filters) -> Result<Vec<Record>, TransportError> {
        match self.area_filters(filters).await? {
            Some(filters) => self.get_records(TERM_ENTITY, &filters).await,
            None => Ok(Vec::new()),
        }
    }

    /// Fetches every page of area terms.
    pub async fn get_all_areas(&self, filters: &Filters) -> Result<Vec<Record>, TransportError> {
        Ok(self.walk_areas(filters).await?.records)
    }

    /// Like [`get_all_areas`](Self::get_all_areas), but also reports pages
    /// that came back without a usable envelope.
    pub async fn walk_areas(&self, filters: &Filters) -> Result<PageWalk, TransportError> {
        match self.area_filters(filters).await? {
            Some(filters) => self.walk_pages(TERM_ENTITY, &filters).await,
            None => Ok(PageWalk::default()),
        }
    }

    /// Number of pages for a query, or 0 if the envelope has no `last` link.
    pub async fn page_count(
        &self,
        entity_type: &str,
        filters: &Filters,
    ) -> Result<u32, TransportError> {
        Ok(self
            .fetch_envelope(entity_type, filters)
            .await?
            .and_then(|envelope| envelope.page_total())
            .unwrap_or(0))
    }

    /// Fetches pages `0..page_count` in order and concatenates them.
    ///
    /// Any caller-supplied `page` filter is ignored. The first, unpaged
    /// response doubles as page 0.
    pub async fn get_all_records(
        &self,
        entity_type: &str,
        filters: &Filters,
    ) -> Result<Vec<Record>, TransportError> {
        Ok(self.walk_pages(entity_type, filters).await?.records)
    }

    /// The page walk behind [`get_all_records`](Self::get_all_records).
    ///
    /// A page that fails with a status or an unreadable body contributes no
    /// records and is listed in [`PageWalk::missing_pages`]. If page 0 fails
    /// the page total is unknown and the walk stops there.
    pub async fn walk_pages(
        &self,
        entity_type: &str,
        filters: &Filters,
    ) -> Result<PageWalk, TransportError> {
        let mut filters = filters.clone();
        filters.remove("page");

        let Some(first) = self.fetch_envelope(entity_type, &filters).await? else {
            return Ok(PageWalk {
                records: Vec::new(),
                missing_pages: vec![0],
            });
        };

        let pages = first.page_total().unwrap_or(1);
        let mut walk = PageWalk {
            records: first.list,
            missing_pages: Vec::new(),
        };

        for page in 1..pages {
            filters.insert("page".to_string(), page.to_string());
            match self.fetch_envelope(entity_type, &filters).await? {
                Some(envelope) => {
                    tracing::debug!(entity_type, page, count = envelope.list.len(), "fetched page");
                    walk.records.extend(envelope.list);
                }
                None => {
                    tracing::warn!(entity_type, page, pages, "page lost, continuing without it");
                    walk.missing_pages.push(page);
                }
            }
        }

        Ok(walk)
    }

    async fn area_filters(&self, filters: &Filters) -> Result<Option<Filters>, TransportError> {
        let Some(vid) = self.vocabulary_id(AREA_VOCABULARY).await? else {
            tracing::warn!(vocabulary = AREA_VOCABULARY, "vocabulary not found");
            return Ok(None);
        };

        let mut filters = filters.clone();
        filters.insert("vocabulary".to_string(), vid.to_string());
        Ok(Some(filters))
    }

    /// `None` for non-200 responses and bodies that are not an envelope.
    async fn fetch_envelope(
        &self,
        entity_type: &str,
        filters: &Filters,
    ) -> Result<Option<Envelope>, TransportError> {
        let path = record_path(entity_type, filters);
        let response = self.request(HttpRequest::get(&path)).await?;

        if response.status != 200 {
            tracing::warn!(status = response.status, %path, "unexpected status from farmOS");
            return Ok(None);
        }

        match Envelope::parse(&response.body) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                tracing::warn!(%path, error = %e, "malformed farmOS response");
                Ok(None)
            }
        }
    }
}

/// `<entity_type>.json` plus RFC 3986-encoded filters.
pub fn record_path(entity_type: &str, filters: &Filters) -> String {
    let mut path = format!("{}.json", entity_type);
    if !filters.is_empty() {
        let query = filters
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        path.push('?');
        path.push_str(&query);
    }
    path
}

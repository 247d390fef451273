//! farmOS REST API client.
//!
//! Covers the pieces needed to pull areas: session login with a CSRF token,
//! vocabulary lookup, and paginated list retrieval. Nothing is ever written
//! back to farmOS.
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use farmsync::farmos::{Credentials, FarmOsClient, Filters};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials::new("farm.example.com", "farmer", "secret");
//! let mut client = FarmOsClient::connect(credentials, Duration::from_secs(30))?;
//! client.authenticate().await?;
//! let areas = client.get_all_areas(&Filters::new()).await?;
//! println!("{} areas", areas.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod records;
mod session;
mod transport;

pub use client::{
    record_path, FarmOsClient, PageWalk, AREA_VOCABULARY, LOGIN_FORM_ID, LOGIN_PATH, TERM_ENTITY,
    TOKEN_PATH, VOCABULARY_ENTITY,
};
pub use error::{AuthError, TransportError};
pub use records::{Envelope, Filters, Record, Vocabulary};
pub use session::{Credentials, Session, CSRF_HEADER};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, RedirectPolicy, ReqwestTransport, Transport,
    MAX_REDIRECTS,
};

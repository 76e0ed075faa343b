//! Decides whether a URL may be rendered inside the embedded surface.

use crate::origin::{Origin, OriginError};
use url::Url;

/// Path prefix of the PiKVM HTTP API. Never rendered as a page.
const API_PREFIX: &str = "/api/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Render in the embedded surface
    Internal,
    /// Block in-surface and hand to the OS opener
    External,
}

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error(transparent)]
    Origin(#[from] OriginError),
    #[error("invalid navigation URL {url}: {source}")]
    Candidate {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Scheme, host and effective port must all match
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Pages served by the shell itself (`tauri://localhost`, `http(s)://tauri.localhost`)
pub fn is_shell_page(url: &Url) -> bool {
    match url.scheme() {
        "tauri" => url.host_str() == Some("localhost"),
        "http" | "https" => url.host_str() == Some("tauri.localhost"),
        _ => false,
    }
}

/// Classify an already parsed candidate
pub fn classify_url(origin: &Origin, candidate: &Url) -> Result<Disposition, NavigationError> {
    let origin = origin.url()?;
    if same_origin(&origin, candidate) && !candidate.path().starts_with(API_PREFIX) {
        Ok(Disposition::Internal)
    } else {
        Ok(Disposition::External)
    }
}

pub fn classify(origin: &Origin, candidate: &str) -> Result<Disposition, NavigationError> {
    let candidate = Url::parse(candidate).map_err(|source| NavigationError::Candidate {
        url: candidate.to_string(),
        source,
    })?;
    classify_url(origin, &candidate)
}

/// Classification used by the host callbacks, which cannot propagate an
/// error. Anything that fails to classify leaves the surface.
pub fn classify_or_external(origin: &Origin, candidate: &Url) -> Disposition {
    if is_shell_page(candidate) {
        return Disposition::Internal;
    }
    match classify_url(origin, candidate) {
        Ok(disposition) => disposition,
        Err(e) => {
            log::warn!("[Navigation] Cannot classify {}: {}", candidate, e);
            Disposition::External
        }
    }
}

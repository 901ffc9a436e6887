//! Error taxonomy for origin verification.
//!
//! Per-resource failures (`FetchFailed`, `DnsResolutionFailed`, `Timeout`) are caught at the
//! resource boundary by the engine; `ResourceUnavailable` found at startup is fatal to the run.

use std::fmt;
use std::io;
use std::time::Duration;

/// Why a GET did not produce a usable payload.
#[derive(Debug)]
pub enum FetchFailure {
    /// Final response status was outside 2xx (includes unfollowed redirects).
    Http(u32),
    /// Curl reported a transport error (connect, TLS, read, ...).
    Transport(curl::Error),
    /// URL scheme is not http or https.
    UnsupportedScheme(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Http(code) => write!(f, "HTTP {}", code),
            FetchFailure::Transport(e) => write!(f, "{}", e),
            FetchFailure::UnsupportedScheme(s) => write!(f, "unsupported scheme {:?}", s),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("fetch of {url} failed: {failure}")]
    FetchFailed { url: String, failure: FetchFailure },

    #[error("could not resolve {host}: {source}")]
    DnsResolutionFailed {
        host: String,
        #[source]
        source: io::Error,
    },

    /// Reverse lookup failed. The endpoint resolver absorbs this and falls back to the IP text.
    #[error("reverse lookup of {ip} failed: {source}")]
    ReverseLookupDegraded {
        ip: String,
        #[source]
        source: io::Error,
    },

    /// The fetch succeeded but no connection not already attributed in this run carried it.
    #[error("no new connection attributed to {url}")]
    Unattributed { url: String },

    #[error("connection enumeration unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("{operation} timed out after {}s", limit.as_secs_f64())]
    Timeout { operation: String, limit: Duration },

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl VerifyError {
    pub(crate) fn fetch(url: &str, failure: FetchFailure) -> Self {
        VerifyError::FetchFailed {
            url: url.to_string(),
            failure,
        }
    }

    /// True for failures that must stop the whole run rather than one resource.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VerifyError::ResourceUnavailable(_) | VerifyError::InvalidConfiguration(_)
        )
    }
}

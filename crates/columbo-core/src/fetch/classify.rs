//! Map HTTP status and curl errors onto the verification error taxonomy.

use std::time::Duration;

use crate::error::{FetchFailure, VerifyError};

/// Status check for the final response: anything outside 2xx is a failed fetch.
pub fn check_status(url: &str, code: u32) -> Result<(), VerifyError> {
    if (200..300).contains(&code) {
        Ok(())
    } else {
        Err(VerifyError::fetch(url, FetchFailure::Http(code)))
    }
}

/// Curl timeouts become `Timeout`; everything else is a transport-level `FetchFailed`.
pub fn classify_curl_error(url: &str, e: curl::Error, limit: Duration) -> VerifyError {
    if e.is_operation_timedout() {
        return VerifyError::Timeout {
            operation: format!("GET {}", url),
            limit,
        };
    }
    VerifyError::fetch(url, FetchFailure::Transport(e))
}

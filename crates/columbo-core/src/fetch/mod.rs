//! Single-resource HTTP GET with connection capture.
//!
//! Uses the curl crate (libcurl). After the transfer the handle is asked which local port
//! and remote IP it used. Callers that attribute connections from outside the handle get a
//! hook that runs while each response's connection is still open.

mod classify;

pub use classify::{check_status, classify_curl_error};

use std::net::IpAddr;
use std::time::Duration;

use url::Url;

use crate::connection::Connection;
use crate::error::{FetchFailure, VerifyError};

/// A successful (2xx) retrieval.
#[derive(Debug)]
pub struct Fetched {
    pub body: Vec<u8>,
    /// Connection reported by the transport itself, when it exposes one.
    pub connection: Option<Connection>,
    /// Where the body came from after redirects, if different from the request.
    pub effective_url: Option<Url>,
}

impl Fetched {
    pub fn new(body: Vec<u8>, connection: Option<Connection>) -> Self {
        Self {
            body,
            connection,
            effective_url: None,
        }
    }

    pub fn with_effective_url(mut self, url: Url) -> Self {
        self.effective_url = Some(url);
        self
    }

    /// Base for resolving references found in the body.
    pub fn final_url<'a>(&'a self, requested: &'a Url) -> &'a Url {
        self.effective_url.as_ref().unwrap_or(requested)
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Performs one GET per call. Implementations must only return `Ok` for 2xx responses.
pub trait Fetcher: Send + Sync {
    /// GET `url`, calling `on_connected` once per response (redirect hops included) after
    /// its headers arrive and before the transport may close the connection.
    fn fetch_observed(
        &self,
        url: &Url,
        on_connected: &mut dyn FnMut(),
    ) -> Result<Fetched, VerifyError>;

    fn fetch(&self, url: &Url) -> Result<Fetched, VerifyError> {
        self.fetch_observed(url, &mut || {})
    }
}

/// Curl transfer settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirections: u32,
    pub user_agent: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(30),
            follow_redirects: true,
            max_redirections: 10,
            user_agent: None,
        }
    }
}

/// [`Fetcher`] backed by a fresh `curl::easy::Easy` per request, so no two fetches share a
/// connection.
#[derive(Debug, Clone, Default)]
pub struct CurlFetcher {
    options: FetchOptions,
}

impl CurlFetcher {
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }

    fn configure(&self, easy: &mut curl::easy::Easy, url: &str) -> Result<(), curl::Error> {
        easy.url(url)?;
        easy.get(true)?;
        easy.follow_location(self.options.follow_redirects)?;
        easy.max_redirections(self.options.max_redirections)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.timeout(self.options.timeout)?;
        if let Some(agent) = &self.options.user_agent {
            easy.useragent(agent)?;
        }
        Ok(())
    }
}

impl Fetcher for CurlFetcher {
    fn fetch_observed(
        &self,
        url: &Url,
        on_connected: &mut dyn FnMut(),
    ) -> Result<Fetched, VerifyError> {
        let url_str = url.as_str();
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(VerifyError::fetch(
                    url_str,
                    FetchFailure::UnsupportedScheme(other.to_string()),
                ))
            }
        }
        let limit = self.options.timeout;
        let mut body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        self.configure(&mut easy, url_str)
            .map_err(|e| classify_curl_error(url_str, e, limit))?;

        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(|e| classify_curl_error(url_str, e, limit))?;
            transfer
                .header_function(|line| {
                    // Blank line ends a header block.
                    if line == b"\r\n" || line == b"\n" {
                        on_connected();
                    }
                    true
                })
                .map_err(|e| classify_curl_error(url_str, e, limit))?;
            transfer
                .perform()
                .map_err(|e| classify_curl_error(url_str, e, limit))?;
        }

        let code = easy
            .response_code()
            .map_err(|e| classify_curl_error(url_str, e, limit))?;
        check_status(url_str, code)?;

        let connection = transfer_connection(&mut easy);
        let effective = effective_url(&mut easy).filter(|u| u != url);
        tracing::debug!(
            url = url_str,
            status = code,
            bytes = body.len(),
            connection = ?connection,
            effective = ?effective.as_ref().map(Url::as_str),
            "GET complete"
        );
        let fetched = Fetched::new(body, connection);
        Ok(match effective {
            Some(u) => fetched.with_effective_url(u),
            None => fetched,
        })
    }
}

/// Local port and primary (remote) IP of the last connection the handle used.
fn transfer_connection(easy: &mut curl::easy::Easy) -> Option<Connection> {
    let local_port = easy.local_port().ok().filter(|p| *p != 0)?;
    let remote_ip: IpAddr = easy.primary_ip().ok().flatten()?.parse().ok()?;
    Some(Connection {
        local_port,
        remote_ip,
    })
}

fn effective_url(easy: &mut curl::easy::Easy) -> Option<Url> {
    Url::parse(easy.effective_url().ok().flatten()?).ok()
}

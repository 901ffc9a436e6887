//! Endpoint identity: what a URL claims versus who actually answered.
//!
//! The claimed side is the URL host plus its forward lookup; the actual side is the
//! reverse lookup of the socket's remote IP. Both names go through [`normalize_fqdn`] so the
//! classifier can compare them with plain equality.

mod system;

use std::net::IpAddr;

use url::{Host, Url};

use crate::error::VerifyError;

pub use system::SystemResolver;

/// Raw DNS primitives. Implementations should bound each call and report `Timeout`.
pub trait DnsResolver: Send + Sync {
    /// Every address `host` resolves to, in resolver order.
    fn forward(&self, host: &str) -> Result<Vec<IpAddr>, VerifyError>;

    /// Hostname for `ip`. Failure is reported as `ReverseLookupDegraded`.
    fn reverse(&self, ip: IpAddr) -> Result<String, VerifyError>;
}

/// The identity implied by a URL's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedIdentity {
    pub fqdn: String,
    pub ip: IpAddr,
}

/// Lowercase and drop a single trailing dot, so `Example.COM.` and `example.com` compare equal.
pub fn normalize_fqdn(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase()
}

/// Claimed/actual identity lookups on top of a [`DnsResolver`].
#[derive(Debug, Clone)]
pub struct EndpointResolver<R> {
    dns: R,
}

impl<R: DnsResolver> EndpointResolver<R> {
    pub fn new(dns: R) -> Self {
        Self { dns }
    }

    pub fn dns(&self) -> &R {
        &self.dns
    }

    /// Host of `url` (scheme, port, path and query stripped) and the address it resolves to.
    /// IP-literal hosts are taken as-is. For names the first answer in the same address
    /// family as `actual` wins, else the first answer of any family.
    pub fn claimed_identity(
        &self,
        url: &Url,
        actual: IpAddr,
    ) -> Result<ClaimedIdentity, VerifyError> {
        match url.host() {
            Some(Host::Ipv4(v4)) => Ok(ClaimedIdentity {
                fqdn: v4.to_string(),
                ip: IpAddr::V4(v4),
            }),
            Some(Host::Ipv6(v6)) => Ok(ClaimedIdentity {
                fqdn: v6.to_string(),
                ip: IpAddr::V6(v6),
            }),
            Some(Host::Domain(domain)) => {
                let fqdn = normalize_fqdn(domain);
                let addrs = self.dns.forward(&fqdn)?;
                let ip = addrs
                    .iter()
                    .find(|a| a.is_ipv4() == actual.is_ipv4())
                    .or_else(|| addrs.first())
                    .copied()
                    .ok_or_else(|| VerifyError::DnsResolutionFailed {
                        host: fqdn.clone(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "no addresses returned",
                        ),
                    })?;
                tracing::debug!(%fqdn, %ip, "claimed identity");
                Ok(ClaimedIdentity { fqdn, ip })
            }
            None => Err(VerifyError::InvalidUrl {
                url: url.to_string(),
                reason: "URL has no host".to_string(),
            }),
        }
    }

    /// Reverse lookup of `ip`, best effort: any failure degrades to the IP's text.
    pub fn actual_identity(&self, ip: IpAddr) -> String {
        match self.dns.reverse(ip) {
            Ok(name) if !name.trim().is_empty() => normalize_fqdn(name.trim()),
            Ok(_) => {
                tracing::warn!(%ip, "reverse lookup returned an empty name; using IP");
                ip.to_string()
            }
            Err(e) => {
                tracing::warn!(%ip, error = %e, "reverse lookup degraded; using IP");
                ip.to_string()
            }
        }
    }
}

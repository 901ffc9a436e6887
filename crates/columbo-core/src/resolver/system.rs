//! System resolver (getaddrinfo / getnameinfo via `dns_lookup`) with a per-lookup bound.

use std::io;
use std::net::IpAddr;
use std::sync::mpsc;
use std::time::Duration;

use super::DnsResolver;
use crate::error::VerifyError;

/// Blocking libc lookups run on a helper thread so a hung resolver costs at most `timeout`.
#[derive(Debug, Clone, Copy)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn bounded<T, F>(&self, operation: String, lookup: F) -> Result<io::Result<T>, VerifyError>
    where
        T: Send + 'static,
        F: FnOnce() -> io::Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        // The thread is detached: if the lookup hangs past the bound it finishes on its own
        // and its send fails silently.
        std::thread::spawn(move || {
            let _ = tx.send(lookup());
        });
        rx.recv_timeout(self.timeout).map_err(|_| VerifyError::Timeout {
            operation,
            limit: self.timeout,
        })
    }
}

impl DnsResolver for SystemResolver {
    fn forward(&self, host: &str) -> Result<Vec<IpAddr>, VerifyError> {
        let owned = host.to_string();
        self.bounded(format!("forward lookup of {}", host), move || {
            dns_lookup::lookup_host(&owned)
        })?
        .map_err(|source| VerifyError::DnsResolutionFailed {
            host: host.to_string(),
            source,
        })
    }

    fn reverse(&self, ip: IpAddr) -> Result<String, VerifyError> {
        self.bounded(format!("reverse lookup of {}", ip), move || {
            dns_lookup::lookup_addr(&ip)
        })?
        .map_err(|source| VerifyError::ReverseLookupDegraded {
            ip: ip.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn ip_literal_forward_resolves_to_itself() {
        let r = SystemResolver::new(Duration::from_secs(5));
        let addrs = r.forward("127.0.0.1").unwrap();
        assert!(addrs.contains(&IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[test]
    fn bounded_reports_timeout() {
        let r = SystemResolver::new(Duration::from_millis(20));
        let res = r.bounded("slow lookup".to_string(), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        match res {
            Err(VerifyError::Timeout { operation, limit }) => {
                assert_eq!(operation, "slow lookup");
                assert_eq!(limit, Duration::from_millis(20));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}

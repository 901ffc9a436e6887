//! Resolver for tests that only talk to 127.0.0.1.
//!
//! `localhost` forward-resolves to loopback; every reverse lookup fails, which exercises the
//! IP-text fallback and keeps results independent of the host's /etc/hosts.

use columbo_core::error::VerifyError;
use columbo_core::resolver::DnsResolver;
use std::io;
use std::net::{IpAddr, Ipv4Addr};

pub struct LoopbackDns;

impl DnsResolver for LoopbackDns {
    fn forward(&self, host: &str) -> Result<Vec<IpAddr>, VerifyError> {
        if host == "localhost" {
            Ok(vec![IpAddr::V4(Ipv4Addr::LOCALHOST)])
        } else {
            Err(VerifyError::DnsResolutionFailed {
                host: host.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "not in test zone"),
            })
        }
    }

    fn reverse(&self, ip: IpAddr) -> Result<String, VerifyError> {
        Err(VerifyError::ReverseLookupDegraded {
            ip: ip.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no PTR in test zone"),
        })
    }
}

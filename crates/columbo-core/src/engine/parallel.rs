//! Bounded worker pool for direct-attribution resource verification.
//!
//! Workers pull resources from a shared queue and each one fetches, resolves and
//! classifies independently; the connection is read off the worker's own transfer, never
//! from a shared table. Results come back over a channel and are returned in discovery
//! order for the single collector.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Mutex;

use super::{build_record, missing_connection};
use crate::connection::Connection;
use crate::discover::DiscoveredResource;
use crate::error::VerifyError;
use crate::fetch::Fetcher;
use crate::record::VerificationRecord;
use crate::resolver::{DnsResolver, EndpointResolver};

/// A resource verified by a worker, not yet attributed in the run's seen-port set.
pub(super) struct Verified {
    pub connection: Connection,
    pub record: VerificationRecord,
    pub body: Vec<u8>,
}

pub(super) fn verify_direct<F: Fetcher, R: DnsResolver>(
    fetcher: &F,
    resolver: &EndpointResolver<R>,
    res: &DiscoveredResource,
) -> Result<Verified, VerifyError> {
    let fetched = fetcher.fetch(&res.url)?;
    let connection = fetched
        .connection
        .ok_or_else(|| missing_connection(&res.url))?;
    let body = fetched.into_body();
    let record = build_record(resolver, &res.name, &res.url, &connection)?;
    Ok(Verified {
        connection,
        record,
        body,
    })
}

/// Verify `resources` with at most `workers` in flight. Output index `i` belongs to
/// `resources[i]`.
pub(super) fn verify_all<F: Fetcher, R: DnsResolver>(
    fetcher: &F,
    resolver: &EndpointResolver<R>,
    resources: &[DiscoveredResource],
    workers: usize,
) -> Vec<Result<Verified, VerifyError>> {
    let work: Mutex<VecDeque<(usize, &DiscoveredResource)>> =
        Mutex::new(resources.iter().enumerate().collect());
    let (tx, rx) = mpsc::channel();
    let num_workers = workers.clamp(1, resources.len().max(1));

    std::thread::scope(|s| {
        for _ in 0..num_workers {
            let tx = tx.clone();
            let work = &work;
            s.spawn(move || loop {
                let next = work.lock().ok().and_then(|mut q| q.pop_front());
                let (index, res) = match next {
                    Some(p) => p,
                    None => break,
                };
                let _ = tx.send((index, verify_direct(fetcher, resolver, res)));
            });
        }
    });
    drop(tx);

    let mut results: Vec<(usize, Result<Verified, VerifyError>)> = rx.into_iter().collect();
    results.sort_by_key(|(index, _)| *index);
    tracing::debug!(workers = num_workers, results = results.len(), "worker pool drained");
    results.into_iter().map(|(_, r)| r).collect()
}

//! Origin-verification engine.
//!
//! Per page: fetch and record the page itself, discover its `src` resources, then fetch,
//! attribute, resolve and classify each one. A failure on one resource is logged and the
//! resource skipped; it never stops the page or the batch.
//!
//! Attribution runs in one of two modes. In direct mode the transfer reports its own
//! connection, so resources may be fetched by a bounded worker pool while a single
//! collector claims ports and appends records in discovery order. In connection-table mode
//! the process's TCP table is diffed from inside each transfer, once per response while its
//! connection is still open. That is only sound when fetches never overlap, so the mode is
//! strictly sequential.
//!
//! A resource whose fetch succeeded but whose connection was already attributed is skipped
//! as unattributed, so `discovered == verified + skipped` for every page.

mod parallel;

use url::Url;

use crate::classify::classify;
use crate::config::{AttributionMode, ColumboConfig};
use crate::connection::{Connection, ConnectionObserver, ConnectionSource, ProcNetTcp};
use crate::discover::{discover_resources, DiscoveredResource};
use crate::error::VerifyError;
use crate::fetch::{CurlFetcher, Fetcher};
use crate::ledger::{ResourceLedger, RunStats};
use crate::record::VerificationRecord;
use crate::resolver::{DnsResolver, EndpointResolver, SystemResolver};
use crate::storage::PayloadStore;
use crate::url_model::parse_page_url;

/// Where connection attribution comes from.
pub enum Attribution {
    Direct,
    ConnectionTable(Box<dyn ConnectionSource>),
}

impl std::fmt::Debug for Attribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribution::Direct => write!(f, "Direct"),
            Attribution::ConnectionTable(_) => write!(f, "ConnectionTable"),
        }
    }
}

#[derive(Debug)]
pub struct EngineOptions {
    pub attribution: Attribution,
    /// Resource fetches in flight per page (direct attribution only).
    pub concurrency: usize,
    /// Save verified payloads here when set.
    pub store: Option<PayloadStore>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            attribution: Attribution::Direct,
            concurrency: 1,
            store: None,
        }
    }
}

/// A resource that produced no record, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedResource {
    pub name: String,
    pub url: String,
    pub reason: String,
}

/// Outcome of one page.
#[derive(Debug, Clone)]
pub struct PageReport {
    pub url: String,
    /// Resources found on the page (the page itself not included).
    pub discovered: usize,
    /// Records produced for this page, page record first, then resources in discovery order.
    pub records: Vec<VerificationRecord>,
    pub skipped: Vec<SkippedResource>,
}

pub struct Engine<F, R> {
    fetcher: F,
    resolver: EndpointResolver<R>,
    attribution: Attribution,
    concurrency: usize,
    store: Option<PayloadStore>,
    observer: ConnectionObserver,
    ledger: ResourceLedger,
    stats: RunStats,
}

/// Output of one fetch plus attribution.
struct Attributed {
    records: Vec<VerificationRecord>,
    body: Vec<u8>,
    /// Base for the references in `body`.
    final_url: Url,
}

impl Engine<CurlFetcher, SystemResolver> {
    /// Engine with libcurl, the system resolver and the configured attribution mode.
    pub fn from_config(cfg: &ColumboConfig, store: Option<PayloadStore>) -> Result<Self, VerifyError> {
        cfg.validate()?;
        let attribution = match cfg.attribution {
            AttributionMode::Direct => Attribution::Direct,
            AttributionMode::ConnectionTable => {
                Attribution::ConnectionTable(Box::new(ProcNetTcp::new()))
            }
        };
        Engine::new(
            CurlFetcher::new(cfg.fetch_options()),
            EndpointResolver::new(SystemResolver::new(cfg.dns_timeout())),
            EngineOptions {
                attribution,
                concurrency: cfg.concurrency,
                store,
            },
        )
    }
}

impl<F: Fetcher, R: DnsResolver> Engine<F, R> {
    /// Validates the options and, in connection-table mode, checks once that the table is
    /// readable at all. Failure there is fatal for the run.
    pub fn new(
        fetcher: F,
        resolver: EndpointResolver<R>,
        options: EngineOptions,
    ) -> Result<Self, VerifyError> {
        if options.concurrency == 0 {
            return Err(VerifyError::InvalidConfiguration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if let Attribution::ConnectionTable(source) = &options.attribution {
            if options.concurrency > 1 {
                return Err(VerifyError::InvalidConfiguration(
                    "connection-table attribution cannot run fetches concurrently; \
                     use direct attribution or concurrency = 1"
                        .to_string(),
                ));
            }
            let probe = source.snapshot()?;
            tracing::debug!(connections = probe.len(), "connection table readable");
        }
        tracing::info!(
            attribution = ?options.attribution,
            concurrency = options.concurrency,
            save = options.store.is_some(),
            "engine ready"
        );
        Ok(Self {
            fetcher,
            resolver,
            attribution: options.attribution,
            concurrency: options.concurrency,
            store: options.store,
            observer: ConnectionObserver::new(),
            ledger: ResourceLedger::new(),
            stats: RunStats::default(),
        })
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn into_ledger(self) -> ResourceLedger {
        self.ledger
    }

    /// Process each page in order. A page that cannot be fetched or verified is logged and
    /// left out of the result; the rest of the batch continues.
    pub fn process_pages<I, S>(&mut self, urls: I) -> Vec<PageReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut reports = Vec::new();
        for url in urls {
            let url = url.as_ref();
            match self.process_page(url) {
                Ok(report) => reports.push(report),
                Err(e) => tracing::warn!(page = url, error = %e, "page skipped"),
            }
        }
        tracing::info!(
            pages = self.stats.pages_requested,
            verified_pages = self.stats.pages_verified,
            discovered = self.stats.resources_discovered,
            verified = self.stats.resources_verified,
            skipped = self.stats.resources_skipped,
            records = self.ledger.len(),
            "run complete"
        );
        reports
    }

    /// Verify the page at `url` and every resource it references.
    ///
    /// Errors only when the page itself cannot be fetched or verified; resource failures
    /// are listed in [`PageReport::skipped`]. Every discovered resource ends up either
    /// verified or skipped.
    pub fn process_page(&mut self, url: &str) -> Result<PageReport, VerifyError> {
        self.stats.pages_requested += 1;
        let page_url = parse_page_url(url)?;
        let _span = tracing::info_span!("page", url = %page_url).entered();

        let page = self.verify_sequential(page_url.as_str(), &page_url)?;
        self.stats.pages_verified += 1;
        if page.records.is_empty() {
            tracing::warn!("page connection was already attributed; no page record");
        }
        for r in &page.records {
            self.ledger.append(r.clone());
        }
        if page.final_url != page_url {
            tracing::debug!(base = %page.final_url, "page redirected");
        }

        let html = String::from_utf8_lossy(&page.body);
        let resources = discover_resources(&html, &page.final_url);
        tracing::info!(count = resources.len(), "resources discovered");
        self.stats.resources_discovered += resources.len();

        let mut report = PageReport {
            url: page_url.to_string(),
            discovered: resources.len(),
            records: page.records,
            skipped: Vec::new(),
        };

        let parallel = matches!(self.attribution, Attribution::Direct)
            && self.concurrency > 1
            && resources.len() > 1;
        if parallel {
            let results =
                parallel::verify_all(&self.fetcher, &self.resolver, &resources, self.concurrency);
            for (res, result) in resources.iter().zip(results) {
                match result {
                    Ok(v) => match self.observer.claim(v.connection) {
                        Some(_) => self.commit(&mut report, res, vec![v.record], &v.body),
                        None => self.skip(&mut report, res, unattributed(&res.url)),
                    },
                    Err(e) => self.skip(&mut report, res, e),
                }
            }
        } else {
            for res in &resources {
                match self.verify_sequential(&res.name, &res.url) {
                    Ok(a) if a.records.is_empty() => {
                        self.skip(&mut report, res, unattributed(&res.url))
                    }
                    Ok(a) => self.commit(&mut report, res, a.records, &a.body),
                    Err(e) => self.skip(&mut report, res, e),
                }
            }
        }
        Ok(report)
    }

    /// Fetch and attribute, then resolve and classify. In connection-table mode the table
    /// is read from inside the transfer, while each response's connection is still open.
    /// No records means every connection involved was attributed earlier in the run.
    fn verify_sequential(&mut self, name: &str, url: &Url) -> Result<Attributed, VerifyError> {
        let connections: Vec<Connection>;
        let fetched = match &self.attribution {
            Attribution::Direct => {
                let fetched = self.fetcher.fetch(url)?;
                let conn = fetched.connection.ok_or_else(|| missing_connection(url))?;
                connections = self.observer.claim(conn).into_iter().collect();
                fetched
            }
            Attribution::ConnectionTable(source) => {
                let observer = &mut self.observer;
                let mut observed = Vec::new();
                let mut table_error = None;
                let fetched = self.fetcher.fetch_observed(url, &mut || {
                    if table_error.is_some() {
                        return;
                    }
                    match observer.observe_new(&**source) {
                        Ok(fresh) => observed.extend(fresh),
                        Err(e) => table_error = Some(e),
                    }
                })?;
                if let Some(e) = table_error {
                    return Err(e);
                }
                connections = observed;
                fetched
            }
        };
        let final_url = fetched.final_url(url).clone();
        let body = fetched.into_body();

        if connections.is_empty() {
            tracing::debug!(%url, "no new connection attributed");
        }
        let records = connections
            .iter()
            .map(|c| build_record(&self.resolver, name, url, c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Attributed {
            records,
            body,
            final_url,
        })
    }

    fn commit(
        &mut self,
        report: &mut PageReport,
        res: &DiscoveredResource,
        records: Vec<VerificationRecord>,
        body: &[u8],
    ) {
        self.stats.resources_verified += 1;
        for r in records {
            if r.ip_mismatch() || r.fqdn_mismatch() {
                tracing::info!(
                    name = r.name(),
                    claimed = r.claimed_fqdn(),
                    actual = r.actual_fqdn(),
                    actual_ip = r.actual_ip(),
                    "served from a different origin"
                );
            }
            self.ledger.append(r.clone());
            report.records.push(r);
        }
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&res.name, body) {
                tracing::warn!(name = %res.name, error = %e, "could not save payload");
            }
        }
    }

    fn skip(&mut self, report: &mut PageReport, res: &DiscoveredResource, e: VerifyError) {
        tracing::warn!(url = %res.url, error = %e, "resource skipped");
        self.stats.resources_skipped += 1;
        report.skipped.push(SkippedResource {
            name: res.name.clone(),
            url: res.url.to_string(),
            reason: e.to_string(),
        });
    }
}

fn missing_connection(url: &Url) -> VerifyError {
    VerifyError::ResourceUnavailable(format!("transport reported no connection for {}", url))
}

fn unattributed(url: &Url) -> VerifyError {
    VerifyError::Unattributed {
        url: url.to_string(),
    }
}

fn build_record<R: DnsResolver>(
    resolver: &EndpointResolver<R>,
    name: &str,
    url: &Url,
    connection: &Connection,
) -> Result<VerificationRecord, VerifyError> {
    let claimed = resolver.claimed_identity(url, connection.remote_ip)?;
    let actual_fqdn = resolver.actual_identity(connection.remote_ip);
    let claimed_ip = claimed.ip.to_string();
    let actual_ip = connection.remote_ip.to_string();
    let verdict = classify(&claimed_ip, &actual_ip, &claimed.fqdn, &actual_fqdn);
    Ok(VerificationRecord::new(
        name,
        url.as_str(),
        claimed_ip,
        actual_ip,
        claimed.fqdn,
        actual_fqdn,
        verdict,
    ))
}

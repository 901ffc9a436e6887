//! Run the engine over the requested pages and report the ledger.

use anyhow::{Context, Result};
use columbo_core::config::ColumboConfig;
use columbo_core::engine::Engine;
use columbo_core::report;
use columbo_core::storage::PayloadStore;
use std::io::Write;
use std::path::PathBuf;

use super::OutputFormat;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Save verified payloads here.
    pub save_dir: Option<PathBuf>,
    /// Write the CSV table here.
    pub csv_path: Option<PathBuf>,
    pub format: OutputFormat,
}

pub async fn run_verification(
    cfg: ColumboConfig,
    pages: Vec<String>,
    opts: RunOptions,
) -> Result<()> {
    let store = match &opts.save_dir {
        Some(dir) => Some(PayloadStore::create(dir)?),
        None => None,
    };

    // libcurl and the system resolver block; keep them off the async runtime.
    let (records, stats) = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut engine = Engine::from_config(&cfg, store)?;
        engine.process_pages(&pages);
        let stats = engine.stats();
        Ok((engine.into_ledger().into_records(), stats))
    })
    .await
    .context("verification task join")??;

    if let Some(path) = &opts.csv_path {
        report::write_csv(path, &records)?;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match opts.format {
        OutputFormat::Text => report::write_text(&mut out, &records)?,
        OutputFormat::Json => report::write_json_lines(&mut out, &records)?,
    }
    out.flush()?;

    eprintln!(
        "{} of {} page(s) verified; {} resource(s) discovered, {} verified, {} skipped; {} record(s)",
        stats.pages_verified,
        stats.pages_requested,
        stats.resources_discovered,
        stats.resources_verified,
        stats.resources_skipped,
        records.len()
    );
    Ok(())
}

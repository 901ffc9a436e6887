//! CLI for Columbo.

mod run;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use columbo_core::config::{self, AttributionMode, ColumboConfig};
use std::path::{Path, PathBuf};

use run::{run_verification, RunOptions};

/// Screen output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One `Resource(...)` line per record.
    Text,
    /// One JSON object per record.
    Json,
}

/// Command-line spelling of [`AttributionMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AttributionArg {
    /// The transfer reports its own local port and remote IP.
    Direct,
    /// Diff this process's TCP connection table after each fetch (Linux, sequential).
    ConnectionTable,
}

impl From<AttributionArg> for AttributionMode {
    fn from(a: AttributionArg) -> Self {
        match a {
            AttributionArg::Direct => AttributionMode::Direct,
            AttributionArg::ConnectionTable => AttributionMode::ConnectionTable,
        }
    }
}

/// Find where the src elements of a web page (images, scripts, media) are actually served from.
#[derive(Debug, Parser)]
#[command(name = "columbo")]
#[command(about = "Find where the elements of a web page are actually served from", long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["urls", "individual"])))]
pub struct Cli {
    /// Output directory for saved files and the CSV report (default: current directory).
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Save copies of the files examined.
    #[arg(short, long)]
    pub save: bool,

    /// Write results in CSV format to this file (inside the output directory).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Text file containing URLs to process, one per line.
    #[arg(short, long, value_name = "FILE")]
    pub urls: Option<PathBuf>,

    /// Single URL to process.
    #[arg(short, long, value_name = "URL")]
    pub individual: Option<String>,

    /// Screen output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Fetch up to N resources of a page concurrently (direct attribution only).
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// How fetches are tied to connections; overrides the config file.
    #[arg(long, value_enum)]
    pub attribution: Option<AttributionArg>,
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        cli.apply_overrides(&mut cfg);
        tracing::debug!("effective config: {:?}", cfg);

        let pages = cli.page_urls()?;
        let output_dir = cli.dir.clone().unwrap_or_else(|| PathBuf::from("."));
        if cli.dir.is_some() {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("failed to create {}", output_dir.display()))?;
        }

        let opts = RunOptions {
            save_dir: cli.save.then(|| output_dir.clone()),
            csv_path: cli.output.as_ref().map(|o| output_dir.join(o)),
            format: cli.format,
        };
        run_verification(cfg, pages, opts).await
    }

    /// Command-line flags win over the config file.
    pub fn apply_overrides(&self, cfg: &mut ColumboConfig) {
        if let Some(jobs) = self.jobs {
            cfg.concurrency = jobs;
        }
        if let Some(a) = self.attribution {
            cfg.attribution = a.into();
        }
    }

    fn page_urls(&self) -> Result<Vec<String>> {
        if let Some(url) = &self.individual {
            return Ok(vec![url.clone()]);
        }
        match &self.urls {
            Some(path) => read_url_list(path),
            None => anyhow::bail!("must have a single url (-i) or a list of urls (-u) to process"),
        }
    }
}

fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read url list {}", path.display()))?;
    Ok(parse_url_list(&text))
}

/// One URL per line; blank lines and `#` comments are ignored.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

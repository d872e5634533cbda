//! Cache command - inspect a host's persisted SNMP walks and sections.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use hostfetch_core::{HostName, SectionName};
use hostfetch_sources::SnmpFetcherConfig;
use hostfetch_store::{WalkCacheKey, default_cache_dir, list_files, list_section_cache};
use tracing::debug;

use crate::output::{CacheReport, JsonFormatter, SectionReport, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the cache command.
#[derive(Args)]
pub struct CacheArgs {
    /// Host whose caches are listed.
    pub host: String,

    /// Cache root (defaults to the user cache directory).
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// SNMP fetcher configuration (JSON) providing paths and intervals.
    #[arg(long, conflicts_with = "base")]
    pub config: Option<PathBuf>,
}

/// Runs the cache command.
pub async fn run(args: &CacheArgs, cli: &Cli) -> Result<ExitCode> {
    let host = HostName::new(&args.host)
        .with_context(|| format!("Invalid host name '{}'", args.host))?;
    let config = load_config(args).await?;

    let report = build_report(&config, &host, Utc::now()).await?;
    let output = match cli.format {
        OutputFormat::Json => JsonFormatter::new(cli.pretty).format_cache(&report)?,
        OutputFormat::Text => TextFormatter::new(!cli.no_color).format_cache(&report),
    };
    println!("{output}");

    Ok(ExitCode::Success)
}

async fn load_config(args: &CacheArgs) -> Result<SnmpFetcherConfig> {
    if let Some(path) = &args.config {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()));
    }
    let base = args.base.clone().unwrap_or_else(default_cache_dir);
    Ok(SnmpFetcherConfig::new(base))
}

/// Collects what is on disk for `host`, judged at `now`.
pub async fn build_report(
    config: &SnmpFetcherConfig,
    host: &HostName,
    now: DateTime<Utc>,
) -> Result<CacheReport> {
    let walk_cache_dir = config.walk_cache_path(host);
    let mut walks = Vec::new();
    for (name, _) in list_files(&walk_cache_dir).await? {
        match WalkCacheKey::from_file_name(&name) {
            Ok(key) => walks.push(key),
            Err(e) => debug!(file = %name, error = %e, "Skipping foreign file"),
        }
    }
    walks.sort();

    let section_cache_dir = config.section_cache_path(host);
    let intervals = config.intervals_for(host);
    let sections = list_section_cache(&section_cache_dir)
        .await?
        .into_iter()
        .map(|entry| {
            let validity = SectionName::new(&entry.section)
                .ok()
                .and_then(|name| intervals.get(&name).copied());
            SectionReport::new(entry, validity, now)
        })
        .collect();

    Ok(CacheReport {
        hostname: host.clone(),
        walk_cache_dir,
        walks,
        section_cache_dir,
        sections,
    })
}

//! Fetch command - run one job and print its payload.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use hostfetch_core::{HostName, Mode};
use hostfetch_fetch::{
    AnyTrigger, Cancelled, FetchResult, Fetcher, FetcherTrigger, FileCache, SecretsProvider,
    TimeoutFetcherTrigger,
};
use hostfetch_store::{DiskFileCache, FileCacheConfig, NoCache, RawCodec, default_cache_dir};
use tracing::{debug, info, warn};

use crate::job::{FetchJob, JobFetcher, secrets_provider};
use crate::output::{FetchOutcome, FetchReport, JsonFormatter, Payload, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Directory for file caches whose job names none, below the cache root.
const DEFAULT_FILE_CACHE_DIR: &str = "raw";

/// Arguments for the fetch command.
#[derive(Args)]
pub struct FetchArgs {
    /// Job file (JSON).
    pub job: PathBuf,

    /// Fetch mode (checking, discovery, inventory, rtc, force_sections, none).
    #[arg(long, short, default_value = "checking")]
    pub mode: Mode,

    /// Cancel the fetch after this many seconds.
    #[arg(long, short)]
    pub timeout: Option<u64>,
}

/// What every fetcher of a job shares.
struct JobContext<'a> {
    hostname: &'a HostName,
    file_cache: Option<&'a FileCacheConfig>,
    secrets: &'a dyn SecretsProvider,
    trigger: AnyTrigger,
    mode: Mode,
}

/// Runs the fetch command.
pub async fn run(args: &FetchArgs, cli: &Cli) -> Result<ExitCode> {
    let FetchJob {
        hostname,
        fetcher,
        file_cache,
        secrets,
    } = FetchJob::load(&args.job)?;

    let secrets = secrets_provider(secrets.as_ref());
    let ctx = JobContext {
        hostname: &hostname,
        file_cache: file_cache.as_ref(),
        secrets: secrets.as_ref(),
        trigger: trigger_for(args.timeout),
        mode: args.mode,
    };
    info!(host = %hostname, mode = %args.mode, trigger = ctx.trigger.ident(), "Running fetch job");

    let (fetcher_type, result) = match fetcher {
        JobFetcher::Snmp(job) => {
            let mut fetcher = job.into_fetcher();
            let result = execute(&mut fetcher, &ctx).await;
            (fetcher.fetcher_type(), settle(result, Payload::Snmp))
        }
        JobFetcher::Program(mut fetcher) => {
            let result = execute(&mut fetcher, &ctx).await;
            (fetcher.fetcher_type(), settle(result, Payload::Agent))
        }
        JobFetcher::Tcp(mut fetcher) => {
            let result = execute(&mut fetcher, &ctx).await;
            (fetcher.fetcher_type(), settle(result, Payload::Agent))
        }
        JobFetcher::Piggyback(mut fetcher) => {
            let result = execute(&mut fetcher, &ctx).await;
            (fetcher.fetcher_type(), settle(result, Payload::Agent))
        }
    };

    let exit_code = match &result {
        FetchOutcome::Payload(_) => ExitCode::Success,
        FetchOutcome::Fault { .. } => ExitCode::FetchFault,
        FetchOutcome::Cancelled(_) => ExitCode::Cancelled,
    };
    let report = FetchReport {
        hostname: hostname.clone(),
        fetcher: fetcher_type,
        mode: args.mode,
        trigger: ctx.trigger.ident(),
        outcome: result,
    };

    let output = match cli.format {
        OutputFormat::Json => JsonFormatter::new(cli.pretty).format_fetch(&report)?,
        OutputFormat::Text => TextFormatter::new(!cli.no_color).format_fetch(&report),
    };
    println!("{output}");

    Ok(exit_code)
}

/// The trigger for an optional deadline in seconds.
fn trigger_for(timeout: Option<u64>) -> AnyTrigger {
    match timeout {
        Some(timeout) => AnyTrigger::Timeout(TimeoutFetcherTrigger { timeout }),
        None => AnyTrigger::default(),
    }
}

/// Runs one fetcher through the job's trigger, cache and secrets.
async fn execute<F>(
    fetcher: &mut F,
    ctx: &JobContext<'_>,
) -> Result<FetchResult<F::RawData>, Cancelled>
where
    F: Fetcher,
    F::RawData: RawCodec,
{
    let cache = file_cache::<F::RawData>(ctx.hostname, ctx.file_cache);
    ctx.trigger
        .get_raw_data(cache.as_ref(), fetcher, ctx.mode, ctx.secrets)
        .await
}

/// A disk cache if the job configures one.
fn file_cache<T: RawCodec + 'static>(
    hostname: &HostName,
    config: Option<&FileCacheConfig>,
) -> Box<dyn FileCache<T>> {
    match config {
        Some(config) => {
            let directory = config
                .directory
                .clone()
                .unwrap_or_else(|| default_cache_dir().join(DEFAULT_FILE_CACHE_DIR));
            debug!(directory = %directory.display(), "Using file cache");
            Box::new(DiskFileCache::from_config(
                hostname.clone(),
                &directory,
                config,
            ))
        }
        None => Box::new(NoCache::new(hostname.clone())),
    }
}

/// Turns a trigger result into something printable.
fn settle<T>(
    result: Result<FetchResult<T>, Cancelled>,
    payload: impl FnOnce(T) -> Payload,
) -> FetchOutcome {
    match result {
        Ok(Ok(raw)) => FetchOutcome::Payload(payload(raw)),
        Ok(Err(err)) => {
            warn!(kind = err.kind(), error = %err, "Fetch failed");
            FetchOutcome::Fault {
                kind: err.kind(),
                message: err.to_string(),
            }
        }
        Err(cancelled) => {
            warn!(reason = %cancelled.reason, "Fetch cancelled");
            FetchOutcome::Cancelled(cancelled.reason)
        }
    }
}

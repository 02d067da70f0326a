//! Command-line interface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use reelharvest_browser::ChromiumEngine;
use reelharvest_core::{
    load_proxies, load_urls, parse_proxy_line, validate_urls, AppConfig, RunSummary,
};
use reelharvest_proxy::{GatewaySource, ProxySource, RoundRobinRotation};
use reelharvest_scanner::{ListingCrawler, ScrapeOrchestrator};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::output::{classify_urls, resolve_concurrency, timestamped_path, write_url_list, CsvSink};

#[derive(Parser)]
#[command(name = "reelharvest")]
#[command(about = "Scrape short-video items and creator profiles through rotating proxies")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "REELHARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long, global = true)]
    visible: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape item and profile URLs into a CSV file
    Scrape {
        /// File with one URL per line
        #[arg(short, long)]
        urls: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Discover item URLs from hashtag listings
    Discover {
        /// Hashtags to search, comma separated (leading # optional)
        #[arg(long, value_delimiter = ',', required = true)]
        hashtags: Vec<String>,

        /// Overall number of item URLs to collect across all hashtags
        #[arg(long)]
        max_videos: Option<usize>,

        /// Where to write the discovered URLs
        #[arg(long)]
        url_output: Option<PathBuf>,

        /// Scrape the discovered URLs right away
        #[arg(long)]
        scrape: bool,

        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// File with one ADDRESS:PORT:USERNAME:PASSWORD proxy per line
    #[arg(short, long, conflicts_with = "gateway")]
    proxies: Option<PathBuf>,

    /// Rotating gateway as ADDRESS:PORT:USERNAME:PASSWORD
    #[arg(long, env = "REELHARVEST_GATEWAY")]
    gateway: Option<String>,

    /// CSV output path (timestamped name by default)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Concurrent workers (config value, else chosen from the URL count)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Retries per URL, each on a fresh proxy
    #[arg(long)]
    max_retries: Option<u32>,

    /// Do not visit creator profiles for item URLs
    #[arg(long)]
    skip_profiles: bool,
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    config.apply_env();
    if cli.visible {
        config.browser.headless = false;
    }

    match cli.command {
        Commands::Scrape { urls, run } => {
            apply_run_args(&mut config, &run);
            let urls = load_urls(&urls)?;
            scrape(&config, &run, urls).await
        }
        Commands::Discover {
            hashtags,
            max_videos,
            url_output,
            scrape: then_scrape,
            run,
        } => {
            apply_run_args(&mut config, &run);
            let total = max_videos.or(config.discovery.max_items);
            let urls = discover(&config, &run, &hashtags, total).await?;

            let url_output = url_output.unwrap_or_else(|| timestamped_path("discovered", "txt"));
            write_url_list(&url_output, &urls)?;
            info!(path = %url_output.display(), count = urls.len(), "discovered URLs written");

            if then_scrape && !urls.is_empty() {
                scrape(&config, &run, urls).await?;
            }
            Ok(())
        }
    }
}

fn apply_run_args(config: &mut AppConfig, run: &RunArgs) {
    if run.skip_profiles {
        config.scraping.skip_profile_enrichment = true;
    }
    if let Some(retries) = run.max_retries {
        config.scraping.max_retries = retries;
    }
}

fn proxy_source(config: &AppConfig, run: &RunArgs) -> anyhow::Result<Arc<dyn ProxySource>> {
    if let Some(gateway) = &run.gateway {
        let endpoint = parse_proxy_line(gateway).context("parsing --gateway")?;
        info!(gateway = %endpoint, "using rotating gateway");
        return Ok(Arc::new(GatewaySource::new(endpoint)));
    }

    let Some(path) = &run.proxies else {
        bail!("either --proxies or --gateway is required");
    };
    let proxies = load_proxies(path)?;

    let rotation =
        RoundRobinRotation::with_threshold(proxies, config.scraping.forced_rotation_threshold)?;
    Ok(Arc::new(rotation))
}

async fn scrape(config: &AppConfig, run: &RunArgs, urls: Vec<String>) -> anyhow::Result<()> {
    for problem in validate_urls(&urls) {
        warn!("{problem}");
    }

    let (items, profiles) = classify_urls(&urls);
    let concurrency =
        resolve_concurrency(run.concurrency, config.scraping.concurrency, urls.len());
    info!(
        total = urls.len(),
        items,
        profiles,
        concurrency,
        skip_profiles = config.scraping.skip_profile_enrichment,
        "starting scrape"
    );

    let source = proxy_source(config, run)?;
    let output = run
        .output
        .clone()
        .unwrap_or_else(|| timestamped_path("results", "csv"));
    let sink = CsvSink::create(&output)?;

    let engine = Arc::new(ChromiumEngine::launch(&config.browser).await?);
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::task::spawn_blocking(move || sink.consume(rx));

    let orchestrator =
        ScrapeOrchestrator::new(Arc::clone(&engine), source, config).with_events(tx);
    let results = orchestrator.run(&urls, concurrency).await;
    drop(orchestrator);

    let written = writer.await.context("CSV writer task")??;
    shutdown(engine).await;

    let results = results?;
    let summary = RunSummary::from_results(&results);
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        rows = written,
        output = %output.display(),
        "scrape complete"
    );
    Ok(())
}

async fn discover(
    config: &AppConfig,
    run: &RunArgs,
    hashtags: &[String],
    total: Option<usize>,
) -> anyhow::Result<Vec<String>> {
    let queries: Vec<String> = hashtags
        .iter()
        .map(|h| h.trim().trim_start_matches('#').to_string())
        .filter(|h| !h.is_empty())
        .collect();
    if queries.is_empty() {
        bail!("no hashtags given");
    }
    info!(hashtags = ?queries, total = ?total, "starting discovery");

    let source = proxy_source(config, run)?;
    let engine = Arc::new(ChromiumEngine::launch(&config.browser).await?);
    let crawler = ListingCrawler::new(config);

    let urls = crawler
        .discover_all(engine.as_ref(), source.as_ref(), &queries, total)
        .await;
    shutdown(engine).await;

    Ok(urls?)
}

async fn shutdown(engine: Arc<ChromiumEngine>) {
    match Arc::try_unwrap(engine) {
        Ok(engine) => engine.shutdown().await,
        Err(_) => warn!("browser still in use at exit, leaving it to the OS"),
    }
}


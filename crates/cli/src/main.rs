mod echo;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use estela_core::{
    CaptureHistory, CaptureStore, FetchConfig, FsStore, Outcome, Pipeline, PipelineConfig, RawPage, Snapshot, SourceLocks,
    fetch_page, read_file_page, read_stdin_page, render_markdown,
};
use owo_colors::OwoColorize;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::echo::*;

pub(crate) const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capture web articles into versioned, deduplicated snapshots
#[derive(Parser, Debug)]
#[command(name = "estela")]
#[command(author = "Estela Contributors")]
#[command(version)]
#[command(about = "Capture web articles into versioned snapshots", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Pipeline configuration file (default: <config dir>/estela/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Snapshot store directory (overrides the configured root)
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value = "20", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, global = true, value_name = "UA")]
    user_agent: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one capture cycle
    Capture {
        /// URL to fetch, local HTML file, or "-" for stdin
        #[arg(value_name = "INPUT")]
        input: String,

        /// Source URL to record the capture under (default: the input)
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// Print the rendered artifact of a new version to stdout
        #[arg(long)]
        print: bool,
    },
    /// Capture sources repeatedly
    Watch {
        /// Source URLs to poll
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Seconds between rounds
        #[arg(long, default_value = "900", value_name = "SECS")]
        every: u64,

        /// Stop after this many rounds (default: run until interrupted)
        #[arg(long, value_name = "N")]
        rounds: Option<u32>,
    },
    /// List the stored versions of a source
    History {
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Print the markdown artifact of a stored version
    Show {
        #[arg(value_name = "URL")]
        url: String,

        /// Version to show (default: latest)
        #[arg(long, value_name = "N")]
        version: Option<u32>,
    },
}

/// Everything a subcommand needs, resolved from flags and config
struct Session {
    config: PipelineConfig,
    store: FsStore,
    fetch: FetchConfig,
    verbose: bool,
}

impl Session {
    fn from_args(args: &Args) -> anyhow::Result<Self> {
        let config = match &args.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => PipelineConfig::load_default().context("Failed to load default config")?,
        };

        let root = args.store.clone().unwrap_or_else(|| config.store.root.clone());
        let store =
            FsStore::open(&root).with_context(|| format!("Failed to open store at {}", root.display()))?;

        let mut fetch = FetchConfig { timeout: args.timeout, ..Default::default() };
        if let Some(user_agent) = &args.user_agent {
            fetch.user_agent = user_agent.clone();
        }

        debug!(store = %root.display(), sites = config.sites.len(), timeout = fetch.timeout, "cli.session");
        Ok(Self { config, store, fetch, verbose: args.verbose })
    }

    fn pipeline(&self) -> Pipeline<FsStore> {
        Pipeline::new(&self.config, self.store.clone())
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "estela=debug,estela_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn is_http(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Reads the page named by `input`, recorded under `url` when given
async fn read_input(input: &str, url: Option<&str>, fetch: &FetchConfig) -> anyhow::Result<RawPage> {
    if input == "-" {
        let source_url = url.context("--url is required when reading from stdin")?;
        return read_stdin_page(source_url).context("Failed to read from stdin");
    }

    if is_http(input) {
        let mut page = fetch_page(input, fetch).await.with_context(|| format!("Failed to fetch {input}"))?;
        if let Some(url) = url {
            page.source_url = url.to_string();
        }
        return Ok(page);
    }

    let path = Path::new(input);
    let source_url = match url {
        Some(url) => url.to_string(),
        None => file_url(path)?,
    };
    read_file_page(path, &source_url).with_context(|| format!("Failed to read file: {input}"))
}

fn file_url(path: &Path) -> anyhow::Result<String> {
    let absolute = path.canonicalize().with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(format!("file://{}", absolute.display()))
}

async fn capture(ctx: &Session, input: &str, url: Option<&str>, print: bool) -> anyhow::Result<()> {
    let started = Instant::now();

    if ctx.verbose {
        let source = if is_http(input) {
            format!("Fetching {}", input.bright_white().underline())
        } else {
            format!("Reading {}", input.bright_white())
        };
        print_step(1, 3, &source);
    }

    let page = read_input(input, url, &ctx.fetch).await?;

    if ctx.verbose {
        print_field("Size", &format_size(page.raw_markup.len()));
        print_field("Source", &page.source_url);
        eprintln!();
        print_step(2, 3, "Extracting and versioning");
    }

    let outcome =
        ctx.pipeline().process(&page).with_context(|| format!("Capture of {} failed", page.source_url))?;

    if ctx.verbose {
        print_step(3, 3, "Reporting");
    }

    match outcome {
        Outcome::Persisted(snapshot) => {
            let artifact = ctx.store.artifact_path(&snapshot);
            print_success(&format!("Stored v{} of {}", snapshot.version, snapshot.source_url));
            print_field("Artifact", &artifact.display().to_string());
            if ctx.verbose {
                print_snapshot_details(&snapshot);
            }
            if print {
                print!("{}", render_markdown(&snapshot));
            }
        }
        Outcome::Unchanged { version } => {
            print_info(&format!("Unchanged since v{version} of {}", page.source_url));
        }
    }

    if ctx.verbose {
        print_timing("Total", started.elapsed());
    }

    Ok(())
}

async fn watch(ctx: &Session, urls: &[String], every: u64, rounds: Option<u32>) -> anyhow::Result<()> {
    if let Some(url) = urls.iter().find(|url| !is_http(url)) {
        bail!("watch only polls http(s) URLs, got {url}");
    }

    let pipeline = Arc::new(ctx.pipeline());
    let locks = Arc::new(SourceLocks::new());
    let mut interval = tokio::time::interval(Duration::from_secs(every.max(1)));
    let mut round = 0;

    loop {
        interval.tick().await;
        round += 1;
        if ctx.verbose {
            print_info(&format!("Round {round}: polling {} sources", urls.len()));
        }

        let mut tasks = tokio::task::JoinSet::new();
        for url in urls {
            let url = url.clone();
            let fetch = ctx.fetch.clone();
            let pipeline = Arc::clone(&pipeline);
            let locks = Arc::clone(&locks);

            tasks.spawn(async move {
                let result = async {
                    let page = fetch_page(&url, &fetch).await?;
                    let outcome = tokio::task::spawn_blocking(move || pipeline.process_locked(&page, &locks)).await??;
                    anyhow::Ok(outcome)
                }
                .await;
                (url, result)
            });
        }

        let mut failures = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((url, Ok(Outcome::Persisted(snapshot)))) => {
                    print_success(&format!("Stored v{} of {url}", snapshot.version))
                }
                Ok((url, Ok(Outcome::Unchanged { version }))) => {
                    print_info(&format!("Unchanged since v{version} of {url}"))
                }
                Ok((url, Err(e))) => {
                    failures += 1;
                    print_error(&format!("{url}: {e:#}"));
                }
                Err(e) => {
                    failures += 1;
                    print_error(&format!("capture task failed: {e}"));
                }
            }
        }

        if failures > 0 {
            print_warning(&format!("{failures} of {} sources failed in round {round}", urls.len()));
        }

        if rounds.is_some_and(|limit| round >= limit) {
            return Ok(());
        }
    }
}

fn history(ctx: &Session, url: &str) -> anyhow::Result<()> {
    let versions = ctx.store.list_versions(url).with_context(|| format!("Failed to list versions of {url}"))?;
    if versions.is_empty() {
        bail!("No snapshots stored for {url}");
    }

    for version in versions {
        let snapshot = load_snapshot(ctx, url, Some(version))?;
        let extracted = snapshot.extracted_at.format(&Rfc3339).context("Failed to format timestamp")?;
        println!(
            "v{}\t{}\t{} bloques\t{} notas\t{} imágenes\t{}",
            snapshot.version,
            extracted,
            snapshot.content.blocks.len(),
            snapshot.content.footnotes.len(),
            snapshot.image_count(),
            ctx.store.artifact_path(&snapshot).display()
        );
    }

    Ok(())
}

fn load_snapshot(ctx: &Session, url: &str, version: Option<u32>) -> anyhow::Result<Snapshot> {
    let found = match version {
        Some(version) => ctx.store.get(url, version),
        None => ctx.store.get_latest(url),
    }
    .with_context(|| format!("Failed to read snapshot of {url}"))?;

    match (found, version) {
        (Some(snapshot), _) => Ok(snapshot),
        (None, Some(version)) => bail!("No version {version} stored for {url}"),
        (None, None) => bail!("No snapshots stored for {url}"),
    }
}

fn show(ctx: &Session, url: &str, version: Option<u32>) -> anyhow::Result<()> {
    let snapshot = load_snapshot(ctx, url, version)?;
    print!("{}", render_markdown(&snapshot));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let ctx = Session::from_args(&args)?;

    match &args.command {
        Command::Capture { input, url, print } => capture(&ctx, input, url.as_deref(), *print).await,
        Command::Watch { urls, every, rounds } => watch(&ctx, urls, *every, *rounds).await,
        Command::History { url } => history(&ctx, url),
        Command::Show { url, version } => show(&ctx, url, *version),
    }
}

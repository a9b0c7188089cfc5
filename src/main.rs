use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hashtag_scraper::browser::ChromiumSession;
use hashtag_scraper::collector::{self, CollectionResult, FeedQuery};
use hashtag_scraper::config::Config;
use hashtag_scraper::constants::{DEFAULT_MAX_POSTS, DEFAULT_MAX_SCROLLS};

#[derive(Parser)]
#[command(name = "hashtag-scraper", about = "Collect posts tagged with a hashtag", version)]
struct Cli {
    /// Hashtag to collect, without the leading '#'
    hashtag: String,

    /// Number of scroll iterations used to expand the feed
    #[arg(long, default_value_t = DEFAULT_MAX_SCROLLS)]
    max_scrolls: u32,

    /// Maximum number of posts to collect
    #[arg(long, default_value_t = DEFAULT_MAX_POSTS)]
    max_posts: usize,

    /// Driver name to look up in the driver table
    #[arg(long, env = "BROWSER_DRIVER")]
    driver: Option<String>,

    /// Browser executable, bypassing the driver table
    #[arg(long, env = "BROWSER_PATH")]
    browser_path: Option<PathBuf>,

    /// Print the collected posts as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(driver) = cli.driver {
        config.driver = driver;
    }
    if let Some(path) = cli.browser_path {
        config.browser_path = Some(path);
    }
    config.validate().context("Invalid configuration")?;

    let query = FeedQuery::new(&cli.hashtag, cli.max_scrolls, cli.max_posts)
        .context("Invalid arguments")?;
    let settings = config.collector_settings();
    let session_config = config
        .session_config()
        .context("Failed to select browser executable")?;

    info!(
        hashtag = %query.hashtag(),
        max_scrolls = query.max_scrolls(),
        max_posts = query.max_posts(),
        driver = %config.driver,
        "Starting collection"
    );

    let session = ChromiumSession::launch(&session_config)
        .await
        .context("Failed to start browser session")?;

    let outcome = tokio::select! {
        result = collector::collect(&session, &settings, &query) => Some(result),
        () = shutdown_signal() => None,
    };

    // Release the browser on every path before reporting
    session.close().await;

    let Some(result) = outcome else {
        warn!("Interrupted before collection finished");
        anyhow::bail!("interrupted");
    };
    let result = result.context("Collection failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&result.posts)
            .context("Failed to serialize posts")?;
        println!("{json}");
    }
    print_summary(&result);

    Ok(())
}

fn print_summary(result: &CollectionResult) {
    println!("Total: {} post(s)", result.posts.len());
    println!("Total: {} error(s)", result.error_count);
    println!("Total: {} second(s)", result.elapsed_seconds);
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hashtag_scraper=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

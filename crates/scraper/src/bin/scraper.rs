//! newsflow-scraper — blocking TradingView fetch loop on a worker thread,
//! publishing fresh articles to `tv_articles` through a bounded handoff
//! channel.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use newsflow_broker::{Broker, BrokerConfig};
use newsflow_core::queues::QUEUE_TV_ARTICLES;
use newsflow_core::{logging, signals};
use newsflow_scraper::{publish_articles, scrape_loop, ScrapeConfig, ShutdownFlag, TradingViewFetcher};

/// Bound of the fetcher→publisher handoff channel; a full channel blocks
/// the fetcher thread, which is the intended backpressure.
const HANDOFF_CAPACITY: usize = 64;

/// How long to wait for the worker thread to come home.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Scraper worker — fetches TradingView news and feeds the raw queue.
#[derive(Parser, Debug)]
#[command(name = "newsflow-scraper", version, about)]
struct Cli {
    #[arg(long, env = "RABBITMQ_HOST", default_value = "rabbitmq")]
    rabbitmq_host: String,

    #[arg(long, env = "RABBITMQ_USER", default_value = "admin")]
    rabbitmq_user: String,

    #[arg(long, env = "RABBITMQ_PASS", default_value = "password", hide_env_values = true)]
    rabbitmq_pass: String,

    /// Connect retry budget in seconds.
    #[arg(long, env = "MQ_CONNECT_TIMEOUT", default_value_t = 60)]
    mq_connect_timeout: u64,

    #[arg(long, env = "SELENIUM_HUB_URL", default_value = "http://selenium-hub:4444/wd/hub")]
    selenium_hub_url: String,

    #[arg(long, env = "TRADE_VIEW_USER")]
    trade_view_user: String,

    #[arg(long, env = "TRADE_VIEW_PASS", hide_env_values = true)]
    trade_view_pass: String,

    /// Seconds between scans.
    #[arg(long, env = "SCRAPE_INTERVAL", default_value_t = 10)]
    scrape_interval: u64,

    /// Login retry budget in seconds.
    #[arg(long, env = "LOGIN_RETRY_TIMEOUT", default_value_t = 60)]
    login_retry_timeout: u64,

    #[arg(long, env = "COOKIES_PATH", default_value = "output/trading_view_cookies.json")]
    cookies_path: PathBuf,

    #[arg(long, env = "SCRAPER_OUTPUT_DIR", default_value = "output/trading_view")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init("scraper");

    info!("connecting to broker");
    let broker_config = BrokerConfig::new(&cli.rabbitmq_host, &cli.rabbitmq_user, &cli.rabbitmq_pass)
        .with_connect_timeout(Duration::from_secs(cli.mq_connect_timeout));
    let broker = Arc::new(
        Broker::connect(&broker_config)
            .await
            .context("failed to connect to RabbitMQ")?,
    );
    broker.declare_queue(QUEUE_TV_ARTICLES).await?;

    let fetcher = TradingViewFetcher::new(
        &cli.selenium_hub_url,
        &cli.trade_view_user,
        &cli.trade_view_pass,
        &cli.cookies_path,
        &cli.output_dir,
    );

    let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
    let thread_stop = Arc::new(ShutdownFlag::new());
    let (loop_stop_tx, loop_stop_rx) = watch::channel(false);

    let scrape_config = ScrapeConfig {
        interval: Duration::from_secs(cli.scrape_interval),
        login_retry_timeout: Duration::from_secs(cli.login_retry_timeout),
        ..ScrapeConfig::default()
    };
    let worker_stop = thread_stop.clone();
    let worker = std::thread::Builder::new()
        .name("scraper-worker".into())
        .spawn(move || scrape_loop(fetcher, tx, &worker_stop, &scrape_config))
        .context("failed to spawn scraper worker thread")?;

    let publisher_broker = broker.clone();
    let mut publisher = tokio::spawn(async move {
        publish_articles(publisher_broker, QUEUE_TV_ARTICLES, rx, loop_stop_rx).await
    });

    // Run until a signal arrives or the publisher dies on a broker error.
    let early_outcome = tokio::select! {
        _ = signals::wait_for_shutdown_signal() => {
            info!("shutdown signal received");
            None
        }
        joined = &mut publisher => {
            warn!("publisher exited early");
            Some(joined.context("publisher task panicked")?)
        }
    };

    thread_stop.set();
    let _ = loop_stop_tx.send(true);

    // On a signal, the publisher drains the handoff channel before returning.
    let outcome = match early_outcome {
        Some(outcome) => outcome,
        None => publisher.await.context("publisher task panicked")?,
    };

    info!(published = outcome.published, "publisher drained");
    if let Some(article) = outcome.leftover {
        warn!(title = %article.title, "article left unpublished by broker failure");
    }

    broker.shutdown().await;

    // The worker observes the stop flag within one cadence wait; give it a
    // bounded join so a hung browser call cannot wedge shutdown.
    let join = tokio::task::spawn_blocking(move || worker.join());
    match tokio::time::timeout(JOIN_TIMEOUT, join).await {
        Ok(Ok(Ok(()))) => info!("worker thread joined"),
        Ok(Ok(Err(_))) => warn!("worker thread panicked"),
        Ok(Err(e)) => warn!(error = %e, "worker join task failed"),
        Err(_) => warn!(timeout = ?JOIN_TIMEOUT, "worker thread did not stop in time, detaching"),
    }

    info!("shutdown complete");
    Ok(())
}

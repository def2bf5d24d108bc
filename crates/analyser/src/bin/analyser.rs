//! newsflow-analyser — consumes raw articles from `tv_articles`, enriches
//! them with a DeepSeek analysis, publishes enriched articles to
//! `processed_articles`, and pushes results to the optional gateway.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use newsflow_analyser::{
    AnalyserStage, ArticleAnalyser, DeepSeekClient, GatewayClient, MockTradeExecutor, TradePolicy,
};
use newsflow_broker::{Broker, BrokerConfig, QueueConsumer};
use newsflow_core::queues::{QUEUE_PROCESSED_ARTICLES, QUEUE_TV_ARTICLES};
use newsflow_core::{logging, signals};

/// Analyser worker — LLM enrichment between the raw and processed queues.
#[derive(Parser, Debug)]
#[command(name = "newsflow-analyser", version, about)]
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

    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    deepseek_api_key: String,

    /// Analysis prompt file, loaded once at startup.
    #[arg(long, env = "PROMPT_PATH", default_value = "prompts/analysis.txt")]
    prompt_path: PathBuf,

    /// Optional gateway endpoint; absent means no external push.
    #[arg(long, env = "AWS_GATEWAY_ENDPOINT")]
    aws_gateway_endpoint: Option<String>,

    /// Also publish enriched messages that carry no structured block.
    #[arg(long, env = "PUBLISH_UNSTRUCTURED", default_value_t = false)]
    publish_unstructured: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init("analyser");

    info!("connecting to broker");
    let broker_config = BrokerConfig::new(&cli.rabbitmq_host, &cli.rabbitmq_user, &cli.rabbitmq_pass)
        .with_connect_timeout(Duration::from_secs(cli.mq_connect_timeout));
    let broker = Arc::new(
        Broker::connect(&broker_config)
            .await
            .context("failed to connect to RabbitMQ")?,
    );
    broker.declare_queue(QUEUE_TV_ARTICLES).await?;
    broker.declare_queue(QUEUE_PROCESSED_ARTICLES).await?;

    info!("creating deepseek analyser");
    let llm = Arc::new(DeepSeekClient::new(cli.deepseek_api_key));
    let analyser = ArticleAnalyser::from_prompt_file(llm, &cli.prompt_path)
        .with_context(|| format!("failed to read prompt file {}", cli.prompt_path.display()))?;

    let policy = TradePolicy::new(MockTradeExecutor::default());

    let gateway = match cli.aws_gateway_endpoint {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "gateway push enabled");
            Some(GatewayClient::new(endpoint))
        }
        None => {
            info!("no gateway endpoint configured, analysis results will not be pushed");
            None
        }
    };

    let stage = Arc::new(
        AnalyserStage::new(
            analyser,
            policy,
            broker.clone(),
            QUEUE_PROCESSED_ARTICLES,
            gateway,
        )
        .publish_unstructured(cli.publish_unstructured),
    );

    let consumer =
        QueueConsumer::new(broker.channel().clone(), QUEUE_TV_ARTICLES).with_handler(stage);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        signals::wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        let _ = stop_tx.send(true);
    });

    consumer.run(stop_rx).await?;

    broker.shutdown().await;
    info!("shutdown complete");
    Ok(())
}

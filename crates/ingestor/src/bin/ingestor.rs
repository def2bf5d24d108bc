//! newsflow-ingestor — consumes enriched articles from `processed_articles`
//! and writes them to Weaviate and Postgres, idempotently per article id.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use newsflow_broker::{Broker, BrokerConfig, QueueConsumer};
use newsflow_core::queues::QUEUE_PROCESSED_ARTICLES;
use newsflow_core::{logging, signals};
use newsflow_ingestor::{PgSink, VectorSink};
use newsflow_store::{HttpEmbedder, PgConfig, PgStore, WeaviateClient, WeaviateConfig};

/// Ingestor worker — dual-sink persistence for enriched articles.
#[derive(Parser, Debug)]
#[command(name = "newsflow-ingestor", version, about)]
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

    #[arg(long, env = "POSTGRES_HOST", default_value = "postgres")]
    postgres_host: String,

    #[arg(long, env = "POSTGRES_PORT", default_value_t = 5432)]
    postgres_port: u16,

    #[arg(long, env = "POSTGRES_USER", default_value = "postgres")]
    postgres_user: String,

    #[arg(long, env = "POSTGRES_PASSWORD", default_value = "password", hide_env_values = true)]
    postgres_password: String,

    #[arg(long, env = "POSTGRES_DB", default_value = "postgres")]
    postgres_db: String,

    #[arg(long, env = "PG_TABLE", default_value = "articles")]
    pg_table: String,

    #[arg(long, env = "WEAVIATE_HOST", default_value = "weaviate")]
    weaviate_host: String,

    #[arg(long, env = "WEAVIATE_HTTP_PORT", default_value_t = 8080)]
    weaviate_http_port: u16,

    #[arg(long, env = "WEAVIATE_GRPC_PORT", default_value_t = 50051)]
    weaviate_grpc_port: u16,

    #[arg(long, env = "WEAVIATE_CLASS_NAME", default_value = "articles")]
    weaviate_class_name: String,

    #[arg(long, env = "EMBEDDING_URL", default_value = "http://localhost:11434")]
    embedding_url: String,

    #[arg(long, env = "EMBEDDING_MODEL", default_value = "bge-base-zh-v1.5")]
    embedding_model: String,

    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value_t = 768)]
    embedding_dimensions: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init("ingestor");

    let weaviate_config = WeaviateConfig {
        host: cli.weaviate_host.clone(),
        http_port: cli.weaviate_http_port,
        grpc_port: cli.weaviate_grpc_port,
        class_name: cli.weaviate_class_name.clone(),
    };
    info!(url = %weaviate_config.base_url(), "connecting to Weaviate");
    let weaviate = Arc::new(WeaviateClient::new(&weaviate_config));
    weaviate
        .ensure_collection()
        .await
        .context("failed to bootstrap Weaviate collection")?;

    let pg_config = PgConfig {
        host: cli.postgres_host.clone(),
        port: cli.postgres_port,
        user: cli.postgres_user.clone(),
        password: cli.postgres_password.clone(),
        database: cli.postgres_db.clone(),
        table: cli.pg_table.clone(),
    };
    info!(host = %pg_config.host, database = %pg_config.database, "connecting to Postgres");
    let pg = Arc::new(
        PgStore::connect(&pg_config)
            .await
            .context("failed to connect to Postgres")?,
    );
    pg.ensure_table()
        .await
        .context("failed to bootstrap articles table")?;

    let embedder = Arc::new(HttpEmbedder::new(
        cli.embedding_url.clone(),
        cli.embedding_model.clone(),
        cli.embedding_dimensions,
    ));

    info!("connecting to broker");
    let broker_config = BrokerConfig::new(&cli.rabbitmq_host, &cli.rabbitmq_user, &cli.rabbitmq_pass)
        .with_connect_timeout(Duration::from_secs(cli.mq_connect_timeout));
    let broker = Broker::connect(&broker_config)
        .await
        .context("failed to connect to RabbitMQ")?;
    broker.declare_queue(QUEUE_PROCESSED_ARTICLES).await?;

    let consumer = QueueConsumer::new(broker.channel().clone(), QUEUE_PROCESSED_ARTICLES)
        .with_handler(Arc::new(VectorSink::new(weaviate.clone(), embedder)))
        .with_handler(Arc::new(PgSink::new(pg.clone())));

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        signals::wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        let _ = stop_tx.send(true);
    });

    consumer.run(stop_rx).await?;

    broker.shutdown().await;
    pg.close().await;
    info!("shutdown complete");
    Ok(())
}

//! newsflow-mcp-server — exposes the read-side query tools over JSON-RPC
//! on HTTP. Opens the two store clients before serving and closes them on
//! shutdown.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use newsflow_core::{logging, signals};
use newsflow_mcp::tools::{HistoricalAnalysisTool, ListToolsTool, SimilarArticlesTool};
use newsflow_mcp::{http, McpServer, ToolRegistry};
use newsflow_store::{HttpEmbedder, PgConfig, PgStore, WeaviateClient, WeaviateConfig};

/// MCP tool server — semantic and historical article lookups.
#[derive(Parser, Debug)]
#[command(name = "newsflow-mcp-server", version, about)]
struct Cli {
    #[arg(long, env = "MCP_SERVER_PORT", default_value_t = 8000)]
    mcp_server_port: u16,

    #[arg(long, env = "POSTGRES_HOST", default_value = "localhost")]
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

    #[arg(long, env = "WEAVIATE_HOST", default_value = "localhost")]
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
    logging::init("mcp-server");

    let pg_config = PgConfig {
        host: cli.postgres_host.clone(),
        port: cli.postgres_port,
        user: cli.postgres_user.clone(),
        password: cli.postgres_password.clone(),
        database: cli.postgres_db.clone(),
        table: cli.pg_table.clone(),
    };
    let pg = Arc::new(
        PgStore::connect(&pg_config)
            .await
            .context("failed to connect to Postgres")?,
    );

    let weaviate_config = WeaviateConfig {
        host: cli.weaviate_host.clone(),
        http_port: cli.weaviate_http_port,
        grpc_port: cli.weaviate_grpc_port,
        class_name: cli.weaviate_class_name.clone(),
    };
    let weaviate = Arc::new(WeaviateClient::new(&weaviate_config));

    let embedder = Arc::new(HttpEmbedder::new(
        cli.embedding_url.clone(),
        cli.embedding_model.clone(),
        cli.embedding_dimensions,
    ));

    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(SimilarArticlesTool::new(embedder, weaviate)))
        .context("failed to register get_similar_articles")?;
    registry
        .register(Arc::new(HistoricalAnalysisTool::new(pg.clone())))
        .context("failed to register get_article_historical_analysis")?;
    registry
        .register(Arc::new(ListToolsTool::new(registry.list())))
        .context("failed to register list_tools")?;

    info!(tools = registry.len(), "tool registry ready");
    let server = McpServer::new(registry);

    http::serve(server, cli.mcp_server_port, async {
        signals::wait_for_shutdown_signal().await;
        info!("shutdown signal received");
    })
    .await
    .context("MCP HTTP server failed")?;

    pg.close().await;
    info!("shutdown complete");
    Ok(())
}

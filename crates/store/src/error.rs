use thiserror::Error;

/// Errors from the relational and vector store clients.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store API error: {0}")]
    Api(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] crate::embedder::EmbeddingError),
}

//! Persistence clients for the pipeline's two stores and the embedding
//! backend they share: Postgres (queryable article records) and Weaviate
//! (vector retrieval).

pub mod embedder;
pub mod error;
pub mod pg;
pub mod weaviate;

pub use embedder::{Embedder, EmbeddingError, HttpEmbedder};
pub use error::StoreError;
pub use pg::{AnalysisHistory, ArticleUpsert, PgConfig, PgStore};
pub use weaviate::{VectorSearch, VectorWrite, WeaviateClient, WeaviateConfig};

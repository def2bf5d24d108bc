use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info};

use newsflow_broker::{DeliveryHandler, HandlerError};
use newsflow_core::ArticleMessage;
use newsflow_store::{ArticleUpsert, Embedder, VectorWrite};

fn decode(body: &str) -> Result<ArticleMessage, HandlerError> {
    ArticleMessage::from_json(body)
        .map_err(|e| HandlerError::new(format!("failed to decode article message: {e}")))
}

/// Relational sink: one upsert per delivery, keyed on the article id.
///
/// Sink errors are re-raised so the delivery scope rejects the message; a
/// redelivery overwrites rather than duplicates thanks to the upsert.
pub struct PgSink {
    store: Arc<dyn ArticleUpsert>,
}

impl PgSink {
    pub fn new(store: Arc<dyn ArticleUpsert>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DeliveryHandler for PgSink {
    async fn handle(&self, body: &str) -> Result<(), HandlerError> {
        let msg = decode(body)?;
        self.store.upsert(&msg).await.map_err(|e| {
            error!(message_id = %msg.message_id, error = %e, "failed to store article");
            HandlerError::new(format!("relational write failed: {e}"))
        })?;
        info!(message_id = %msg.message_id, "article stored");
        Ok(())
    }
}

/// Vector sink: embeds the content and inserts `{article_id, content}`.
///
/// An empty id or content is skipped silently (logged, acked): there is
/// nothing useful to embed and rejecting would poison the queue.
pub struct VectorSink {
    client: Arc<dyn VectorWrite>,
    embedder: Arc<dyn Embedder>,
}

impl VectorSink {
    pub fn new(client: Arc<dyn VectorWrite>, embedder: Arc<dyn Embedder>) -> Self {
        Self { client, embedder }
    }
}

#[async_trait]
impl DeliveryHandler for VectorSink {
    async fn handle(&self, body: &str) -> Result<(), HandlerError> {
        let msg = decode(body)?;

        let article_id = msg.message_id.trim();
        let content = msg.content.trim();
        if article_id.is_empty() || content.is_empty() {
            info!("skipping vector write for article with empty id or content");
            return Ok(());
        }

        let vector = self.embedder.encode(content).await.map_err(|e| {
            error!(message_id = %article_id, error = %e, "failed to embed article");
            HandlerError::new(format!("embedding failed: {e}"))
        })?;

        let properties = json!({
            "article_id": article_id,
            "content": content,
        });
        self.client.insert(properties, &vector).await.map_err(|e| {
            error!(message_id = %article_id, error = %e, "failed to store article vector");
            HandlerError::new(format!("vector write failed: {e}"))
        })?;

        info!(message_id = %article_id, "article vector stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsflow_store::{EmbeddingError, StoreError};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    #[derive(Default)]
    struct RecordingVectorStore {
        inserts: Mutex<Vec<(Value, Vec<f32>)>>,
    }

    #[async_trait]
    impl VectorWrite for RecordingVectorStore {
        async fn insert(&self, properties: Value, vector: &[f32]) -> Result<(), StoreError> {
            self.inserts.lock().await.push((properties, vector.to_vec()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingUpsert {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ArticleUpsert for CountingUpsert {
        async fn upsert(&self, _msg: &ArticleMessage) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(StoreError::Api("write refused".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn vector_sink_embeds_and_inserts_properties() {
        let store = Arc::new(RecordingVectorStore::default());
        let sink = VectorSink::new(store.clone(), Arc::new(FixedEmbedder));

        let msg = ArticleMessage::new("Title", "Body text");
        sink.handle(&msg.to_json().unwrap()).await.unwrap();

        let inserts = store.inserts.lock().await;
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].0["article_id"], Value::String(msg.message_id.clone()));
        assert_eq!(inserts[0].0["content"], "Body text");
        assert_eq!(inserts[0].1, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn vector_sink_skips_empty_content_silently() {
        let store = Arc::new(RecordingVectorStore::default());
        let sink = VectorSink::new(store.clone(), Arc::new(FixedEmbedder));

        let msg = ArticleMessage::new("Title", "   ");
        sink.handle(&msg.to_json().unwrap()).await.unwrap();

        assert!(store.inserts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn vector_sink_rejects_undecodable_body() {
        let store = Arc::new(RecordingVectorStore::default());
        let sink = VectorSink::new(store, Arc::new(FixedEmbedder));
        assert!(sink.handle("nope").await.is_err());
    }

    #[tokio::test]
    async fn pg_sink_upserts_once_per_delivery() {
        let store = Arc::new(CountingUpsert::default());
        let sink = PgSink::new(store.clone());

        let msg = ArticleMessage::new("Title", "Body");
        sink.handle(&msg.to_json().unwrap()).await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pg_sink_surfaces_store_errors() {
        let store = Arc::new(CountingUpsert { calls: AtomicUsize::new(0), fail: true });
        let sink = PgSink::new(store);

        let msg = ArticleMessage::new("Title", "Body");
        assert!(sink.handle(&msg.to_json().unwrap()).await.is_err());
    }
}

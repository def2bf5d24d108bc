use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use newsflow_broker::{BrokerError, Publisher};
use newsflow_core::ArticleMessage;

/// Poll interval on the handoff channel so the stop signal is observed.
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Backoff after a non-fatal publish failure.
const RETRY_WAIT: Duration = Duration::from_secs(5);

/// How the publisher loop ended.
#[derive(Debug)]
pub struct DrainOutcome {
    pub published: usize,
    /// A message that could not be published because the broker went away.
    /// The supervisor logs it and restarts the stage.
    pub leftover: Option<ArticleMessage>,
}

/// Drain the handoff channel into queue `routing_key`.
///
/// Runs until the stop signal fires **and** the channel is empty, so every
/// message the worker handed off before shutdown is published (or carried
/// out in `leftover` when the broker connection is gone). A non-fatal
/// publish failure keeps the message at the head of the line and retries
/// after a short sleep; an AMQP transport failure ends the loop so the
/// supervisor can rebuild the connection.
pub async fn publish_articles(
    publisher: Arc<dyn Publisher>,
    routing_key: &str,
    mut rx: mpsc::Receiver<ArticleMessage>,
    stop: watch::Receiver<bool>,
) -> DrainOutcome {
    let mut published = 0usize;
    let mut carry: Option<ArticleMessage> = None;

    loop {
        let article = match carry.take() {
            Some(article) => article,
            None => {
                if *stop.borrow() {
                    // Draining: take whatever is left, stop at empty.
                    match rx.try_recv() {
                        Ok(article) => article,
                        Err(_) => break,
                    }
                } else {
                    match tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await {
                        Ok(Some(article)) => article,
                        Ok(None) => break, // worker dropped its sender
                        Err(_) => continue, // timeout, re-check stop
                    }
                }
            }
        };

        let body = match article.to_json() {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "failed to encode article, dropping");
                continue;
            }
        };

        match publisher.publish(routing_key, body.as_bytes()).await {
            Ok(()) => {
                published += 1;
                info!(title = %article.title, "article published");
            }
            Err(e @ (BrokerError::Amqp(_) | BrokerError::ConnectTimeout(_))) => {
                error!(error = %e, "queue error, stopping publisher");
                return DrainOutcome {
                    published,
                    leftover: Some(article),
                };
            }
            Err(e) => {
                warn!(error = %e, "failed to publish article, retrying shortly");
                carry = Some(article);
                tokio::time::sleep(RETRY_WAIT).await;
            }
        }
    }

    DrainOutcome {
        published,
        leftover: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// Publisher that fails the first `failures` calls, then records bodies.
    struct FlakyPublisher {
        failures: AtomicUsize,
        fatal: bool,
        published: Mutex<Vec<String>>,
    }

    impl FlakyPublisher {
        fn reliable() -> Self {
            Self::failing(0, false)
        }

        fn failing(failures: usize, fatal: bool) -> Self {
            Self {
                failures: AtomicUsize::new(failures),
                fatal,
                published: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Publisher for FlakyPublisher {
        async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), BrokerError> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                if self.fatal {
                    return Err(BrokerError::ConnectTimeout(Duration::from_secs(60)));
                }
                return Err(BrokerError::Unconfirmed {
                    routing_key: routing_key.to_string(),
                });
            }
            self.published
                .lock()
                .await
                .push(String::from_utf8(body.to_vec()).unwrap());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drains_channel_before_returning_on_stop() {
        let publisher = Arc::new(FlakyPublisher::reliable());
        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        for i in 0..3 {
            tx.send(ArticleMessage::new(format!("t{i}"), "c")).await.unwrap();
        }
        // Stop before the publisher even starts: it must still drain all 3.
        stop_tx.send(true).unwrap();

        let outcome = publish_articles(publisher.clone(), "tv_articles", rx, stop_rx).await;
        assert_eq!(outcome.published, 3);
        assert!(outcome.leftover.is_none());
        assert_eq!(publisher.published.lock().await.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failure_in_order() {
        let publisher = Arc::new(FlakyPublisher::failing(2, false));
        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        tx.send(ArticleMessage::new("first", "c")).await.unwrap();
        tx.send(ArticleMessage::new("second", "c")).await.unwrap();
        stop_tx.send(true).unwrap();

        let outcome = publish_articles(publisher.clone(), "tv_articles", rx, stop_rx).await;
        assert_eq!(outcome.published, 2);

        let bodies = publisher.published.lock().await;
        let first = ArticleMessage::from_json(&bodies[0]).unwrap();
        let second = ArticleMessage::from_json(&bodies[1]).unwrap();
        assert_eq!(first.title, "first");
        assert_eq!(second.title, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_broker_error_returns_leftover() {
        let publisher = Arc::new(FlakyPublisher::failing(1, true));
        let (tx, rx) = mpsc::channel(8);
        let (_stop_tx, stop_rx) = watch::channel(false);

        tx.send(ArticleMessage::new("held", "c")).await.unwrap();

        let outcome = publish_articles(publisher, "tv_articles", rx, stop_rx).await;
        assert_eq!(outcome.published, 0);
        assert_eq!(outcome.leftover.unwrap().title, "held");
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_ends_the_loop() {
        let publisher = Arc::new(FlakyPublisher::reliable());
        let (tx, rx) = mpsc::channel(8);
        let (_stop_tx, stop_rx) = watch::channel(false);

        tx.send(ArticleMessage::new("only", "c")).await.unwrap();
        drop(tx);

        let outcome = publish_articles(publisher, "tv_articles", rx, stop_rx).await;
        assert_eq!(outcome.published, 1);
        assert!(outcome.leftover.is_none());
    }
}

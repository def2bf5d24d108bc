use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{error, info};

use newsflow_core::ArticleMessage;

use crate::fetcher::PageFetcher;

/// Stop flag for the blocking worker thread: a mutex/condvar pair so the
/// cadence wait is interruptible the moment shutdown is signalled.
#[derive(Default)]
pub struct ShutdownFlag {
    state: Mutex<bool>,
    cv: Condvar,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let mut stopped = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *stopped = true;
        self.cv.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait up to `timeout`; returns true if the flag was set meanwhile.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .cv
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            stopped = guard;
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Wait between scans.
    pub interval: Duration,
    /// Total budget for login retries.
    pub login_retry_timeout: Duration,
    /// Wait between login attempts.
    pub login_retry_wait: Duration,
    /// Max articles per scan.
    pub fetch_limit: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            login_retry_timeout: Duration::from_secs(60),
            login_retry_wait: Duration::from_secs(5),
            fetch_limit: 5,
        }
    }
}

/// Blocking fetch loop, run on a dedicated OS thread.
///
/// Logs in with a retry budget, then fetches on a fixed cadence and hands
/// every article to the async publisher through the bounded channel.
/// `blocking_send` on a full channel is the backpressure path: the fetcher
/// stalls until the publisher catches up. Exits when the stop flag is set,
/// when the login budget is spent, or when the channel is closed.
pub fn scrape_loop<F: PageFetcher>(
    mut fetcher: F,
    tx: mpsc::Sender<ArticleMessage>,
    stop: &ShutdownFlag,
    config: &ScrapeConfig,
) {
    let giveup = Instant::now() + config.login_retry_timeout;
    loop {
        match fetcher.login() {
            Ok(true) => break,
            Ok(false) => error!("login failed, retrying"),
            Err(e) => error!(error = %e, "login failed, retrying"),
        }
        if Instant::now() > giveup {
            error!("login failed, giving up");
            return;
        }
        if stop.wait(config.login_retry_wait) {
            return;
        }
    }

    info!(interval = ?config.interval, "scrape loop started");
    while !stop.wait(config.interval) {
        match fetcher.fetch_news(config.fetch_limit) {
            Ok(articles) => {
                for article in articles {
                    if tx.blocking_send(article).is_err() {
                        info!("handoff channel closed, stopping worker");
                        return;
                    }
                }
            }
            Err(e) => error!(error = %e, "failed to fetch news"),
        }
    }
    info!("scrape loop stopped");
}

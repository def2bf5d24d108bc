use thiserror::Error;

use newsflow_core::ArticleMessage;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("webdriver error: {0}")]
    WebDriver(#[from] crate::webdriver::WebDriverError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("login failed: {0}")]
    Login(String),

    #[error("no active browser session")]
    NoSession,
}

/// Blocking site-adapter seam, owned by the scraper's worker thread.
///
/// Implementations hold whatever browser or HTTP session they need;
/// `fetch_news` returns only items not seen before (adapters dedupe
/// internally) already converted to plain-text messages.
pub trait PageFetcher: Send {
    /// Authenticate the session. `Ok(false)` means the attempt failed but
    /// retrying may help; errors mean the same to the caller and carry the
    /// reason.
    fn login(&mut self) -> Result<bool, FetchError>;

    /// Fetch up to `limit` fresh articles.
    fn fetch_news(&mut self, limit: usize) -> Result<Vec<ArticleMessage>, FetchError>;
}

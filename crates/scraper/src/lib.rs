//! Scraper stage: a blocking fetch loop on a dedicated OS thread feeding an
//! async publisher through a bounded handoff channel.
//!
//! The fetcher side is behind the [`PageFetcher`] seam; the shipped adapter
//! drives a remote browser over the WebDriver protocol against the
//! TradingView news flow.

pub mod fetcher;
pub mod html;
pub mod publisher;
pub mod trading_view;
pub mod webdriver;
pub mod worker;

pub use fetcher::{FetchError, PageFetcher};
pub use publisher::{publish_articles, DrainOutcome};
pub use trading_view::TradingViewFetcher;
pub use webdriver::{WebDriver, WebDriverError};
pub use worker::{scrape_loop, ScrapeConfig, ShutdownFlag};

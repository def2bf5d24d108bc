//! Queue names shared by every stage of the pipeline.

/// Raw articles published by the scraper, consumed by the analyser.
pub const QUEUE_TV_ARTICLES: &str = "tv_articles";

/// Enriched articles published by the analyser, consumed by the ingestor.
pub const QUEUE_PROCESSED_ARTICLES: &str = "processed_articles";

//! Ingestor stage: terminates the pipeline by writing enriched articles to
//! the vector store and the relational store, idempotently per article id.

pub mod sinks;

pub use sinks::{PgSink, VectorSink};

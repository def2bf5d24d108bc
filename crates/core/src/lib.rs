pub mod analysis;
pub mod dedupe;
pub mod logging;
pub mod message;
pub mod queues;
pub mod signals;

pub use analysis::{parse_score, HorizonAnalysis, StructuredAnalysis};
pub use dedupe::UrlDedupe;
pub use message::ArticleMessage;

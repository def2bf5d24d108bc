//! Analyser stage: consumes raw articles from queue A, enriches them with
//! an LLM analysis, publishes enriched articles to queue B, and pushes the
//! analysis text to the external gateway when one is configured.

pub mod analyser;
pub mod extract;
pub mod gateway;
pub mod llm;
pub mod policy;
pub mod stage;

pub use analyser::ArticleAnalyser;
pub use extract::extract_structured;
pub use gateway::{GatewayClient, PushResponse};
pub use llm::{ChatCompletion, DeepSeekClient, LlmError};
pub use policy::{MockTradeExecutor, TradeExecutor, TradePolicy};
pub use stage::AnalyserStage;

//! The query tools served by the MCP server.

pub mod history;
pub mod list;
pub mod similar;

pub use history::HistoricalAnalysisTool;
pub use list::ListToolsTool;
pub use similar::SimilarArticlesTool;

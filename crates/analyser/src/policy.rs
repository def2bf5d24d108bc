use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tracing::{info, warn};

use newsflow_core::{parse_score, StructuredAnalysis};

/// Trade execution seam, shared across the async stage. Evaluation is
/// best-effort; implementations must not panic on odd input.
pub trait TradeExecutor: Send + Sync {
    fn execute_trade(&self, ticker: &str, side: &str, quantity: f64);
    fn cash(&self) -> f64;
    fn portfolio(&self) -> HashMap<String, f64>;
}

/// Paper-trading executor: tracks cash and a position map in memory.
pub struct MockTradeExecutor {
    state: Mutex<ExecutorState>,
}

struct ExecutorState {
    cash: f64,
    portfolio: HashMap<String, f64>,
}

impl MockTradeExecutor {
    pub fn new(starting_cash: f64) -> Self {
        Self {
            state: Mutex::new(ExecutorState {
                cash: starting_cash,
                portfolio: HashMap::new(),
            }),
        }
    }
}

impl Default for MockTradeExecutor {
    fn default() -> Self {
        Self::new(100_000.0)
    }
}

impl TradeExecutor for MockTradeExecutor {
    fn execute_trade(&self, ticker: &str, side: &str, quantity: f64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match side {
            "buy" => {
                *state.portfolio.entry(ticker.to_string()).or_insert(0.0) += quantity;
            }
            "sell" => {
                *state.portfolio.entry(ticker.to_string()).or_insert(0.0) -= quantity;
            }
            other => {
                warn!(side = %other, "unknown trade side, ignoring");
                return;
            }
        }
        info!(ticker, side, quantity, "trade executed");
    }

    fn cash(&self) -> f64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).cash
    }

    fn portfolio(&self) -> HashMap<String, f64> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .portfolio
            .clone()
    }
}

/// Fixed buy quantity until sizing becomes part of the analysis.
const BUY_QUANTITY: f64 = 10.0;

/// Turns a structured analysis into a trade decision.
///
/// Only the short-term score is consulted: a positive score is a buy
/// signal for the identified ticker. Anything missing or unparsable is
/// logged and skipped; policy evaluation never fails the pipeline.
pub struct TradePolicy<E: TradeExecutor> {
    executor: E,
}

impl<E: TradeExecutor> TradePolicy<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn evaluate(&self, analysis: &Value) {
        let Some(typed) = StructuredAnalysis::from_value(analysis) else {
            info!("no short_term analysis available");
            return;
        };

        if typed.stock_code.is_empty() {
            info!("no impacted stock");
            return;
        }

        let Some(score) = parse_score(&typed.analysis.short_term.score) else {
            warn!(score = %typed.analysis.short_term.score, "score is missing or invalid");
            return;
        };

        if score > 0 {
            info!(
                stock = %typed.stock_name,
                ticker = %typed.stock_code,
                score,
                "positive short-term signal"
            );
            self.executor.execute_trade(&typed.stock_code, "buy", BUY_QUANTITY);
            info!(cash = self.executor.cash(), "cash after trade");
            info!(portfolio = ?self.executor.portfolio(), "portfolio after trade");
        } else {
            info!(score, "score is not a buy signal");
        }
    }
}

//! The streaming event protocol.
//!
//! A strictly ordered sequence: exactly one `Init`, zero or more `Loading`,
//! one `Progress` per completed instrument in completion order, then
//! exactly one `Complete` or `Error` terminating the stream.

use quantsim_core::portfolio::BacktestResult;
use quantsim_core::ticker_result::TickerResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Event {
    Init {
        total_tickers: usize,
        job_id: String,
    },
    Loading {
        message: String,
    },
    Progress {
        ticker: String,
        completed: usize,
        total: usize,
        percentage: f64,
        ticker_result: TickerResult,
    },
    Complete {
        result: BacktestResult,
    },
    Error {
        message: String,
    },
}

impl Event {
    pub fn progress(ticker: String, completed: usize, total: usize, ticker_result: TickerResult) -> Self {
        let percentage = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            100.0
        };
        Event::Progress {
            ticker,
            completed,
            total,
            percentage,
            ticker_result,
        }
    }

    /// Render this event as a server-sent-events line: `data: {json}\n\n`.
    pub fn to_sse_line(&self) -> String {
        let body = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("data: {body}\n\n")
    }
}

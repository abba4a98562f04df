//! Aggregate result for one elapsed window.

use serde::{Deserialize, Serialize};

/// The aggregate of all admitted trades in one tumbling window.
///
/// Created once per elapsed non-empty window and immutable thereafter.
/// `window_start`/`window_end` are the event timestamps of the first and
/// last admitted trade, not wall-clock boundaries; the field names double
/// as the JSON wire format read by queue consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    /// Quantity-weighted mean price over the window.
    pub average_price: f64,
    /// Sum of admitted quantities.
    pub total_quantity: f64,
    /// Event timestamp of the first admitted trade (ms since epoch).
    pub window_start: u64,
    /// Event timestamp of the last admitted trade (ms since epoch).
    pub window_end: u64,
    /// Number of admitted trades.
    pub trade_count: u64,
}

impl WindowSummary {
    /// Serialize to the JSON wire format used on the queue.
    pub fn to_wire(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Deserialize from the JSON wire format.
    pub fn from_wire(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl std::fmt::Display for WindowSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Window([{}..{}] avg={:.8} qty={:.4} n={})",
            self.window_start, self.window_end, self.average_price, self.total_quantity, self.trade_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WindowSummary {
        WindowSummary {
            average_price: 150.0,
            total_quantity: 2.0,
            window_start: 1000,
            window_end: 1001,
            trade_count: 2,
        }
    }

    #[test]
    fn wire_round_trip() {
        let summary = sample();
        let bytes = summary.to_wire().unwrap();
        let back = WindowSummary::from_wire(&bytes).unwrap();
        assert_eq!(back, summary);
    }

    #[test]
    fn wire_field_names() {
        let v: serde_json::Value =
            serde_json::from_slice(&sample().to_wire().unwrap()).unwrap();
        assert_eq!(v["average_price"], 150.0);
        assert_eq!(v["total_quantity"], 2.0);
        assert_eq!(v["window_start"], 1000);
        assert_eq!(v["window_end"], 1001);
        assert_eq!(v["trade_count"], 2);
    }
}

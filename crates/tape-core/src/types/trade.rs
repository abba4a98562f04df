//! A single decoded trade execution.

/// One trade from the feed, already validated by the decoder.
///
/// Immutable once constructed. The decoder guarantees `price > 0.0` and
/// `quantity > 0.0` — non-positive values never become trades.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    /// Trading pair symbol as the feed reports it (e.g. `"BTCUSDT"`).
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    /// Feed-supplied trade timestamp, milliseconds since Unix epoch.
    pub event_time_ms: u64,
}

impl Trade {
    /// Notional value of the execution (`price * quantity`).
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade({} {:.8}x{:.4} t={})",
            self.symbol, self.price, self.quantity, self.event_time_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notional_value() {
        let t = Trade {
            symbol: "BTCUSDT".into(),
            price: 30_000.0,
            quantity: 0.5,
            event_time_ms: 1_672_515_782_136,
        };
        assert!((t.notional() - 15_000.0).abs() < 1e-9);
    }
}

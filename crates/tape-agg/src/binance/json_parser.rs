//! Binance JSON message parser.
//!
//! Parses WebSocket JSON frames from the trade streams into [`Trade`]
//! records. Numeric fields arrive as JSON strings on most streams; parsing
//! uses `fast-float` for the string-to-f64 conversion.

use tape_core::Trade;
use tracing::warn;

/// Build the SUBSCRIBE request for the configured trading pairs.
pub fn build_subscribe(pairs: &[String]) -> String {
    let params: Vec<String> =
        pairs.iter().map(|p| format!("{}@trade", p.to_lowercase())).collect();
    serde_json::json!({
        "method": "SUBSCRIBE",
        "params": params,
        "id": 1
    })
    .to_string()
}

/// Parse one WebSocket frame into a [`Trade`].
///
/// Handles both the bare event envelope (`{"e":"trade",...}`) and the
/// combined-stream envelope (`{"stream":...,"data":{...}}`). Returns `None`
/// for frames that are not trade events (subscription acks) and for
/// malformed trade frames, which are logged and dropped — a bad frame never
/// stops the pipeline.
pub fn parse_message(text: &str) -> Option<Trade> {
    let v: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!("dropping unparseable frame: {e}");
            return None;
        }
    };

    // Combined streams wrap the event in a "data" field.
    let event = v.get("data").unwrap_or(&v);

    let event_type = event.get("e")?.as_str()?;
    if event_type != "trade" && event_type != "aggTrade" {
        return None;
    }

    let trade = parse_trade(event);
    if trade.is_none() {
        warn!("dropping malformed {event_type} frame");
    }
    trade
}

fn parse_trade(v: &serde_json::Value) -> Option<Trade> {
    let symbol = v.get("s")?.as_str()?.to_string();
    let price = parse_f64_field(v, "p")?;
    let quantity = parse_f64_field(v, "q")?;
    let event_time_ms = v.get("T")?.as_u64()?;

    // Non-positive values are decode failures, not trades.
    if price <= 0.0 || quantity <= 0.0 {
        return None;
    }

    Some(Trade { symbol, price, quantity, event_time_ms })
}

/// Parse a named field as `f64`, accepting either a JSON string (`"30000.5"`)
/// or a native number (`30000.5`).
#[inline]
fn parse_f64_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    let field = v.get(key)?;
    if let Some(s) = field.as_str() {
        fast_float2::parse(s).ok()
    } else {
        field.as_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trade_msg() {
        let json = r#"{"e":"trade","E":1672515782136,"s":"BTCUSDT","t":12345,"p":"16500.50","q":"0.031","T":1672515782132,"m":true,"M":true}"#;
        let trade = parse_message(json).unwrap();
        assert_eq!(trade.symbol, "BTCUSDT");
        assert!((trade.price - 16500.50).abs() < 0.01);
        assert!((trade.quantity - 0.031).abs() < 1e-9);
        assert_eq!(trade.event_time_ms, 1672515782132);
    }

    #[test]
    fn parse_combined_stream_envelope() {
        let json = r#"{"stream":"btcusdt@trade","data":{"e":"trade","E":1672515782136,"s":"BTCUSDT","t":12345,"p":"100.0","q":"1.0","T":1000,"m":false,"M":true}}"#;
        let trade = parse_message(json).unwrap();
        assert_eq!(trade.symbol, "BTCUSDT");
        assert_eq!(trade.event_time_ms, 1000);
    }

    #[test]
    fn parse_agg_trade_msg() {
        let json = r#"{"e":"aggTrade","E":1672515782136,"s":"ETHUSDT","a":99,"p":"1200.25","q":"2.5","f":100,"l":105,"T":1672515782130,"m":true}"#;
        let trade = parse_message(json).unwrap();
        assert_eq!(trade.symbol, "ETHUSDT");
        assert!((trade.price - 1200.25).abs() < 1e-9);
    }

    #[test]
    fn subscription_ack_is_not_a_trade() {
        assert!(parse_message(r#"{"result":null,"id":1}"#).is_none());
    }

    #[test]
    fn malformed_frames_are_dropped() {
        // not JSON at all
        assert!(parse_message("not json").is_none());
        // missing quantity
        assert!(parse_message(r#"{"e":"trade","s":"BTCUSDT","p":"100.0","T":1000}"#).is_none());
        // non-numeric price
        assert!(
            parse_message(r#"{"e":"trade","s":"BTCUSDT","p":"abc","q":"1.0","T":1000}"#).is_none()
        );
    }

    #[test]
    fn non_positive_values_are_decode_failures() {
        assert!(
            parse_message(r#"{"e":"trade","s":"BTCUSDT","p":"0","q":"1.0","T":1000}"#).is_none()
        );
        assert!(
            parse_message(r#"{"e":"trade","s":"BTCUSDT","p":"100.0","q":"-2","T":1000}"#).is_none()
        );
    }

    #[test]
    fn subscribe_covers_all_pairs() {
        let msg = build_subscribe(&["BTCUSDT".to_string(), "ethusdt".to_string()]);
        let v: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(v["method"], "SUBSCRIBE");
        let params = v["params"].as_array().unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0], "btcusdt@trade");
        assert_eq!(params[1], "ethusdt@trade");
    }
}

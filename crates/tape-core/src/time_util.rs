//! Wall-clock time helpers.
//!
//! Trade timestamps come from the feed; the only local clock use is the
//! publish timestamp stamped onto outgoing queue messages.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as **seconds** since Unix epoch (AMQP timestamp resolution).
#[inline]
pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_not_milliseconds() {
        let secs = now_secs();
        // Between 2020-01-01 and 2200-01-01 — catches unit mix-ups.
        assert!(secs > 1_577_836_800);
        assert!(secs < 7_258_118_400);
    }
}

//! Time helpers.
//!
//! All timestamps in the persisted documents are Unix milliseconds stored as
//! `i64`. Ledger operations take the current time as an explicit argument so
//! they stay deterministic under test; callers use [`now_ms`].

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Format a millisecond duration as a short human string ("1h 30min", "45min", "12s").
pub fn format_duration_ms(duration_ms: i64) -> String {
    let total_seconds = duration_ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {:02}min", hours, minutes)
    } else if minutes > 0 {
        format!("{}min", minutes)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(12_000), "12s");
        assert_eq!(format_duration_ms(45 * 60_000), "45min");
        assert_eq!(format_duration_ms(3_600_000), "1h 00min");
        assert_eq!(format_duration_ms(5_400_000), "1h 30min");
        assert_eq!(format_duration_ms(0), "0s");
        // Negative durations are clamped rather than formatted as garbage
        assert_eq!(format_duration_ms(-5_000), "0s");
    }
}

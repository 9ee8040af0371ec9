//! Time helpers: every internal timestamp is UTC nanoseconds since the Unix
//! epoch; venue timestamps arrive in s/ms/us/ns and are promoted here.

use chrono::Utc;

/// Current wall-clock time, UTC nanoseconds since the Unix epoch.
pub fn now_ns() -> i64 {
    Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_millis() * 1_000_000)
}

pub fn now_s() -> i64 {
    Utc::now().timestamp()
}

pub fn from_seconds(seconds: i64) -> i64 {
    seconds.saturating_mul(1_000_000_000)
}

pub fn from_millis(millis: i64) -> i64 {
    millis.saturating_mul(1_000_000)
}

pub fn from_micros(micros: i64) -> i64 {
    micros.saturating_mul(1_000)
}

/// Promote a fractional-seconds timestamp (as carried by, e.g., Kraken's WS
/// trade feed) to UTC nanoseconds.
pub fn from_seconds_f64(seconds: f64) -> i64 {
    (seconds * 1_000_000_000.0).round() as i64
}

/// Bitvavo's trade timestamp is either milliseconds or nanoseconds; §4.4
/// disambiguates by digit count (> 13 digits ⇒ already nanoseconds).
pub fn promote_ambiguous_ms_or_ns(raw: i64) -> i64 {
    let digits = raw.unsigned_abs().to_string().len();
    if digits > 13 {
        raw
    } else {
        from_millis(raw)
    }
}

/// Align `timestamp_s` down to the most recent `bucket_s`-second boundary
/// (§4.6/§8 bucket alignment law).
pub fn floor_to_bucket(timestamp_s: i64, bucket_s: i64) -> i64 {
    timestamp_s.div_euclid(bucket_s) * bucket_s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_alignment_holds_for_positive_and_negative_offsets() {
        for ts in [-125_i64, -1, 0, 1, 59, 60, 61, 3_599, 3_600, 3_601] {
            for bucket in [60_i64, 300, 3_600] {
                let open = floor_to_bucket(ts, bucket);
                assert!(open <= ts, "open {open} should be <= ts {ts}");
                assert!(ts < open + bucket, "ts {ts} should be < open+bucket {}", open + bucket);
                assert_eq!(open % bucket, 0);
            }
        }
    }

    #[test]
    fn bitvavo_disambiguates_ms_from_ns_by_digit_count() {
        // 13-digit millisecond timestamp.
        let ms = 1_700_000_000_000_i64;
        assert_eq!(promote_ambiguous_ms_or_ns(ms), from_millis(ms));

        // 19-digit nanosecond timestamp.
        let ns = 1_700_000_000_000_000_000_i64;
        assert_eq!(promote_ambiguous_ms_or_ns(ns), ns);
    }
}

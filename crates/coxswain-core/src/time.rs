//! Timestamp helpers shared by the resource and operation models.
//!
//! All timestamps are UTC and serialize as RFC 3339 strings.

use time::OffsetDateTime;

/// Current UTC time, truncated to whole microseconds so values survive a
/// JSON round trip unchanged.
pub fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.microsecond() * 1_000)
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_utc_is_utc() {
        let now = now_utc();
        assert_eq!(now.offset(), time::UtcOffset::UTC);
    }

    #[test]
    fn test_now_utc_microsecond_precision() {
        let now = now_utc();
        assert_eq!(now.nanosecond() % 1_000, 0);
    }
}

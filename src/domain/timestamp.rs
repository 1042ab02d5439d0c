// Discovery timestamp normalization and parsing
use chrono::{DateTime, NaiveDateTime, Utc};

/// Normalizes an upstream discovery timestamp to at most six fractional
/// digits with a trailing `Z`. The graph-metadata service emits nanosecond
/// precision which chrono's `%.f` would accept, but the canonical form the
/// rest of the pipeline compares against is microseconds.
pub fn normalize_discovery_timestamp(raw: &str) -> String {
    let Some(dot) = raw.find('.') else {
        return raw.to_string();
    };

    let fraction: String = raw[dot + 1..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .take(6)
        .collect();

    format!("{}.{}Z", &raw[..dot], fraction)
}

/// Parses a discovery timestamp after normalization. Returns `None` on
/// malformed input; callers log and skip rather than abort.
pub fn parse_discovery_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = normalize_discovery_timestamp(raw);
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.fZ")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_normalize_truncates_excess_fraction() {
        assert_eq!(
            normalize_discovery_timestamp("2024-01-01T00:00:00.123456789Z"),
            "2024-01-01T00:00:00.123456Z"
        );
    }

    #[test]
    fn test_normalize_keeps_short_fraction() {
        assert_eq!(
            normalize_discovery_timestamp("2024-01-01T00:00:00.123Z"),
            "2024-01-01T00:00:00.123Z"
        );
    }

    #[test]
    fn test_normalize_without_fraction_is_untouched() {
        assert_eq!(
            normalize_discovery_timestamp("2024-01-01T00:00:00Z"),
            "2024-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_parse_microsecond_timestamp() {
        let parsed = parse_discovery_timestamp("2024-01-01T00:00:00.123456Z").unwrap();
        assert_eq!(parsed.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_parse_nanosecond_timestamp_truncates() {
        let parsed = parse_discovery_timestamp("2024-01-01T00:00:00.123456789Z").unwrap();
        assert_eq!(parsed.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_parse_malformed_returns_none() {
        assert!(parse_discovery_timestamp("not-a-timestamp").is_none());
        assert!(parse_discovery_timestamp("2024-13-99T99:00:00.1Z").is_none());
    }
}

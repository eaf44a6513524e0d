use anyhow::{anyhow, Result};
use std::time::Duration;

/// Parses durations such as `500ms`, `30s`, `5m`, `1h` or bare seconds.
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    let s = duration_str.trim();
    if s.is_empty() {
        return Err(anyhow!("Empty duration"));
    }

    let parsed = if let Some(millis) = s.strip_suffix("ms") {
        Duration::from_millis(millis.parse()?)
    } else if let Some(seconds) = s.strip_suffix('s') {
        Duration::from_secs(seconds.parse()?)
    } else if let Some(minutes) = s.strip_suffix('m') {
        Duration::from_secs(scale(minutes.parse()?, 60, duration_str)?)
    } else if let Some(hours) = s.strip_suffix('h') {
        Duration::from_secs(scale(hours.parse()?, 3600, duration_str)?)
    } else {
        Duration::from_secs(s.parse()?)
    };

    Ok(parsed)
}

fn scale(value: u64, factor: u64, input: &str) -> Result<u64> {
    value
        .checked_mul(factor)
        .ok_or_else(|| anyhow!("Duration too large: {}", input))
}

pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("12").unwrap(), Duration::from_secs(12));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("999999999999999999h").is_err());
        assert!(parse_duration("999999999999999999m").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}

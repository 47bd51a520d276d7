//! Timespan Module
//!
//! Text format for durations stored in the `ValueLifeTime` field:
//! `[d.]hh:mm:ss[.fffffff]`, where the fraction counts 100ns ticks.
//! Configuration additionally accepts unit shorthand such as `2h` or `250ms`.

use std::time::Duration;

use serde::Serializer;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
const NANOS_PER_TICK: u32 = 100;
const TICK_DIGITS: usize = 7;

// == Format ==
/// Formats a duration as `[d.]hh:mm:ss[.fffffff]`.
///
/// Precision below one tick (100ns) is truncated.
pub fn format(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total % SECS_PER_MINUTE;
    let ticks = duration.subsec_nanos() / NANOS_PER_TICK;

    let mut out = String::with_capacity(24);
    if days > 0 {
        out.push_str(&format!("{}.", days));
    }
    out.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if ticks > 0 {
        out.push_str(&format!(".{:07}", ticks));
    }
    out
}

/// Rounds a duration down to whole 100ns ticks, the finest precision the
/// text form keeps.
pub fn truncate_to_ticks(duration: Duration) -> Duration {
    let nanos = duration.subsec_nanos();
    Duration::new(duration.as_secs(), nanos - nanos % NANOS_PER_TICK)
}

// == Parse ==
/// Parses `[d.]hh:mm:ss[.fffffff]`.
///
/// Negative spans are rejected since record lifetimes cannot be negative.
pub fn parse(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    if text.starts_with('-') {
        return Err(format!("negative timespan '{}' is not a valid lifetime", input));
    }

    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("'{}' is not in [d.]hh:mm:ss[.fffffff] form", input));
    }

    let (days, hours) = match parts[0].split_once('.') {
        Some((days, hours)) => (parse_component(days, input)?, parse_component(hours, input)?),
        None => (0, parse_component(parts[0], input)?),
    };
    let minutes = parse_component(parts[1], input)?;
    let (seconds, ticks) = match parts[2].split_once('.') {
        Some((seconds, fraction)) => (parse_component(seconds, input)?, parse_ticks(fraction, input)?),
        None => (parse_component(parts[2], input)?, 0),
    };

    if hours >= 24 || minutes >= 60 || seconds >= 60 {
        return Err(format!("'{}' has an out-of-range component", input));
    }

    let secs = days
        .checked_mul(SECS_PER_DAY)
        .and_then(|d| d.checked_add(hours * SECS_PER_HOUR + minutes * SECS_PER_MINUTE + seconds))
        .ok_or_else(|| format!("'{}' overflows", input))?;

    Ok(Duration::new(secs, ticks * NANOS_PER_TICK))
}

/// Parses either unit shorthand (`250ms`, `45s`, `30m`, `2h`, `1d`) or the
/// `[d.]hh:mm:ss[.fffffff]` form.
pub fn parse_human(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    if text.contains(':') {
        return parse(text);
    }

    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("'{}' is missing a unit (ms, s, m, h, d)", input))?;
    let (amount, unit) = text.split_at(split);
    let amount: u64 = amount
        .parse()
        .map_err(|_| format!("'{}' does not start with a number", input))?;

    let duration = match unit {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => amount.checked_mul(SECS_PER_MINUTE).map(Duration::from_secs),
        "h" => amount.checked_mul(SECS_PER_HOUR).map(Duration::from_secs),
        "d" => amount.checked_mul(SECS_PER_DAY).map(Duration::from_secs),
        other => return Err(format!("unknown duration unit '{}' in '{}'", other, input)),
    };

    duration.ok_or_else(|| format!("'{}' overflows", input))
}

fn parse_component(text: &str, input: &str) -> Result<u64, String> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' has a non-numeric component '{}'", input, text));
    }
    text.parse()
        .map_err(|_| format!("'{}' has an out-of-range component '{}'", input, text))
}

fn parse_ticks(fraction: &str, input: &str) -> Result<u32, String> {
    if fraction.is_empty()
        || fraction.len() > TICK_DIGITS
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(format!("'{}' has an invalid fraction '{}'", input, fraction));
    }
    let padded = format!("{:0<width$}", fraction, width = TICK_DIGITS);
    padded
        .parse()
        .map_err(|_| format!("'{}' has an invalid fraction '{}'", input, fraction))
}

// == Serde Helpers ==
/// Serializes an optional duration as a timespan string or `null`.
pub fn serialize_option<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(duration) => serializer.serialize_str(&format(*duration)),
        None => serializer.serialize_none(),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_ticks() {
        assert_eq!(
            truncate_to_ticks(Duration::from_nanos(1_000_000_150)),
            Duration::from_nanos(1_000_000_100)
        );
        assert_eq!(truncate_to_ticks(Duration::from_nanos(99)), Duration::ZERO);
        assert_eq!(
            truncate_to_ticks(Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_format_short_span() {
        assert_eq!(format(Duration::from_secs(600)), "00:10:00");
        assert_eq!(format(Duration::ZERO), "00:00:00");
    }

    #[test]
    fn test_format_with_days_and_ticks() {
        let span = Duration::new(SECS_PER_DAY + 2 * SECS_PER_HOUR + 5, 15_000_000);
        assert_eq!(format(span), "1.02:00:05.0150000");
    }

    #[test]
    fn test_parse_accepts_all_shapes() {
        assert_eq!(parse("00:10:00").unwrap(), Duration::from_secs(600));
        assert_eq!(
            parse("1.02:00:05.015").unwrap(),
            Duration::new(SECS_PER_DAY + 2 * SECS_PER_HOUR + 5, 15_000_000)
        );
        assert_eq!(parse("00:00:00.0000001").unwrap(), Duration::new(0, 100));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse("-00:10:00").is_err());
        assert!(parse("10:00").is_err());
        assert!(parse("24:00:00").is_err());
        assert!(parse("00:60:00").is_err());
        assert!(parse("00:00:00.12345678").is_err());
        assert!(parse("aa:00:00").is_err());
    }

    #[test]
    fn test_parse_human_units() {
        assert_eq!(parse_human("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_human("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_human("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_human("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_human("1d").unwrap(), Duration::from_secs(SECS_PER_DAY));
        assert_eq!(parse_human("02:00:00").unwrap(), Duration::from_secs(7200));
    }

    #[test]
    fn test_parse_human_rejects_unknown_unit() {
        assert!(parse_human("2w").is_err());
        assert!(parse_human("120").is_err());
        assert!(parse_human("h").is_err());
    }
}

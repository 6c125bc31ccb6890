//! Duration parsing utilities.

use anyhow::Context;

/// Parse a duration string like "1h", "30m", "300s", "300" into seconds.
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration_to_secs(s: &str) -> anyhow::Result<i64> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    let secs = if let Some(num_str) = s.strip_suffix('h') {
        let hours: i64 = num_str
            .parse()
            .with_context(|| format!("Invalid hours value: {num_str}"))?;
        hours * 3600
    } else if let Some(num_str) = s.strip_suffix('m') {
        let minutes: i64 = num_str
            .parse()
            .with_context(|| format!("Invalid minutes value: {num_str}"))?;
        minutes * 60
    } else if let Some(num_str) = s.strip_suffix('s') {
        num_str
            .parse()
            .with_context(|| format!("Invalid seconds value: {num_str}"))?
    } else {
        s.parse::<i64>()
            .with_context(|| format!("Invalid duration value: {s}"))?
    };

    if secs < 0 {
        anyhow::bail!("Duration must not be negative: {s}");
    }
    Ok(secs)
}

/// Like [`parse_duration_to_secs`] but for values used as timers.
pub fn parse_duration(s: &str) -> anyhow::Result<std::time::Duration> {
    Ok(std::time::Duration::from_secs(parse_duration_to_secs(s)? as u64))
}

//! Speed-limit argument parsing: "500" (bytes/s), "500k", "1.5m".

const KILO: f64 = 1024.0;
const MEGA: f64 = 1024.0 * 1024.0;

#[derive(Debug, thiserror::Error)]
#[error("unable to parse speed limit \"{value}\": {reason}")]
pub struct SpeedLimitError {
    pub value: String,
    pub reason: String,
}

/// Parses a speed-limit string into bytes per second. A trailing `k` or `m`
/// scales by 1024 or 1024²; the numeric part may be fractional. The result
/// must come out positive.
pub fn parse_speed_limit(value: &str) -> Result<f64, SpeedLimitError> {
    let err = |reason: &str| SpeedLimitError {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    let last = trimmed.chars().last().ok_or_else(|| err("empty value"))?;
    let (number_part, multiplier) = match last {
        'k' => (&trimmed[..trimmed.len() - 1], KILO),
        'm' => (&trimmed[..trimmed.len() - 1], MEGA),
        c if c.is_ascii_digit() => (trimmed, 1.0),
        c => return Err(err(&format!("unknown speed multiplier '{c}'"))),
    };

    let number: f64 = number_part
        .parse()
        .map_err(|_| err("not a number"))?;
    if !number.is_finite() || number <= 0.0 {
        return Err(err("speed must be positive"));
    }
    Ok(number * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_number_is_bytes_per_second() {
        assert_eq!(parse_speed_limit("500").unwrap(), 500.0);
    }

    #[test]
    fn kilo_and_mega_suffixes_scale() {
        assert_eq!(parse_speed_limit("500k").unwrap(), 500.0 * 1024.0);
        assert_eq!(parse_speed_limit("2m").unwrap(), 2.0 * 1024.0 * 1024.0);
    }

    #[test]
    fn fractional_values_are_accepted() {
        assert_eq!(parse_speed_limit("1.5m").unwrap(), 1.5 * 1024.0 * 1024.0);
    }

    #[test]
    fn unknown_suffix_is_rejected() {
        let err = parse_speed_limit("500g").unwrap_err();
        assert!(err.to_string().contains("unknown speed multiplier"));
    }

    #[test]
    fn garbage_and_non_positive_values_are_rejected() {
        assert!(parse_speed_limit("k").is_err());
        assert!(parse_speed_limit("").is_err());
        assert!(parse_speed_limit("-5k").is_err());
        assert!(parse_speed_limit("0").is_err());
    }
}

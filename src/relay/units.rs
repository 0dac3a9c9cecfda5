//! Pulse duration units and parsing

use crate::error::{RelayPanelError, Result};
use std::fmt;
use std::str::FromStr;

/// Unit offered by the row's unit selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    /// Seconds
    #[default]
    Seconds,
    /// Milliseconds
    Milliseconds,
    /// Microseconds
    Microseconds,
}

impl TimeUnit {
    /// Selector order
    pub const ALL: [Self; 3] = [Self::Seconds, Self::Milliseconds, Self::Microseconds];

    /// Units per second
    pub const fn per_second(self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Milliseconds => 1e3,
            Self::Microseconds => 1e6,
        }
    }

    /// Convert a value in this unit to seconds
    pub fn to_seconds(self, value: f64) -> f64 {
        value / self.per_second()
    }

    /// Label shown in the selector
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "μs",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for TimeUnit {
    type Err = RelayPanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "s" => Ok(Self::Seconds),
            "ms" => Ok(Self::Milliseconds),
            // Greek mu, micro sign, and ASCII fallback
            "μs" | "µs" | "us" => Ok(Self::Microseconds),
            other => Err(RelayPanelError::UnknownTimeUnit(other.to_string())),
        }
    }
}

/// Parse an entered number in `unit` into seconds
///
/// Rejects non-numeric, negative and non-finite input.
pub fn parse_duration(text: &str, unit: TimeUnit) -> Result<f64> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| RelayPanelError::InvalidDuration(text.to_string()))?;
    validate_seconds(value).map_err(|_| RelayPanelError::InvalidDuration(text.to_string()))?;
    Ok(unit.to_seconds(value))
}

/// Check that `seconds` is a usable pulse length
pub fn validate_seconds(seconds: f64) -> Result<f64> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(seconds)
    } else {
        Err(RelayPanelError::InvalidDuration(seconds.to_string()))
    }
}

/// Live readout text, e.g. `0.2s`
pub fn format_seconds(seconds: f64) -> String {
    format!("{seconds}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * b.abs().max(1.0)
    }

    #[test]
    fn test_milliseconds() {
        let secs = parse_duration("200", TimeUnit::Milliseconds).unwrap();
        assert!(close(secs, 0.2), "got {secs}");
    }

    #[test]
    fn test_microseconds() {
        let secs = parse_duration("5", "μs".parse().unwrap()).unwrap();
        assert!(close(secs, 0.000_005), "got {secs}");
    }

    #[test]
    fn test_seconds() {
        let secs = parse_duration("1", TimeUnit::Seconds).unwrap();
        assert!(close(secs, 1.0));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let secs = parse_duration(" 0.5 ", TimeUnit::Seconds).unwrap();
        assert!(close(secs, 0.5));
    }

    #[test]
    fn test_non_numeric_rejected() {
        assert!(matches!(
            parse_duration("abc", TimeUnit::Seconds),
            Err(RelayPanelError::InvalidDuration(s)) if s == "abc"
        ));
        assert!(parse_duration("", TimeUnit::Seconds).is_err());
    }

    #[test]
    fn test_negative_and_nan_rejected() {
        assert!(parse_duration("-1", TimeUnit::Seconds).is_err());
        assert!(parse_duration("NaN", TimeUnit::Seconds).is_err());
        assert!(parse_duration("inf", TimeUnit::Milliseconds).is_err());
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("s".parse::<TimeUnit>().unwrap(), TimeUnit::Seconds);
        assert_eq!("ms".parse::<TimeUnit>().unwrap(), TimeUnit::Milliseconds);
        assert_eq!("us".parse::<TimeUnit>().unwrap(), TimeUnit::Microseconds);
        assert_eq!("µs".parse::<TimeUnit>().unwrap(), TimeUnit::Microseconds);
        assert!(matches!(
            "min".parse::<TimeUnit>(),
            Err(RelayPanelError::UnknownTimeUnit(_))
        ));
    }

    #[test]
    fn test_symbols_round_trip_through_selector() {
        for unit in TimeUnit::ALL {
            assert_eq!(unit.symbol().parse::<TimeUnit>().unwrap(), unit);
        }
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.2), "0.2s");
        assert_eq!(format_seconds(0.000_005), "0.000005s");
    }

    proptest! {
        #[test]
        fn prop_milliseconds_are_thousandths(ms in 0u32..10_000_000) {
            let secs = parse_duration(&ms.to_string(), TimeUnit::Milliseconds).unwrap();
            prop_assert!(close(secs * 1e3, f64::from(ms)));
        }
    }
}

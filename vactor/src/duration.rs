//! Wire encoding of timer and reminder intervals.
//!
//! The runtime speaks Go-style duration strings restricted to a fixed unit order:
//! `"{h}h{m}m{s}s{ms}ms"`, optionally followed by `"{us}us{ns}ns"` when the value carries
//! sub-millisecond precision. Days are folded into hours. The disabled sentinel
//! ("never start" for due times, "fire once" for periods) is the empty string.

use std::{fmt, fmt::Write, str::FromStr, time::Duration};

use crate::errors::FormatError;

/// Due time or period of a timer or reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    /// Negative-one sentinel: the timer never starts, or never repeats.
    Disabled,
    After(Duration),
}

// (suffix, nanoseconds per unit), in the only order accepted on the wire
const UNITS: [(&str, u128); 6] = [
    ("h", 3_600_000_000_000),
    ("m", 60_000_000_000),
    ("s", 1_000_000_000),
    ("ms", 1_000_000),
    ("us", 1_000),
    ("ns", 1),
];

pub fn encode(interval: Interval) -> String {
    let Interval::After(d) = interval else {
        return String::new();
    };

    let secs = d.as_secs();
    let nanos = d.subsec_nanos();

    let mut out = format!(
        "{}h{}m{}s{}ms",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60,
        nanos / 1_000_000
    );

    let sub_milli = nanos % 1_000_000;
    if sub_milli != 0 {
        // Writing into a String cannot fail
        let _ = write!(out, "{}us{}ns", sub_milli / 1_000, sub_milli % 1_000);
    }

    out
}

pub fn decode(input: &str) -> Result<Interval, FormatError> {
    if input.is_empty() {
        return Ok(Interval::Disabled);
    }

    let mut total: u128 = 0;
    let mut next_unit = 0;
    let mut rest = input;

    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(FormatError::new(input, "expected a number"));
        }
        let (number, tail) = rest.split_at(digits);

        let letters = tail.bytes().take_while(u8::is_ascii_alphabetic).count();
        if letters == 0 {
            return Err(FormatError::new(input, "missing unit"));
        }
        let (unit, tail) = tail.split_at(letters);

        let Some(pos) = UNITS.iter().position(|(suffix, _)| *suffix == unit) else {
            return Err(FormatError::new(input, format!("unknown unit {unit:?}")));
        };
        if pos < next_unit {
            return Err(FormatError::new(
                input,
                format!("unit {unit:?} repeated or out of order"),
            ));
        }
        next_unit = pos + 1;

        let value: u128 = number
            .parse()
            .map_err(|_| FormatError::new(input, "number out of range"))?;

        total = value
            .checked_mul(UNITS[pos].1)
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| FormatError::new(input, "duration overflow"))?;

        rest = tail;
    }

    let secs = u64::try_from(total / 1_000_000_000)
        .map_err(|_| FormatError::new(input, "duration overflow"))?;
    let nanos = (total % 1_000_000_000) as u32;

    Ok(Interval::After(Duration::new(secs, nanos)))
}

// Implementations

impl Interval {
    /// Fire as soon as possible.
    pub const IMMEDIATE: Interval = Interval::After(Duration::ZERO);

    pub const fn from_secs(secs: u64) -> Self {
        Interval::After(Duration::from_secs(secs))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Interval::After(Duration::from_millis(millis))
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Interval::Disabled)
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Interval::Disabled => None,
            Interval::After(d) => Some(*d),
        }
    }
}

impl From<Duration> for Interval {
    fn from(d: Duration) -> Self {
        Interval::After(d)
    }
}

impl From<Option<Duration>> for Interval {
    fn from(d: Option<Duration>) -> Self {
        d.map_or(Interval::Disabled, Interval::After)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(*self))
    }
}

impl FromStr for Interval {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

/// `#[serde(with = "serde_interval")]` support for wire payloads.
pub(crate) mod serde_interval {
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::Interval;

    pub(crate) fn serialize<S: Serializer>(
        interval: &Interval,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(*interval))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Interval, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        assert_eq!(encode(Interval::IMMEDIATE), "0h0m0s0ms");
        assert_eq!(encode(Interval::from_secs(10)), "0h0m10s0ms");
        assert_eq!(
            encode(Interval::After(Duration::from_millis(
                (25 * 3600 + 4 * 60 + 5) * 1000 + 60
            ))),
            "25h4m5s60ms"
        );
        assert_eq!(encode(Interval::Disabled), "");
        assert_eq!(
            encode(Interval::After(Duration::new(1, 2_003_004))),
            "0h0m1s2ms3us4ns"
        );
    }

    #[test]
    fn test_round_trip() {
        let samples = [
            Interval::Disabled,
            Interval::IMMEDIATE,
            Interval::from_millis(1),
            Interval::from_secs(59),
            Interval::from_secs(3600 * 24 * 400),
            Interval::After(Duration::new(7, 1)),
            Interval::After(Duration::new(u64::MAX / 4, 999_999_999)),
        ];

        for interval in samples {
            assert_eq!(decode(&encode(interval)).unwrap(), interval, "{interval:?}");
        }
    }

    #[test]
    fn test_decode_partial_units() {
        assert_eq!(decode("10s").unwrap(), Interval::from_secs(10));
        assert_eq!(decode("1h30m").unwrap(), Interval::from_secs(5400));
        assert_eq!(decode("90m").unwrap(), Interval::from_secs(5400));
        assert_eq!(decode("250ms").unwrap(), Interval::from_millis(250));
    }

    #[test]
    fn test_decode_malformed() {
        for bad in [
            "-1ms", "1x", "h", "10", "1s1h", "1m1m", "1.5s", "1h 2m", "s10", "1ms2",
        ] {
            assert!(decode(bad).is_err(), "{bad:?} should not decode");
        }

        assert!(decode("99999999999999999999999999999999999999999h").is_err());
    }

    #[test]
    fn test_from_str_and_display() {
        let interval: Interval = "0h1m0s0ms".parse().unwrap();
        assert_eq!(interval, Interval::from_secs(60));
        assert_eq!(interval.to_string(), "0h1m0s0ms");
        assert_eq!(Interval::from(None::<Duration>), Interval::Disabled);
        assert_eq!(interval.as_duration(), Some(Duration::from_secs(60)));
        assert_eq!(Interval::Disabled.as_duration(), None);
    }
}

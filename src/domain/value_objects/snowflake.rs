//! Snowflake identifier value object.
//!
//! Users and messages are identified by 64-bit Snowflake ids. Callers hand
//! them over as decimal strings; this type is the single place where that
//! text is checked.
//!
//! ```text
//! 64                         22          17          12          0
//! +---------------------------+-----------+-----------+-----------+
//! |         timestamp         |  worker   |  process  |  sequence |
//! |          (42 bits)        |  (5 bits) |  (5 bits) |  (12 bits)|
//! +---------------------------+-----------+-----------+-----------+
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A Snowflake id. Always strictly positive once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snowflake(pub i64);

/// Why a textual id was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnowflakeParseError {
    #[error("id is empty")]
    Empty,

    #[error("id must contain only decimal digits")]
    NotNumeric,

    #[error("id must be a positive 64-bit integer")]
    OutOfRange,
}

impl Snowflake {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Sequence bits (low 12).
    pub fn sequence(&self) -> u16 {
        (self.0 as u64 & 0xFFF) as u16
    }

    /// Milliseconds since the generator epoch.
    pub fn epoch_offset_ms(&self) -> u64 {
        (self.0 as u64) >> 22
    }
}

impl FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SnowflakeParseError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SnowflakeParseError::NotNumeric);
        }
        match s.parse::<i64>() {
            Ok(value) if value > 0 => Ok(Self(value)),
            _ => Err(SnowflakeParseError::OutOfRange),
        }
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Snowflake {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Snowflake> for i64 {
    fn from(snowflake: Snowflake) -> Self {
        snowflake.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_valid() {
        let sf: Snowflake = "175928847299117063".parse().unwrap();
        assert_eq!(sf.as_i64(), 175928847299117063);
        assert_eq!(sf.to_string(), "175928847299117063");
    }

    #[test_case("" => SnowflakeParseError::Empty ; "empty")]
    #[test_case("   " => SnowflakeParseError::Empty ; "whitespace")]
    #[test_case("12ab" => SnowflakeParseError::NotNumeric ; "letters")]
    #[test_case("-5" => SnowflakeParseError::NotNumeric ; "negative")]
    #[test_case("0" => SnowflakeParseError::OutOfRange ; "zero")]
    #[test_case("99999999999999999999" => SnowflakeParseError::OutOfRange ; "overflow")]
    fn test_parse_rejects(input: &str) -> SnowflakeParseError {
        input.parse::<Snowflake>().unwrap_err()
    }

    #[test]
    fn test_components() {
        let sf = Snowflake::new((1234 << 22) | 7);
        assert_eq!(sf.epoch_offset_ms(), 1234);
        assert_eq!(sf.sequence(), 7);
    }
}

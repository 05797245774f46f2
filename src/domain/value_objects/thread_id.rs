//! Conversation (thread) identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the two participant ids.
pub const THREAD_ID_SEPARATOR: char = '_';

/// Order-independent id of a two-party conversation.
///
/// Built by sorting the two participant ids as text and joining them, so
/// `for_participants(a, b) == for_participants(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn for_participants(a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{}{}{}", low, THREAD_ID_SEPARATOR, high))
    }

    /// Wrap an id read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("u1", "u2" ; "short ids")]
    #[test_case("507f1f77bcf86cd799439011", "507f191e810c19729de860ea" ; "hex ids")]
    #[test_case("9", "10" ; "numeric ids sort as text")]
    fn test_symmetric(a: &str, b: &str) {
        assert_eq!(ThreadId::for_participants(a, b), ThreadId::for_participants(b, a));
    }

    #[test]
    fn test_format() {
        assert_eq!(ThreadId::for_participants("u2", "u1").as_str(), "u1_u2");
        assert_eq!(ThreadId::for_participants("9", "10").to_string(), "10_9");
    }
}

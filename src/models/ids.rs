// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Canonical identifiers for curriculum content.
//!
//! Clients send series and episode ids either as JSON numbers or as numeric
//! strings (`"1"` and `1` name the same episode). Everything that reaches the
//! store goes through [`ContentId`], so a record can never be duplicated under
//! two spellings of the same id.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Numeric id of a series or an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentId(pub u32);

/// Reserved id of the onboarding/tutorial series.
pub const TUTORIAL_SERIES_ID: ContentId = ContentId(0);

impl ContentId {
    pub fn is_tutorial(self) -> bool {
        self == TUTORIAL_SERIES_ID
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ContentId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Error for ids that are not non-negative integers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid content id: {0:?}")]
pub struct InvalidContentId(pub String);

impl FromStr for ContentId {
    type Err = InvalidContentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(ContentId)
            .map_err(|_| InvalidContentId(s.to_string()))
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

struct ContentIdVisitor;

impl de::Visitor<'_> for ContentIdVisitor {
    type Value = ContentId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer or a numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ContentId, E> {
        u32::try_from(v)
            .map(ContentId)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ContentId, E> {
        u32::try_from(v)
            .map(ContentId)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ContentId, E> {
        if v.fract() == 0.0 && v >= 0.0 && v <= f64::from(u32::MAX) {
            Ok(ContentId(v as u32))
        } else {
            Err(E::invalid_value(de::Unexpected::Float(v), &self))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ContentId, E> {
        v.parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ContentIdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_and_number_ids_are_equal() {
        let from_str: ContentId = serde_json::from_str("\"1\"").unwrap();
        let from_num: ContentId = serde_json::from_str("1").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(serde_json::to_string(&from_str).unwrap(), "1");
    }

    #[test]
    fn test_rejects_non_numeric_and_negative() {
        assert!(serde_json::from_str::<ContentId>("\"abc\"").is_err());
        assert!(serde_json::from_str::<ContentId>("-3").is_err());
        assert!(serde_json::from_str::<ContentId>("1.5").is_err());
        assert!("x1".parse::<ContentId>().is_err());
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(" 7 ".parse::<ContentId>().unwrap(), ContentId(7));
    }

    #[test]
    fn test_tutorial_id() {
        assert!(ContentId(0).is_tutorial());
        assert!(!ContentId(3).is_tutorial());
    }
}
